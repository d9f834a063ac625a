//! Bounded JSON line handler.
//!
//! Pipeline per record: gate, processors, reduction, duplicate check, sink.
//! The handler never exits the process; a stop request is reported back to
//! the caller in [`HandleOutcome::Written`].

use crate::gate::LevelChannelGate;
use crate::log_sink::LogSink;
use crate::processors::{
    AppEnvProcessor, ErrorChainProcessor, MoveContextProcessor, RequestIdProcessor,
};
use logfit_config::ValidatedConfig;
use logfit_domain::{Level, Record};
use logfit_dump::AdaptiveReducer;
use logfit_ports::{AdmitAll, ReductionObserver, ReductionOutcome, RecordGate, RecordProcessor};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// What the handler did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The gate rejected the record.
    Skipped,
    /// The bounded line equals the previously written one and was dropped.
    Duplicate,
    /// The line was written.
    Written {
        /// How the line was produced.
        reduction: ReductionOutcome,
        /// The record's level is above the stop threshold.
        stop_requested: bool,
    },
}

impl HandleOutcome {
    /// Returns true when a line reached the sink.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Returns true when the caller should stop processing.
    #[must_use]
    pub const fn stop_requested(&self) -> bool {
        matches!(
            self,
            Self::Written {
                stop_requested: true,
                ..
            }
        )
    }
}

/// Writes each admitted record as one bounded JSON line.
pub struct BoundedJsonHandler {
    gate: Arc<dyn RecordGate>,
    processors: Vec<Arc<dyn RecordProcessor>>,
    reducer: AdaptiveReducer,
    sink: Arc<dyn LogSink>,
    deduplicate: bool,
    stop_when_level_above: Level,
    last_fingerprint: Mutex<Option<String>>,
    suppress_stop: AtomicBool,
}

impl std::fmt::Debug for BoundedJsonHandler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BoundedJsonHandler")
            .field("processors", &self.processor_names())
            .field("reducer", &self.reducer)
            .field("deduplicate", &self.deduplicate)
            .field("stop_when_level_above", &self.stop_when_level_above)
            .finish_non_exhaustive()
    }
}

impl BoundedJsonHandler {
    /// Handler admitting every record, with no processors, deduplication on,
    /// and stop requests above `Critical`.
    #[must_use]
    pub fn new(reducer: AdaptiveReducer, sink: Arc<dyn LogSink>) -> Self {
        Self {
            gate: Arc::new(AdmitAll),
            processors: Vec::new(),
            reducer,
            sink,
            deduplicate: true,
            stop_when_level_above: Level::Critical,
            last_fingerprint: Mutex::new(None),
            suppress_stop: AtomicBool::new(false),
        }
    }

    /// Handler wired from a validated config: level/channel gate, then the
    /// error chain, context move, env, and request id processors.
    #[must_use]
    pub fn from_config(
        config: &ValidatedConfig,
        sink: Arc<dyn LogSink>,
        observer: Arc<dyn ReductionObserver>,
    ) -> Self {
        let handler_config = &config.handler;
        let chain_depth =
            usize::try_from(config.limits().error_chain_max_depth.get()).unwrap_or(usize::MAX);
        let reducer = AdaptiveReducer::new(config.reduction_policy()).with_observer(observer);

        Self::new(reducer, sink)
            .with_gate(Arc::new(LevelChannelGate::from_config(handler_config)))
            .with_processor(Arc::new(ErrorChainProcessor::new(chain_depth)))
            .with_processor(Arc::new(MoveContextProcessor))
            .with_processor(Arc::new(AppEnvProcessor::new(handler_config.app_env.clone())))
            .with_processor(Arc::new(RequestIdProcessor::new(
                handler_config.request_id.clone(),
                handler_config.request_id_forwarded.clone(),
            )))
            .with_deduplication(handler_config.deduplicate)
            .with_stop_when_level_above(handler_config.stop_when_level_above)
    }

    /// Replace the gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn RecordGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Append a processor; processors run in registration order.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Toggle duplicate suppression.
    #[must_use]
    pub const fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Request a stop for records above `level`.
    #[must_use]
    pub const fn with_stop_when_level_above(mut self, level: Level) -> Self {
        self.stop_when_level_above = level;
        self
    }

    /// Names of the registered processors, in order.
    #[must_use]
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors
            .iter()
            .map(|processor| processor.name())
            .collect()
    }

    /// The reducer in use.
    #[must_use]
    pub const fn reducer(&self) -> &AdaptiveReducer {
        &self.reducer
    }

    /// Do not request a stop for the next record that would trigger one.
    pub fn suppress_next_stop(&self) {
        self.suppress_stop.store(true, Ordering::SeqCst);
    }

    /// Run one record through the pipeline.
    pub fn handle(&self, record: Record) -> HandleOutcome {
        if !self.gate.admits(&record) {
            tracing::trace!(
                level = %record.level,
                channel = %record.channel,
                "record skipped by gate"
            );
            return HandleOutcome::Skipped;
        }

        let record = self
            .processors
            .iter()
            .fold(record, |record, processor| processor.process(record));
        let level = record.level;
        let reduction = self.reducer.reduce_with_report(&record.to_value());

        if self.deduplicate && self.is_repeat(&reduction.output) {
            tracing::debug!(%level, "duplicate record suppressed");
            return HandleOutcome::Duplicate;
        }

        let mut line = reduction.output;
        line.push('\n');
        self.sink.write_line(&line);

        HandleOutcome::Written {
            reduction: reduction.outcome,
            stop_requested: self.stop_requested(level),
        }
    }

    fn is_repeat(&self, output: &str) -> bool {
        let fingerprint = format!("{:x}", Sha256::digest(output.as_bytes()));
        let mut last = self
            .last_fingerprint
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == Some(fingerprint.as_str()) {
            return true;
        }
        *last = Some(fingerprint);
        false
    }

    fn stop_requested(&self, level: Level) -> bool {
        if level <= self.stop_when_level_above {
            return false;
        }
        if self.suppress_stop.swap(false, Ordering::SeqCst) {
            tracing::debug!(%level, "stop request suppressed once");
            return false;
        }
        tracing::warn!(
            %level,
            threshold = %self.stop_when_level_above,
            "record level requests a stop"
        );
        true
    }
}
