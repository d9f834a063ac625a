//! Record processors run before reduction.

use logfit_domain::{Record, Value};
use logfit_ports::RecordProcessor;

/// Value written when an enrichment source is unset.
pub const UNSET_MARKER: &str = "-";

/// Context key naming the field `MoveContextProcessor` moves context into.
pub const DESTINATION_FIELD_NAME: &str = "destinationFieldName";

/// Stamps the application environment into `extra.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEnvProcessor {
    env: Option<String>,
}

impl AppEnvProcessor {
    /// Processor stamping `env`, or `-` when `None`.
    #[must_use]
    pub const fn new(env: Option<String>) -> Self {
        Self { env }
    }
}

impl RecordProcessor for AppEnvProcessor {
    fn name(&self) -> &'static str {
        "app_env"
    }

    fn process(&self, mut record: Record) -> Record {
        let env = self.env.as_deref().unwrap_or(UNSET_MARKER);
        record.extra.insert("env", Value::from(env));
        record
    }
}

/// Stamps request correlation ids into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdProcessor {
    request_id: Option<String>,
    forwarded: Option<String>,
}

impl RequestIdProcessor {
    /// Processor stamping both ids, `-` for each one that is `None`.
    #[must_use]
    pub const fn new(request_id: Option<String>, forwarded: Option<String>) -> Self {
        Self {
            request_id,
            forwarded,
        }
    }
}

impl RecordProcessor for RequestIdProcessor {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process(&self, mut record: Record) -> Record {
        let request_id = self.request_id.as_deref().unwrap_or(UNSET_MARKER);
        let forwarded = self.forwarded.as_deref().unwrap_or(UNSET_MARKER);
        record.extra.insert("request_id", Value::from(request_id));
        record
            .extra
            .insert("request_id_forwarded", Value::from(forwarded));
        record
    }
}

/// Moves the whole context under the top-level field named by
/// `context.destinationFieldName`, leaving the context empty.
///
/// Records without a string destination pass unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveContextProcessor;

impl RecordProcessor for MoveContextProcessor {
    fn name(&self) -> &'static str {
        "move_context"
    }

    fn process(&self, mut record: Record) -> Record {
        let Some(destination) = record
            .context
            .get(DESTINATION_FIELD_NAME)
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return record;
        };

        let mut context = std::mem::take(&mut record.context);
        context.remove(DESTINATION_FIELD_NAME);
        record.fields.insert(destination, Value::Map(context));
        record
    }
}

/// Caps the cause chain of the attached error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorChainProcessor {
    max_depth: usize,
}

impl ErrorChainProcessor {
    /// Keep at most `max_depth` causes below the attached error.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl RecordProcessor for ErrorChainProcessor {
    fn name(&self) -> &'static str {
        "error_chain"
    }

    fn process(&self, mut record: Record) -> Record {
        if let Some(error) = &record.error
            && error.chain_len() > self.max_depth + 1
        {
            record.error = Some(std::sync::Arc::new(error.truncated(self.max_depth)));
        }
        record
    }
}
