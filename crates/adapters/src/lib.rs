//! # logfit-adapters
//!
//! Adapter implementations around the dump core: log sinks, the level/channel
//! gate, record processors, reduction observers, std-error capture, and the
//! bounded JSON handler that ties them together.
//! This crate depends on `ports`, `shared`, `config`, and `dump`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod capture;
pub mod gate;
pub mod handler;
pub mod log_sink;
pub mod observer;
pub mod processors;

pub use capture::capture_std_error;
pub use gate::LevelChannelGate;
pub use handler::{BoundedJsonHandler, HandleOutcome};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use observer::{CountingObserver, FanOutObserver, ReductionCounts, TracingObserver};
pub use processors::{
    AppEnvProcessor, ErrorChainProcessor, MoveContextProcessor, RequestIdProcessor,
};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
