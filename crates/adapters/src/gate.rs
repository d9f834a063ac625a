//! Level and channel admission.

use logfit_config::HandlerConfig;
use logfit_domain::{DEFAULT_CHANNEL, Level, Record};
use logfit_ports::RecordGate;

/// Status codes at or above this are server errors and always pass.
pub const SERVER_ERROR_STATUS: u16 = 500;

/// Gate deciding which records are written.
///
/// Checked in order:
/// 1. an attached error with a client status (< 500) is skipped;
/// 2. a record below `ignore_below` is skipped;
/// 3. a record on a pass channel is admitted;
/// 4. any other channel is admitted only above `Info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChannelGate {
    ignore_below: Level,
    pass_channels: Vec<String>,
    skip_client_errors: bool,
}

impl Default for LevelChannelGate {
    fn default() -> Self {
        Self {
            ignore_below: Level::Debug,
            pass_channels: vec![DEFAULT_CHANNEL.to_owned()],
            skip_client_errors: true,
        }
    }
}

impl LevelChannelGate {
    /// Gate built from the handler config section.
    #[must_use]
    pub fn from_config(config: &HandlerConfig) -> Self {
        Self {
            ignore_below: config.ignore_record_level_below,
            pass_channels: config.pass_channels.clone(),
            skip_client_errors: config.skip_client_errors,
        }
    }

    /// Skip records below `level`.
    #[must_use]
    pub const fn with_ignore_below(mut self, level: Level) -> Self {
        self.ignore_below = level;
        self
    }

    /// Replace the channels admitted at every level.
    #[must_use]
    pub fn with_pass_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pass_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    fn is_client_error(record: &Record) -> bool {
        record
            .error
            .as_ref()
            .and_then(|error| error.status_code)
            .is_some_and(|status| status < SERVER_ERROR_STATUS)
    }
}

impl RecordGate for LevelChannelGate {
    fn admits(&self, record: &Record) -> bool {
        if self.skip_client_errors && Self::is_client_error(record) {
            return false;
        }
        if record.level < self.ignore_below {
            return false;
        }
        if self.pass_channels.iter().any(|channel| *channel == record.channel) {
            return true;
        }
        record.level > Level::Info
    }
}
