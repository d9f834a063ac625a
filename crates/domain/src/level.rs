//! Record severity levels.
//!
//! Ordinals follow the syslog ladder (RFC 5424) as numbered by common
//! logging stacks, so levels read from upstream producers keep their meaning.

use logfit_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordinal severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Detailed debug information.
    Debug,
    /// Interesting events.
    Info,
    /// Normal but significant events.
    Notice,
    /// Exceptional occurrences that are not errors.
    Warning,
    /// Runtime errors that do not require immediate action.
    Error,
    /// Critical conditions.
    Critical,
    /// Action must be taken immediately.
    Alert,
    /// System is unusable.
    Emergency,
}

impl Level {
    /// Every level in ascending severity.
    pub const ALL: [Self; 8] = [
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Critical,
        Self::Alert,
        Self::Emergency,
    ];

    /// Numeric ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u16 {
        match self {
            Self::Debug => 100,
            Self::Info => 200,
            Self::Notice => 250,
            Self::Warning => 300,
            Self::Error => 400,
            Self::Critical => 500,
            Self::Alert => 550,
            Self::Emergency => 600,
        }
    }

    /// Upper-case level name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Alert => "ALERT",
            Self::Emergency => "EMERGENCY",
        }
    }

    /// Resolve an exact ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: u16) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.ordinal() == ordinal)
    }

    /// Parse a level from a name (case-insensitive, `WARN` accepted) or an
    /// exact ordinal.
    pub fn parse(input: &str) -> Result<Self, LevelParseError> {
        let trimmed = input.trim();
        if let Ok(ordinal) = trimmed.parse::<u16>() {
            return Self::from_ordinal(ordinal).ok_or_else(|| LevelParseError::new(input));
        }
        let upper = trimmed.to_ascii_uppercase();
        if upper == "WARN" {
            return Ok(Self::Warning);
        }
        Self::ALL
            .into_iter()
            .find(|level| level.name() == upper)
            .ok_or_else(|| LevelParseError::new(input))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelInput {
    Ordinal(u16),
    Name(String),
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match LevelInput::deserialize(deserializer)? {
            LevelInput::Ordinal(ordinal) => Self::from_ordinal(ordinal)
                .ok_or_else(|| serde::de::Error::custom(LevelParseError::new(ordinal.to_string()))),
            LevelInput::Name(name) => Self::parse(&name).map_err(serde::de::Error::custom),
        }
    }
}

/// Unknown level name or ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelParseError {
    input: String,
}

impl LevelParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for LevelParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown log level: {:?}", self.input)
    }
}

impl std::error::Error for LevelParseError {}

impl From<LevelParseError> for ErrorEnvelope {
    fn from(error: LevelParseError) -> Self {
        Self::expected(ErrorCode::new("domain", "invalid_level"), error.to_string())
            .with_metadata("input", error.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_aliases_and_ordinals() -> Result<(), LevelParseError> {
        assert_eq!(Level::parse("warning")?, Level::Warning);
        assert_eq!(Level::parse("WARN")?, Level::Warning);
        assert_eq!(Level::parse(" critical ")?, Level::Critical);
        assert_eq!(Level::parse("550")?, Level::Alert);
        Ok(())
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(Level::parse("loud").is_err());
        assert!(Level::parse("301").is_err());
    }

    #[test]
    fn ordering_follows_ordinals() {
        for pair in Level::ALL.windows(2) {
            if let [lower, higher] = pair {
                assert!(lower < higher);
                assert!(lower.ordinal() < higher.ordinal());
            }
        }
    }

    #[test]
    fn serde_accepts_names_and_numbers() -> Result<(), serde_json::Error> {
        let by_name: Level = serde_json::from_str("\"error\"")?;
        let by_number: Level = serde_json::from_str("400")?;
        assert_eq!(by_name, Level::Error);
        assert_eq!(by_number, Level::Error);
        assert_eq!(serde_json::to_string(&Level::Notice)?, "\"NOTICE\"");
        assert!(serde_json::from_str::<Level>("401").is_err());
        Ok(())
    }
}
