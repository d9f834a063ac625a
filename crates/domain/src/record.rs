//! Structured log records.

use crate::error::{CapturedError, PreviousError, StackFrame};
use crate::level::{Level, LevelParseError};
use crate::value::{Value, ValueMap};
use logfit_shared::{ErrorCode, ErrorEnvelope};
use serde_json::Map as JsonMap;
use std::fmt;
use std::sync::Arc;

/// Channel used when a record does not name one.
pub const DEFAULT_CHANNEL: &str = "app";

/// Context key an attached error is exposed under.
pub const EXCEPTION_KEY: &str = "exception";

/// One structured log event.
#[derive(Debug, Clone)]
pub struct Record {
    /// Severity.
    pub level: Level,
    /// Category the record was logged on.
    pub channel: String,
    /// Human-readable message.
    pub message: String,
    /// Caller-supplied data.
    pub context: ValueMap,
    /// Processor-supplied data.
    pub extra: ValueMap,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: Option<i64>,
    /// Attached error.
    pub error: Option<Arc<CapturedError>>,
    /// Additional top-level fields, written after `extra`.
    pub fields: ValueMap,
}

impl Record {
    /// Create a record with empty context and extra data.
    pub fn new(level: Level, channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            channel: channel.into(),
            message: message.into(),
            context: ValueMap::new(),
            extra: ValueMap::new(),
            timestamp_ms: None,
            error: None,
            fields: ValueMap::new(),
        }
    }

    /// Builder-style context insert.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key, value.into());
        self
    }

    /// Builder-style extra insert.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value.into());
        self
    }

    /// Attach a timestamp.
    #[must_use]
    pub const fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Attach an error.
    #[must_use]
    pub fn with_error(mut self, error: CapturedError) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    /// Top-level mapping handed to the dump core.
    ///
    /// Field order is fixed: `timestampMs`, `level`, `levelName`, `channel`,
    /// `message`, `context`, `extra`, then any additional fields. An attached
    /// error appears as `context.exception`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        if let Some(timestamp_ms) = self.timestamp_ms {
            map.insert("timestampMs", Value::Int(timestamp_ms));
        }
        map.insert("level", Value::from(u32::from(self.level.ordinal())));
        map.insert("levelName", Value::from(self.level.name()));
        map.insert("channel", Value::from(self.channel.as_str()));
        map.insert("message", Value::from(self.message.as_str()));

        let mut context = self.context.clone();
        if let Some(error) = &self.error {
            context.insert(EXCEPTION_KEY, Value::Opaque(error.clone()));
        }
        map.insert("context", Value::Map(context));
        map.insert("extra", Value::Map(self.extra.clone()));

        for (key, value) in self.fields.iter() {
            map.insert(key, value.clone());
        }
        Value::Map(map)
    }

    /// Build a record from a decoded JSON object.
    ///
    /// Recognised keys: `level` (name or ordinal, default `INFO`), `channel`
    /// (default `app`), `message`, `context`, `extra`, `timestampMs`, and
    /// `exception` (an error object with an optional `previous` chain).
    /// Every other key lands in [`Record::fields`].
    pub fn from_json(value: serde_json::Value) -> Result<Self, RecordError> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(RecordError::NotAnObject {
                found: json_type_name(&value),
            });
        };

        let level = match object.remove("level") {
            None | Some(serde_json::Value::Null) => Level::Info,
            Some(serde_json::Value::String(name)) => Level::parse(&name)?,
            Some(serde_json::Value::Number(number)) => number
                .as_u64()
                .and_then(|ordinal| u16::try_from(ordinal).ok())
                .and_then(Level::from_ordinal)
                .ok_or_else(|| RecordError::InvalidField {
                    field: "level",
                    expected: "a known level ordinal",
                })?,
            Some(_) => {
                return Err(RecordError::InvalidField {
                    field: "level",
                    expected: "a level name or ordinal",
                });
            },
        };
        let channel = take_string(&mut object, "channel")?.unwrap_or_else(|| DEFAULT_CHANNEL.to_owned());
        let message = take_string(&mut object, "message")?.unwrap_or_default();
        let context = take_map(&mut object, "context")?;
        let extra = take_map(&mut object, "extra")?;
        let timestamp_ms = match object.remove("timestampMs") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(number)) => {
                Some(number.as_i64().ok_or(RecordError::InvalidField {
                    field: "timestampMs",
                    expected: "an integer",
                })?)
            },
            Some(_) => {
                return Err(RecordError::InvalidField {
                    field: "timestampMs",
                    expected: "an integer",
                });
            },
        };
        let error = match object.remove(EXCEPTION_KEY) {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(error)) => Some(Arc::new(captured_from_json(error)?)),
            Some(_) => {
                return Err(RecordError::InvalidField {
                    field: EXCEPTION_KEY,
                    expected: "an object",
                });
            },
        };
        let fields = object
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();

        Ok(Self {
            level,
            channel,
            message,
            context,
            extra,
            timestamp_ms,
            error,
            fields,
        })
    }
}

fn take_string(
    object: &mut JsonMap<String, serde_json::Value>,
    field: &'static str,
) -> Result<Option<String>, RecordError> {
    match object.remove(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(_) => Err(RecordError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn take_map(
    object: &mut JsonMap<String, serde_json::Value>,
    field: &'static str,
) -> Result<ValueMap, RecordError> {
    match object.remove(field) {
        None | Some(serde_json::Value::Null) => Ok(ValueMap::new()),
        Some(serde_json::Value::Object(entries)) => Ok(entries
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect()),
        // An empty JSON array is how some producers encode an empty map.
        Some(serde_json::Value::Array(items)) if items.is_empty() => Ok(ValueMap::new()),
        Some(_) => Err(RecordError::InvalidField {
            field,
            expected: "an object",
        }),
    }
}

fn take_u32(
    object: &mut JsonMap<String, serde_json::Value>,
    field: &'static str,
) -> Result<Option<u32>, RecordError> {
    match object.remove(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(number)) => number
            .as_u64()
            .and_then(|value| u32::try_from(value).ok())
            .map(Some)
            .ok_or(RecordError::InvalidField {
                field,
                expected: "a non-negative integer",
            }),
        Some(_) => Err(RecordError::InvalidField {
            field,
            expected: "a non-negative integer",
        }),
    }
}

fn captured_from_json(
    mut object: JsonMap<String, serde_json::Value>,
) -> Result<CapturedError, RecordError> {
    let message = take_string(&mut object, "message")?.unwrap_or_default();
    let class = take_string(&mut object, "class")?.unwrap_or_else(|| "Error".to_owned());
    let code = match object.remove("code") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(number)) => number.as_i64(),
        Some(_) => {
            return Err(RecordError::InvalidField {
                field: "exception.code",
                expected: "an integer",
            });
        },
    };
    let file = take_string(&mut object, "file")?;
    let line = take_u32(&mut object, "line")?;
    let status_code = take_u32(&mut object, "statusCode")?
        .map(|status| u16::try_from(status).unwrap_or(u16::MAX));
    let frames = match object.remove("trace") {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(frames)) => frames
            .into_iter()
            .map(frame_from_json)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(RecordError::InvalidField {
                field: "exception.trace",
                expected: "an array of frames",
            });
        },
    };
    let extra_data = object.remove("extraData").map(Value::from);
    let previous = match object.remove("previous") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Object(previous)) => Some(PreviousError::Captured(Arc::new(
            captured_from_json(previous)?,
        ))),
        Some(_) => {
            return Err(RecordError::InvalidField {
                field: "exception.previous",
                expected: "an object",
            });
        },
    };

    Ok(CapturedError {
        message,
        class,
        code,
        file,
        line,
        frames,
        extra_data,
        status_code,
        previous,
    })
}

fn frame_from_json(value: serde_json::Value) -> Result<StackFrame, RecordError> {
    let serde_json::Value::Object(mut object) = value else {
        return Err(RecordError::InvalidField {
            field: "exception.trace",
            expected: "an array of frames",
        });
    };
    let args = match object.remove("args") {
        Some(serde_json::Value::Array(args)) => args.into_iter().map(Value::from).collect(),
        _ => Vec::new(),
    };
    Ok(StackFrame {
        function: take_string(&mut object, "function")?.unwrap_or_default(),
        type_name: take_string(&mut object, "class")?,
        file: take_string(&mut object, "file")?,
        line: take_u32(&mut object, "line")?,
        args,
    })
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Record decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The input was not a JSON object.
    NotAnObject {
        /// JSON type found instead.
        found: &'static str,
    },
    /// A recognised field had the wrong shape.
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Shape the field must have.
        expected: &'static str,
    },
    /// The level name or ordinal is unknown.
    InvalidLevel(LevelParseError),
}

impl RecordError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotAnObject { .. } => ErrorCode::new("domain", "record_not_object"),
            Self::InvalidField { .. } => ErrorCode::new("domain", "invalid_record_field"),
            Self::InvalidLevel(_) => ErrorCode::new("domain", "invalid_level"),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => {
                write!(formatter, "record must be a JSON object (got {found})")
            },
            Self::InvalidField { field, expected } => {
                write!(formatter, "record field `{field}` must be {expected}")
            },
            Self::InvalidLevel(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for RecordError {}

impl From<LevelParseError> for RecordError {
    fn from(error: LevelParseError) -> Self {
        Self::InvalidLevel(error)
    }
}

impl From<RecordError> for ErrorEnvelope {
    fn from(error: RecordError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            RecordError::NotAnObject { found } => envelope.with_metadata("found", found),
            RecordError::InvalidField { field, .. } => envelope.with_metadata("field", field),
            RecordError::InvalidLevel(error) => envelope.with_metadata("input", error.input()),
        }
    }
}
