//! Materialized error trees handed to the dump core.
//!
//! Capture happens elsewhere; this module only holds the already-built
//! `{message, class, frames, previous}` tree and exposes it as an
//! [`Opaque`] so the projector renders it like any other object.

use crate::value::{Opaque, OpaqueKind, Value, ValueMap};
use std::sync::Arc;

/// Text written in place of causes beyond the configured chain depth.
pub const MAX_CAUSE_DEPTH_MESSAGE: &str = "The max depth level has been reached";

/// One call-site frame.
#[derive(Debug, Clone, Default)]
pub struct StackFrame {
    /// Function or method name.
    pub function: String,
    /// Defining type, if the frame is a method.
    pub type_name: Option<String>,
    /// Call-site file.
    pub file: Option<String>,
    /// Call-site line.
    pub line: Option<u32>,
    /// Call arguments.
    pub args: Vec<Value>,
}

impl StackFrame {
    /// Frame for a free function.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    /// Attach the call site.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Attach the defining type.
    #[must_use]
    pub fn in_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = ValueMap::new().with("function", self.function.as_str());
        if let Some(type_name) = &self.type_name {
            map.insert("class", Value::from(type_name.as_str()));
        }
        if let Some(file) = &self.file {
            map.insert("file", Value::from(file.as_str()));
        }
        if let Some(line) = self.line {
            map.insert("line", Value::from(line));
        }
        if !self.args.is_empty() {
            map.insert("args", Value::List(self.args.clone()));
        }
        Value::Map(map)
    }
}

/// Cause attached to a captured error.
#[derive(Debug, Clone)]
pub enum PreviousError {
    /// The next error in the chain.
    Captured(Arc<CapturedError>),
    /// The chain was cut at this point.
    Elided,
}

/// An error/exception with its cause chain.
#[derive(Debug, Clone, Default)]
pub struct CapturedError {
    /// Human-readable message.
    pub message: String,
    /// Kind or class identifier.
    pub class: String,
    /// Application error code.
    pub code: Option<i64>,
    /// File where the error was raised.
    pub file: Option<String>,
    /// Line where the error was raised.
    pub line: Option<u32>,
    /// Stack frames, innermost first.
    pub frames: Vec<StackFrame>,
    /// Free-form data attached by the raiser.
    pub extra_data: Option<Value>,
    /// HTTP-style status, when the error maps to a response.
    pub status_code: Option<u16>,
    /// Nested cause.
    pub previous: Option<PreviousError>,
}

impl CapturedError {
    /// Create an error with a class and message.
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach a cause.
    #[must_use]
    pub fn caused_by(mut self, previous: Self) -> Self {
        self.previous = Some(PreviousError::Captured(Arc::new(previous)));
        self
    }

    /// Attach an HTTP-style status.
    #[must_use]
    pub const fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach free-form data.
    #[must_use]
    pub fn with_extra_data(mut self, data: impl Into<Value>) -> Self {
        self.extra_data = Some(data.into());
        self
    }

    /// Attach a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// The direct cause, if one is attached and not elided.
    #[must_use]
    pub fn cause(&self) -> Option<&Arc<Self>> {
        match &self.previous {
            Some(PreviousError::Captured(previous)) => Some(previous),
            Some(PreviousError::Elided) | None => None,
        }
    }

    /// Number of errors in the chain, this one included.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        let mut len = 1;
        let mut current = self.cause();
        while let Some(error) = current {
            len += 1;
            current = error.cause();
        }
        len
    }

    /// Copy of this error with causes deeper than `max_depth` replaced by
    /// [`PreviousError::Elided`]. Depth 0 is this error.
    #[must_use]
    pub fn truncated(&self, max_depth: usize) -> Self {
        self.truncated_at(0, max_depth)
    }

    fn truncated_at(&self, depth: usize, max_depth: usize) -> Self {
        let previous = match &self.previous {
            Some(PreviousError::Captured(_)) if depth >= max_depth => Some(PreviousError::Elided),
            Some(PreviousError::Captured(cause)) => Some(PreviousError::Captured(Arc::new(
                cause.truncated_at(depth + 1, max_depth),
            ))),
            other => other.clone(),
        };
        Self {
            previous,
            ..self.clone()
        }
    }
}

impl Opaque for CapturedError {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn kind(&self) -> OpaqueKind {
        OpaqueKind::Error
    }

    fn attributes(&self) -> ValueMap {
        let mut map = ValueMap::new().with("message", self.message.as_str());
        if let Some(code) = self.code {
            map.insert("code", Value::from(code));
        }
        if let Some(file) = &self.file {
            map.insert("file", Value::from(file.as_str()));
        }
        if let Some(line) = self.line {
            map.insert("line", Value::from(line));
        }
        if let Some(status_code) = self.status_code {
            map.insert("statusCode", Value::from(u32::from(status_code)));
        }
        if !self.frames.is_empty() {
            map.insert(
                "trace",
                Value::List(self.frames.iter().map(StackFrame::to_value).collect()),
            );
        }
        if let Some(data) = &self.extra_data {
            map.insert("extraData", data.clone());
        }
        match &self.previous {
            Some(PreviousError::Captured(previous)) => {
                let previous: Arc<dyn Opaque> = previous.clone();
                map.insert("previous", Value::Opaque(previous));
            },
            Some(PreviousError::Elided) => {
                map.insert("previous", Value::from(MAX_CAUSE_DEPTH_MESSAGE));
            },
            None => {},
        }
        map
    }
}
