//! Bounded serialization: canonical JSON plus budget measurement.
//!
//! Output is compact JSON with Unicode and `/` left unescaped, control
//! characters (newlines included) escaped, and floats always carrying a
//! fractional part, so `1.0` stays distinct from `1`. Strings in the
//! projected tree are valid UTF-8 by construction; invalid input bytes are
//! substituted when values are built (see `Value::from_utf8_lossy`).

use crate::projector::ProjectedValue;
use logfit_domain::LengthUnit;
use unicode_segmentation::UnicodeSegmentation;

/// Measure `text` in `unit`.
#[must_use]
pub fn measure(unit: LengthUnit, text: &str) -> usize {
    match unit {
        LengthUnit::Chars => text.chars().count(),
        LengthUnit::Bytes => text.len(),
        LengthUnit::Graphemes => text.graphemes(true).count(),
    }
}

/// Serializes projected trees and checks them against a budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedSerializer {
    unit: LengthUnit,
}

impl BoundedSerializer {
    /// Create a serializer measuring in `unit`.
    #[must_use]
    pub const fn new(unit: LengthUnit) -> Self {
        Self { unit }
    }

    /// The unit lengths are measured in.
    #[must_use]
    pub const fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// Serialize to compact JSON. Never fails: a projected tree has string
    /// keys and finite numbers only.
    #[must_use]
    pub fn serialize(&self, value: &ProjectedValue) -> String {
        value.to_string()
    }

    /// Length of a serialized string in the configured unit.
    #[must_use]
    pub fn length(&self, serialized: &str) -> usize {
        measure(self.unit, serialized)
    }

    /// Returns true when `serialized` is strictly shorter than `budget`.
    #[must_use]
    pub fn fits(&self, serialized: &str, budget: usize) -> bool {
        self.length(serialized) < budget
    }

    /// Serialized length of a single projected node.
    #[must_use]
    pub fn node_length(&self, value: &ProjectedValue) -> usize {
        self.length(&self.serialize(value))
    }
}
