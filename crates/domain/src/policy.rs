//! Reduction policy: every knob the dump core reads.

use serde::{Deserialize, Serialize};

/// Default depth ceiling for the depth search.
pub const DEFAULT_MAX_DUMP_DEPTH: usize = 5;
/// Default output budget.
pub const DEFAULT_MAX_RECORD_LENGTH: usize = 16_000;
/// Default size placeholder.
pub const DEFAULT_PLACEHOLDER: &str = "too big";
/// Default depth marker.
pub const DEFAULT_DEPTH_MARKER: &str = "**MAX_DEPTH**";
/// Default terminal output when nothing fits.
pub const DEFAULT_TOO_BIG_FALLBACK: &str = r#"{"message":"the record is too big"}"#;
/// Default cap on placeholder substitutions.
pub const DEFAULT_MAX_REDUCTION_STEPS: usize = 4096;

/// Smallest record any budget must be able to hold.
pub const MIN_SKELETON: &str = r#"{"message":""}"#;
/// Smallest accepted budget (`MIN_SKELETON` must fit strictly).
pub const MIN_RECORD_LENGTH: usize = MIN_SKELETON.len() + 1;

/// Unit the budget is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Unicode scalar values.
    #[default]
    Chars,
    /// UTF-8 bytes.
    Bytes,
    /// Extended grapheme clusters.
    Graphemes,
}

impl LengthUnit {
    /// Lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chars => "chars",
            Self::Bytes => "bytes",
            Self::Graphemes => "graphemes",
        }
    }
}

/// Order in which substitution positions are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionOrder {
    /// Last-declared field and child first.
    #[default]
    Reverse,
    /// First-declared field and child first.
    Forward,
}

/// Configuration surface of the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionPolicy {
    /// Depth ceiling for the depth search.
    pub max_dump_depth: usize,
    /// Output budget; output must be strictly shorter.
    pub max_record_length: usize,
    /// Replacement for subtrees removed for size.
    pub placeholder: String,
    /// Replacement for subtrees cut by depth.
    pub depth_marker: String,
    /// Terminal output when the budget cannot be met.
    pub too_big_fallback: String,
    /// Unit the budget is measured in.
    pub length_unit: LengthUnit,
    /// Cap on substitutions before giving up.
    pub max_reduction_steps: usize,
    /// Substitution visiting order.
    pub substitution_order: SubstitutionOrder,
}

impl Default for ReductionPolicy {
    fn default() -> Self {
        Self {
            max_dump_depth: DEFAULT_MAX_DUMP_DEPTH,
            max_record_length: DEFAULT_MAX_RECORD_LENGTH,
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            depth_marker: DEFAULT_DEPTH_MARKER.to_owned(),
            too_big_fallback: DEFAULT_TOO_BIG_FALLBACK.to_owned(),
            length_unit: LengthUnit::Chars,
            max_reduction_steps: DEFAULT_MAX_REDUCTION_STEPS,
            substitution_order: SubstitutionOrder::Reverse,
        }
    }
}

impl ReductionPolicy {
    /// Override the depth ceiling.
    #[must_use]
    pub const fn with_max_dump_depth(mut self, depth: usize) -> Self {
        self.max_dump_depth = depth;
        self
    }

    /// Override the budget.
    #[must_use]
    pub const fn with_max_record_length(mut self, length: usize) -> Self {
        self.max_record_length = length;
        self
    }

    /// Override the placeholder.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Override the depth marker.
    #[must_use]
    pub fn with_depth_marker(mut self, marker: impl Into<String>) -> Self {
        self.depth_marker = marker.into();
        self
    }

    /// Override the budget unit.
    #[must_use]
    pub const fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = unit;
        self
    }

    /// Override the substitution cap.
    #[must_use]
    pub const fn with_max_reduction_steps(mut self, steps: usize) -> Self {
        self.max_reduction_steps = steps;
        self
    }

    /// Override the substitution order.
    #[must_use]
    pub const fn with_substitution_order(mut self, order: SubstitutionOrder) -> Self {
        self.substitution_order = order;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = ReductionPolicy::default();
        assert_eq!(policy.max_dump_depth, 5);
        assert_eq!(policy.max_record_length, 16_000);
        assert_eq!(policy.placeholder, "too big");
        assert_eq!(policy.depth_marker, "**MAX_DEPTH**");
        assert_eq!(policy.too_big_fallback, r#"{"message":"the record is too big"}"#);
        assert_eq!(policy.length_unit, LengthUnit::Chars);
        assert_eq!(policy.substitution_order, SubstitutionOrder::Reverse);
    }

    #[test]
    fn minimum_budget_holds_skeleton() {
        assert_eq!(MIN_RECORD_LENGTH, 15);
    }

    #[test]
    fn units_and_orders_use_lowercase_names() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&LengthUnit::Graphemes)?, "\"graphemes\"");
        let order: SubstitutionOrder = serde_json::from_str("\"forward\"")?;
        assert_eq!(order, SubstitutionOrder::Forward);
        Ok(())
    }
}
