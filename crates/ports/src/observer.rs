//! Reduction observer boundary contract.
//!
//! This is the only side-effecting hook the dump core exposes. The core calls
//! it once per reduction; implementations must not panic.

use std::fmt;

/// Why the reducer gave up and returned the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// Every substitution position was replaced and the output still did not fit.
    BudgetUnreachable,
    /// The substitution step cap was exhausted.
    StepCapExceeded,
}

impl FallbackReason {
    /// Stable identifier for logs and counters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BudgetUnreachable => "budget_unreachable",
            Self::StepCapExceeded => "step_cap_exceeded",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// How a reduction produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionOutcome {
    /// The projection at `depth` fit without substitution.
    Fitted {
        /// Deepest projection depth that fit.
        depth: usize,
    },
    /// Positions were replaced with the placeholder until the output fit.
    Substituted {
        /// Depth of the projection substitution started from.
        base_depth: usize,
        /// Number of positions replaced.
        replaced: usize,
    },
    /// The fixed fallback was returned.
    Fallback {
        /// Why the budget could not be met.
        reason: FallbackReason,
    },
}

impl ReductionOutcome {
    /// Stable identifier for logs and counters.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Fitted { .. } => "fitted",
            Self::Substituted { .. } => "substituted",
            Self::Fallback { .. } => "fallback",
        }
    }

    /// Returns true for the fallback outcome.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Summary of one reduction handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionReport {
    /// How the output was produced.
    pub outcome: ReductionOutcome,
    /// Measured length of the output.
    pub output_length: usize,
    /// Budget the output was reduced against.
    pub budget: usize,
}

/// Boundary contract for observing reductions.
pub trait ReductionObserver: Send + Sync {
    /// Called once per reduction.
    fn on_reduction(&self, report: &ReductionReport);
}

/// Observer that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReductionObserver for NoopObserver {
    fn on_reduction(&self, _report: &ReductionReport) {}
}
