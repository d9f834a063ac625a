//! Reduction observer adapters.

use logfit_ports::{FallbackReason, ReductionObserver, ReductionOutcome, ReductionReport};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Emits one `tracing` event per reduction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ReductionObserver for TracingObserver {
    fn on_reduction(&self, report: &ReductionReport) {
        match report.outcome {
            ReductionOutcome::Fallback { reason } => tracing::warn!(
                target: "logfit::reduction",
                outcome = report.outcome.label(),
                reason = reason.as_str(),
                budget = report.budget,
                length = report.output_length,
                "reduction fell back"
            ),
            _ => tracing::debug!(
                target: "logfit::reduction",
                outcome = report.outcome.label(),
                budget = report.budget,
                length = report.output_length,
                "reduction completed"
            ),
        }
    }
}

/// Point-in-time copy of [`CountingObserver`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionCounts {
    /// Reductions that fit without substitution.
    pub fitted: u64,
    /// Reductions that fit after substitution.
    pub substituted: u64,
    /// Fallbacks because the budget was unreachable.
    pub budget_unreachable: u64,
    /// Fallbacks because the step cap was exhausted.
    pub step_cap_exceeded: u64,
    /// Total placeholder substitutions across all reductions.
    pub replaced_positions: u64,
}

impl ReductionCounts {
    /// Every reduction seen.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.fitted + self.substituted + self.fallbacks()
    }

    /// Fallbacks of either reason.
    #[must_use]
    pub const fn fallbacks(&self) -> u64 {
        self.budget_unreachable + self.step_cap_exceeded
    }
}

/// Counts reductions per outcome.
#[derive(Debug, Default)]
pub struct CountingObserver {
    fitted: AtomicU64,
    substituted: AtomicU64,
    budget_unreachable: AtomicU64,
    step_cap_exceeded: AtomicU64,
    replaced_positions: AtomicU64,
}

impl CountingObserver {
    /// Create an observer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the counters.
    #[must_use]
    pub fn snapshot(&self) -> ReductionCounts {
        ReductionCounts {
            fitted: self.fitted.load(Ordering::Relaxed),
            substituted: self.substituted.load(Ordering::Relaxed),
            budget_unreachable: self.budget_unreachable.load(Ordering::Relaxed),
            step_cap_exceeded: self.step_cap_exceeded.load(Ordering::Relaxed),
            replaced_positions: self.replaced_positions.load(Ordering::Relaxed),
        }
    }
}

impl ReductionObserver for CountingObserver {
    fn on_reduction(&self, report: &ReductionReport) {
        match report.outcome {
            ReductionOutcome::Fitted { .. } => {
                self.fitted.fetch_add(1, Ordering::Relaxed);
            },
            ReductionOutcome::Substituted { replaced, .. } => {
                self.substituted.fetch_add(1, Ordering::Relaxed);
                self.replaced_positions.fetch_add(
                    u64::try_from(replaced).unwrap_or(u64::MAX),
                    Ordering::Relaxed,
                );
            },
            ReductionOutcome::Fallback {
                reason: FallbackReason::BudgetUnreachable,
            } => {
                self.budget_unreachable.fetch_add(1, Ordering::Relaxed);
            },
            ReductionOutcome::Fallback {
                reason: FallbackReason::StepCapExceeded,
            } => {
                self.step_cap_exceeded.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

/// Forwards each report to every registered observer, in order.
#[derive(Default, Clone)]
pub struct FanOutObserver {
    observers: Vec<Arc<dyn ReductionObserver>>,
}

impl std::fmt::Debug for FanOutObserver {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FanOutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl FanOutObserver {
    /// Empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn ReductionObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl ReductionObserver for FanOutObserver {
    fn on_reduction(&self, report: &ReductionReport) {
        for observer in &self.observers {
            observer.on_reduction(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: ReductionOutcome) -> ReductionReport {
        ReductionReport {
            outcome,
            output_length: 10,
            budget: 100,
        }
    }

    #[test]
    fn counts_each_outcome() {
        let observer = CountingObserver::new();
        observer.on_reduction(&report(ReductionOutcome::Fitted { depth: 5 }));
        observer.on_reduction(&report(ReductionOutcome::Substituted {
            base_depth: 1,
            replaced: 3,
        }));
        observer.on_reduction(&report(ReductionOutcome::Fallback {
            reason: FallbackReason::StepCapExceeded,
        }));

        let counts = observer.snapshot();
        assert_eq!(counts.fitted, 1);
        assert_eq!(counts.substituted, 1);
        assert_eq!(counts.replaced_positions, 3);
        assert_eq!(counts.step_cap_exceeded, 1);
        assert_eq!(counts.budget_unreachable, 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn fan_out_reaches_every_observer() {
        let first = Arc::new(CountingObserver::new());
        let second = Arc::new(CountingObserver::new());
        let fan_out = FanOutObserver::new()
            .with(first.clone())
            .with(Arc::new(TracingObserver))
            .with(second.clone());

        fan_out.on_reduction(&report(ReductionOutcome::Fallback {
            reason: FallbackReason::BudgetUnreachable,
        }));

        assert_eq!(first.snapshot().budget_unreachable, 1);
        assert_eq!(second.snapshot(), first.snapshot());
    }

    #[test]
    fn tracing_observer_accepts_every_outcome() {
        let observer = TracingObserver;
        observer.on_reduction(&report(ReductionOutcome::Fitted { depth: 0 }));
        observer.on_reduction(&report(ReductionOutcome::Fallback {
            reason: FallbackReason::BudgetUnreachable,
        }));
    }
}
