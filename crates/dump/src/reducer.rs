//! Adaptive reduction of a record to a size budget.
//!
//! 1. Depth search: project at `max_dump_depth`, then one level shallower at
//!    a time down to depth 1, and return the first serialization that fits.
//!    Top-level fields are never cut by the search. Depths above the value's
//!    own nesting project identically and are skipped.
//! 2. Substitution: starting from the projection one level below the root,
//!    replace top-level fields and their immediate children with the
//!    placeholder, one position at a time, until the output fits. Positions
//!    are visited field by field (last field first by default), each
//!    field's children before the field itself. Every field still ahead
//!    keeps one step of `max_reduction_steps` in reserve; a field with more
//!    replaceable children than the spare steps is replaced whole.
//! 3. Fallback: when nothing fits, return the fixed fallback string.
//!
//! `reduce` never fails and never panics; every outcome is a string.

use crate::projector::{ProjectedValue, ScalarProjector};
use crate::serializer::BoundedSerializer;
use logfit_domain::{Record, ReductionPolicy, SubstitutionOrder, Value};
use logfit_ports::{
    FallbackReason, NoopObserver, ReductionObserver, ReductionOutcome, ReductionReport,
};
use std::sync::Arc;

/// Reduce `record` with default policy values, overriding depth and budget.
#[must_use]
pub fn reduce(record: &Record, max_depth: usize, budget: usize) -> String {
    let policy = ReductionPolicy::default()
        .with_max_dump_depth(max_depth)
        .with_max_record_length(budget);
    AdaptiveReducer::new(policy).reduce_record(record)
}

/// Output of a reduction together with how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Bounded serialization (or the fallback).
    pub output: String,
    /// How `output` was produced.
    pub outcome: ReductionOutcome,
}

/// A top-level field with its children in visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldPositions {
    field: String,
    children: Vec<ChildKey>,
}

/// Address of one substitution position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    Field(String),
    Child(String, ChildKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChildKey {
    Key(String),
    Index(usize),
}

/// Orchestrates projection, serialization, and substitution.
#[derive(Clone)]
pub struct AdaptiveReducer {
    policy: ReductionPolicy,
    projector: ScalarProjector,
    serializer: BoundedSerializer,
    observer: Arc<dyn ReductionObserver>,
}

impl std::fmt::Debug for AdaptiveReducer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AdaptiveReducer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AdaptiveReducer {
    /// Create a reducer for `policy` with no observer.
    #[must_use]
    pub fn new(policy: ReductionPolicy) -> Self {
        Self {
            projector: ScalarProjector::new(policy.depth_marker.clone())
                .with_length_unit(policy.length_unit),
            serializer: BoundedSerializer::new(policy.length_unit),
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an observer notified after every reduction.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ReductionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The policy in use.
    #[must_use]
    pub const fn policy(&self) -> &ReductionPolicy {
        &self.policy
    }

    /// Reduce a record to a bounded string.
    #[must_use]
    pub fn reduce_record(&self, record: &Record) -> String {
        self.reduce_with_report(&record.to_value()).output
    }

    /// Reduce any value to a bounded string.
    #[must_use]
    pub fn reduce(&self, value: &Value) -> String {
        self.reduce_with_report(value).output
    }

    /// Reduce a value and report how the output was produced.
    #[must_use]
    pub fn reduce_with_report(&self, value: &Value) -> Reduction {
        let reduction = self.run(value);
        let report = ReductionReport {
            outcome: reduction.outcome,
            output_length: self.serializer.length(&reduction.output),
            budget: self.policy.max_record_length,
        };
        match reduction.outcome {
            ReductionOutcome::Fallback { reason } => tracing::warn!(
                reason = reason.as_str(),
                budget = report.budget,
                "record does not fit the budget; wrote fallback"
            ),
            ReductionOutcome::Substituted {
                base_depth,
                replaced,
            } => tracing::debug!(
                base_depth,
                replaced,
                length = report.output_length,
                "record reduced by substitution"
            ),
            ReductionOutcome::Fitted { depth } => tracing::trace!(
                depth,
                length = report.output_length,
                "record fits"
            ),
        }
        self.observer.on_reduction(&report);
        reduction
    }

    fn run(&self, value: &Value) -> Reduction {
        let budget = self.policy.max_record_length;
        let max_depth = self.policy.max_dump_depth;

        let (projected, report) = self.projector.project_with_report(value, max_depth);
        let serialized = self.serializer.serialize(&projected);
        if self.serializer.fits(&serialized, budget) {
            return Reduction {
                output: serialized,
                outcome: ReductionOutcome::Fitted { depth: max_depth },
            };
        }

        let base_depth = max_depth.min(1);
        for depth in (base_depth..report.settled_depth(max_depth)).rev() {
            let serialized = self
                .serializer
                .serialize(&self.projector.project(value, depth));
            if self.serializer.fits(&serialized, budget) {
                return Reduction {
                    output: serialized,
                    outcome: ReductionOutcome::Fitted { depth },
                };
            }
        }

        let mut base = self.projector.project(value, base_depth);
        self.substitute(&mut base, base_depth)
    }

    fn substitute(&self, base: &mut ProjectedValue, base_depth: usize) -> Reduction {
        let step_cap = self.policy.max_reduction_steps;
        let placeholder_length = self
            .serializer
            .node_length(&ProjectedValue::String(self.policy.placeholder.clone()));
        let fields = field_positions(base, self.policy.substitution_order);
        let field_count = fields.len();
        let mut replaced = 0_usize;

        for (visited, FieldPositions { field, children }) in fields.into_iter().enumerate() {
            let mut replaceable = Vec::with_capacity(children.len());
            for child in children {
                let position = Position::Child(field.clone(), child);
                if self.is_replaceable(base, &position, placeholder_length) {
                    replaceable.push(position);
                }
            }

            let spare = step_cap.saturating_sub(replaced + (field_count - visited));
            if replaceable.len() <= spare {
                for position in &replaceable {
                    let reduction = self.replace(base, position, &mut replaced, base_depth);
                    if let Some(reduction) = reduction {
                        return reduction;
                    }
                }
            }

            let position = Position::Field(field);
            if !self.is_replaceable(base, &position, placeholder_length) {
                continue;
            }
            if replaced >= step_cap {
                return self.fallback(FallbackReason::StepCapExceeded);
            }
            if let Some(reduction) = self.replace(base, &position, &mut replaced, base_depth) {
                return reduction;
            }
        }

        self.fallback(FallbackReason::BudgetUnreachable)
    }

    fn is_replaceable(
        &self,
        base: &mut ProjectedValue,
        position: &Position,
        placeholder_length: usize,
    ) -> bool {
        slot_mut(base, position)
            .is_some_and(|slot| self.serializer.node_length(slot) > placeholder_length)
    }

    /// Replace one position and return the reduction when the result fits.
    fn replace(
        &self,
        base: &mut ProjectedValue,
        position: &Position,
        replaced: &mut usize,
        base_depth: usize,
    ) -> Option<Reduction> {
        let slot = slot_mut(base, position)?;
        *slot = ProjectedValue::String(self.policy.placeholder.clone());
        *replaced += 1;

        let serialized = self.serializer.serialize(base);
        self.serializer
            .fits(&serialized, self.policy.max_record_length)
            .then(|| Reduction {
                output: serialized,
                outcome: ReductionOutcome::Substituted {
                    base_depth,
                    replaced: *replaced,
                },
            })
    }

    fn fallback(&self, reason: FallbackReason) -> Reduction {
        Reduction {
            output: self.policy.too_big_fallback.clone(),
            outcome: ReductionOutcome::Fallback { reason },
        }
    }
}

/// Substitution positions of the top two levels in visiting order.
fn field_positions(root: &ProjectedValue, order: SubstitutionOrder) -> Vec<FieldPositions> {
    let mut fields: Vec<FieldPositions> = match root {
        ProjectedValue::Object(object) => object
            .iter()
            .map(|(key, value)| FieldPositions {
                field: key.clone(),
                children: child_keys(value),
            })
            .collect(),
        ProjectedValue::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, value)| FieldPositions {
                field: index.to_string(),
                children: child_keys(value),
            })
            .collect(),
        _ => Vec::new(),
    };

    if order == SubstitutionOrder::Reverse {
        fields.reverse();
        for field in &mut fields {
            field.children.reverse();
        }
    }
    fields
}

fn child_keys(value: &ProjectedValue) -> Vec<ChildKey> {
    match value {
        ProjectedValue::Object(object) => object.keys().cloned().map(ChildKey::Key).collect(),
        ProjectedValue::Array(items) => (0..items.len()).map(ChildKey::Index).collect(),
        _ => Vec::new(),
    }
}

fn slot_mut<'a>(root: &'a mut ProjectedValue, position: &Position) -> Option<&'a mut ProjectedValue> {
    let (field, child) = match position {
        Position::Field(field) => (field, None),
        Position::Child(field, child) => (field, Some(child)),
    };
    let field_slot = match root {
        ProjectedValue::Object(object) => object.get_mut(field.as_str()),
        ProjectedValue::Array(items) => field
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get_mut(index)),
        _ => None,
    }?;
    match child {
        None => Some(field_slot),
        Some(ChildKey::Key(key)) => field_slot
            .as_object_mut()
            .and_then(|object| object.get_mut(key.as_str())),
        Some(ChildKey::Index(index)) => field_slot
            .as_array_mut()
            .and_then(|items| items.get_mut(*index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logfit_domain::{Level, ValueMap};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        reports: Mutex<Vec<ReductionReport>>,
    }

    impl ReductionObserver for RecordingObserver {
        fn on_reduction(&self, report: &ReductionReport) {
            if let Ok(mut reports) = self.reports.lock() {
                reports.push(*report);
            }
        }
    }

    fn policy(depth: usize, budget: usize) -> ReductionPolicy {
        ReductionPolicy::default()
            .with_max_dump_depth(depth)
            .with_max_record_length(budget)
    }

    #[test]
    fn depth_search_returns_deepest_fitting_depth() {
        let value = Value::from(json!({"a": {"b": {"c": "deep value here"}}}));
        let full = r#"{"a":{"b":{"c":"deep value here"}}}"#;
        let reducer = AdaptiveReducer::new(policy(5, full.len() + 1));
        let reduction = reducer.reduce_with_report(&value);
        assert_eq!(reduction.output, full);
        assert_eq!(reduction.outcome, ReductionOutcome::Fitted { depth: 5 });

        // One char short of the full dump: depth 1 cuts `b`'s contents.
        let reducer = AdaptiveReducer::new(policy(5, full.len()));
        let reduction = reducer.reduce_with_report(&value);
        assert_eq!(reduction.output, r#"{"a":{"b":"**MAX_DEPTH**"}}"#);
        assert_eq!(reduction.outcome, ReductionOutcome::Fitted { depth: 1 });
    }

    fn group(field: &str, children: Vec<ChildKey>) -> FieldPositions {
        FieldPositions {
            field: field.to_owned(),
            children,
        }
    }

    #[test]
    fn positions_visit_last_field_and_last_child_first_in_reverse() {
        let root = json!({"a": 1, "b": {"x": 1, "y": 2}, "c": [1, 2]});
        let visited = field_positions(&root, SubstitutionOrder::Reverse);
        assert_eq!(
            visited,
            vec![
                group("c", vec![ChildKey::Index(1), ChildKey::Index(0)]),
                group("b", vec![ChildKey::Key("y".into()), ChildKey::Key("x".into())]),
                group("a", Vec::new()),
            ]
        );
    }

    #[test]
    fn forward_order_starts_with_first_field() {
        let root = json!({"a": {"x": 1}, "b": 2});
        let visited = field_positions(&root, SubstitutionOrder::Forward);
        assert_eq!(
            visited,
            vec![group("a", vec![ChildKey::Key("x".into())]), group("b", Vec::new())]
        );
    }

    #[test]
    fn children_are_replaced_before_their_field() {
        let value = Value::from(json!({
            "keep": "k",
            "ctx": {"small": "s", "big": "b".repeat(200)}
        }));
        let reduction = AdaptiveReducer::new(policy(3, 60)).reduce_with_report(&value);
        assert_eq!(
            reduction.output,
            r#"{"keep":"k","ctx":{"small":"s","big":"too big"}}"#
        );
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Substituted {
                base_depth: 1,
                replaced: 1
            }
        );
    }

    #[test]
    fn fields_with_more_children_than_spare_steps_are_replaced_whole() {
        let entries: serde_json::Map<String, serde_json::Value> = (0..10)
            .map(|index| (format!("k{index}"), json!("v".repeat(30))))
            .collect();
        let value = Value::from(json!({"level": 1, "ctx": entries}));
        let reducer = AdaptiveReducer::new(policy(3, 40).with_max_reduction_steps(5));
        let reduction = reducer.reduce_with_report(&value);
        assert_eq!(reduction.output, r#"{"level":1,"ctx":"too big"}"#);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Substituted {
                base_depth: 1,
                replaced: 1
            }
        );
    }

    #[test]
    fn small_positions_are_skipped_without_counting() {
        let long = "x".repeat(200);
        // `keep` is visited first but is shorter than the placeholder.
        let value = Value::from(json!({"drop": long, "keep": "tiny"}));
        let reducer = AdaptiveReducer::new(policy(3, 40).with_max_reduction_steps(1));
        let reduction = reducer.reduce_with_report(&value);
        assert_eq!(reduction.output, r#"{"drop":"too big","keep":"tiny"}"#);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Substituted {
                base_depth: 1,
                replaced: 1
            }
        );
    }

    #[test]
    fn step_cap_returns_fallback() {
        let long = "x".repeat(200);
        let value = Value::from(json!({"a": long.clone(), "b": long}));
        let reducer = AdaptiveReducer::new(policy(3, 40).with_max_reduction_steps(1));
        let reduction = reducer.reduce_with_report(&value);
        assert_eq!(reduction.output, r#"{"message":"the record is too big"}"#);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Fallback {
                reason: FallbackReason::StepCapExceeded
            }
        );
    }

    #[test]
    fn scalar_root_that_does_not_fit_falls_back() {
        let value = Value::from("y".repeat(100));
        let reduction = AdaptiveReducer::new(policy(2, 50)).reduce_with_report(&value);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Fallback {
                reason: FallbackReason::BudgetUnreachable
            }
        );
    }

    #[test]
    fn zero_max_depth_substitutes_from_depth_zero() {
        let value = Value::from(json!({"a": {"b": "nested value"}, "m": "z".repeat(100)}));
        let reduction = AdaptiveReducer::new(policy(0, 60)).reduce_with_report(&value);
        assert_eq!(reduction.output, r#"{"a":"**MAX_DEPTH**","m":"too big"}"#);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Substituted {
                base_depth: 0,
                replaced: 1
            }
        );
    }

    #[test]
    fn observer_sees_every_reduction() {
        let observer = Arc::new(RecordingObserver::default());
        let reducer = AdaptiveReducer::new(policy(2, 20)).with_observer(observer.clone());

        let record = Record::new(Level::Info, "app", "m".repeat(100))
            .with_context("k", Value::Map(ValueMap::new()));
        let output = reducer.reduce_record(&record);
        assert_eq!(output, r#"{"message":"the record is too big"}"#);

        let reports = observer
            .reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default();
        assert_eq!(reports.len(), 1);
        assert!(reports.iter().all(|report| report.outcome.is_fallback()));
        assert!(reports.iter().all(|report| report.budget == 20));
    }

    #[test]
    fn huge_max_depth_stops_at_the_value_depth() {
        let record = Record::new(Level::Info, "app", "m".repeat(500));
        let reduction = AdaptiveReducer::new(policy(usize::MAX, 120))
            .reduce_with_report(&record.to_value());
        assert!(reduction.output.contains(r#""message":"too big""#));
        assert!(reduction.output.chars().count() < 120);
        assert_eq!(
            reduction.outcome,
            ReductionOutcome::Substituted {
                base_depth: 1,
                replaced: 1
            }
        );
    }

    #[test]
    fn reduce_uses_default_placeholders() {
        let record = Record::new(Level::Warning, "app", "ok").with_context("a", "short");
        let output = reduce(&record, 5, 16_000);
        assert_eq!(
            output,
            r#"{"level":300,"levelName":"WARNING","channel":"app","message":"ok","context":{"a":"short"},"extra":{}}"#
        );
    }
}
