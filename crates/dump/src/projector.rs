//! Scalar projection: any [`Value`] to a finite, acyclic JSON tree.
//!
//! The top value sits at depth 0. A non-scalar at depth `d` is expanded while
//! `d <= max_depth`. Past that it is cut: it becomes the depth marker unless
//! its own projection, with its children cut the same way, serializes shorter
//! than the marker. A cut never lengthens the output, so a shallower
//! projection is never larger than a deeper one. Scalars pass through at any
//! depth.
//!
//! Cycle detection is path-local: identities of the shared cells and opaque
//! objects currently being expanded are kept on a stack, so a value reached
//! twice on one path becomes a recursion marker while the same value reached
//! on sibling paths is expanded each time.

use crate::serializer::measure;
use logfit_domain::{
    LengthUnit, Opaque, OpaqueKind, SharedValue, Value, ValueMap, normalize_attribute_name,
    opaque_identity,
};
use serde_json::{Map as JsonMap, Number};
use std::sync::Arc;

/// Output of the projector: only null, bool, number, string, array, object.
pub type ProjectedValue = serde_json::Value;

/// Key carrying the type discriminator of an expanded object.
pub const TYPE_KEY: &str = "__type";
/// Key carrying the class name of an expanded object.
pub const CLASS_KEY: &str = "__class";

/// Marker for callables.
pub const CALLABLE_MARKER: &str = "**CALLABLE**";
/// Marker for values the host runtime cannot describe.
pub const UNKNOWN_MARKER: &str = "**UNKNOWN**";

/// Marker for a resource handle of the given type.
#[must_use]
pub fn resource_marker(resource_type: &str) -> String {
    format!("**RESOURCE({resource_type})**")
}

/// Marker for an identity reached again on the current path.
#[must_use]
pub fn recursion_marker(label: &str) -> String {
    format!("**RECURSION({label})**")
}

/// Depth facts gathered during one projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthReport {
    /// Deepest level at which a container was expanded.
    pub deepest: usize,
    /// True when a container below `max_depth` was cut.
    pub cut: bool,
}

impl DepthReport {
    /// Smallest depth that projects exactly like `max_depth` did.
    #[must_use]
    pub const fn settled_depth(&self, max_depth: usize) -> usize {
        if self.cut || self.deepest > max_depth {
            max_depth
        } else {
            self.deepest
        }
    }
}

/// Converts values into depth-limited, cycle-free JSON trees.
#[derive(Debug, Clone)]
pub struct ScalarProjector {
    depth_marker: String,
    unit: LengthUnit,
}

impl ScalarProjector {
    /// Create a projector writing `depth_marker` where depth cuts a branch.
    pub fn new(depth_marker: impl Into<String>) -> Self {
        Self {
            depth_marker: depth_marker.into(),
            unit: LengthUnit::default(),
        }
    }

    /// Measure cut branches against the marker in `unit`.
    #[must_use]
    pub const fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.unit = unit;
        self
    }

    /// The configured depth marker.
    #[must_use]
    pub fn depth_marker(&self) -> &str {
        &self.depth_marker
    }

    /// Project `value`, expanding non-scalars down to `max_depth`.
    #[must_use]
    pub fn project(&self, value: &Value, max_depth: usize) -> ProjectedValue {
        self.project_with_report(value, max_depth).0
    }

    /// Project `value` and report how deep the expansion went.
    #[must_use]
    pub fn project_with_report(
        &self,
        value: &Value,
        max_depth: usize,
    ) -> (ProjectedValue, DepthReport) {
        let marker = ProjectedValue::String(self.depth_marker.clone());
        let mut walk = Walk {
            depth_marker: &self.depth_marker,
            marker_length: measure(self.unit, &marker.to_string()),
            unit: self.unit,
            max_depth,
            path: Vec::new(),
            report: DepthReport::default(),
        };
        let projected = walk.value(value, 0);
        (projected, walk.report)
    }
}

/// Identity on the current path plus the label its recursion marker uses.
struct PathEntry {
    identity: usize,
    label: String,
}

/// Running serialized length of a container built under a limit.
struct Tally {
    used: usize,
    limit: Option<usize>,
}

impl Tally {
    /// Start a container; both brackets are charged up front.
    fn open(limit: Option<usize>) -> Option<Self> {
        let mut tally = Self { used: 0, limit };
        tally.spend(2)?;
        Some(tally)
    }

    const fn is_bounded(&self) -> bool {
        self.limit.is_some()
    }

    fn spend(&mut self, amount: usize) -> Option<()> {
        self.used = self.used.saturating_add(amount);
        match self.limit {
            Some(limit) if self.used >= limit => None,
            _ => Some(()),
        }
    }

    /// Limit left for the next child.
    fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }
}

struct Walk<'a> {
    depth_marker: &'a str,
    marker_length: usize,
    unit: LengthUnit,
    max_depth: usize,
    path: Vec<PathEntry>,
    report: DepthReport,
}

impl Walk<'_> {
    fn value(&mut self, value: &Value, depth: usize) -> ProjectedValue {
        if let Some(scalar) = project_scalar(value) {
            return scalar;
        }
        if depth > self.max_depth {
            self.report.cut = true;
            return self
                .node(value, depth, Some(self.marker_length))
                .unwrap_or_else(|| ProjectedValue::String(self.depth_marker.to_owned()));
        }
        self.report.deepest = self.report.deepest.max(depth);
        // Without a limit every node is produced.
        self.node(value, depth, None).unwrap_or(ProjectedValue::Null)
    }

    /// Project a child. Under a limit the child is already past `max_depth`
    /// and must serialize shorter than `limit`.
    fn child(
        &mut self,
        value: &Value,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        match limit {
            None => Some(self.value(value, depth)),
            Some(_) => self.node(value, depth, limit),
        }
    }

    fn node(
        &mut self,
        value: &Value,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        match value {
            Value::List(items) => self.list(items, depth, limit),
            Value::Map(map) => self.map(map, depth, limit),
            Value::Shared(cell) => self.shared(cell, depth, limit),
            Value::Opaque(object) => self.opaque(object, depth, limit),
            scalar => self.within(project_scalar(scalar)?, limit),
        }
    }

    fn list(
        &mut self,
        items: &[Value],
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        let mut tally = Tally::open(limit)?;
        let mut projected = Vec::with_capacity(items.len());
        for item in items {
            if !projected.is_empty() {
                tally.spend(1)?;
            }
            let item = self.child(item, depth + 1, tally.remaining())?;
            self.charge(&mut tally, &item)?;
            projected.push(item);
        }
        Some(ProjectedValue::Array(projected))
    }

    fn map(
        &mut self,
        map: &ValueMap,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        let mut tally = Tally::open(limit)?;
        let mut object = JsonMap::with_capacity(map.len());
        for (key, value) in map.iter() {
            self.charge_key(&mut tally, object.is_empty(), key)?;
            let projected = self.child(value, depth + 1, tally.remaining())?;
            self.charge(&mut tally, &projected)?;
            object.insert(key.to_owned(), projected);
        }
        Some(ProjectedValue::Object(object))
    }

    fn shared(
        &mut self,
        cell: &SharedValue,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        let identity = cell.identity();
        // The identity check comes before locking: re-reading a lock this
        // thread already holds may deadlock.
        if let Some(label) = self.on_path(identity) {
            let marker = recursion_marker(label);
            return self.within(ProjectedValue::String(marker), limit);
        }
        let Some(guard) = cell.read() else {
            return self.within(ProjectedValue::String(UNKNOWN_MARKER.to_owned()), limit);
        };
        let label = match &*guard {
            Value::List(_) => "list",
            Value::Map(_) => "map",
            other => other.kind_name(),
        };
        self.path.push(PathEntry {
            identity,
            label: label.to_owned(),
        });
        // The cell is transparent: its contents sit at the cell's own depth.
        let projected = self.child(&guard, depth, limit);
        self.path.pop();
        projected
    }

    fn opaque(
        &mut self,
        object: &Arc<dyn Opaque>,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        let kind = object.kind();
        let marker = match kind {
            OpaqueKind::Resource => resource_marker(object.class_name()),
            OpaqueKind::Callable => CALLABLE_MARKER.to_owned(),
            OpaqueKind::Unsupported => UNKNOWN_MARKER.to_owned(),
            OpaqueKind::Object | OpaqueKind::Error => {
                let identity = opaque_identity(object);
                if self.on_path(identity).is_none() {
                    self.path.push(PathEntry {
                        identity,
                        label: object.class_name().to_owned(),
                    });
                    let projected = self.object_fields(object, kind, depth, limit);
                    self.path.pop();
                    return projected;
                }
                recursion_marker(object.class_name())
            },
        };
        self.within(ProjectedValue::String(marker), limit)
    }

    fn object_fields(
        &mut self,
        object: &Arc<dyn Opaque>,
        kind: OpaqueKind,
        depth: usize,
        limit: Option<usize>,
    ) -> Option<ProjectedValue> {
        let attributes = object.attributes();
        let mut tally = Tally::open(limit)?;
        let mut projected = JsonMap::with_capacity(attributes.len() + 2);
        let header: [(&str, ProjectedValue); 2] = [
            (TYPE_KEY, kind.type_tag().into()),
            (CLASS_KEY, object.class_name().into()),
        ];
        for (key, value) in header {
            self.charge_key(&mut tally, projected.is_empty(), key)?;
            self.charge(&mut tally, &value)?;
            projected.insert(key.to_owned(), value);
        }
        for (name, value) in attributes.iter() {
            let name = normalize_attribute_name(name);
            self.charge_key(&mut tally, false, name)?;
            let value = self.child(value, depth + 1, tally.remaining())?;
            self.charge(&mut tally, &value)?;
            projected.insert(name.to_owned(), value);
        }
        Some(ProjectedValue::Object(projected))
    }

    fn length(&self, node: &ProjectedValue) -> usize {
        measure(self.unit, &node.to_string())
    }

    /// Keep `node` only when it serializes shorter than `limit`.
    fn within(&self, node: ProjectedValue, limit: Option<usize>) -> Option<ProjectedValue> {
        match limit {
            Some(limit) if self.length(&node) >= limit => None,
            _ => Some(node),
        }
    }

    fn charge(&self, tally: &mut Tally, node: &ProjectedValue) -> Option<()> {
        if tally.is_bounded() {
            tally.spend(self.length(node))
        } else {
            Some(())
        }
    }

    /// Charge an object key with its colon, plus a comma unless it is first.
    fn charge_key(&self, tally: &mut Tally, first: bool, key: &str) -> Option<()> {
        if !tally.is_bounded() {
            return Some(());
        }
        let key_length = self.length(&ProjectedValue::String(key.to_owned()));
        tally.spend(usize::from(!first) + key_length + 1)
    }

    fn on_path(&self, identity: usize) -> Option<&str> {
        self.path
            .iter()
            .find(|entry| entry.identity == identity)
            .map(|entry| entry.label.as_str())
    }
}

fn project_scalar(value: &Value) -> Option<ProjectedValue> {
    let projected = match value {
        Value::Null => ProjectedValue::Null,
        Value::Bool(flag) => ProjectedValue::Bool(*flag),
        Value::Int(number) => ProjectedValue::Number((*number).into()),
        Value::UInt(number) => ProjectedValue::Number((*number).into()),
        Value::Float(number) => project_float(*number),
        Value::String(text) => ProjectedValue::String(text.clone()),
        Value::List(_) | Value::Map(_) | Value::Shared(_) | Value::Opaque(_) => return None,
    };
    Some(projected)
}

fn project_float(number: f64) -> ProjectedValue {
    Number::from_f64(number).map_or_else(
        || {
            let text = if number.is_nan() {
                "NaN"
            } else if number.is_sign_negative() {
                "-inf"
            } else {
                "inf"
            };
            ProjectedValue::String(text.to_owned())
        },
        ProjectedValue::Number,
    )
}
