//! The dumpable value model.
//!
//! A [`Value`] is a closed sum type resolved once at the record boundary. The
//! projector matches exhaustively over it instead of probing types at runtime.
//! Two variants carry identity: [`Value::Shared`] (a collection cell that may
//! alias itself) and [`Value::Opaque`] (a host object such as an error).

use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

// =============================================================================
// VALUE
// =============================================================================

/// Recursive value handed to the dump core.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Signed integer scalar.
    Int(i64),
    /// Unsigned integer scalar (values above `i64::MAX`).
    UInt(u64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered list.
    List(Vec<Self>),
    /// Insertion-ordered mapping.
    Map(ValueMap),
    /// Shared collection cell that may reference itself.
    Shared(SharedValue),
    /// Host object without a native collection shape.
    Opaque(Arc<dyn Opaque>),
}

impl Value {
    /// Build a string value from raw bytes, substituting invalid sequences
    /// with U+FFFD.
    #[must_use]
    pub fn from_utf8_lossy(bytes: &[u8]) -> Self {
        Self::String(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Build a mapping from `(name, value)` pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Map(entries.into_iter().collect())
    }

    /// Wrap a host object.
    pub fn opaque(object: impl Opaque + 'static) -> Self {
        Self::Opaque(Arc::new(object))
    }

    /// Returns true for values that never need expansion.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Bool(_)
                | Self::Int(_)
                | Self::UInt(_)
                | Self::Float(_)
                | Self::String(_)
        )
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Shared(_) => "shared",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Borrow the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Self::Map(value)
    }
}

impl From<SharedValue> for Value {
    fn from(value: SharedValue) -> Self {
        Self::Shared(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => number_to_value(&number),
            serde_json::Value::String(text) => Self::String(text),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            },
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

fn number_to_value(number: &serde_json::Number) -> Value {
    if let Some(value) = number.as_i64() {
        return Value::Int(value);
    }
    if let Some(value) = number.as_u64() {
        return Value::UInt(value);
    }
    number.as_f64().map_or(Value::Null, Value::Float)
}

// =============================================================================
// VALUE MAP
// =============================================================================

/// Insertion-ordered string-keyed mapping.
///
/// Inserting an existing key replaces its value in place, so the key keeps
/// its original position. Lookups are hashed.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: IndexMap<String, Value>,
}

impl ValueMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Create an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    /// Borrow a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Mutably borrow a value by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Returns true when the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key, shifting later entries down to keep their order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &Value)> + ExactSizeIterator {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for ValueMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// =============================================================================
// SHARED VALUE
// =============================================================================

/// Shared, mutable collection cell.
///
/// Cloning shares the cell. A cell may contain itself, which is how callers
/// model self-referencing collections.
#[derive(Clone)]
pub struct SharedValue {
    inner: Arc<RwLock<Value>>,
}

impl SharedValue {
    /// Wrap a value in a new cell.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Stable identity of the cell for the lifetime of the allocation.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>().addr()
    }

    /// Borrow the contents. Returns `None` when the lock is poisoned.
    pub fn read(&self) -> Option<RwLockReadGuard<'_, Value>> {
        self.inner.read().ok()
    }

    /// Mutate the contents in place. Returns `None` when the lock is poisoned.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let mut guard = self.inner.write().ok()?;
        Some(mutate(&mut guard))
    }
}

impl fmt::Debug for SharedValue {
    // Contents are not printed: a self-referencing cell would recurse forever.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SharedValue")
            .field("identity", &format_args!("{:#x}", self.identity()))
            .finish()
    }
}

// =============================================================================
// OPAQUE
// =============================================================================

/// Kind of host object, deciding how the projector renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    /// Plain object: rendered as a mapping of its attributes.
    Object,
    /// Error/exception: rendered as a mapping of its attributes.
    Error,
    /// Resource handle (file, socket): rendered as a marker.
    Resource,
    /// Callable (closure, function pointer): rendered as a marker.
    Callable,
    /// Anything the host runtime cannot describe: rendered as a marker.
    Unsupported,
}

impl OpaqueKind {
    /// Type discriminator written into expanded objects.
    #[must_use]
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Object | Self::Resource | Self::Callable | Self::Unsupported => "object",
        }
    }

    /// Returns true when the projector expands this kind into a mapping.
    #[must_use]
    pub const fn is_expandable(self) -> bool {
        matches!(self, Self::Object | Self::Error)
    }
}

/// Capability a host object implements to become dumpable.
///
/// Identity is the address of the `Arc` holding the object, so the same
/// object reached twice on one path is detected as a cycle.
pub trait Opaque: fmt::Debug + Send + Sync {
    /// Class or type name, shown in the dump and in recursion markers.
    fn class_name(&self) -> &str;

    /// Kind of object.
    fn kind(&self) -> OpaqueKind {
        OpaqueKind::Object
    }

    /// Every visible attribute in declaration order, including members
    /// normally hidden by access control. Names may carry a scope qualifier;
    /// see [`normalize_attribute_name`].
    fn attributes(&self) -> ValueMap;
}

/// Identity of an opaque object for cycle detection.
#[must_use]
pub fn opaque_identity(object: &Arc<dyn Opaque>) -> usize {
    Arc::as_ptr(object).cast::<()>().addr()
}

/// Strip a scope qualifier of the form `\0<scope>\0name`.
///
/// ```
/// use logfit_domain::normalize_attribute_name;
///
/// assert_eq!(normalize_attribute_name("\0*\0items"), "items");
/// assert_eq!(normalize_attribute_name("\0App\\Order\0id"), "id");
/// assert_eq!(normalize_attribute_name("plain"), "plain");
/// ```
#[must_use]
pub fn normalize_attribute_name(name: &str) -> &str {
    name.strip_prefix('\0')
        .and_then(|rest| rest.split_once('\0'))
        .map_or(name, |(_, simple)| simple)
}

/// General-purpose object with interior-mutable attributes.
///
/// Attributes can be set after the object is shared, which lets callers
/// build objects that reference themselves.
#[derive(Debug)]
pub struct ObjectValue {
    class_name: String,
    kind: OpaqueKind,
    attributes: RwLock<ValueMap>,
}

impl ObjectValue {
    /// Create a plain object.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self::with_kind(class_name, OpaqueKind::Object)
    }

    /// Create an object of an explicit kind.
    pub fn with_kind(class_name: impl Into<String>, kind: OpaqueKind) -> Self {
        Self {
            class_name: class_name.into(),
            kind,
            attributes: RwLock::new(ValueMap::new()),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set an attribute. A poisoned lock drops the write.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<Value>) {
        if let Ok(mut attributes) = self.attributes.write() {
            attributes.insert(name, value.into());
        }
    }
}

impl Opaque for ObjectValue {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn kind(&self) -> OpaqueKind {
        self.kind
    }

    fn attributes(&self) -> ValueMap {
        self.attributes
            .read()
            .map(|attributes| attributes.clone())
            .unwrap_or_default()
    }
}
