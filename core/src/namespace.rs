//! The flat name-to-value mapping produced by tokenizing `argv`.

use std::collections::BTreeMap;

use crate::value::Value;

/// Parsed command-line values keyed by field name.
///
/// Holds one entry per option descriptor reachable from the registered
/// specification (defaults already applied) plus the selected submode, if
/// submodes were registered.
///
/// # Examples
///
/// ```
/// use cfgspec_core::{Namespace, Value};
///
/// let mut ns = Namespace::new();
/// ns.insert("num", Value::Int(42));
/// assert_eq!(ns.get("num"), Some(&Value::Int(42)));
/// assert_eq!(ns.submode(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
    submode: Option<String>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Value stored for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Name of the selected submode.
    pub fn submode(&self) -> Option<&str> {
        self.submode.as_deref()
    }

    /// Records `name` as the selected submode.
    pub fn set_submode(&mut self, name: impl Into<String>) {
        self.submode = Some(name.into());
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
