//! Component input props.
//!
//! Props are what a visual component actually receives: a string-keyed map of
//! [`PropValue`]s. Values arrive from three directions — attribute changes
//! (through the mapping engine), intercepted event-listener registrations
//! (stored as callback props), and the imperative `data` accessor on a bridge
//! element. Merging is always shallow and right-biased, matching the way the
//! bridge folds a single changed attribute over the previous props.

use core::fmt::{self, Debug};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::rc::Rc;

use serde_json::Value;

/// A single prop value.
#[derive(Clone, PartialEq)]
pub enum PropValue {
    /// Explicit absence, e.g. a removed attribute.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A numeric value.
    Number(f64),
    /// A plain string — the default for unconverted attributes.
    Text(String),
    /// Arbitrary structured data.
    Json(Value),
    /// A host-provided callback, stored so the component can invoke it.
    Listener(Listener),
}

impl Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => write!(f, "Bool({value})"),
            Self::Number(value) => write!(f, "Number({value})"),
            Self::Text(value) => write!(f, "Text({value:?})"),
            Self::Json(value) => write!(f, "Json({value})"),
            Self::Listener(_) => f.write_str("Listener(..)"),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Listener> for PropValue {
    fn from(value: Listener) -> Self {
        Self::Listener(value)
    }
}

/// A cheap-clone callback handle with pointer identity.
///
/// Listeners are compared by identity, never by behavior: removing a listener
/// removes the exact handle that was registered.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Value)>);

impl Listener {
    /// Wraps a callback.
    pub fn new(f: impl Fn(&Value) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callback with an event detail.
    pub fn call(&self, detail: &Value) {
        (self.0)(detail);
    }
}

impl Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener")
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// An ordered, string-keyed collection of prop values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    /// Creates an empty props collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a prop, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    /// Shallow right-biased merge: every entry of `patch` replaces the entry
    /// of the same name; entries absent from `patch` are preserved.
    #[must_use]
    pub fn merged(mut self, patch: Self) -> Self {
        self.0.extend(patch.0);
        self
    }

    /// Number of props.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no props.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the props in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, PropValue> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Props {
    type Item = (&'a String, &'a PropValue);
    type IntoIter = btree_map::Iter<'a, String, PropValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
