//! Declarative attribute-name / event-name → prop-name mapping.
//!
//! A widget class declares, once, how the attributes and events of its tag
//! project onto component props. The declaration is a [`MappingDescriptor`];
//! it is compiled into a [`Mapping`] when the class is registered, so
//! malformed descriptors fail fast instead of being re-resolved on every
//! attribute change. Lookups at change-time are infallible: names with no
//! mapping resolve to `None` and the caller treats them as silent no-ops,
//! since host markup may carry incidental attributes.

use core::fmt::{self, Debug};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::props::PropValue;

/// Converts a raw attribute string into a prop value.
pub type Convert = Rc<dyn Fn(&str) -> PropValue>;

/// A declarative mapping from external attribute/event names to prop names.
///
/// # Example
///
/// ```
/// use mooring_core::{MappingDescriptor, PropValue};
///
/// let descriptor = MappingDescriptor::new()
///     .attribute("text", "text")
///     .attribute_with("show-ranking", "showRanking", |raw| {
///         PropValue::Bool(raw == "true")
///     })
///     .event("on-add-item", "onAddItem");
/// ```
#[derive(Clone, Default)]
pub struct MappingDescriptor {
    attributes: Vec<(String, String, Option<Convert>)>,
    events: Vec<(String, String)>,
}

impl Debug for MappingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingDescriptor")
            .field("attributes", &self.attributes.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl MappingDescriptor {
    /// Creates an empty descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Maps an attribute to a prop, passing the raw string through unchanged.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, prop: impl Into<String>) -> Self {
        self.attributes.push((name.into(), prop.into(), None));
        self
    }

    /// Maps an attribute to a prop through a value converter.
    #[must_use]
    pub fn attribute_with(
        mut self,
        name: impl Into<String>,
        prop: impl Into<String>,
        convert: impl Fn(&str) -> PropValue + 'static,
    ) -> Self {
        self.attributes
            .push((name.into(), prop.into(), Some(Rc::new(convert))));
        self
    }

    /// Maps an event name to a callback prop.
    #[must_use]
    pub fn event(mut self, name: impl Into<String>, prop: impl Into<String>) -> Self {
        self.events.push((name.into(), prop.into()));
        self
    }

    /// Returns `true` if the descriptor maps nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.events.is_empty()
    }
}

/// An error found while compiling a [`MappingDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// An attribute mapping has an empty attribute name.
    #[error("attribute mapping with an empty attribute name")]
    EmptyAttributeName,
    /// An event mapping has an empty event name.
    #[error("event mapping with an empty event name")]
    EmptyEventName,
    /// A mapping targets an empty prop name.
    #[error("mapping for `{name}` targets an empty prop name")]
    EmptyPropName {
        /// The attribute or event name whose mapping is malformed.
        name: String,
    },
    /// An attribute mapping refers to an attribute the class does not observe.
    #[error("attribute `{attribute}` is mapped but not observed")]
    UnobservedAttribute {
        /// The unobserved attribute name.
        attribute: String,
    },
    /// The same attribute is mapped twice.
    #[error("attribute `{attribute}` is mapped more than once")]
    DuplicateAttribute {
        /// The duplicated attribute name.
        attribute: String,
    },
    /// The same event is mapped twice.
    #[error("event `{event}` is mapped more than once")]
    DuplicateEvent {
        /// The duplicated event name.
        event: String,
    },
}

/// A mapped attribute target: the prop name plus an optional converter.
#[derive(Clone)]
pub struct AttributeSpec {
    prop: String,
    convert: Option<Convert>,
}

impl Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("prop", &self.prop)
            .field("convert", &self.convert.is_some())
            .finish()
    }
}

impl AttributeSpec {
    /// The prop this attribute projects onto.
    #[must_use]
    pub fn prop(&self) -> &str {
        &self.prop
    }

    /// Converts a raw attribute value into the prop value.
    ///
    /// Without a converter the raw string passes through as
    /// [`PropValue::Text`].
    #[must_use]
    pub fn convert(&self, raw: &str) -> PropValue {
        self.convert
            .as_ref()
            .map_or_else(|| PropValue::Text(raw.into()), |convert| convert(raw))
    }
}

/// A compiled, validated mapping table.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    attributes: BTreeMap<String, AttributeSpec>,
    events: BTreeMap<String, String>,
}

impl Mapping {
    /// Compiles a descriptor against the set of observed attribute names.
    ///
    /// # Errors
    ///
    /// Fails on empty attribute/event/prop names, on an attribute mapping
    /// whose attribute is not observed, and on duplicate mappings for the
    /// same name.
    pub fn compile(
        descriptor: MappingDescriptor,
        observed: &BTreeSet<String>,
    ) -> Result<Self, MappingError> {
        let mut attributes = BTreeMap::new();
        for (name, prop, convert) in descriptor.attributes {
            if name.is_empty() {
                return Err(MappingError::EmptyAttributeName);
            }
            if prop.is_empty() {
                return Err(MappingError::EmptyPropName { name });
            }
            if !observed.contains(&name) {
                return Err(MappingError::UnobservedAttribute { attribute: name });
            }
            if attributes
                .insert(name.clone(), AttributeSpec { prop, convert })
                .is_some()
            {
                return Err(MappingError::DuplicateAttribute { attribute: name });
            }
        }

        let mut events = BTreeMap::new();
        for (name, prop) in descriptor.events {
            if name.is_empty() {
                return Err(MappingError::EmptyEventName);
            }
            if prop.is_empty() {
                return Err(MappingError::EmptyPropName { name });
            }
            if events.insert(name.clone(), prop).is_some() {
                return Err(MappingError::DuplicateEvent { event: name });
            }
        }

        Ok(Self { attributes, events })
    }

    /// Resolves an attribute name, or `None` when unmapped.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    /// Resolves an event name to its callback prop, or `None` when unmapped.
    #[must_use]
    pub fn event(&self, name: &str) -> Option<&str> {
        self.events.get(name).map(String::as_str)
    }
}
