//! Widget classes and tag registration.
//!
//! A [`WidgetClass`] is the static template behind one custom tag: its tag
//! name, the attribute names it observes, the compiled attribute/event
//! mapping, and the factory for its visual component. Classes are built once
//! and registered with the runtime's [`Registry`]; registering a tag that is
//! already defined is a silent no-op, matching the platform's global element
//! registry semantics.

use core::fmt::{self, Debug};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use mooring_core::{DynComponent, Mapping, MappingDescriptor, MappingError};
use tracing::debug;

/// The static template for one custom element tag.
#[derive(Clone)]
pub struct WidgetClass {
    tag_name: String,
    observed_attributes: BTreeSet<String>,
    mapping: Option<Mapping>,
    component: DynComponent,
}

impl WidgetClass {
    /// Starts building a class for `tag_name` rendering `component`.
    pub fn builder<F, V>(tag_name: impl Into<String>, component: F) -> WidgetClassBuilder
    where
        F: Fn(&mooring_core::Props) -> V + 'static,
        V: 'static,
    {
        WidgetClassBuilder {
            tag_name: tag_name.into(),
            component: mooring_core::component(component),
            observed_attributes: BTreeSet::new(),
            descriptor: None,
        }
    }

    /// The tag name this class is registered under.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// The attribute names whose changes reach the bridge element.
    #[must_use]
    pub const fn observed_attributes(&self) -> &BTreeSet<String> {
        &self.observed_attributes
    }

    /// The compiled attribute/event mapping, if the class declared one.
    #[must_use]
    pub const fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    /// The visual component factory for this tag.
    #[must_use]
    pub fn component(&self) -> DynComponent {
        self.component.clone()
    }
}

impl Debug for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetClass")
            .field("tag_name", &self.tag_name)
            .field("observed_attributes", &self.observed_attributes)
            .field("mapping", &self.mapping.is_some())
            .finish()
    }
}

/// Builder for [`WidgetClass`].
#[derive(Clone)]
pub struct WidgetClassBuilder {
    tag_name: String,
    component: DynComponent,
    observed_attributes: BTreeSet<String>,
    descriptor: Option<MappingDescriptor>,
}

impl WidgetClassBuilder {
    /// Declares the observed attribute names.
    #[must_use]
    pub fn observe<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed_attributes
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares the attribute/event → prop mapping.
    #[must_use]
    pub fn mapping(mut self, descriptor: MappingDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Compiles the mapping and finishes the class.
    ///
    /// # Errors
    ///
    /// Fails when the mapping descriptor is malformed, e.g. it maps an
    /// attribute the class does not observe.
    pub fn build(self) -> Result<WidgetClass, MappingError> {
        let mapping = self
            .descriptor
            .map(|descriptor| Mapping::compile(descriptor, &self.observed_attributes))
            .transpose()?;
        Ok(WidgetClass {
            tag_name: self.tag_name,
            observed_attributes: self.observed_attributes,
            mapping,
            component: self.component,
        })
    }
}

impl Debug for WidgetClassBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetClassBuilder")
            .field("tag_name", &self.tag_name)
            .finish()
    }
}

/// The runtime's tag registry.
#[derive(Debug, Default)]
pub struct Registry {
    classes: core::cell::RefCell<BTreeMap<String, Rc<WidgetClass>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a tag. Returns `false` when the tag was already defined, in
    /// which case the existing class is kept untouched.
    pub fn define(&self, class: WidgetClass) -> bool {
        let mut classes = self.classes.borrow_mut();
        if classes.contains_key(class.tag_name()) {
            debug!(tag = class.tag_name(), "tag already defined, skipping");
            return false;
        }
        classes.insert(class.tag_name().into(), Rc::new(class));
        true
    }

    /// Looks up the class registered under `tag_name`.
    #[must_use]
    pub fn get(&self, tag_name: &str) -> Option<Rc<WidgetClass>> {
        self.classes.borrow().get(tag_name).cloned()
    }

    /// Returns `true` when `tag_name` is defined.
    #[must_use]
    pub fn is_defined(&self, tag_name: &str) -> bool {
        self.classes.borrow().contains_key(tag_name)
    }

    /// Number of defined tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.borrow().len()
    }

    /// Returns `true` when no tag is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.borrow().is_empty()
    }
}
