//! The aggregate render tree handed to the component-tree renderer.
//!
//! One render pass produces one [`Node`] describing every active widget
//! instance: a keyed fragment whose children are per-instance portals, each
//! portal targeting that instance's isolated [`Surface`] and invoking the
//! instance's visual component with its props observable. When a shared
//! settings provider is configured, the fragment is nested inside a
//! [`Node::Provider`].
//!
//! The stable [`InstanceKey`] on each fragment child is what lets the
//! renderer preserve an instance's state when siblings are added or removed.

use core::any::Any;
use core::fmt::{self, Debug};
use core::num::NonZeroU64;
use std::rc::Rc;

use mooring_reactive::Observable;

use crate::props::Props;
use crate::settings::Settings;
use crate::surface::Surface;

/// A monotonic, process-unique identity for one mounted widget instance.
///
/// Keys are assigned in increasing order starting at 1 and are never reused
/// while the corresponding element stays mounted; detaching and reattaching
/// the same element yields a fresh key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey(NonZeroU64);

impl InstanceKey {
    /// Wraps a raw key value.
    #[must_use]
    pub const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Type-erased renderable output produced by a visual component.
///
/// The bridge never looks inside: the renderer downcasts to whatever output
/// type its component framework produces.
#[derive(Clone)]
pub struct AnyVisual(Rc<dyn Any>);

impl AnyVisual {
    /// Erases a concrete renderable value.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Recovers the concrete output type, or `None` on a mismatch.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Debug for AnyVisual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnyVisual")
    }
}

/// A visual component: any callable from an input value to renderable output.
///
/// The bridge is agnostic to the component's internals; it only wires the
/// component together with the observable carrying its input.
pub trait Component<In> {
    /// Produces renderable output for the given input.
    fn render(&self, input: &In) -> AnyVisual;
}

impl<In, F, V> Component<In> for F
where
    F: Fn(&In) -> V,
    V: 'static,
{
    fn render(&self, input: &In) -> AnyVisual {
        AnyVisual::new(self(input))
    }
}

/// A shared handle to a props-consuming visual component.
pub type DynComponent = Rc<dyn Component<Props>>;

/// A shared handle to the settings-consuming context provider component.
pub type DynProvider = Rc<dyn Component<Settings>>;

/// Erases a props-consuming component into a shared handle.
pub fn component<F, V>(f: F) -> DynComponent
where
    F: Fn(&Props) -> V + 'static,
    V: 'static,
{
    Rc::new(f)
}

/// Erases a settings-consuming provider component into a shared handle.
pub fn provider<F, V>(f: F) -> DynProvider
where
    F: Fn(&Settings) -> V + 'static,
    V: 'static,
{
    Rc::new(f)
}

/// A node of the aggregate render tree.
#[derive(Clone)]
pub enum Node {
    /// An ordered sequence of keyed children.
    Fragment(Vec<Keyed>),
    /// Renders `content` into an instance's isolated surface.
    Portal {
        /// The isolated attach point the content lands in.
        surface: Surface,
        /// The content rendered into the surface.
        content: Rc<Node>,
    },
    /// Invokes a visual component with the instance's props observable.
    ///
    /// The renderer is expected to subscribe to the observable so that only
    /// this component re-renders when the props change.
    Component {
        /// The visual component to invoke.
        component: DynComponent,
        /// The instance-owned props channel.
        props: Observable<Props>,
    },
    /// Nests children inside the shared settings provider.
    Provider {
        /// The context provider component.
        provider: DynProvider,
        /// The shared settings channel.
        settings: Observable<Settings>,
        /// The wrapped subtree.
        children: Rc<Node>,
    },
}

impl Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fragment(children) => f.debug_tuple("Fragment").field(&children.len()).finish(),
            Self::Portal { surface, .. } => {
                f.debug_struct("Portal").field("surface", surface).finish()
            }
            Self::Component { props, .. } => {
                f.debug_struct("Component").field("props", props).finish()
            }
            Self::Provider { settings, .. } => f
                .debug_struct("Provider")
                .field("settings", settings)
                .finish(),
        }
    }
}

/// A fragment child carrying its stable instance key.
#[derive(Debug, Clone)]
pub struct Keyed {
    /// The stable identity of the instance this subtree belongs to.
    pub key: InstanceKey,
    /// The instance's subtree.
    pub node: Node,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_visual_downcasts_to_the_erased_type() {
        let visual = AnyVisual::new(String::from("output"));
        assert_eq!(visual.downcast_ref::<String>().map(String::as_str), Some("output"));
        assert!(visual.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn instance_keys_display_as_their_raw_value() {
        let key = InstanceKey::new(NonZeroU64::new(7).expect("nonzero"));
        assert_eq!(key.to_string(), "7");
        assert_eq!(key.get(), 7);
    }

    #[test]
    fn closures_are_components() {
        let render = component(|props: &Props| format!("{} props", props.len()));
        let output = render.render(&Props::new());
        assert_eq!(
            output.downcast_ref::<String>().map(String::as_str),
            Some("0 props")
        );
    }
}
