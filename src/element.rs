//! The per-instance bridge element.
//!
//! A [`BridgeElement`] is the adapter behind one mounted tag instance. The
//! host platform drives it: it calls [`connected`](BridgeElement::connected)
//! when the node is inserted into the document,
//! [`disconnected`](BridgeElement::disconnected) when it is removed,
//! [`attribute_changed`](BridgeElement::attribute_changed) for observed
//! attributes, and
//! [`add_event_listener`](BridgeElement::add_event_listener) when the host
//! registers a listener. The element owns its props observable exclusively
//! and projects attribute values and mapped listeners into it; rendering
//! itself is delegated to the shared render pass through the cached portal.
//!
//! A node can be removed and reinserted, so the detached state is re-enterable:
//! every reattachment builds a fresh portal and receives a fresh instance key.

use core::fmt::{self, Debug};
use std::rc::Rc;

use mooring_reactive::Observable;

use mooring_core::{
    Listener, ListenerTable, Node, PropValue, Props, Surface, action_event_name,
};
use serde_json::Value;
use tracing::trace;

use crate::error::LifecycleError;
use crate::registry::WidgetClass;
use crate::runtime::{MountState, Runtime};

/// The bridge adapter behind one custom element instance.
#[derive(Clone)]
pub struct BridgeElement {
    inner: Rc<ElementInner>,
}

struct ElementInner {
    class: Rc<WidgetClass>,
    runtime: Runtime,
    props: Observable<Props>,
    portal: core::cell::RefCell<Option<Node>>,
    surface: core::cell::RefCell<Option<Surface>>,
    listeners: ListenerTable,
}

impl BridgeElement {
    /// Creates an unattached element of the given class.
    #[must_use]
    pub fn new(class: Rc<WidgetClass>, runtime: Runtime) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                class,
                runtime,
                props: Observable::new(),
                portal: core::cell::RefCell::new(None),
                surface: core::cell::RefCell::new(None),
                listeners: ListenerTable::new(),
            }),
        }
    }

    /// The tag name of this element's class.
    #[must_use]
    pub fn tag_name(&self) -> &str {
        self.inner.class.tag_name()
    }

    /// Whether the element is currently attached to the document.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.portal.borrow().is_some()
    }

    /// Identity comparison: two handles to the same element instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Mount hook: the node was inserted into the document.
    ///
    /// Builds the portal into a freshly allocated isolated surface and
    /// registers the instance with the runtime under a new unique key.
    pub fn connected(&self) {
        self.build_portal();
        self.inner
            .runtime
            .notify_mount_state(self, MountState::Mounted);
    }

    /// Unmount hook: the node was removed from the document.
    ///
    /// Discards the portal and surface handles and deregisters the instance.
    /// Prop data stays intact, but a later reattachment gets a fresh key —
    /// render state is not preserved across a full unmount/remount.
    pub fn disconnected(&self) {
        self.inner.portal.borrow_mut().take();
        self.inner.surface.borrow_mut().take();
        self.inner
            .runtime
            .notify_mount_state(self, MountState::Unmounted);
    }

    /// Observed-attribute change hook.
    ///
    /// No-op when the value did not actually change, and when the attribute
    /// is unmapped — host markup may carry incidental attributes. Otherwise
    /// the converted value is shallow-merged into the props observable. A
    /// removed attribute maps to [`PropValue::Null`].
    pub fn attribute_changed(&self, name: &str, old: Option<&str>, new: Option<&str>) {
        if old == new {
            return;
        }
        let Some(spec) = self
            .inner
            .class
            .mapping()
            .and_then(|mapping| mapping.attribute(name))
        else {
            trace!(attribute = name, "unmapped attribute ignored");
            return;
        };
        let value = new.map_or(PropValue::Null, |raw| spec.convert(raw));
        self.merge_prop(spec.prop().to_owned(), value);
    }

    /// Intercepted listener registration.
    ///
    /// The listener is always registered natively so custom events reach it.
    /// When the event name is mapped, the listener is additionally stored as
    /// a callback prop so the visual component can invoke it directly.
    pub fn add_event_listener(&self, event: &str, listener: Listener) {
        self.inner.listeners.add(event, listener.clone());
        if let Some(prop) = self
            .inner
            .class
            .mapping()
            .and_then(|mapping| mapping.event(event))
        {
            self.merge_prop(prop.to_owned(), PropValue::Listener(listener));
        }
    }

    /// Removes a natively registered listener, by identity.
    ///
    /// A previously mapped callback prop stays in place; the host replaces
    /// it by registering a new listener for the same event.
    pub fn remove_event_listener(&self, event: &str, listener: &Listener) {
        self.inner.listeners.remove(event, listener);
    }

    /// Dispatches a widget action to the host as an `"on-<action>"` custom
    /// event. Returns the number of host listeners reached.
    pub fn dispatch_action(&self, action: &str, detail: Value) -> usize {
        self.dispatch_event(&action_event_name(action), detail)
    }

    /// Dispatches a raw custom event to the host.
    pub fn dispatch_event(&self, event: &str, detail: Value) -> usize {
        self.inner.listeners.dispatch(event, &detail)
    }

    /// Imperative prop accessor: the current props value.
    #[must_use]
    pub fn data(&self) -> Option<Props> {
        self.inner.props.get()
    }

    /// Imperative prop accessor: replaces the props value wholesale,
    /// bypassing attribute mapping entirely.
    pub fn set_data(&self, props: Props) {
        self.inner.props.set(props);
    }

    /// The instance-owned props channel.
    #[must_use]
    pub fn props(&self) -> Observable<Props> {
        self.inner.props.clone()
    }

    /// The cached portal for the shared render pass.
    ///
    /// # Errors
    ///
    /// Fails when the element is not attached, i.e. no mount hook has built
    /// a portal yet.
    pub fn rendered_portal(&self) -> Result<Node, LifecycleError> {
        self.inner
            .portal
            .borrow()
            .clone()
            .ok_or(LifecycleError::PortalNotBuilt)
    }

    /// The isolated surface of the current attachment, if any.
    #[must_use]
    pub fn surface(&self) -> Option<Surface> {
        self.inner.surface.borrow().clone()
    }

    /// Rebuilds the cached portal into a fresh surface without touching the
    /// props value. Used when the shared render root is torn down and
    /// recreated.
    pub(crate) fn renew_portal(&self) {
        if self.is_connected() {
            self.build_portal();
        }
    }

    fn build_portal(&self) {
        let surface = self.inner.runtime.allocate_surface();
        if let Some(sheet) = self.inner.runtime.stylesheet() {
            surface.adopt(sheet);
        }
        let content = Node::Component {
            component: self.inner.class.component(),
            props: self.inner.props.clone(),
        };
        *self.inner.surface.borrow_mut() = Some(surface.clone());
        *self.inner.portal.borrow_mut() = Some(Node::Portal {
            surface,
            content: Rc::new(content),
        });
    }

    fn merge_prop(&self, name: String, value: PropValue) {
        let merged = self
            .inner
            .props
            .get()
            .unwrap_or_default()
            .merged(Props::new().with(name, value));
        self.inner.props.set(merged);
    }
}

impl Debug for BridgeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeElement")
            .field("tag_name", &self.tag_name())
            .field("connected", &self.is_connected())
            .finish()
    }
}
