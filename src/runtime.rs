//! The shared runtime context.
//!
//! Everything the bridge shares across instances — the tag registry, the
//! active-instance sequence, the key counter, the initialized flag, the
//! settings observable, and the scheduler — lives in one [`Runtime`] owned
//! by the widgets manager and handed to each bridge element at construction.
//! Nothing here is a module global: unit tests run as many independent
//! runtimes as they like, while a real page creates exactly one.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Debug};
use core::num::NonZeroU64;
use std::rc::Rc;

use mooring_reactive::Observable;

use mooring_core::{InstanceKey, Settings, StyleSheet, Surface, TaskQueue};
use tracing::{debug, trace};

use crate::element::BridgeElement;
use crate::error::{ConfigError, LifecycleError};
use crate::registry::Registry;
use crate::scheduler::RenderScheduler;

/// One entry of the active-instance sequence.
#[derive(Debug, Clone)]
pub(crate) struct ActiveInstance {
    pub(crate) key: InstanceKey,
    pub(crate) element: BridgeElement,
}

/// Shared handle to the bridge runtime context.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    registry: Registry,
    active: RefCell<Vec<ActiveInstance>>,
    next_key: Cell<u64>,
    next_surface: Cell<u64>,
    initialized: Cell<bool>,
    manager_claimed: Cell<bool>,
    settings: RefCell<Observable<Settings>>,
    stylesheet: RefCell<Option<StyleSheet>>,
    scheduler: RenderScheduler,
    render: RefCell<Option<Rc<dyn Fn() -> Result<(), LifecycleError>>>>,
}

pub(crate) enum MountState {
    Mounted,
    Unmounted,
}

impl Runtime {
    /// Creates a fresh runtime deferring renders through `queue`.
    #[must_use]
    pub fn new(queue: Rc<dyn TaskQueue>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                registry: Registry::new(),
                active: RefCell::new(Vec::new()),
                next_key: Cell::new(1),
                next_surface: Cell::new(1),
                initialized: Cell::new(false),
                manager_claimed: Cell::new(false),
                settings: RefCell::new(Observable::new()),
                stylesheet: RefCell::new(None),
                scheduler: RenderScheduler::new(queue),
                render: RefCell::new(None),
            }),
        }
    }

    /// The tag registry of this runtime.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Creates an unattached bridge element for a registered tag, the way a
    /// host page creates an element by tag name. Returns `None` for
    /// undefined tags.
    #[must_use]
    pub fn create_element(&self, tag_name: &str) -> Option<BridgeElement> {
        let class = self.inner.registry.get(tag_name)?;
        Some(BridgeElement::new(class, self.clone()))
    }

    /// Whether the manager on this runtime is initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    /// Keys of the currently active instances, in insertion order.
    #[must_use]
    pub fn active_keys(&self) -> Vec<InstanceKey> {
        self.inner
            .active
            .borrow()
            .iter()
            .map(|instance| instance.key)
            .collect()
    }

    /// Number of currently active instances.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.active.borrow().len()
    }

    /// Whether a deferred render is currently armed.
    #[must_use]
    pub fn is_render_armed(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    pub(crate) fn claim_manager(&self) -> Result<(), ConfigError> {
        if self.inner.manager_claimed.get() {
            return Err(ConfigError::ManagerAlreadyConstructed);
        }
        // Permanent: the claim survives unmount(), so the runtime can never
        // host a second manager.
        self.inner.manager_claimed.set(true);
        Ok(())
    }

    pub(crate) fn set_initialized(&self, initialized: bool) {
        self.inner.initialized.set(initialized);
    }

    pub(crate) fn fresh_key(&self) -> InstanceKey {
        let raw = self.inner.next_key.get();
        self.inner.next_key.set(raw + 1);
        InstanceKey::new(NonZeroU64::new(raw).expect("instance keys start at 1"))
    }

    pub(crate) fn allocate_surface(&self) -> Surface {
        let id = self.inner.next_surface.get();
        self.inner.next_surface.set(id + 1);
        Surface::new(id)
    }

    /// The shared settings channel currently in effect.
    pub(crate) fn settings(&self) -> Observable<Settings> {
        self.inner.settings.borrow().clone()
    }

    /// Replaces the settings channel with a fresh, empty one, detaching
    /// every subscriber of the old channel.
    pub(crate) fn reset_settings(&self) {
        *self.inner.settings.borrow_mut() = Observable::new();
    }

    pub(crate) fn stylesheet(&self) -> Option<StyleSheet> {
        self.inner.stylesheet.borrow().clone()
    }

    pub(crate) fn set_stylesheet(&self, sheet: StyleSheet) {
        *self.inner.stylesheet.borrow_mut() = Some(sheet);
    }

    pub(crate) fn set_render(&self, render: Rc<dyn Fn() -> Result<(), LifecycleError>>) {
        *self.inner.render.borrow_mut() = Some(render);
    }

    /// Performs one render pass right now, bypassing the scheduler.
    pub(crate) fn render_now(&self) -> Result<(), LifecycleError> {
        let render = self.inner.render.borrow().clone();
        render.map_or(Err(LifecycleError::NotInitialized), |render| render())
    }

    /// Applies a mount-state change synchronously and arms a deferred render
    /// when one is needed.
    pub(crate) fn notify_mount_state(&self, element: &BridgeElement, state: MountState) {
        match state {
            MountState::Mounted => {
                let key = self.fresh_key();
                trace!(tag = element.tag_name(), %key, "instance mounted");
                self.inner.active.borrow_mut().push(ActiveInstance {
                    key,
                    element: element.clone(),
                });
            }
            MountState::Unmounted => {
                let mut active = self.inner.active.borrow_mut();
                if let Some(index) = active
                    .iter()
                    .position(|instance| instance.element.ptr_eq(element))
                {
                    let removed = active.remove(index);
                    trace!(tag = element.tag_name(), key = %removed.key, "instance unmounted");
                }
            }
        }

        // Before initialize() there is nothing to coalesce: the initial
        // render will pick the active set up.
        if self.is_initialized() {
            self.inner.scheduler.arm(self.clone());
        }
    }

    /// The deferred render callback. Re-checks `initialized` because an
    /// explicit unmount may have happened between arming and firing.
    pub(crate) fn deferred_render(&self) {
        if self.is_initialized() {
            if let Err(error) = self.render_now() {
                debug!(%error, "deferred render failed");
            }
        } else {
            debug!("skipping deferred render armed before teardown");
        }
        self.inner.scheduler.finish();
    }

    pub(crate) fn cancel_pending_render(&self) {
        self.inner.scheduler.cancel_pending();
    }

    pub(crate) fn active_snapshot(&self) -> Vec<ActiveInstance> {
        self.inner.active.borrow().clone()
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("tags", &self.inner.registry.len())
            .field("active", &self.active_count())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
