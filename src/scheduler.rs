//! The coalescing render scheduler.
//!
//! Mount/unmount churn arrives in bursts — a host-page navigation can remove
//! several widgets and add several others in one synchronous turn. The
//! scheduler folds any number of notifications from one turn into a single
//! deferred render pass: the first notification arms a task on the runtime's
//! queue, later ones see the armed flag and do nothing. When the task fires
//! it re-checks that the manager is still initialized, because an explicit
//! `unmount()` may have torn the render root down in the race window between
//! arming and firing; a stale task is a silent skip, not an error.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Debug};
use std::rc::Rc;

use mooring_core::{TaskHandle, TaskQueue};
use tracing::{debug, trace};

use crate::runtime::Runtime;

/// Single-pending-slot deferred render state.
pub(crate) struct RenderScheduler {
    queue: Rc<dyn TaskQueue>,
    armed: Cell<bool>,
    pending: RefCell<Option<TaskHandle>>,
}

impl RenderScheduler {
    pub(crate) fn new(queue: Rc<dyn TaskQueue>) -> Self {
        Self {
            queue,
            armed: Cell::new(false),
            pending: RefCell::new(None),
        }
    }

    /// Whether a deferred render is already waiting for the next boundary.
    pub(crate) fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Arms one deferred render pass, unless one is already armed.
    pub(crate) fn arm(&self, runtime: Runtime) {
        if self.armed.get() {
            trace!("render already armed, coalescing");
            return;
        }
        self.armed.set(true);
        debug!("arming deferred render");
        let handle = self.queue.defer(Box::new(move || runtime.deferred_render()));
        *self.pending.borrow_mut() = Some(handle);
    }

    /// Clears the armed state after the deferred task ran (or skipped).
    pub(crate) fn finish(&self) {
        self.armed.set(false);
        self.pending.borrow_mut().take();
    }

    /// Cancels a still-pending deferred render, if any.
    pub(crate) fn cancel_pending(&self) {
        if let Some(handle) = self.pending.borrow_mut().take() {
            debug!("cancelling pending deferred render");
            handle.cancel();
        }
        self.armed.set(false);
    }
}

impl Debug for RenderScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("armed", &self.armed.get())
            .finish()
    }
}
