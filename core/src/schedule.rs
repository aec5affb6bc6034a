//! Deferred task scheduling.
//!
//! The render scheduler coalesces mount/unmount bursts by deferring exactly
//! one task to the next macrotask boundary. That boundary is abstracted as a
//! [`TaskQueue`] so hosts can plug in their platform timer, and so the
//! coalescing behavior is unit-testable without real time passing: the
//! in-crate [`VirtualQueue`] holds deferred tasks until it is driven
//! manually.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Debug};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// A queue deferring tasks to the next task boundary.
pub trait TaskQueue {
    /// Defers a task, returning a handle that can cancel it before it runs.
    fn defer(&self, task: Task) -> TaskHandle;
}

/// Cancellation handle for a deferred task.
///
/// Cancelling is advisory-but-final: a queue must not run a task whose
/// handle was cancelled before the task fired.
#[derive(Clone, Default)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// Creates a live (non-cancelled) handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the task as cancelled.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct Entry {
    task: Task,
    handle: TaskHandle,
}

/// A manually-driven task queue standing in for the platform's macrotask
/// boundary.
///
/// [`run`](Self::run) executes only the tasks that were already deferred
/// when it was called; tasks deferred during the run wait for the next call,
/// exactly like work scheduled from within a platform timer callback.
#[derive(Clone, Default)]
pub struct VirtualQueue {
    entries: Rc<RefCell<VecDeque<Entry>>>,
}

impl VirtualQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every task deferred before this call, skipping cancelled ones.
    /// Returns the number of tasks that actually ran.
    pub fn run(&self) -> usize {
        let pending = self.entries.borrow().len();
        let mut ran = 0;
        for _ in 0..pending {
            let entry = self.entries.borrow_mut().pop_front();
            let Some(entry) = entry else { break };
            if entry.handle.is_cancelled() {
                trace!("skipping cancelled task");
                continue;
            }
            (entry.task)();
            ran += 1;
        }
        ran
    }

    /// Number of tasks currently deferred, cancelled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is deferred.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl TaskQueue for VirtualQueue {
    fn defer(&self, task: Task) -> TaskHandle {
        let handle = TaskHandle::new();
        self.entries.borrow_mut().push_back(Entry {
            task,
            handle: handle.clone(),
        });
        handle
    }
}

impl Debug for VirtualQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualQueue")
            .field("pending", &self.len())
            .finish()
    }
}
