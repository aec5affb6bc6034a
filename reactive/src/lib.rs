#![doc = include_str!("../README.md")]

use core::cell::{Cell, RefCell};
use core::fmt::{self, Debug};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// A single-value reactive cell.
///
/// The cell holds an optional value of type `T` behind a shared handle;
/// cloning an `Observable` produces another handle to the same cell. Setting
/// the value notifies every watcher registered on this cell and nothing else,
/// which is what lets a prop provider re-render only the dependents actually
/// reading this value.
///
/// # Example
///
/// ```
/// use mooring_reactive::Observable;
///
/// let cell = Observable::new();
/// assert!(!cell.is_set());
///
/// let seen = std::rc::Rc::new(std::cell::Cell::new(0));
/// let guard = cell.watch({
///     let seen = seen.clone();
///     move |value: &i32| seen.set(*value)
/// });
///
/// cell.set(7);
/// assert_eq!(cell.get(), Some(7));
/// assert_eq!(seen.get(), 7);
/// drop(guard);
/// ```
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    value: RefCell<Option<T>>,
    watchers: RefCell<BTreeMap<u64, Rc<dyn Fn(&T)>>>,
    next_watcher: Cell<u64>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("set", &self.is_set())
            .field("watchers", &self.inner.watchers.borrow().len())
            .finish()
    }
}

impl<T> PartialEq for Observable<T> {
    /// Two observables are equal when they are handles to the same cell.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Observable<T> {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(None),
                watchers: RefCell::new(BTreeMap::new()),
                next_watcher: Cell::new(0),
            }),
        }
    }

    /// Creates a cell holding `value`.
    #[must_use]
    pub fn of(value: T) -> Self {
        let cell = Self::new();
        *cell.inner.value.borrow_mut() = Some(value);
        cell
    }

    /// Returns `true` if the cell currently holds a value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Reads the current value through a closure without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.value.borrow().as_ref())
    }

    /// Removes and returns the current value, leaving the cell empty.
    ///
    /// Watchers are not notified; this is a teardown operation, not an update.
    pub fn take(&self) -> Option<T> {
        self.inner.value.borrow_mut().take()
    }

    /// Registers a watcher invoked on every subsequent [`set`](Self::set).
    ///
    /// The watcher stays registered until the returned guard is dropped.
    #[must_use = "the watcher is unregistered when the guard is dropped"]
    pub fn watch(&self, watcher: impl Fn(&T) + 'static) -> WatcherGuard
    where
        T: 'static,
    {
        let id = self.inner.next_watcher.get();
        self.inner.next_watcher.set(id + 1);
        self.inner
            .watchers
            .borrow_mut()
            .insert(id, Rc::new(watcher));
        WatcherGuard {
            unregister: Box::new(Unregister {
                inner: Rc::downgrade(&self.inner),
                id,
            }),
        }
    }

    /// Number of watchers currently registered on this cell.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }
}

impl<T: Clone> Observable<T> {
    /// Returns a clone of the current value, or `None` if the cell is empty.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Replaces the current value and notifies every watcher on this cell.
    ///
    /// Both the watcher table and the value are snapshotted before any
    /// watcher runs, so a watcher may register or drop guards and even write
    /// this cell re-entrantly.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value);
        let watchers: Vec<Rc<dyn Fn(&T)>> =
            self.inner.watchers.borrow().values().cloned().collect();
        log::trace!("observable set, notifying {} watcher(s)", watchers.len());
        let current = self.inner.value.borrow().clone();
        if let Some(current) = current {
            for watcher in watchers {
                watcher(&current);
            }
        }
    }
}

trait UnregisterWatcher {
    fn unregister(&self);
}

struct Unregister<T> {
    inner: Weak<Inner<T>>,
    id: u64,
}

impl<T> UnregisterWatcher for Unregister<T> {
    fn unregister(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.watchers.borrow_mut().remove(&self.id);
        }
    }
}

/// Guard keeping a watcher registered; dropping it unregisters the watcher.
#[must_use = "the watcher is unregistered when the guard is dropped"]
pub struct WatcherGuard {
    unregister: Box<dyn UnregisterWatcher>,
}

impl Debug for WatcherGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WatcherGuard")
    }
}

impl Drop for WatcherGuard {
    fn drop(&mut self) {
        self.unregister.unregister();
    }
}
