//! Widget-to-host custom events.
//!
//! Bridge elements signal the host page through `"on-<action>"`-style custom
//! events instead of a shared-state write: the host registers a standard
//! listener on the element, and the widget dispatches the action with a JSON
//! detail. Elements keep a native listener table independent of the mapping
//! engine — every registered listener is dispatchable, mapped or not.

use core::cell::RefCell;
use core::fmt::{self, Debug};
use std::collections::BTreeMap;

use serde_json::Value;
use tracing::trace;

use crate::props::Listener;

/// The `"on-<action>"` event name for a widget action.
#[must_use]
pub fn action_event_name(action: &str) -> String {
    format!("on-{action}")
}

/// The native listener registrations of one bridge element.
#[derive(Default)]
pub struct ListenerTable {
    listeners: RefCell<BTreeMap<String, Vec<Listener>>>,
}

impl ListenerTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: RefCell::new(BTreeMap::new()),
        }
    }

    /// Registers a listener for `event`.
    pub fn add(&self, event: impl Into<String>, listener: Listener) {
        self.listeners
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(listener);
    }

    /// Removes the first registration of exactly this listener, by identity.
    pub fn remove(&self, event: &str, listener: &Listener) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(registered) = listeners.get_mut(event)
            && let Some(index) = registered.iter().position(|other| other == listener)
        {
            registered.remove(index);
        }
    }

    /// Dispatches `event` to every registered listener, in registration
    /// order. Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &str, detail: &Value) -> usize {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default();
        trace!(event, count = listeners.len(), "dispatching custom event");
        for listener in &listeners {
            listener.call(detail);
        }
        listeners.len()
    }
}

impl Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let count: usize = listeners.values().map(Vec::len).sum();
        f.debug_struct("ListenerTable")
            .field("events", &listeners.len())
            .field("listeners", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use serde_json::json;
    use std::rc::Rc;

    #[test]
    fn action_names_use_the_on_prefix() {
        assert_eq!(action_event_name("add-item"), "on-add-item");
    }

    #[test]
    fn dispatch_invokes_listeners_in_registration_order() {
        let table = ListenerTable::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = order.clone();
            table.add(
                "on-add-item",
                Listener::new(move |_| order.borrow_mut().push(tag)),
            );
        }
        let invoked = table.dispatch("on-add-item", &json!({"text": "Click me!"}));
        assert_eq!(invoked, 2);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn dispatch_of_an_unknown_event_reaches_nobody() {
        let table = ListenerTable::new();
        assert_eq!(table.dispatch("on-unknown", &Value::Null), 0);
    }

    #[test]
    fn remove_targets_the_exact_listener() {
        let table = ListenerTable::new();
        let hits = Rc::new(Cell::new(0));
        let keep = Listener::new({
            let hits = hits.clone();
            move |_| hits.set(hits.get() + 1)
        });
        let removed = Listener::new(|_| panic!("removed listener must not fire"));
        table.add("on-add-item", keep);
        table.add("on-add-item", removed.clone());
        table.remove("on-add-item", &removed);
        assert_eq!(table.dispatch("on-add-item", &Value::Null), 1);
        assert_eq!(hits.get(), 1);
    }
}
