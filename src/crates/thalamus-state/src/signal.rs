//! Single-threaded signal/slot primitive with scoped connections.
//!
//! Handlers are registered with [`Signal::connect`], which returns a
//! move-only [`Connection`] guard; dropping the guard severs the
//! connection. Everything here is `Rc`-based and intended for use on the
//! io executor only.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type SlotList<T> = RefCell<Vec<(u64, Rc<dyn Fn(&T)>)>>;

/// A multi-observer callback list.
///
/// Emission iterates over a snapshot of the currently connected slots, so
/// handlers may connect or disconnect (including themselves) while an emit
/// is in progress. A slot disconnected mid-emit is not invoked afterwards.
pub struct Signal<T> {
    slots: Rc<SlotList<T>>,
    next_id: Cell<u64>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    /// Registers `handler` and returns the guard keeping it connected.
    pub fn connect(&self, handler: impl Fn(&T) + 'static) -> Connection {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.slots.borrow_mut().push((id, Rc::new(handler)));
        let weak: Weak<SlotList<T>> = Rc::downgrade(&self.slots);
        Connection::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.borrow_mut().retain(|(slot_id, _)| *slot_id != id);
            }
        })
    }

    /// Invokes every connected handler in connection order.
    pub fn emit(&self, arg: &T) {
        let snapshot: Vec<(u64, Rc<dyn Fn(&T)>)> = self
            .slots
            .borrow()
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();
        for (id, callback) in snapshot {
            let still_connected = self.slots.borrow().iter().any(|(slot_id, _)| *slot_id == id);
            if still_connected {
                callback(arg);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }
}

/// Move-only scope guard for a signal connection.
///
/// The connection is severed when the guard drops. [`Connection::forget`]
/// leaks the registration for callers that intend it to live for the rest
/// of the program.
pub struct Connection {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl Connection {
    fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// A guard that is not connected to anything. Used where an API must
    /// return a `Connection` but the subscription was satisfied
    /// immediately.
    pub fn empty() -> Self {
        Self { disconnect: None }
    }

    /// Severs the connection now.
    pub fn disconnect(mut self) {
        if let Some(f) = self.disconnect.take() {
            f();
        }
    }

    /// Leaves the handler connected for the lifetime of the signal.
    pub fn forget(mut self) {
        self.disconnect = None;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(f) = self.disconnect.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_connection_order() {
        let signal = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen1 = Rc::clone(&seen);
        let _c1 = signal.connect(move |v: &i32| seen1.borrow_mut().push((1, *v)));
        let seen2 = Rc::clone(&seen);
        let _c2 = signal.connect(move |v: &i32| seen2.borrow_mut().push((2, *v)));

        signal.emit(&7);
        assert_eq!(*seen.borrow(), vec![(1, 7), (2, 7)]);
    }

    #[test]
    fn test_drop_disconnects() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let count2 = Rc::clone(&count);
        let conn = signal.connect(move |_: &()| count2.set(count2.get() + 1));
        signal.emit(&());
        assert_eq!(count.get(), 1);

        drop(conn);
        signal.emit(&());
        assert_eq!(count.get(), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_forget_keeps_connection() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let count2 = Rc::clone(&count);
        signal.connect(move |_: &()| count2.set(count2.get() + 1)).forget();
        signal.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_disconnect_during_emit() {
        let signal = Rc::new(Signal::new());
        let second_fired = Rc::new(Cell::new(false));

        // First handler disconnects the second before it runs.
        let victim: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
        let victim2 = Rc::clone(&victim);
        let _c1 = signal.connect(move |_: &()| {
            victim2.borrow_mut().take();
        });
        let second_fired2 = Rc::clone(&second_fired);
        *victim.borrow_mut() = Some(signal.connect(move |_: &()| second_fired2.set(true)));

        signal.emit(&());
        assert!(!second_fired.get());
    }

    #[test]
    fn test_connect_during_emit_does_not_fire_this_round() {
        let signal = Rc::new(Signal::new());
        let late_fired = Rc::new(Cell::new(0));

        let signal2 = Rc::clone(&signal);
        let late = Rc::clone(&late_fired);
        let _c1 = signal.connect(move |_: &()| {
            let late = Rc::clone(&late);
            signal2.connect(move |_: &()| late.set(late.get() + 1)).forget();
        });

        signal.emit(&());
        assert_eq!(late_fired.get(), 0);
        signal.emit(&());
        assert_eq!(late_fired.get(), 1);
    }
}
