//! Change notifications.
//!
//! Observers register through [`Listeners::subscribe`] and get back a [`Subscription`] guard;
//! dropping the guard unregisters the callback. A callback may drop guards (including its own)
//! or register new ones while being notified; new registrations take effect from the next
//! notification.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeChangeKind {
    /// The hierarchy was rebuilt.
    Structure,
    /// The expanded set changed.
    Expansion,
    /// The shown set changed.
    Visibility,
    /// The selection changed.
    Selection,
    /// Focus moved.
    Focus,
    /// Search results or the searching flag changed.
    Search,
    /// Scroll offset, viewport or measurements changed.
    Scroll,
    /// The loading flag changed.
    Loading,
}

/// One change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeChange {
    /// What changed.
    pub kind: TreeChangeKind,
    /// Version before the change.
    pub old_version: u64,
    /// Version after the change.
    pub new_version: u64,
}

impl TreeChange {
    /// Create a notification.
    pub fn new(kind: TreeChangeKind, old_version: u64, new_version: u64) -> Self {
        Self {
            kind,
            old_version,
            new_version,
        }
    }
}

/// Change callback.
pub type TreeChangeCallback = Box<dyn FnMut(&TreeChange)>;

type Slot = Rc<RefCell<TreeChangeCallback>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: Vec<(u64, Slot)>,
}

/// Callback registry owned by a view.
#[derive(Default)]
pub struct Listeners {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

impl Listeners {
    /// Register `callback` until the returned guard is dropped.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&TreeChange) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let callback: TreeChangeCallback = Box::new(callback);
        registry.slots.push((id, Rc::new(RefCell::new(callback))));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Invoke every registered callback once.
    pub fn notify(&self, change: &TreeChange) {
        let snapshot: Vec<(u64, Slot)> = self.registry.borrow().slots.clone();
        for (id, slot) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            // A callback that triggers a nested notification is not re-entered.
            if let Ok(mut callback) = slot.try_borrow_mut() {
                (&mut **callback)(change);
            }
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.registry.borrow().slots.iter().any(|(slot, _)| *slot == id)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registry.borrow().slots.len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister everything. Outstanding guards become inert.
    pub fn clear(&self) {
        self.registry.borrow_mut().slots.clear();
    }
}

/// Registration guard returned by [`Listeners::subscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Returns `true` while the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().slots.iter().any(|(id, _)| *id == self.id))
    }

    /// Unregister now.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade()
            && let Ok(mut registry) = registry.try_borrow_mut()
        {
            registry.slots.retain(|(id, _)| *id != self.id);
        }
    }
}
