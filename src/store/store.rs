use super::handler::{ChangedKeys, Handler, Notify};
use super::snapshot::Snapshot;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A state update accepted by [`Store::set_state`].
pub enum Update {
    /// Keys to write.
    Patch(Map<String, Value>),
    /// Computes the keys to write from the current snapshot.
    With(Box<dyn FnOnce(&Snapshot) -> Map<String, Value>>),
}

impl Update {
    /// An update computed from the snapshot committed when `set_state` runs.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&Snapshot) -> Map<String, Value> + 'static,
    {
        Update::With(Box::new(f))
    }

    fn resolve(self, current: &Snapshot) -> Map<String, Value> {
        match self {
            Update::Patch(patch) => patch,
            Update::With(f) => f(current),
        }
    }
}

impl From<Map<String, Value>> for Update {
    fn from(patch: Map<String, Value>) -> Self {
        Update::Patch(patch)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}

struct StoreInner {
    name: Option<String>,
    snapshot: RefCell<Snapshot>,
    subscribers: RefCell<Vec<Handler>>,
}

/// An observable state container.
///
/// A store owns a [`Snapshot`] and an ordered list of [`Handler`]s. Every
/// [`set_state`](Store::set_state) merges the update into a new snapshot,
/// commits it, and then notifies every handler in subscription order.
///
/// `Store` is a cheap handle: clones refer to the same state.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use serde_json::json;
/// use statebind::{Handler, Store};
///
/// let initial = json!({ "count": 0 }).as_object().cloned().unwrap();
/// let store = Store::new(initial);
///
/// let handler = Handler::from_fn(|keys| {
///     assert!(keys.contains("count"));
///     Ok(())
/// });
/// store.subscribe(&handler);
///
/// block_on(store.set_state_with(|state| {
///     let next = state["count"].as_i64().unwrap_or(0) + 1;
///     json!({ "count": next }).as_object().cloned().unwrap()
/// }))
/// .unwrap();
///
/// assert_eq!(store.get_state()["count"], json!(1));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a new store holding a shallow copy of `initial`.
    pub fn new(initial: impl Into<Snapshot>) -> Self {
        Self::build(None, initial.into())
    }

    /// Create a named store. The name labels log events and keys the
    /// by-name prop mapping of a binding.
    pub fn named(name: impl Into<String>, initial: impl Into<Snapshot>) -> Self {
        Self::build(Some(name.into()), initial.into())
    }

    fn build(name: Option<String>, initial: Snapshot) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                name,
                snapshot: RefCell::new(initial),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The name given to [`Store::named`], if any.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The currently committed snapshot.
    pub fn get_state(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Merge `update` into the state and notify every subscriber.
    ///
    /// The merge is shallow and produces a new snapshot, which is committed
    /// before any handler runs. Handlers are then invoked synchronously in
    /// subscription order with the update's key set; the returned [`Notify`]
    /// joins the futures they return.
    ///
    /// Concurrent calls are not serialized: an update computed from a
    /// function sees whatever snapshot is committed when *this* call runs.
    pub fn set_state(&self, update: impl Into<Update>) -> Notify {
        let current = self.get_state();
        let patch = update.into().resolve(&current);
        let changed = ChangedKeys::new(patch.keys().cloned().collect());

        let next = current.merged(patch);
        *self.inner.snapshot.borrow_mut() = next;

        // Handlers may subscribe or unsubscribe while being notified.
        let subscribers = self.inner.subscribers.borrow().clone();
        tracing::debug!(
            store = self.name().unwrap_or("<anonymous>"),
            changed = ?changed,
            subscribers = subscribers.len(),
            "state committed"
        );

        let pending = subscribers
            .iter()
            .map(|handler| handler.call(&changed))
            .collect();
        Notify::join(pending)
    }

    /// Shorthand for `set_state(Update::with(f))`.
    pub fn set_state_with<F>(&self, f: F) -> Notify
    where
        F: FnOnce(&Snapshot) -> Map<String, Value> + 'static,
    {
        self.set_state(Update::with(f))
    }

    /// Append `handler` to the subscriber list. The same handler may be
    /// subscribed more than once; each registration is notified.
    pub fn subscribe(&self, handler: &Handler) {
        self.inner.subscribers.borrow_mut().push(handler.clone());
    }

    /// Remove the first registration of `handler`, compared by identity.
    ///
    /// Further registrations of the same handler are left in place. Returns
    /// whether a registration was removed.
    pub fn unsubscribe(&self, handler: &Handler) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        match subscribers.iter().position(|h| h.ptr_eq(handler)) {
            Some(index) => {
                subscribers.remove(index);
                true
            }
            None => {
                tracing::warn!(
                    store = self.name().unwrap_or("<anonymous>"),
                    "unsubscribe called for a handler that is not subscribed"
                );
                false
            }
        }
    }

    /// Number of active registrations.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("state", &*self.inner.snapshot.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Weak counterpart of [`Store`].
#[derive(Clone, Debug, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    /// The store, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}
