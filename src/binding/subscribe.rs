use crate::error::{BindError, HandlerError, Result};
use crate::host::{Component, StateHost};
use crate::store::{ChangedKeys, Handler, HandlerFuture, Props, Snapshot, Store};
use futures::channel::oneshot;
use futures::future::{self, Either};
use futures::FutureExt;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

/// Props key under which the default mapping exposes raw snapshots.
pub const STATES_KEY: &str = "states";

/// One or more stores, in the order their snapshots reach the prop mapper.
#[derive(Clone, Debug, Default)]
pub struct StoreList(Vec<Store>);

impl StoreList {
    /// Number of stores, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list holds no store.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Store> for StoreList {
    fn from(store: Store) -> Self {
        StoreList(vec![store])
    }
}

impl From<&Store> for StoreList {
    fn from(store: &Store) -> Self {
        StoreList(vec![store.clone()])
    }
}

impl From<Vec<Store>> for StoreList {
    fn from(stores: Vec<Store>) -> Self {
        StoreList(stores)
    }
}

impl From<&[Store]> for StoreList {
    fn from(stores: &[Store]) -> Self {
        StoreList(stores.to_vec())
    }
}

impl<const N: usize> From<[Store; N]> for StoreList {
    fn from(stores: [Store; N]) -> Self {
        StoreList(stores.into())
    }
}

impl<const N: usize> From<[&Store; N]> for StoreList {
    fn from(stores: [&Store; N]) -> Self {
        StoreList(stores.into_iter().cloned().collect())
    }
}

/// Allow-list of keys that make a binding recompute. Empty means "any key".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyFilter(BTreeSet<String>);

impl KeyFilter {
    /// Build a filter admitting any of `keys`.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Whether the filter admits every update.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a notification with `changed` keys passes the filter.
    pub fn admits(&self, changed: &ChangedKeys) -> bool {
        self.0.is_empty() || changed.iter().any(|key| self.0.contains(key))
    }
}

type MapFn = Rc<dyn Fn(&[Snapshot]) -> Props>;

#[derive(Clone)]
enum Mapper {
    /// Snapshots under [`STATES_KEY`]: the object for one store, an array
    /// for several.
    States,
    /// One prop per store, keyed by store name or `store<index>`.
    ByName(Rc<[String]>),
    Custom(MapFn),
}

impl Mapper {
    fn apply(&self, snapshots: &[Snapshot]) -> Props {
        match self {
            Mapper::States => {
                let states = match snapshots {
                    [single] => single.to_value(),
                    many => Value::Array(many.iter().map(Snapshot::to_value).collect()),
                };
                let mut props = Props::new();
                props.insert(STATES_KEY.to_owned(), states);
                props
            }
            Mapper::ByName(names) => names
                .iter()
                .cloned()
                .zip(snapshots.iter().map(Snapshot::to_value))
                .collect(),
            Mapper::Custom(f) => f(snapshots),
        }
    }
}

/// Builder for a class-style binding.
///
/// Validation happens in [`build`](Binding::build): a missing component
/// yields [`BindError::MissingComponent`], an empty store list
/// [`BindError::MissingStore`].
///
/// # Examples
///
/// ```
/// use serde_json::{json, Value};
/// use statebind::{Binding, HeadlessHost, Props, Store};
///
/// let a = Store::new(json!({ "x": 1 }).as_object().cloned().unwrap());
/// let b = Store::new(json!({ "y": 2 }).as_object().cloned().unwrap());
///
/// let bound = Binding::new()
///     .component(|props: &Props| props["sum"].clone())
///     .stores([&a, &b])
///     .map_to_props(|states| {
///         let sum = states[0]["x"].as_i64().unwrap_or(0) + states[1]["y"].as_i64().unwrap_or(0);
///         json!({ "sum": sum }).as_object().cloned().unwrap()
///     })
///     .build()
///     .unwrap();
///
/// let view = bound.mount(Props::new(), HeadlessHost::new());
/// assert_eq!(view.render(), Value::from(3));
/// ```
pub struct Binding<C> {
    component: Option<C>,
    stores: Vec<Store>,
    mapper: Mapper,
    key_filter: KeyFilter,
}

impl<C: Component> Binding<C> {
    /// An empty builder using the default `states` mapping.
    pub fn new() -> Self {
        Self {
            component: None,
            stores: Vec::new(),
            mapper: Mapper::States,
            key_filter: KeyFilter::default(),
        }
    }

    /// Set the component to render.
    pub fn component(mut self, component: C) -> Self {
        self.component = Some(component);
        self
    }

    /// Append one store.
    pub fn store(mut self, store: &Store) -> Self {
        self.stores.push(store.clone());
        self
    }

    /// Append stores, keeping their order.
    pub fn stores(mut self, stores: impl Into<StoreList>) -> Self {
        self.stores.extend(stores.into().0);
        self
    }

    /// Derive props from every store's snapshot, in store order.
    pub fn map_to_props<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Snapshot]) -> Props + 'static,
    {
        self.mapper = Mapper::Custom(Rc::new(f));
        self
    }

    /// Expose each store's snapshot under the store's name.
    ///
    /// Unnamed stores are keyed `store<index>`. The props carry snapshots
    /// only; write back through the [`Store`] handle itself.
    pub fn map_by_name(mut self) -> Self {
        // Resolved in `build`, once the store list is final.
        self.mapper = Mapper::ByName(Rc::from(Vec::new()));
        self
    }

    /// Recompute only when an update writes one of `keys`.
    pub fn key_filter<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.key_filter = KeyFilter::new(keys);
        self
    }

    /// Validate and freeze the binding.
    pub fn build(self) -> Result<BoundComponent<C>> {
        let component = self.component.ok_or(BindError::MissingComponent)?;
        if self.stores.is_empty() {
            return Err(BindError::MissingStore);
        }

        let mapper = match self.mapper {
            Mapper::ByName(_) => Mapper::ByName(
                self.stores
                    .iter()
                    .enumerate()
                    .map(|(index, store)| {
                        store
                            .name()
                            .map(str::to_owned)
                            .unwrap_or_else(|| format!("store{index}"))
                    })
                    .collect(),
            ),
            other => other,
        };

        Ok(BoundComponent {
            component: Rc::new(component),
            stores: self.stores.into(),
            mapper,
            key_filter: (!self.key_filter.is_empty()).then_some(self.key_filter),
        })
    }
}

impl<C: Component> Default for Binding<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bind `component` to `stores` with the default mapping and no key filter.
pub fn subscribe<C: Component>(
    component: C,
    stores: impl Into<StoreList>,
) -> Result<BoundComponent<C>> {
    Binding::new().component(component).stores(stores).build()
}

/// A component bound to its stores, ready to be mounted any number of times.
pub struct BoundComponent<C> {
    component: Rc<C>,
    stores: Rc<[Store]>,
    mapper: Mapper,
    key_filter: Option<KeyFilter>,
}

impl<C> Clone for BoundComponent<C> {
    fn clone(&self) -> Self {
        Self {
            component: Rc::clone(&self.component),
            stores: Rc::clone(&self.stores),
            mapper: self.mapper.clone(),
            key_filter: self.key_filter.clone(),
        }
    }
}

impl<C: Component> BoundComponent<C> {
    /// Mount an instance with the caller's pass-through `props`.
    ///
    /// The instance subscribes to every store before computing its initial
    /// derived props.
    pub fn mount<H>(&self, props: Props, host: H) -> Mounted<C>
    where
        H: StateHost + 'static,
    {
        let instance = Rc::new_cyclic(|weak: &Weak<Instance>| Instance {
            stores: Rc::clone(&self.stores),
            mapper: self.mapper.clone(),
            key_filter: self.key_filter.clone(),
            host: Box::new(host),
            handler: Instance::handler(weak.clone()),
            mounted: Cell::new(true),
            state: RefCell::new(Props::new()),
            in_flight: RefCell::new(Vec::new()),
        });
        instance.initialize();

        Mounted {
            instance,
            component: Rc::clone(&self.component),
            props,
        }
    }

    /// The bound stores, in mapping order.
    pub fn stores(&self) -> &[Store] {
        &self.stores
    }
}

/// Per-mount adapter between the stores and the host.
struct Instance {
    stores: Rc<[Store]>,
    mapper: Mapper,
    key_filter: Option<KeyFilter>,
    host: Box<dyn StateHost>,
    handler: Handler,
    mounted: Cell<bool>,
    state: RefCell<Props>,
    /// Released on teardown so no notification outlives the mount.
    in_flight: RefCell<Vec<oneshot::Sender<()>>>,
}

impl Instance {
    fn handler(instance: Weak<Instance>) -> Handler {
        Handler::new(move |changed| match instance.upgrade() {
            Some(instance) => instance.on_update(changed),
            None => future::ready(Ok(())).boxed_local(),
        })
    }

    fn initialize(&self) {
        for store in self.stores.iter() {
            store.subscribe(&self.handler);
        }
        let state = self.recompute_derived_state();
        *self.state.borrow_mut() = state;
        tracing::debug!(stores = self.stores.len(), "binding mounted");
    }

    fn recompute_derived_state(&self) -> Props {
        let snapshots: Vec<Snapshot> = self.stores.iter().map(Store::get_state).collect();
        self.mapper.apply(&snapshots)
    }

    fn on_update(&self, changed: &ChangedKeys) -> HandlerFuture {
        if !self.mounted.get() {
            tracing::trace!("notification after teardown ignored");
            return future::ready(Ok(())).boxed_local();
        }
        if let Some(filter) = &self.key_filter {
            if !filter.admits(changed) {
                tracing::trace!(changed = ?changed, "no filtered key changed");
                return future::ready(Ok(())).boxed_local();
            }
        }

        let state = self.recompute_derived_state();
        *self.state.borrow_mut() = state.clone();

        let (done_tx, done_rx) = oneshot::channel();
        self.host.replace_state(
            &state,
            Box::new(move || {
                let _ = done_tx.send(());
            }),
        );

        let (release_tx, release_rx) = oneshot::channel::<()>();
        {
            let mut in_flight = self.in_flight.borrow_mut();
            in_flight.retain(|tx| !tx.is_canceled());
            in_flight.push(release_tx);
        }

        async move {
            match future::select(done_rx, release_rx).await {
                Either::Left((Ok(()), _)) => {}
                Either::Left((Err(_), _)) => {
                    tracing::debug!("host dropped the render before it committed");
                }
                Either::Right(_) => tracing::trace!("pending render released by teardown"),
            }
            Ok::<(), HandlerError>(())
        }
        .boxed_local()
    }

    fn teardown(&self) {
        if !self.mounted.replace(false) {
            return;
        }
        for store in self.stores.iter() {
            store.unsubscribe(&self.handler);
        }
        self.in_flight.borrow_mut().clear();
        tracing::debug!(stores = self.stores.len(), "binding torn down");
    }
}

/// A mounted instance of a [`BoundComponent`].
///
/// Dropping it (or calling [`unmount`](Mounted::unmount)) unsubscribes from
/// every store exactly once.
pub struct Mounted<C> {
    instance: Rc<Instance>,
    component: Rc<C>,
    props: Props,
}

impl<C: Component> Mounted<C> {
    /// Render with the pass-through props overlaid by the derived props.
    pub fn render(&self) -> C::Output {
        self.component.render(&self.props())
    }

    /// Merged props; derived values win on key collision.
    pub fn props(&self) -> Props {
        let mut merged = self.props.clone();
        merged.extend(self.instance.state.borrow().clone());
        merged
    }

    /// Props derived from the stores at the last recomputation.
    pub fn derived(&self) -> Props {
        self.instance.state.borrow().clone()
    }

    /// Replace the pass-through props, as a parent re-render would.
    pub fn set_props(&mut self, props: Props) {
        self.props = props;
    }

    /// Whether teardown has not run yet.
    pub fn is_mounted(&self) -> bool {
        self.instance.mounted.get()
    }

    /// Tear down the instance. Idempotent.
    pub fn unmount(&self) {
        self.instance.teardown();
    }
}

impl<C> Drop for Mounted<C> {
    fn drop(&mut self) {
        self.instance.teardown();
    }
}

impl<C> fmt::Debug for Mounted<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted")
            .field("props", &self.props)
            .field("derived", &*self.instance.state.borrow())
            .field("mounted", &self.instance.mounted.get())
            .finish()
    }
}
