//! # Statebind
//!
//! Observable state stores and the bindings that keep components in sync
//! with them.
//!
//! ## Stores
//!
//! - `Store` - owns an immutable `Snapshot` and a list of subscriber handlers
//! - `set_state` merges shallowly, commits, then notifies every handler and
//!   returns a `Notify` future joining their continuations
//! - `unsubscribe` removes one registration at a time
//!
//! ## Bindings
//!
//! - `subscribe` / `Binding` - class-style adapter over one or more stores,
//!   with prop mapping and optional key filtering
//! - `use_store` - hook-style adapter over a single store
//!
//! The rendering framework stays outside the crate; it plugs in through the
//! traits in [`host`]. [`host::headless`] implements them without a UI.

pub mod binding;
pub mod error;
pub mod host;
pub mod store;

// Re-export main types for convenience
pub use binding::{subscribe, use_store, Binding, BoundComponent, KeyFilter, Mounted, StoreList};
pub use error::{BindError, HandlerError, HandlerFailure, NotifyError, Result};
pub use host::headless::{HeadlessHost, HeadlessRoot, HookScope};
pub use host::{Component, HookHost, StateHost};
pub use store::{ChangedKeys, Handler, Notify, Props, Snapshot, Store, Update, WeakStore};

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::{json, Value};

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(json!({ "count": 0 }).as_object().cloned().unwrap_or_default());
        let view = subscribe(|props: &Props| props["states"]["count"].clone(), &store)
            .unwrap()
            .mount(Props::new(), HeadlessHost::new());
        assert_eq!(view.render(), Value::from(0));

        block_on(store.set_state(json!({ "count": 42 }).as_object().cloned().unwrap_or_default()))
            .unwrap();
        assert_eq!(view.render(), Value::from(42));
    }
}
