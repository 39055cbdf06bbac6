//! Bindings between stores and a component lifecycle.
//!
//! Two adapters are provided:
//! - [`subscribe`] / [`Binding`]: class-style. Wraps a component, listens to
//!   one or more stores, derives props through a mapper and re-renders the
//!   mounted instance, optionally only when filtered keys change.
//! - [`use_store`]: hook-style. Tracks exactly one store's snapshot inside a
//!   function-style consumer.

mod hook;
mod subscribe;

pub use hook::use_store;
pub use subscribe::{
    subscribe, Binding, BoundComponent, KeyFilter, Mounted, StoreList, STATES_KEY,
};
