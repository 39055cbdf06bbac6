//! Observable state stores.
//!
//! A [`Store`] owns an immutable [`Snapshot`] and a list of [`Handler`]s.
//! Updates merge shallowly into a fresh snapshot, commit it, and fan out to
//! every handler; the returned [`Notify`] future joins their continuations.

mod handler;
mod snapshot;
mod store;

pub use handler::{ChangedKeys, Handler, HandlerFuture, Notify};
pub use snapshot::{Props, Snapshot};
pub use store::{Store, Update, WeakStore};
