use crate::error::{HandlerError, HandlerFailure, NotifyError};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Future returned by a subscriber handler.
pub type HandlerFuture = LocalBoxFuture<'static, Result<(), HandlerError>>;

/// The keys written by one `set_state` call.
///
/// This is the key set of the update mapping, not a diff: a key written with
/// its previous value is still reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedKeys(Rc<[String]>);

impl ChangedKeys {
    pub(crate) fn new(keys: Vec<String>) -> Self {
        Self(keys.into())
    }

    /// Whether `key` was written.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// The written keys, in update order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of written keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the update wrote no key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A callback registered with [`Store::subscribe`](crate::Store::subscribe).
///
/// Handlers compare by identity: clones of one `Handler` are equal, two
/// handlers built from identical closures are not. That identity is what
/// [`Store::unsubscribe`](crate::Store::unsubscribe) matches on.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&ChangedKeys) -> HandlerFuture>);

impl Handler {
    /// Create a handler whose work may continue asynchronously.
    ///
    /// The closure itself runs synchronously inside `set_state`; the future it
    /// returns is joined with the other subscribers' futures.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ChangedKeys) -> HandlerFuture + 'static,
    {
        Self(Rc::new(f))
    }

    /// Create a handler that completes synchronously.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ChangedKeys) -> Result<(), HandlerError> + 'static,
    {
        Self::new(move |keys| future::ready(f(keys)).boxed_local())
    }

    pub(crate) fn call(&self, keys: &ChangedKeys) -> HandlerFuture {
        (self.0)(keys)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        // Data pointers only; vtable addresses are not stable across codegen units.
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&(Rc::as_ptr(&self.0) as *const ()))
            .finish()
    }
}

/// Completion of one `set_state` notification round.
///
/// Resolves after every handler future has settled. The merge and the
/// synchronous part of each handler have already happened by the time this
/// value exists; dropping it only stops waiting for the continuations.
#[must_use = "dropping Notify stops waiting for subscriber continuations"]
pub struct Notify(LocalBoxFuture<'static, Result<(), NotifyError>>);

impl Notify {
    pub(crate) fn join(pending: Vec<HandlerFuture>) -> Self {
        let total = pending.len();
        Self(
            async move {
                let failures: Vec<HandlerFailure> = future::join_all(pending)
                    .await
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, result)| {
                        result.err().map(|error| HandlerFailure { index, error })
                    })
                    .collect();

                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(NotifyError { failures, total })
                }
            }
            .boxed_local(),
        )
    }
}

impl Future for Notify {
    type Output = Result<(), NotifyError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.poll_unpin(cx)
    }
}

impl fmt::Debug for Notify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notify").finish_non_exhaustive()
    }
}
