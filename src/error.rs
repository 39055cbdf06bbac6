//! Error types for stores and bindings.

use thiserror::Error;

/// Errors raised while constructing a binding.
///
/// All of these are returned synchronously when the binding is built, never
/// from inside a render pass.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// The binding was built without a target component.
    #[error("subscribe was called without a component")]
    MissingComponent,

    /// The binding was built without any store to subscribe to.
    #[error("subscribe was called without stores to subscribe to")]
    MissingStore,

    /// `use_store` was called without a store.
    #[error("use_store was called without a store")]
    MissingStateArgument,
}

/// Failure reported by a single subscriber handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("subscriber failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Build a handler error from anything printable.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// A handler failure together with the subscriber's position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Index of the handler in subscription order at notification time.
    pub index: usize,
    /// What the handler reported.
    pub error: HandlerError,
}

/// Aggregate failure of one `set_state` notification round.
///
/// Produced only after every handler future of the round has settled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} of {total} subscribers failed", .failures.len())]
pub struct NotifyError {
    /// Every failed handler, in subscription order.
    pub failures: Vec<HandlerFailure>,
    /// Number of handlers notified in the round.
    pub total: usize,
}

/// Result type for binding construction.
pub type Result<T, E = BindError> = std::result::Result<T, E>;
