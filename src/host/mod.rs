//! Capabilities a rendering framework provides to the bindings.
//!
//! The bindings never render anything themselves. A class-style host drives a
//! [`Mounted`](crate::binding::Mounted) instance through [`StateHost`]; a
//! function-style host runs [`use_store`](crate::use_store) through
//! [`HookHost`]. [`headless`] implements both without any UI.

pub mod headless;

use crate::store::{Props, Snapshot};
use std::rc::Rc;

/// A consumer rendered from its merged props.
pub trait Component {
    type Output;

    fn render(&self, props: &Props) -> Self::Output;
}

impl<F, O> Component for F
where
    F: Fn(&Props) -> O,
{
    type Output = O;

    fn render(&self, props: &Props) -> O {
        self(props)
    }
}

/// Called by the host once a scheduled render has committed.
pub type RenderDone = Box<dyn FnOnce()>;

/// Imperative state replacement for class-style instances.
pub trait StateHost {
    /// The instance's local state has been replaced by `state`; schedule a
    /// re-render and invoke `done` once it has committed.
    ///
    /// Dropping `done` without calling it tells the binding the instance was
    /// discarded; the pending notification then resolves anyway.
    fn replace_state(&self, state: &Props, done: RenderDone);
}

/// Teardown callback returned by an effect.
pub type Cleanup = Box<dyn FnOnce()>;

/// Setter for a hook's local value. Calling it schedules a re-render.
pub type SetSnapshot = Rc<dyn Fn(Snapshot)>;

/// Declarative hooks for function-style consumers.
///
/// Hooks are identified by call order within one render, as usual.
pub trait HookHost {
    /// Local state slot. `init` runs on the first evaluation of the mount
    /// only; later renders return the slot's current value.
    fn use_state(&self, init: Box<dyn FnOnce() -> Snapshot>) -> (Snapshot, SetSnapshot);

    /// Effect with an empty dependency set: runs once after the first render
    /// commits, and its cleanup runs when the consumer is torn down.
    fn use_mount_effect(&self, effect: Box<dyn FnOnce() -> Cleanup>);
}
