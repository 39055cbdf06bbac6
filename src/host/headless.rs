//! A host without a UI.
//!
//! [`HeadlessHost`] serves class-style bindings and [`HeadlessRoot`] runs a
//! function-style consumer with hook support. Both count renders so callers
//! can observe exactly when a binding decided to re-render.

use super::{Cleanup, HookHost, RenderDone, SetSnapshot, StateHost};
use crate::store::{Props, Snapshot};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct HostInner {
    deferred: bool,
    renders: Cell<usize>,
    last_state: RefCell<Option<Props>>,
    pending: RefCell<Vec<RenderDone>>,
}

/// Class-style host that records state replacements.
///
/// By default every scheduled render commits immediately. A
/// [`deferred`](HeadlessHost::deferred) host holds completions until
/// [`flush`](HeadlessHost::flush) so callers can observe in-flight renders.
/// Clones share the same counters.
#[derive(Clone, Default)]
pub struct HeadlessHost {
    inner: Rc<HostInner>,
}

impl HeadlessHost {
    /// A host that commits every render immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose renders commit only on [`flush`](HeadlessHost::flush).
    pub fn deferred() -> Self {
        Self {
            inner: Rc::new(HostInner {
                deferred: true,
                ..HostInner::default()
            }),
        }
    }

    /// Re-renders scheduled so far. The initial mount is not counted.
    pub fn renders(&self) -> usize {
        self.inner.renders.get()
    }

    /// The state passed with the most recent re-render.
    pub fn last_state(&self) -> Option<Props> {
        self.inner.last_state.borrow().clone()
    }

    /// Renders scheduled but not yet committed.
    pub fn pending(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Commit every pending render. Returns how many were committed.
    pub fn flush(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        let count = pending.len();
        for done in pending {
            done();
        }
        count
    }

    /// Drop every pending render without committing it, as a host does when
    /// the instance is discarded mid-render.
    pub fn discard(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        pending.len()
    }
}

impl StateHost for HeadlessHost {
    fn replace_state(&self, state: &Props, done: RenderDone) {
        self.inner.renders.set(self.inner.renders.get() + 1);
        *self.inner.last_state.borrow_mut() = Some(state.clone());
        if self.inner.deferred {
            self.inner.pending.borrow_mut().push(done);
        } else {
            done();
        }
    }
}

struct ScopeInner {
    slots: RefCell<Vec<Rc<RefCell<Snapshot>>>>,
    cursor: Cell<usize>,
    first_render: Cell<bool>,
    effects: RefCell<Vec<Box<dyn FnOnce() -> Cleanup>>>,
    cleanups: RefCell<Vec<Cleanup>>,
    mounted: Cell<bool>,
    dirty: Cell<bool>,
}

/// Hook context handed to a function-style consumer on every render.
pub struct HookScope {
    inner: Rc<ScopeInner>,
}

impl HookHost for HookScope {
    fn use_state(&self, init: Box<dyn FnOnce() -> Snapshot>) -> (Snapshot, SetSnapshot) {
        let index = self.inner.cursor.get();
        self.inner.cursor.set(index + 1);

        let existing = self.inner.slots.borrow().get(index).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = Rc::new(RefCell::new(init()));
                self.inner.slots.borrow_mut().push(slot.clone());
                slot
            }
        };

        let value = slot.borrow().clone();
        let scope = Rc::downgrade(&self.inner);
        let set: SetSnapshot = Rc::new(move |next| {
            let Some(scope) = scope.upgrade() else {
                return;
            };
            if !scope.mounted.get() {
                return;
            }
            *slot.borrow_mut() = next;
            scope.dirty.set(true);
        });
        (value, set)
    }

    fn use_mount_effect(&self, effect: Box<dyn FnOnce() -> Cleanup>) {
        if self.inner.first_render.get() {
            self.inner.effects.borrow_mut().push(effect);
        }
    }
}

/// A mounted function-style consumer.
///
/// Setting a hook's value marks the root dirty; [`flush`](HeadlessRoot::flush)
/// performs the scheduled re-render. Dropping the root unmounts it.
pub struct HeadlessRoot<O> {
    scope: HookScope,
    component: Box<dyn Fn(&HookScope) -> O>,
    output: RefCell<Option<O>>,
    renders: Cell<usize>,
}

impl<O> HeadlessRoot<O> {
    /// Render `component` once, then run its mount effects.
    pub fn mount<F>(component: F) -> Self
    where
        F: Fn(&HookScope) -> O + 'static,
    {
        let root = Self {
            scope: HookScope {
                inner: Rc::new(ScopeInner {
                    slots: RefCell::new(Vec::new()),
                    cursor: Cell::new(0),
                    first_render: Cell::new(true),
                    effects: RefCell::new(Vec::new()),
                    cleanups: RefCell::new(Vec::new()),
                    mounted: Cell::new(true),
                    dirty: Cell::new(false),
                }),
            },
            component: Box::new(component),
            output: RefCell::new(None),
            renders: Cell::new(0),
        };

        root.render();
        root.scope.inner.first_render.set(false);

        let effects = std::mem::take(&mut *root.scope.inner.effects.borrow_mut());
        for effect in effects {
            let cleanup = effect();
            root.scope.inner.cleanups.borrow_mut().push(cleanup);
        }
        root.flush();
        root
    }

    fn render(&self) {
        let inner = &self.scope.inner;
        inner.cursor.set(0);
        inner.dirty.set(false);
        let output = (self.component)(&self.scope);
        *self.output.borrow_mut() = Some(output);
        self.renders.set(self.renders.get() + 1);
    }

    /// Re-render if a hook value changed since the last render.
    pub fn flush(&self) -> bool {
        let inner = &self.scope.inner;
        if inner.mounted.get() && inner.dirty.get() {
            self.render();
            true
        } else {
            false
        }
    }

    /// Number of renders including the first one.
    pub fn renders(&self) -> usize {
        self.renders.get()
    }

    /// Whether [`unmount`](HeadlessRoot::unmount) has not run yet.
    pub fn is_mounted(&self) -> bool {
        self.scope.inner.mounted.get()
    }

    /// Latest render output; `None` once unmounted.
    pub fn output(&self) -> Option<O>
    where
        O: Clone,
    {
        self.output.borrow().clone()
    }

    /// Run effect cleanups in reverse registration order and clear the output.
    pub fn unmount(&self) {
        let inner = &self.scope.inner;
        if !inner.mounted.replace(false) {
            return;
        }
        let cleanups = std::mem::take(&mut *inner.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        *self.output.borrow_mut() = None;
    }
}

impl<O> Drop for HeadlessRoot<O> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn immediate_host_commits_at_once() {
        let host = HeadlessHost::new();
        let committed = Rc::new(Cell::new(false));

        host.replace_state(&Map::new(), {
            let committed = committed.clone();
            Box::new(move || committed.set(true))
        });

        assert!(committed.get());
        assert_eq!(host.renders(), 1);
        assert_eq!(host.pending(), 0);
    }

    #[test]
    fn deferred_host_waits_for_flush() {
        let host = HeadlessHost::deferred();
        let committed = Rc::new(Cell::new(0));

        for _ in 0..2 {
            let committed = committed.clone();
            host.replace_state(&Map::new(), Box::new(move || committed.set(committed.get() + 1)));
        }

        assert_eq!(committed.get(), 0);
        assert_eq!(host.flush(), 2);
        assert_eq!(committed.get(), 2);
    }

    #[test]
    fn root_keeps_hook_state_between_renders() {
        let setter: Rc<RefCell<Option<SetSnapshot>>> = Rc::new(RefCell::new(None));
        let root = HeadlessRoot::mount({
            let setter = setter.clone();
            move |scope: &HookScope| {
                let (value, set) = scope.use_state(Box::new(Snapshot::default));
                *setter.borrow_mut() = Some(set);
                value.to_value()
            }
        });

        assert_eq!(root.output(), Some(json!({})));
        assert!(!root.flush());

        let mut next = Map::new();
        next.insert("a".into(), json!(1));
        if let Some(set) = setter.borrow().as_ref() {
            set(Snapshot::new(next));
        }

        assert!(root.flush());
        assert_eq!(root.renders(), 2);
        assert_eq!(root.output(), Some(json!({ "a": 1 })));
    }

    #[test]
    fn mount_effect_runs_once_and_cleans_up() {
        let runs = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(0));

        let root = HeadlessRoot::mount({
            let runs = runs.clone();
            let cleaned = cleaned.clone();
            move |scope: &HookScope| {
                let runs = runs.clone();
                let cleaned = cleaned.clone();
                scope.use_mount_effect(Box::new(move || {
                    runs.set(runs.get() + 1);
                    Box::new(move || cleaned.set(cleaned.get() + 1))
                }));
            }
        });

        assert_eq!(runs.get(), 1);
        root.unmount();
        root.unmount();
        drop(root);
        assert_eq!(cleaned.get(), 1);
    }
}
