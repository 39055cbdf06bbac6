use crate::error::{BindError, Result};
use crate::host::{Cleanup, HookHost};
use crate::store::{Handler, Snapshot, Store};

/// Track one store's snapshot inside a function-style consumer.
///
/// The first evaluation seeds a local value from [`Store::get_state`]. A
/// mount effect then subscribes a handler that replaces the value with the
/// latest snapshot on every notification, with no key filtering; the effect's
/// cleanup unsubscribes it. A missing store is rejected immediately with
/// [`BindError::MissingStateArgument`].
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use serde_json::json;
/// use statebind::{use_store, HeadlessRoot, Store};
///
/// let store = Store::new(json!({ "fake": "value" }).as_object().cloned().unwrap());
/// let root = HeadlessRoot::mount({
///     let store = store.clone();
///     move |scope| use_store(scope, &store).map(|s| s["fake"].clone()).ok()
/// });
/// assert_eq!(root.output(), Some(Some(json!("value"))));
///
/// block_on(store.set_state(json!({ "fake": "new" }).as_object().cloned().unwrap())).unwrap();
/// root.flush();
/// assert_eq!(root.output(), Some(Some(json!("new"))));
/// ```
pub fn use_store<'a, H>(host: &H, store: impl Into<Option<&'a Store>>) -> Result<Snapshot>
where
    H: HookHost + ?Sized,
{
    let store = store.into().ok_or(BindError::MissingStateArgument)?;

    let (value, set_value) = host.use_state(Box::new({
        let store = store.clone();
        move || store.get_state()
    }));

    let store = store.clone();
    let seen = value.clone();
    host.use_mount_effect(Box::new(move || -> Cleanup {
        let handler = Handler::from_fn({
            let store = store.downgrade();
            let set_value = set_value.clone();
            move |_changed| {
                if let Some(store) = store.upgrade() {
                    set_value(store.get_state());
                }
                Ok(())
            }
        });
        store.subscribe(&handler);
        tracing::trace!(store = store.name().unwrap_or("<anonymous>"), "use_store subscribed");

        // An update may have landed between the first render and this effect.
        let current = store.get_state();
        if !Snapshot::ptr_eq(&current, &seen) {
            set_value(current);
        }

        Box::new(move || {
            store.unsubscribe(&handler);
        })
    }));

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::headless::{HeadlessRoot, HookScope};
    use futures::executor::block_on;
    use serde_json::{json, Map, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn missing_store_is_rejected_at_call_time() {
        let root = HeadlessRoot::mount(|scope: &HookScope| use_store(scope, None).err());
        assert_eq!(root.output(), Some(Some(BindError::MissingStateArgument)));
    }

    #[test]
    fn subscribes_once_per_mount() {
        let store = Store::new(map(json!({ "fake": "value" })));
        let root = HeadlessRoot::mount({
            let store = store.clone();
            move |scope: &HookScope| {
                let state = use_store(scope, &store).unwrap_or_default();
                state["fake"].clone()
            }
        });
        assert_eq!(store.subscriber_count(), 1);

        for value in ["a", "b", "c"] {
            block_on(store.set_state(map(json!({ "fake": value })))).unwrap();
            assert!(root.flush());
        }

        assert_eq!(store.subscriber_count(), 1);
        assert_eq!(root.renders(), 4);
        assert_eq!(root.output(), Some(json!("c")));
    }

    #[test]
    fn every_notification_replaces_value() {
        let store = Store::new(map(json!({ "a": 1, "b": 1 })));
        let renders = Rc::new(Cell::new(0));
        let root = HeadlessRoot::mount({
            let store = store.clone();
            let renders = renders.clone();
            move |scope: &HookScope| {
                renders.set(renders.get() + 1);
                use_store(scope, &store).map(|s| s.to_value()).ok()
            }
        });

        block_on(store.set_state(map(json!({ "b": 2 })))).unwrap();
        root.flush();

        assert_eq!(renders.get(), 2);
        assert_eq!(root.output(), Some(Some(json!({ "a": 1, "b": 2 }))));
    }

    #[test]
    fn unmount_unsubscribes_and_ignores_later_updates() {
        let store = Store::new(map(json!({ "fake": "value" })));
        let root = HeadlessRoot::mount({
            let store = store.clone();
            move |scope: &HookScope| use_store(scope, &store).is_ok()
        });

        root.unmount();
        assert_eq!(store.subscriber_count(), 0);

        block_on(store.set_state(map(json!({ "fake": "later" })))).unwrap();
        assert!(!root.flush());
        assert_eq!(root.renders(), 1);
        assert_eq!(root.output(), None);
    }
}
