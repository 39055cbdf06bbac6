use serde_json::{Map, Value};
use std::ops::Index;
use std::rc::Rc;

/// Property bag handed to components and produced by prop mappers.
pub type Props = Map<String, Value>;

static NULL: Value = Value::Null;

/// An immutable view of a store's state at one instant.
///
/// Cloning is cheap: clones share the same underlying map. A store never
/// mutates a snapshot it has handed out; updates produce a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot(Rc<Map<String, Value>>);

impl Snapshot {
    /// Wrap a map as a snapshot.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(Rc::new(map))
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy the snapshot into a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object((*self.0).clone())
    }

    /// Whether both snapshots are the very same committed state.
    pub fn ptr_eq(a: &Snapshot, b: &Snapshot) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Shallow merge: keys of `patch` overwrite keys of `self`.
    pub(crate) fn merged(&self, patch: Map<String, Value>) -> Snapshot {
        let mut next = (*self.0).clone();
        next.extend(patch);
        Snapshot::new(next)
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Snapshot::new(map)
    }
}

impl From<Snapshot> for Value {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.to_value()
    }
}

/// Missing keys index to `Value::Null`, the same way `serde_json::Value` does.
impl Index<&str> for Snapshot {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.0.get(key).unwrap_or(&NULL)
    }
}
