//! The external node store that holds document bodies.
//!
//! The store is a collaborator: this crate only relies on the four operations of
//! [`NodeStore`]. Durability, sharding, expiry, and retry policy all belong to the
//! implementation. [`MemoryStore`] is a simple implementation suitable for tests and for embedding
//! in a single process.

use crate::error::{Error, Result};
use crate::value::Document;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Opaque identifier of a document held by a [`NodeStore`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_owned())
    }
}

/// Client for the external store that holds node documents.
///
/// All calls may be remote and are expected to block. Implementations should report transport
/// failures through [`Error::Store`].
pub trait NodeStore: Send + Sync {
    /// Store a new document and return the id it was assigned.
    fn create(&self, data: &Document) -> Result<NodeId>;

    /// Fetch a document. A missing document is `Ok(None)`, not an error.
    fn get(&self, id: &NodeId) -> Result<Option<Document>>;

    /// Overwrite the document at `id`.
    fn set(&self, id: &NodeId, data: &Document) -> Result<()>;

    /// Remove the document at `id`. Removing a document that doesn't exist must succeed.
    fn delete(&self, id: &NodeId) -> Result<()>;
}

impl<S: NodeStore + ?Sized> NodeStore for Arc<S> {
    fn create(&self, data: &Document) -> Result<NodeId> {
        (**self).create(data)
    }

    fn get(&self, id: &NodeId) -> Result<Option<Document>> {
        (**self).get(id)
    }

    fn set(&self, id: &NodeId, data: &Document) -> Result<()> {
        (**self).set(id, data)
    }

    fn delete(&self, id: &NodeId) -> Result<()> {
        (**self).delete(id)
    }
}

impl<S: NodeStore + ?Sized> NodeStore for &S {
    fn create(&self, data: &Document) -> Result<NodeId> {
        (**self).create(data)
    }

    fn get(&self, id: &NodeId) -> Result<Option<Document>> {
        (**self).get(id)
    }

    fn set(&self, id: &NodeId, data: &Document) -> Result<()> {
        (**self).set(id, data)
    }

    fn delete(&self, id: &NodeId) -> Result<()> {
        (**self).delete(id)
    }
}

/// In-process node store backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicU64,
    nodes: Mutex<HashMap<NodeId, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held.
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |nodes| nodes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a document is currently held at `id`.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.lock().map_or(false, |nodes| nodes.contains_key(id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<NodeId, Document>>> {
        self.nodes
            .lock()
            .map_err(|_| Error::store("memory node store lock poisoned"))
    }

    fn allocate_id(&self) -> NodeId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        NodeId(URL_SAFE_NO_PAD.encode(n.to_be_bytes()))
    }
}

impl NodeStore for MemoryStore {
    fn create(&self, data: &Document) -> Result<NodeId> {
        let id = self.allocate_id();
        self.lock()?.insert(id.clone(), data.clone());
        Ok(id)
    }

    fn get(&self, id: &NodeId) -> Result<Option<Document>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn set(&self, id: &NodeId, data: &Document) -> Result<()> {
        self.lock()?.insert(id.clone(), data.clone());
        Ok(())
    }

    fn delete(&self, id: &NodeId) -> Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    fn doc(key: &str, val: i64) -> Document {
        let mut doc = Document::new();
        doc.insert(key.into(), Value::Int(val));
        doc
    }

    #[test]
    fn create_get_set_delete() {
        let store = MemoryStore::new();
        let id = store.create(&doc("a", 1)).unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(doc("a", 1)));
        store.set(&id, &doc("a", 2)).unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(doc("a", 2)));
        store.delete(&id).unwrap();
        assert_eq!(store.get(&id).unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let store = MemoryStore::new();
        let a = store.create(&Document::new()).unwrap();
        let b = store.create(&Document::new()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete(&NodeId::from("nope")).unwrap();
    }

    #[test]
    fn shared_through_arc() {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn NodeStore> = store.clone();
        let id = dyn_store.create(&doc("x", 3)).unwrap();
        assert!(store.contains(&id));
    }
}
