//! Record fields that persist a pointer to an externally stored document.
//!
//! A [`NodeField`] is the codec between the bytes a record keeps in its own storage and the
//! [`NodeData`] the record works with. Only a small pointer record, `{"node_id": <id>}`, is
//! written to the record itself. The document body lives in a [`NodeStore`].
//!
//! The owning record system drives three hooks:
//!
//! - [`NodeField::decode`] when a record is loaded,
//! - [`NodeField::encode`] just before a record is saved,
//! - [`NodeField::on_delete`] after a record has been deleted.

use crate::canonical::Canonicalize;
use crate::compress::{decompress, Compress};
use crate::decode::decode_document;
use crate::encode::encode_document;
use crate::error::Result;
use crate::node_data::{bind_body, Bound, NodeData, NodeState};
use crate::store::{NodeId, NodeStore};
use crate::value::{Document, Value};
use crate::MAX_DOC_SIZE;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Key of the pointer record holding the node id.
pub const NODE_ID_KEY: &str = "node_id";

/// Derives a reference token from the record that owns a node.
pub type RefFunc<R> = Box<dyn Fn(&R) -> Option<Value> + Send + Sync>;

/// Plain settings of a node field, loadable from any serde-supported configuration format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Educe)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct FieldOptions {
    /// Save an empty node that was never stored as a null column instead of storing an empty
    /// document.
    pub allow_null: bool,
    /// Fail with [`NodeUnpopulated`][crate::Error::NodeUnpopulated] when a stored node's body is
    /// read before being bound, instead of warning and fetching it.
    pub strict: bool,
    /// Compression used for the persisted pointer record.
    pub compress: Compress,
    /// Reference version this field considers current.
    pub ref_version: Option<Value>,
    /// Largest decompressed column value accepted on decode.
    #[educe(Default = MAX_DOC_SIZE)]
    pub max_size: usize,
}

/// A value read from the record's column for this field.
#[derive(Clone, Debug, PartialEq)]
pub enum Persisted<'a> {
    /// The column was null.
    Null,
    /// Raw column bytes, as produced by [`NodeField::encode`].
    Bytes(&'a [u8]),
    /// An already-decoded pointer record, or a legacy inline body.
    Record(Document),
}

impl<'a> From<Option<&'a [u8]>> for Persisted<'a> {
    fn from(val: Option<&'a [u8]>) -> Self {
        val.map_or(Persisted::Null, Persisted::Bytes)
    }
}

impl<'a> From<&'a [u8]> for Persisted<'a> {
    fn from(val: &'a [u8]) -> Self {
        Persisted::Bytes(val)
    }
}

impl From<Document> for Persisted<'_> {
    fn from(val: Document) -> Self {
        Persisted::Record(val)
    }
}

pub(crate) struct FieldInner<R> {
    pub(crate) store: Arc<dyn NodeStore>,
    pub(crate) options: FieldOptions,
    pub(crate) wrapper: Option<Arc<dyn Canonicalize>>,
    ref_func: Option<RefFunc<R>>,
}

impl<R> FieldInner<R> {
    pub(crate) fn canonicalize(&self, data: Document) -> Document {
        match self.wrapper.as_ref() {
            Some(wrapper) => wrapper.canonicalize(data),
            None => data,
        }
    }

    pub(crate) fn flatten(&self, data: Document) -> Document {
        match self.wrapper.as_ref() {
            Some(wrapper) => wrapper.flatten(data),
            None => data,
        }
    }

    pub(crate) fn reference_for(&self, record: &R) -> Option<Value> {
        self.ref_func.as_ref().and_then(|f| f(record))
    }
}

/// Builder for a [`NodeField`].
pub struct NodeFieldBuilder<R> {
    store: Arc<dyn NodeStore>,
    options: FieldOptions,
    wrapper: Option<Arc<dyn Canonicalize>>,
    ref_func: Option<RefFunc<R>>,
}

impl<R> NodeFieldBuilder<R> {
    /// Replace all plain settings at once.
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    pub fn allow_null(mut self, allow_null: bool) -> Self {
        self.options.allow_null = allow_null;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn compress(mut self, compress: Compress) -> Self {
        self.options.compress = compress;
        self
    }

    /// Set the function deriving a reference token from the owning record, along with the
    /// reference version tokens are produced under.
    pub fn reference<F>(mut self, version: impl Into<Value>, ref_func: F) -> Self
    where
        F: Fn(&R) -> Option<Value> + Send + Sync + 'static,
    {
        self.options.ref_version = Some(version.into());
        self.ref_func = Some(Box::new(ref_func));
        self
    }

    /// Set the canonicalizer applied to every body this field loads or creates.
    pub fn wrapper(mut self, wrapper: impl Canonicalize + 'static) -> Self {
        self.wrapper = Some(Arc::new(wrapper));
        self
    }

    pub fn build(self) -> NodeField<R> {
        NodeField {
            inner: Arc::new(FieldInner {
                store: self.store,
                options: self.options,
                wrapper: self.wrapper,
                ref_func: self.ref_func,
            }),
        }
    }
}

/// Codec between a record's persisted column and the [`NodeData`] for it.
///
/// `R` is the type of the owning record, used only to derive reference tokens. Cloning a field
/// is cheap and clones share their configuration.
pub struct NodeField<R> {
    inner: Arc<FieldInner<R>>,
}

impl<R> Clone for NodeField<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for NodeField<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeField")
            .field("options", &self.inner.options)
            .field("wrapper", &self.inner.wrapper.is_some())
            .field("ref_func", &self.inner.ref_func.is_some())
            .finish()
    }
}

impl<R> NodeField<R> {
    /// Start building a field that keeps its documents in `store`.
    pub fn builder(store: impl NodeStore + 'static) -> NodeFieldBuilder<R> {
        NodeFieldBuilder {
            store: Arc::new(store),
            options: FieldOptions::default(),
            wrapper: None,
            ref_func: None,
        }
    }

    /// A field with default settings.
    pub fn new(store: impl NodeStore + 'static) -> Self {
        Self::builder(store).build()
    }

    pub fn options(&self) -> &FieldOptions {
        &self.inner.options
    }

    /// The store documents are kept in.
    pub fn store(&self) -> &dyn NodeStore {
        self.inner.store.as_ref()
    }

    /// A node with no id and no body, for a new record.
    pub fn empty(&self) -> NodeData<R> {
        NodeData::unbound(Arc::clone(&self.inner), None)
    }

    /// A node pointing at an already-stored document. The body isn't fetched.
    pub fn from_id(&self, id: NodeId) -> NodeData<R> {
        NodeData::unbound(Arc::clone(&self.inner), Some(id))
    }

    /// A new, unsaved node holding `data`. Reserved reference keys in `data` are dropped.
    pub fn from_document(&self, data: Document) -> NodeData<R> {
        let mut node = self.empty();
        node.set_data(data);
        node
    }

    /// Turn a persisted column value into a node.
    ///
    /// This never fails: a column that can't be decoded is logged and treated as an empty
    /// document, so that a damaged pointer can't make the record unreadable. A decoded map with a
    /// `node_id` is a pointer to a stored document, and the body is left unfetched. Any other
    /// decoded map is an inline body from before documents were moved to the node store.
    pub fn decode<'a>(&self, value: impl Into<Persisted<'a>>) -> NodeData<R> {
        let record = match value.into() {
            Persisted::Null => return self.empty(),
            Persisted::Bytes([]) => return self.empty(),
            Persisted::Bytes(bytes) => match self.unpack(bytes) {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, len = bytes.len(), "failed to decode node field, treating it as empty");
                    return self.empty();
                }
            },
            Persisted::Record(record) => record,
        };
        self.from_record(record)
    }

    fn unpack(&self, bytes: &[u8]) -> Result<Document> {
        let raw = decompress(bytes, self.inner.options.max_size)?;
        decode_document(&raw)
    }

    fn from_record(&self, mut record: Document) -> NodeData<R> {
        match record.remove(NODE_ID_KEY) {
            Some(Value::Str(id)) => self.from_id(NodeId::from(id)),
            Some(Value::Int(id)) => self.from_id(NodeId::from(id.to_string())),
            Some(Value::Null) => self.empty(),
            Some(other) => {
                error!(kind = other.kind(), "node_id has an unusable type, treating node field as empty");
                self.empty()
            }
            None => match bind_body(&self.inner, None, record, None) {
                Ok(bound) => NodeData::with_bound(Arc::clone(&self.inner), None, bound),
                Err(e) => {
                    error!(error = %e, "failed to bind inline node body, treating it as empty");
                    self.empty()
                }
            },
        }
    }

    /// Write the node's body to the store and produce the column value to persist for `record`.
    ///
    /// A node without an id gets one from [`NodeStore::create`], and later saves go through
    /// [`NodeStore::set`]. Returns `None` when the field allows nulls and the node was never
    /// stored and has nothing in it.
    pub fn encode(&self, node: &mut NodeData<R>, record: &R) -> Result<Option<Vec<u8>>> {
        let has_content = node.bound.get().map_or(false, |b| !b.data.is_empty());
        if self.inner.options.allow_null && node.id.is_none() && !has_content {
            return Ok(None);
        }

        let reference = self.inner.reference_for(record).filter(|v| !v.is_null());
        let data = node.persist_body(reference.as_ref())?;
        let id = match node.id.as_ref() {
            Some(id) => {
                self.inner.store.set(id, &data)?;
                id.clone()
            }
            None => {
                let id = self.inner.store.create(&data)?;
                debug!(node_id = %id, "created node");
                node.id = Some(id.clone());
                id
            }
        };
        node.record_reference(reference);

        let mut pointer = Document::new();
        pointer.insert(NODE_ID_KEY.into(), Value::Str(id.into_string()));
        self.inner
            .options
            .compress
            .compress(&encode_document(&pointer))
            .map(Some)
    }

    /// Remove the node's document from the store after its record was deleted. Nodes that were
    /// never stored are skipped.
    pub fn on_delete(&self, node: &NodeData<R>) -> Result<()> {
        let Some(id) = node.id() else {
            return Ok(());
        };
        debug!(node_id = %id, "deleting node");
        self.inner.store.delete(id)
    }

    /// Rebuild a node from a snapshot taken with [`NodeData::snapshot`].
    pub fn restore(&self, state: NodeState) -> NodeData<R> {
        let Some(data) = state.data else {
            return NodeData::unbound(Arc::clone(&self.inner), state.id);
        };
        let data = if state.canonical {
            self.inner.canonicalize(data)
        } else {
            data
        };
        let bound = Bound {
            data,
            reference: state.reference,
            reference_version: state.reference_version,
        };
        NodeData::with_bound(Arc::clone(&self.inner), state.id, bound)
    }

    /// Fetch and bind the body of a stored node, checking it against `expected`. This is the
    /// loader path that avoids an unpopulated access.
    pub fn populate(&self, node: &mut NodeData<R>, expected: Option<Value>) -> Result<()> {
        let data = match node.id.as_ref() {
            Some(id) => self.inner.store.get(id)?.unwrap_or_default(),
            None => Document::new(),
        };
        let bound = bind_body(&self.inner, node.id.as_ref(), data, expected)?;
        node.bound = std::cell::OnceCell::from(bound);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::canonical::CanonicalKeys;
    use crate::error::Error;
    use crate::node_data::{REF_KEY, REF_VERSION_KEY};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper counting every call.
    #[derive(Default)]
    struct Counting {
        inner: MemoryStore,
        creates: AtomicUsize,
        gets: AtomicUsize,
        sets: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl NodeStore for Counting {
        fn create(&self, data: &Document) -> Result<NodeId> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(data)
        }
        fn get(&self, id: &NodeId) -> Result<Option<Document>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(id)
        }
        fn set(&self, id: &NodeId, data: &Document) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(id, data)
        }
        fn delete(&self, id: &NodeId) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id)
        }
    }

    struct Event {
        id: u64,
    }

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting::default())
    }

    #[test]
    fn roundtrip() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let body = doc(&[
            ("message", Value::from("hello")),
            ("tags", Value::from(vec![Value::from("a"), Value::from("b")])),
            ("nested", Value::Map(doc(&[("x", Value::F64(0.5))]))),
        ]);
        let mut node = field.from_document(body.clone());
        let bytes = field.encode(&mut node, &Event { id: 1 }).unwrap().unwrap();

        let loaded = field.decode(bytes.as_slice());
        assert_eq!(loaded.id(), node.id());
        assert!(!loaded.is_bound());
        assert_eq!(loaded.data().unwrap(), &body);
    }

    #[test]
    fn create_then_set() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let mut node = field.empty();
        node.insert("a", 1).unwrap();
        let first = field.encode(&mut node, &Event { id: 1 }).unwrap();
        let id = node.id().cloned().unwrap();
        node.insert("a", 2).unwrap();
        let second = field.encode(&mut node, &Event { id: 1 }).unwrap();
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(node.id(), Some(&id));
        assert_eq!(first, second);
        assert_eq!(
            store.get(&id).unwrap().unwrap().get("a"),
            Some(&Value::Int(2))
        );
    }

    #[test]
    fn allow_null_skips_store() {
        let store = counting();
        let field: NodeField<Event> = NodeField::builder(store.clone()).allow_null(true).build();
        let mut node = field.empty();
        assert_eq!(field.encode(&mut node, &Event { id: 1 }).unwrap(), None);
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
        assert!(node.id().is_none());

        node.insert("a", 1).unwrap();
        assert!(field.encode(&mut node, &Event { id: 1 }).unwrap().is_some());
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn without_allow_null_empty_is_stored() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let mut node = field.empty();
        assert!(field.encode(&mut node, &Event { id: 1 }).unwrap().is_some());
        assert_eq!(store.creates.load(Ordering::SeqCst), 1);
        assert!(node.id().is_some());
    }

    #[test]
    fn delete_propagation() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let never_saved = field.empty();
        field.on_delete(&never_saved).unwrap();
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);

        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        field.encode(&mut node, &Event { id: 1 }).unwrap();
        let id = node.id().cloned().unwrap();
        field.on_delete(&node).unwrap();
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
        assert!(!store.inner.contains(&id));
    }

    #[test]
    fn corrupted_bytes_are_empty() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        for bytes in [
            &[0xffu8, 0x00, 0x13][..],
            &[0x00, 0xc1][..],
            &[0x01, 0x28, 0xb5, 0x2f, 0xfd, 0x00][..],
            &[0x00, 0x05][..],
        ] {
            let node = field.decode(bytes);
            assert!(node.id().is_none());
            assert!(node.is_empty().unwrap());
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn legacy_inline_body() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let body = doc(&[("message", Value::from("inline"))]);
        let bytes = Compress::None.compress(&encode_document(&body)).unwrap();
        let node = field.decode(bytes.as_slice());
        assert!(node.is_bound());
        assert!(node.id().is_none());
        assert_eq!(node.data().unwrap(), &body);
    }

    #[test]
    fn legacy_inline_body_drops_reserved_keys() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let body = doc(&[
            ("a", Value::Int(1)),
            (REF_KEY, Value::from("r1")),
            (REF_VERSION_KEY, Value::Int(1)),
        ]);
        let bytes = Compress::None.compress(&encode_document(&body)).unwrap();
        let mut node = field.decode(bytes.as_slice());
        assert_eq!(node.keys().unwrap().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(node.reference(), Some(&Value::from("r1")));
        assert_eq!(node.reference_version(), Some(&Value::Int(1)));

        field.encode(&mut node, &Event { id: 1 }).unwrap();
        let stored = store.inner.get(node.id().unwrap()).unwrap().unwrap();
        assert_eq!(stored, doc(&[("a", Value::Int(1))]));
    }

    #[test]
    fn decoded_record() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let node = field.decode(doc(&[(NODE_ID_KEY, Value::from("abc"))]));
        assert_eq!(node.id(), Some(&NodeId::from("abc")));
        assert!(!node.is_bound());
        let node = field.decode(doc(&[(NODE_ID_KEY, Value::Int(42))]));
        assert_eq!(node.id(), Some(&NodeId::from("42")));
        let node = field.decode(Persisted::Null);
        assert!(node.id().is_none());
        let node = field.decode(None::<&[u8]>);
        assert!(node.id().is_none());
    }

    #[test]
    fn references_are_written_but_hidden() {
        let store = counting();
        let field: NodeField<Event> = NodeField::builder(store.clone())
            .reference(2, |e: &Event| Some(Value::Int(e.id as i64)))
            .build();
        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        field.encode(&mut node, &Event { id: 77 }).unwrap();
        let id = node.id().cloned().unwrap();

        let stored = store.inner.get(&id).unwrap().unwrap();
        assert_eq!(stored.get(REF_KEY), Some(&Value::Int(77)));
        assert_eq!(stored.get(REF_VERSION_KEY), Some(&Value::Int(2)));
        assert!(!node.contains_key(REF_KEY).unwrap());
        assert_eq!(node.reference(), Some(&Value::Int(77)));

        let mut loaded = field.from_id(id.clone());
        field.populate(&mut loaded, Some(Value::Int(77))).unwrap();
        assert_eq!(loaded.keys().unwrap().count(), 1);

        let mut stale = field.from_id(id);
        let err = field.populate(&mut stale, Some(Value::Int(78))).unwrap_err();
        assert!(matches!(err, Error::NodeIntegrityFailure { .. }));
        assert!(!stale.is_bound());
    }

    #[test]
    fn failed_save_keeps_previous_reference() {
        struct RejectWrites(MemoryStore);
        impl NodeStore for RejectWrites {
            fn create(&self, _: &Document) -> Result<NodeId> {
                Err(Error::store("read-only store"))
            }
            fn get(&self, id: &NodeId) -> Result<Option<Document>> {
                self.0.get(id)
            }
            fn set(&self, _: &NodeId, _: &Document) -> Result<()> {
                Err(Error::store("read-only store"))
            }
            fn delete(&self, id: &NodeId) -> Result<()> {
                self.0.delete(id)
            }
        }

        let field: NodeField<Event> = NodeField::builder(RejectWrites(MemoryStore::new()))
            .reference(1, |e: &Event| Some(Value::Int(e.id as i64)))
            .build();
        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        assert!(field.encode(&mut node, &Event { id: 9 }).is_err());
        assert_eq!(node.reference(), None);
        assert_eq!(node.reference_version(), None);
        assert!(!node.contains_key(REF_KEY).unwrap());

        let mut stored = field.empty();
        let body = doc(&[(REF_KEY, Value::Int(3)), (REF_VERSION_KEY, Value::Int(1))]);
        stored.bind(body, None).unwrap();
        stored.id = Some(NodeId::from("existing"));
        assert!(field.encode(&mut stored, &Event { id: 4 }).is_err());
        assert_eq!(stored.reference(), Some(&Value::Int(3)));
    }

    #[test]
    fn no_ref_func_means_no_reserved_keys() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        field.encode(&mut node, &Event { id: 5 }).unwrap();
        let stored = store.inner.get(node.id().unwrap()).unwrap().unwrap();
        assert_eq!(stored, doc(&[("a", Value::Int(1))]));
    }

    struct Tagging;

    impl Canonicalize for Tagging {
        fn canonicalize(&self, mut data: Document) -> Document {
            data.insert("canonical".into(), Value::Bool(true));
            data
        }
        fn flatten(&self, mut data: Document) -> Document {
            data.remove("canonical");
            data
        }
    }

    #[test]
    fn store_sees_flattened_bodies() {
        let store = counting();
        let field: NodeField<Event> = NodeField::builder(store.clone()).wrapper(Tagging).build();
        let mut node = field.empty();
        assert!(node.contains_key("canonical").unwrap());
        node.insert("a", 1).unwrap();
        field.encode(&mut node, &Event { id: 1 }).unwrap();
        let stored = store.inner.get(node.id().unwrap()).unwrap().unwrap();
        assert_eq!(stored, doc(&[("a", Value::Int(1))]));

        let mut loaded = field.from_id(node.id().cloned().unwrap());
        field.populate(&mut loaded, None).unwrap();
        assert!(loaded.contains_key("canonical").unwrap());
    }

    #[test]
    fn wrapper_applies_to_inline_bodies() {
        let store = counting();
        let keys = CanonicalKeys::new().alias("msg", "message");
        let field: NodeField<Event> = NodeField::builder(store.clone()).wrapper(keys).build();
        let node = field.decode(doc(&[("msg", Value::from("hi"))]));
        assert_eq!(node.get("message").unwrap(), Some(&Value::from("hi")));
    }

    #[test]
    fn snapshot_restore() {
        let store = counting();
        let field: NodeField<Event> = NodeField::builder(store.clone()).wrapper(Tagging).build();
        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        field.encode(&mut node, &Event { id: 1 }).unwrap();

        let state = node.snapshot();
        assert!(state.canonical);
        assert_eq!(state.data, Some(doc(&[("a", Value::Int(1))])));

        let json = serde_json::to_string(&state).unwrap();
        let state: NodeState = serde_json::from_str(&json).unwrap();
        let restored = field.restore(state);
        assert!(restored.same_node(&node));
        assert_eq!(restored.data().unwrap(), node.data().unwrap());
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshot_of_unbound_node() {
        let store = counting();
        let field: NodeField<Event> = NodeField::new(store.clone());
        let node = field.from_id(NodeId::from("abc"));
        let restored = field.restore(node.snapshot());
        assert!(!restored.is_bound());
        assert_eq!(restored.id(), Some(&NodeId::from("abc")));
    }

    #[test]
    fn options_from_config() {
        let options: FieldOptions =
            serde_json::from_str(r#"{"allow_null": true, "ref_version": 3}"#).unwrap();
        assert!(options.allow_null);
        assert!(!options.strict);
        assert_eq!(options.ref_version, Some(Value::Int(3)));
        assert_eq!(options.max_size, MAX_DOC_SIZE);
        assert_eq!(options.compress, Compress::default());
        assert!(serde_json::from_str::<FieldOptions>(r#"{"nope": 1}"#).is_err());
    }

    #[test]
    fn store_failures_propagate() {
        struct Down;
        impl NodeStore for Down {
            fn create(&self, _: &Document) -> Result<NodeId> {
                Err(Error::store("store unavailable"))
            }
            fn get(&self, _: &NodeId) -> Result<Option<Document>> {
                Err(Error::store("store unavailable"))
            }
            fn set(&self, _: &NodeId, _: &Document) -> Result<()> {
                Err(Error::store("store unavailable"))
            }
            fn delete(&self, _: &NodeId) -> Result<()> {
                Err(Error::store("store unavailable"))
            }
        }
        let field: NodeField<Event> = NodeField::new(Down);
        let mut node = field.from_document(doc(&[("a", Value::Int(1))]));
        assert!(matches!(
            field.encode(&mut node, &Event { id: 1 }),
            Err(Error::Store(_))
        ));
        assert!(node.id().is_none());
        let node = field.from_id(NodeId::from("x"));
        assert!(matches!(node.get("a"), Err(Error::Store(_))));
        assert!(!node.is_bound());
    }
}
