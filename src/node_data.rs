//! The lazily-loaded document held by a node field.
//!
//! A [`NodeData`] starts out in one of three ways: decoded from a pointer record (an id but no
//! body), freshly created (neither), or built around a body that's already in memory. The first
//! access to the body populates it exactly once, either from the node store or as an empty
//! document. After that, the in-memory body is the only copy this proxy ever looks at, until it
//! is explicitly rebound with [`NodeData::bind`].

use crate::error::{Error, Result};
use crate::field::FieldInner;
use crate::store::NodeId;
use crate::value::{Document, Value};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::btree_map;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Reserved document key holding the reference token.
pub const REF_KEY: &str = "_ref";
/// Reserved document key holding the reference version the token was produced under.
pub const REF_VERSION_KEY: &str = "_ref_version";

/// A populated body, along with the reference information it was bound with.
#[derive(Clone, Debug)]
pub(crate) struct Bound {
    pub(crate) data: Document,
    pub(crate) reference: Option<Value>,
    pub(crate) reference_version: Option<Value>,
}

impl Bound {
    pub(crate) fn new(data: Document) -> Self {
        Self {
            data,
            reference: None,
            reference_version: None,
        }
    }
}

// Null is how a missing reference round-trips through the store, so treat it as absent.
fn non_null(val: Option<Value>) -> Option<Value> {
    val.filter(|v| !v.is_null())
}

/// Strip the reserved keys out of a raw body, check its reference against the expected one, and
/// canonicalize what's left.
pub(crate) fn bind_body<R>(
    field: &FieldInner<R>,
    id: Option<&NodeId>,
    mut data: Document,
    expected: Option<Value>,
) -> Result<Bound> {
    let expected = non_null(expected);
    let stored_ref = non_null(data.remove(REF_KEY));
    let reference_version = non_null(data.remove(REF_VERSION_KEY));

    if let (Some(expected), Some(actual)) = (expected.as_ref(), stored_ref.as_ref()) {
        if reference_version == field.options.ref_version && actual != expected {
            return Err(Error::NodeIntegrityFailure {
                id: id.cloned(),
                expected: expected.clone(),
                actual: stored_ref,
            });
        }
    }

    Ok(Bound {
        data: field.canonicalize(data),
        // A body that carries no token of its own takes the expected one.
        reference: stored_ref.or(expected),
        reference_version,
    })
}

/// Lazily-loaded document belonging to one record's node field.
///
/// The body is populated on first access. For a node that already has an id, the intended path
/// is for the loader to call [`bind`](Self::bind) with the fetched body. If the body is read
/// without that, a strict field fails with [`Error::NodeUnpopulated`], while a lenient field logs
/// a warning and fetches the body from the store itself.
///
/// `NodeData` is owned by a single record and isn't meant to be shared between threads.
pub struct NodeData<R> {
    pub(crate) field: Arc<FieldInner<R>>,
    pub(crate) id: Option<NodeId>,
    pub(crate) bound: OnceCell<Bound>,
}

impl<R> NodeData<R> {
    pub(crate) fn unbound(field: Arc<FieldInner<R>>, id: Option<NodeId>) -> Self {
        Self {
            field,
            id,
            bound: OnceCell::new(),
        }
    }

    pub(crate) fn with_bound(field: Arc<FieldInner<R>>, id: Option<NodeId>, bound: Bound) -> Self {
        Self {
            field,
            id,
            bound: OnceCell::from(bound),
        }
    }

    /// The node's id, if it has ever been saved.
    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    /// Whether the body is populated in memory.
    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Reference token the body was bound or last saved with.
    pub fn reference(&self) -> Option<&Value> {
        self.bound.get().and_then(|b| b.reference.as_ref())
    }

    /// Reference version the body was bound or last saved with.
    pub fn reference_version(&self) -> Option<&Value> {
        self.bound.get().and_then(|b| b.reference_version.as_ref())
    }

    /// Two nodes are the same only if both have been saved and share an id.
    pub fn same_node(&self, other: &NodeData<R>) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }

    /// Populate the body, replacing any body already held.
    ///
    /// The reserved `_ref` and `_ref_version` keys are removed from `data`. If the body's
    /// reference version matches the field's, and `expected` is given, the body's reference must
    /// equal `expected` or this fails with [`Error::NodeIntegrityFailure`], leaving the node as
    /// it was.
    pub fn bind(&mut self, data: Document, expected: Option<Value>) -> Result<()> {
        let bound = bind_body(&self.field, self.id.as_ref(), data, expected)?;
        self.bound = OnceCell::from(bound);
        Ok(())
    }

    /// Replace the body outright. The node keeps its id, so the next save overwrites the stored
    /// document.
    pub fn set_data(&mut self, mut data: Document) {
        data.remove(REF_KEY);
        data.remove(REF_VERSION_KEY);
        let data = self.field.canonicalize(data);
        self.bound = OnceCell::from(Bound::new(data));
    }

    fn load(&self) -> Result<Bound> {
        let Some(id) = self.id.as_ref() else {
            return Ok(Bound::new(self.field.canonicalize(Document::new())));
        };
        if self.field.options.strict {
            return Err(Error::NodeUnpopulated(id.clone()));
        }
        warn!(node_id = %id, "node data accessed before it was populated, fetching it now");
        let data = self.field.store.get(id)?.unwrap_or_default();
        bind_body(&self.field, Some(id), data, None)
    }

    fn bound(&self) -> Result<&Bound> {
        if let Some(bound) = self.bound.get() {
            return Ok(bound);
        }
        let bound = self.load()?;
        Ok(self.bound.get_or_init(|| bound))
    }

    pub(crate) fn bound_mut(&mut self) -> Result<&mut Bound> {
        if self.bound.get().is_none() {
            let bound = self.load()?;
            self.bound = OnceCell::from(bound);
        }
        match self.bound.get_mut() {
            Some(bound) => Ok(bound),
            None => unreachable!("node data was populated above"),
        }
    }

    /// The whole body, populating it if needed.
    pub fn data(&self) -> Result<&Document> {
        self.bound().map(|b| &b.data)
    }

    /// Mutable access to the whole body, populating it if needed.
    pub fn data_mut(&mut self) -> Result<&mut Document> {
        self.bound_mut().map(|b| &mut b.data)
    }

    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        Ok(self.data()?.get(key))
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.data()?.contains_key(key))
    }

    pub fn insert(&mut self, key: impl Into<String>, val: impl Into<Value>) -> Result<Option<Value>> {
        Ok(self.data_mut()?.insert(key.into(), val.into()))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        Ok(self.data_mut()?.remove(key))
    }

    pub fn keys(&self) -> Result<btree_map::Keys<'_, String, Value>> {
        Ok(self.data()?.keys())
    }

    pub fn iter(&self) -> Result<btree_map::Iter<'_, String, Value>> {
        Ok(self.data()?.iter())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.data()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.data()?.is_empty())
    }

    /// A detached copy of the body.
    pub fn copy(&self) -> Result<Document> {
        self.data().cloned()
    }

    /// Build the body that should be written to the node store for `record`.
    ///
    /// The body is flattened through the field's canonicalizer. If the field derives reference
    /// tokens and one is produced for `record`, it's added under the reserved keys and also
    /// recorded on this node. The in-memory body is left without the reserved keys.
    ///
    /// [`NodeField::encode`][crate::NodeField::encode] only records the token once the store
    /// write succeeds.
    pub fn prepare_for_persist(&mut self, record: &R) -> Result<Document> {
        let reference = non_null(self.field.reference_for(record));
        let out = self.persist_body(reference.as_ref())?;
        self.record_reference(reference);
        Ok(out)
    }

    pub(crate) fn persist_body(&mut self, reference: Option<&Value>) -> Result<Document> {
        let field = Arc::clone(&self.field);
        let bound = self.bound_mut()?;
        let mut out = field.flatten(bound.data.clone());
        if let Some(reference) = reference {
            out.insert(REF_KEY.into(), reference.clone());
            if let Some(version) = field.options.ref_version.as_ref() {
                out.insert(REF_VERSION_KEY.into(), version.clone());
            }
        }
        Ok(out)
    }

    pub(crate) fn record_reference(&mut self, reference: Option<Value>) {
        let Some(reference) = reference else {
            return;
        };
        let version = self.field.options.ref_version.clone();
        if let Some(bound) = self.bound.get_mut() {
            bound.reference = Some(reference);
            bound.reference_version = version;
        }
    }

    /// A detached, serializable copy of this node's state. No store handle is included.
    pub fn snapshot(&self) -> NodeState {
        let bound = self.bound.get();
        NodeState {
            id: self.id.clone(),
            reference: bound.and_then(|b| b.reference.clone()),
            reference_version: bound.and_then(|b| b.reference_version.clone()),
            data: bound.map(|b| self.field.flatten(b.data.clone())),
            canonical: self.field.wrapper.is_some(),
        }
    }
}

impl<R> fmt::Debug for NodeData<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dbg = f.debug_struct("NodeData");
        dbg.field("id", &self.id);
        if let Some(bound) = self.bound.get() {
            dbg.field("data", &bound.data);
        }
        dbg.finish()
    }
}

/// Detached state of a [`NodeData`], for handing a node over to another worker.
///
/// The body is always stored in flattened form. `canonical` records whether the producing field
/// canonicalized its bodies, so [`NodeField::restore`][crate::NodeField::restore] knows to redo
/// it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: Option<NodeId>,
    #[serde(default, rename = "ref")]
    pub reference: Option<Value>,
    #[serde(default, rename = "ref_version")]
    pub reference_version: Option<Value>,
    #[serde(default)]
    pub data: Option<Document>,
    #[serde(default)]
    pub canonical: bool,
}
