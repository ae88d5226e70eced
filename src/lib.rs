//! node-field keeps large, schemaless documents out of a record's own storage.
//!
//! A record that owns a potentially large document stores only a small pointer record in its
//! column, and the document body lives in an external key-value [`NodeStore`]. This crate
//! provides the pieces that make that transparent to the code working with the record:
//!
//! - [`NodeField`], the codec between the persisted column and the in-memory node. It decodes
//!   pointer records (and legacy inline bodies), writes bodies to the store on save, and removes
//!   them when the owning record is deleted.
//! - [`NodeData`], a lazily-populated proxy that behaves like a string-keyed map. The body is
//!   fetched at most once, and is normally bound by a loader ahead of time.
//! - Reference integrity. A field can derive a reference token from the owning record, which is
//!   written into the stored body and checked when the body is bound again, so that a body which
//!   ended up under the wrong record is detected.
//! - An optional [`Canonicalize`] strategy that normalizes every body entering memory and
//!   flattens it again before it goes back to the store.
//!
//! Pointer records are written in a compact, canonical binary encoding (see [`encode`] and
//! [`decode`]), optionally compressed with zstd.
//!
//! ```
//! use node_field::{MemoryStore, NodeField, Value};
//! use std::sync::Arc;
//!
//! struct Event {
//!     id: u64,
//! }
//!
//! let store = Arc::new(MemoryStore::new());
//! let field = NodeField::builder(store.clone())
//!     .reference(1, |e: &Event| Some(Value::from(e.id.to_string())))
//!     .build();
//!
//! let event = Event { id: 7 };
//! let mut node = field.empty();
//! node.insert("message", "hello").unwrap();
//! let column = field.encode(&mut node, &event).unwrap().unwrap();
//!
//! let loaded = field.decode(column.as_slice());
//! assert_eq!(loaded.get("message").unwrap(), Some(&Value::from("hello")));
//! ```

mod canonical;
mod compress;
pub mod decode;
mod depth_tracking;
mod element;
pub mod encode;
mod error;
mod field;
mod marker;
mod node_data;
mod store;
mod value;

pub use canonical::{CanonicalKeys, Canonicalize};
pub use compress::{decompress, Compress, CompressionError, ALGORITHM_ZSTD};
pub use error::{Error, Result, StoreError};
pub use field::{FieldOptions, NodeField, NodeFieldBuilder, Persisted, RefFunc, NODE_ID_KEY};
pub use node_data::{NodeData, NodeState, REF_KEY, REF_VERSION_KEY};
pub use store::{MemoryStore, NodeId, NodeStore};
pub use value::{Document, Value};

/// The maximum decompressed size of a persisted column value, by default. Pointer records are
/// tiny, but legacy inline bodies can be large.
pub const MAX_DOC_SIZE: usize = 1usize << 20; // 1 MiB

/// The maximum nesting depth of arrays and maps accepted when decoding.
pub const MAX_DEPTH: usize = 100;
