//! Pluggable normalization of document bodies.
//!
//! A field may carry a [`Canonicalize`] strategy. It is applied to every body the field
//! materializes (fetched, decoded inline, or freshly created), and its [`flatten`] half is
//! applied to every body before it is handed back to the node store.
//!
//! [`flatten`]: Canonicalize::flatten

use crate::value::Document;
use std::collections::HashMap;

/// Normalizes document bodies as they enter memory, and flattens them back to plain documents
/// before they are written out.
pub trait Canonicalize: Send + Sync {
    /// Normalize a body that was just loaded or created.
    fn canonicalize(&self, data: Document) -> Document;

    /// Turn a body back into the plain form the store should see. Defaults to leaving the body
    /// as-is.
    fn flatten(&self, data: Document) -> Document {
        data
    }
}

impl<F> Canonicalize for F
where
    F: Fn(Document) -> Document + Send + Sync,
{
    fn canonicalize(&self, data: Document) -> Document {
        self(data)
    }
}

/// Renames legacy top-level keys to their canonical names.
///
/// When a body holds both a legacy key and its canonical name, the canonical entry wins and the
/// legacy one is dropped.
#[derive(Clone, Debug, Default)]
pub struct CanonicalKeys {
    aliases: HashMap<String, String>,
}

impl CanonicalKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a legacy key name and the canonical name it maps to.
    pub fn alias(mut self, legacy: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(legacy.into(), canonical.into());
        self
    }

    /// Canonical name for a key, which is the key itself if it has no alias.
    pub fn canonical_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map_or(key, |v| v.as_str())
    }
}

impl Canonicalize for CanonicalKeys {
    fn canonicalize(&self, data: Document) -> Document {
        if self.aliases.is_empty() {
            return data;
        }
        let mut out = Document::new();
        let mut legacy = Vec::new();
        for (key, val) in data {
            match self.aliases.get(&key) {
                Some(canonical) => legacy.push((canonical.clone(), val)),
                None => {
                    out.insert(key, val);
                }
            }
        }
        for (key, val) in legacy {
            out.entry(key).or_insert(val);
        }
        out
    }
}
