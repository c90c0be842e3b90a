//! Content-addressed stylesheet cache.

use crate::meta::StylableMeta;
use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug)]
struct CacheEntry {
    hash: blake3::Hash,
    meta: Rc<StylableMeta>,
}

/// Processed stylesheets keyed by canonical path.
///
/// An entry is only returned while the file content still hashes to the
/// value it was processed from.
#[derive(Debug, Default)]
pub struct StylesheetCache {
    entries: FxHashMap<Utf8PathBuf, CacheEntry>,
}

impl StylesheetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table if `content` matches what was processed.
    pub fn get(&self, path: &Utf8Path, content: &str) -> Option<Rc<StylableMeta>> {
        let entry = self.entries.get(path)?;
        if entry.hash == blake3::hash(content.as_bytes()) {
            Some(Rc::clone(&entry.meta))
        } else {
            None
        }
    }

    /// Stores the table processed from `content`.
    pub fn insert(&mut self, path: &Utf8Path, content: &str, meta: Rc<StylableMeta>) {
        let hash = blake3::hash(content.as_bytes());
        self.entries
            .insert(path.to_path_buf(), CacheEntry { hash, meta });
    }

    /// Drops the entry for `path`. Returns true if there was one.
    pub fn invalidate(&mut self, path: &Utf8Path) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
