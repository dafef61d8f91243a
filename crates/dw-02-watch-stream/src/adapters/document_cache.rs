//! In-memory document cache tracking which documents match which targets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::domain::TargetId;
use crate::messages::{Document, DocumentChange, DocumentDelete, DocumentRemove};
use crate::ports::DocumentCache;

#[derive(Default)]
struct CacheState {
    documents: BTreeMap<String, Document>,
    targets: HashMap<TargetId, BTreeSet<String>>,
}

/// Document cache held in memory.
#[derive(Default)]
pub struct InMemoryDocumentCache {
    state: RwLock<CacheState>,
}

impl InMemoryDocumentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document name as matching `target_id`.
    pub fn insert(&self, target_id: TargetId, name: impl Into<String>) {
        self.state
            .write()
            .targets
            .entry(target_id)
            .or_default()
            .insert(name.into());
    }

    /// Latest state of a document.
    pub fn document(&self, name: &str) -> Option<Document> {
        self.state.read().documents.get(name).cloned()
    }

    /// Number of documents with a stored body.
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    /// Whether no document body is stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().documents.is_empty()
    }
}

impl CacheState {
    fn detach(&mut self, name: &str, target_ids: &[TargetId]) {
        for target_id in target_ids {
            if let Some(names) = self.targets.get_mut(target_id) {
                names.remove(name);
            }
        }
    }
}

impl DocumentCache for InMemoryDocumentCache {
    fn on_document_change(&self, change: &DocumentChange) {
        let mut state = self.state.write();
        let name = change.document.name.clone();
        for target_id in &change.target_ids {
            state
                .targets
                .entry(*target_id)
                .or_default()
                .insert(name.clone());
        }
        state.detach(&name, &change.removed_target_ids);
        state.documents.insert(name, change.document.clone());
    }

    fn on_document_delete(&self, delete: &DocumentDelete) {
        let mut state = self.state.write();
        state.documents.remove(&delete.document);
        for names in state.targets.values_mut() {
            names.remove(&delete.document);
        }
    }

    fn on_document_remove(&self, remove: &DocumentRemove) {
        self.state
            .write()
            .detach(&remove.document, &remove.removed_target_ids);
    }

    fn target_document_names(&self, target_id: TargetId) -> BTreeSet<String> {
        self.state
            .read()
            .targets
            .get(&target_id)
            .cloned()
            .unwrap_or_default()
    }
}
