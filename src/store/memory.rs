use std::collections::BTreeMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::core::types::{DocumentId, ID_FIELD_INT};
use crate::store::PaperStore;
use crate::store::projection::project;

/// Paper store backed by in-memory JSON blobs
#[derive(Default)]
pub struct InMemoryPaperStore {
    collections: RwLock<BTreeMap<String, BTreeMap<i64, Value>>>,
}

impl InMemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.read().values().all(BTreeMap::is_empty)
    }
}

impl PaperStore for InMemoryPaperStore {
    fn get_documents(&self, ids: &[DocumentId], projection: Option<&[&str]>) -> Vec<Option<Value>> {
        let collections = self.collections.read();
        ids.iter()
            .map(|id| {
                if id.ordinal().is_none() {
                    return None;
                }
                let document = collections.get(&id.collection)?.get(&id.id_value)?;
                Some(match projection {
                    Some(paths) => project(document, paths),
                    None => document.clone(),
                })
            })
            .collect()
    }

    fn get_max_ordinal(&self, collection: &str) -> i64 {
        self.collections.read()
            .get(collection)
            .and_then(|docs| docs.keys().next_back().copied())
            .unwrap_or(0)
    }

    fn insert_documents(&self, documents: Vec<Value>, collection: &str) -> Result<Vec<DocumentId>> {
        if documents.iter().any(|doc| !doc.is_object()) {
            return Err(Error::invalid_input("documents must be JSON objects"));
        }

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        let mut next = docs.keys().next_back().copied().unwrap_or(0) + 1;

        let mut assigned = Vec::with_capacity(documents.len());
        for mut document in documents {
            if let Value::Object(fields) = &mut document {
                fields.insert(ID_FIELD_INT.to_string(), Value::from(next));
            }
            docs.insert(next, document);
            assigned.push(DocumentId::new(collection, next));
            next += 1;
        }
        debug!(collection, inserted = assigned.len(), "stored documents");
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordinals_continue_after_max() {
        let store = InMemoryPaperStore::new();
        assert_eq!(store.get_max_ordinal("arxiv"), 0);

        let ids = store.insert_documents(vec![json!({"Title": "a"}), json!({"Title": "b"})], "arxiv").unwrap();
        assert_eq!(ids, vec![DocumentId::new("arxiv", 1), DocumentId::new("arxiv", 2)]);
        let ids = store.insert_documents(vec![json!({"Title": "c"})], "arxiv").unwrap();
        assert_eq!(ids, vec![DocumentId::new("arxiv", 3)]);
        assert_eq!(store.get_max_ordinal("arxiv"), 3);
    }

    #[test]
    fn results_follow_request_order_with_gaps() {
        let store = InMemoryPaperStore::new();
        store.insert_documents(vec![json!({"Title": "a", "Year": 2020})], "arxiv").unwrap();

        let mut foreign = DocumentId::new("arxiv", 1);
        foreign.id_field = "doi".to_string();
        let docs = store.get_documents(
            &[DocumentId::new("pmcoa", 1), DocumentId::new("arxiv", 1), foreign],
            Some(&["Title", "id_int"][..]),
        );
        assert_eq!(docs, vec![None, Some(json!({"Title": "a", "id_int": 1})), None]);
    }

    #[test]
    fn rejects_non_objects() {
        let store = InMemoryPaperStore::new();
        assert!(store.insert_documents(vec![json!("text")], "arxiv").is_err());
        assert!(store.is_empty());
    }
}
