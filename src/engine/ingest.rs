use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use tracing::{error, info};
use crate::core::error::{Error, Result};
use crate::core::types::DocumentId;
use crate::dedup::index::DuplicateIndex;
use crate::dedup::record::PaperIdentity;
use crate::store::PaperStore;

/// Outcome of one ingestion batch. Indices refer to the submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub inserted: Vec<DocumentId>,
    /// Already-stored papers each rejected document matched
    pub duplicates: Vec<(usize, Vec<DocumentId>)>,
    /// Documents repeating an earlier document of the same batch
    pub repeated: Vec<(usize, usize)>,
}

/// Write-time duplicate gate in front of the paper store
pub struct Ingestor {
    duplicates: Arc<DuplicateIndex>,
    store: Arc<dyn PaperStore>,
}

impl Ingestor {
    pub fn new(duplicates: Arc<DuplicateIndex>, store: Arc<dyn PaperStore>) -> Self {
        Ingestor { duplicates, store }
    }

    /// Store the documents of `collection` that are not already known and
    /// register their identity keys.
    ///
    /// Documents matching an earlier document of the same batch, under the
    /// same rules as the index check, are rejected as repeats. Concurrent
    /// batches are serialized from the first check to the index update.
    pub fn ingest(&self, documents: Vec<Value>, collection: &str) -> Result<IngestReport> {
        let _writes = self.duplicates.lock_writes();
        let mut report = IngestReport::default();
        let mut gate = self.duplicates.batch_gate();
        let mut accepted: Vec<(Value, PaperIdentity)> = Vec::new();

        for (i, document) in documents.into_iter().enumerate() {
            let identity = identity_of(&document);
            let keys = self.duplicates.identity_keys(&identity);
            let known = self.duplicates.check_keys(&keys);
            if !known.is_empty() {
                report.duplicates.push((i, known));
                continue;
            }
            if let Some(first) = gate.repeat_of(&keys) {
                report.repeated.push((i, first));
                continue;
            }
            gate.admit(i, keys);
            accepted.push((document, identity));
        }

        if accepted.is_empty() {
            return Ok(report);
        }

        let (docs, identities): (Vec<Value>, Vec<PaperIdentity>) = accepted.into_iter().unzip();
        let ids = self.store.insert_documents(docs, collection)?;
        let entries: Vec<(DocumentId, PaperIdentity)> = ids.iter().cloned().zip(identities).collect();
        if let Err(e) = self.duplicates.update(&entries) {
            let stored: Vec<String> = ids.iter().map(ToString::to_string).collect();
            error!(collection, stored = ?stored, error = %e, "papers stored but not registered for duplicate checks");
            return Err(Error::new(e.kind, format!("stored [{}] but duplicate index update failed: {}",
                                                  stored.join(", "), e.context)));
        }

        info!(collection, inserted = ids.len(), duplicates = report.duplicates.len(),
              repeated = report.repeated.len(), "ingested batch");
        report.inserted = ids;
        Ok(report)
    }
}

/// Identity fields of a paper document: `MD5`, `DOI`, `Title` and the
/// first author, taken from `First_Author` or else the first `Author` entry
pub fn identity_of(document: &Value) -> PaperIdentity {
    let text = |key: &str| document.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    let first_author = match document.get("First_Author").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => document.get("Author")
            .and_then(Value::as_array)
            .and_then(|authors| authors.first())
            .map(|author| {
                let part = |key: &str| author.get(key).and_then(Value::as_str).unwrap_or_default();
                format!("{} {}", part("GivenName"), part("FamilyName")).trim().to_string()
            })
            .unwrap_or_default(),
    };

    PaperIdentity {
        md5: text("MD5"),
        doi: text("DOI"),
        title: text("Title"),
        first_author,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_author_from_author_list() {
        let doc = json!({
            "Title": "Graph Network Model",
            "Author": [{"GivenName": "John", "FamilyName": "Smith"}, {"GivenName": "Ada", "FamilyName": "Lee"}]
        });
        let identity = identity_of(&doc);
        assert_eq!(identity.first_author, "John Smith");
        assert_eq!(identity.title, "Graph Network Model");
        assert!(identity.md5.is_empty());
    }

    #[test]
    fn explicit_first_author_wins() {
        let doc = json!({"First_Author": "J. Smith", "Author": [{"GivenName": "Ada", "FamilyName": "Lee"}]});
        assert_eq!(identity_of(&doc).first_author, "J. Smith");
    }
}
