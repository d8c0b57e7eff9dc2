pub mod memory;
pub mod projection;

use serde_json::Value;
use crate::core::error::Result;
use crate::core::types::DocumentId;

pub use memory::InMemoryPaperStore;

/// Read/write contract of the paper store.
///
/// Documents are JSON objects keyed by `DocumentId`; only `id_int` ids
/// resolve.
pub trait PaperStore: Send + Sync {
    /// One entry per requested id, in request order; `None` for misses.
    /// `projection` keeps only the given dotted paths.
    fn get_documents(&self, ids: &[DocumentId], projection: Option<&[&str]>) -> Vec<Option<Value>>;

    /// Largest ordinal stored in `collection`, 0 when it is empty or unknown
    fn get_max_ordinal(&self, collection: &str) -> i64;

    /// Store `documents` under consecutive ordinals after the current
    /// maximum and return the assigned ids
    fn insert_documents(&self, documents: Vec<Value>, collection: &str) -> Result<Vec<DocumentId>>;
}
