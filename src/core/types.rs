use serde::{Serialize, Deserialize};
use std::fmt;

/// The only id field that maps to a position in the shard files
pub const ID_FIELD_INT: &str = "id_int";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Int,
}

/// Stable identifier of a paper inside a collection.
///
/// `id_value` is the 1-based ordinal assigned at ingestion time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    pub collection: String,
    pub id_field: String,
    pub id_type: IdType,
    pub id_value: i64,
}

impl DocumentId {
    pub fn new(collection: impl Into<String>, id_value: i64) -> Self {
        DocumentId {
            collection: collection.into(),
            id_field: ID_FIELD_INT.to_string(),
            id_type: IdType::Int,
            id_value,
        }
    }

    /// Position usable to index shard lookup tables, if this id is resolvable
    pub fn ordinal(&self) -> Option<usize> {
        if self.id_field != ID_FIELD_INT || self.id_value < 0 {
            return None;
        }
        usize::try_from(self.id_value).ok()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}:{}", self.collection, self.id_field, self.id_value)
    }
}

/// Ranked hit returned by the ranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_id: DocumentId,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_int_field_resolves_to_ordinal() {
        let id = DocumentId::new("arxiv", 42);
        assert_eq!(id.ordinal(), Some(42));

        let mut other = id.clone();
        other.id_field = "doi".to_string();
        assert_eq!(other.ordinal(), None);

        let negative = DocumentId::new("arxiv", -1);
        assert_eq!(negative.ordinal(), None);
    }

    #[test]
    fn serializes_with_lowercase_id_type() {
        let json = serde_json::to_value(DocumentId::new("pmcoa", 7)).unwrap();
        assert_eq!(json["id_type"], "int");
        assert_eq!(json["id_field"], "id_int");
    }
}
