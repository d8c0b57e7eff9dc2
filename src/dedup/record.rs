use serde::{Serialize, Deserialize};
use crate::analysis::analyzer::Analyzer;
use crate::core::types::DocumentId;

/// Identity fields of a paper as they arrive from ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperIdentity {
    pub md5: String,
    pub doi: String,
    pub title: String,
    pub first_author: String,
}

/// Normalized identity keys shared by `check` and `update`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKeys {
    pub md5: String,
    pub doi: String,
    pub title: String,
    pub title_head: String,
    pub title_tail: String,
    pub first_author: String,
}

impl IdentityKeys {
    /// Lowercase the hashes, run title and author through `analyzer` and
    /// cut the first and last `window` title tokens
    pub fn normalize(identity: &PaperIdentity, analyzer: &Analyzer, window: usize) -> Self {
        let title = analyzer.normalize(&identity.title);
        let words: Vec<&str> = title.split_whitespace().collect();
        let title_head = words[..window.min(words.len())].join(" ");
        let title_tail = words[words.len().saturating_sub(window)..].join(" ");

        IdentityKeys {
            md5: identity.md5.trim().to_lowercase(),
            doi: identity.doi.trim().to_lowercase(),
            title_head,
            title_tail,
            first_author: analyzer.normalize(&identity.first_author),
            title,
        }
    }

    /// Abbreviated form of the first author, e.g. `j smith`
    pub fn abbreviated_author(&self) -> String {
        abbreviate_name(&self.first_author)
    }

    /// Distinct non-empty keys to insert into the index
    pub fn index_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(6);
        for key in [&self.md5, &self.doi, &self.title, &self.title_head, &self.title_tail, &self.first_author] {
            if !key.is_empty() && !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }
}

/// One durable entry of the duplicate log. Keys are stored normalized so
/// replay never needs the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub collection: String,
    pub id_value: i64,
    pub keys: IdentityKeys,
}

impl DuplicateRecord {
    pub fn doc_id(&self) -> DocumentId {
        DocumentId::new(self.collection.clone(), self.id_value)
    }
}

/// Every word but the last reduced to its first character, lowercased
pub fn abbreviate_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let Some((last, rest)) = words.split_last() else {
        return String::new();
    };
    let mut parts: Vec<String> = rest.iter()
        .filter_map(|w| w.chars().next())
        .map(String::from)
        .collect();
    parts.push(last.to_string());
    parts.join(" ").to_lowercase()
}
