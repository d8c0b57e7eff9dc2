use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use fst::MapBuilder;
use tracing::info;
use crate::analysis::analyzer::Analyzer;
use crate::bitset::ops::BitsetOps;
use crate::compression::delta::DeltaEncoder;
use crate::core::error::Result;
use crate::index::shard::{ShardHeader, INFO_COLLECTION, INFO_PACKED_DOC_IDS};

/// Builds a term shard file in memory and writes it out in one go.
///
/// Terms are indexed the way the query parser produces them: lowercase,
/// stemmed unigrams and bigrams, optionally field-scoped.
pub struct ShardWriter {
    collection: String,
    analyzer: Analyzer,
    postings: BTreeMap<String, BTreeSet<u32>>,
    doc_ids: BTreeSet<u32>,
}

impl ShardWriter {
    pub fn new(collection: impl Into<String>) -> Self {
        ShardWriter {
            collection: collection.into(),
            analyzer: Analyzer::query_english(),
            postings: BTreeMap::new(),
            doc_ids: BTreeSet::new(),
        }
    }

    /// Mark an ordinal as present in this shard
    pub fn add_document(&mut self, ordinal: u32) {
        self.doc_ids.insert(ordinal);
    }

    /// Index a raw term (lowercased) for a document
    pub fn add_term(&mut self, ordinal: u32, term: &str) {
        self.doc_ids.insert(ordinal);
        self.postings.entry(term.to_lowercase())
            .or_default()
            .insert(ordinal);
    }

    /// Index unigrams and bigrams of `text`, unscoped and, if a scope is
    /// given, also as `scope:ngram`. Records `availablefield:<scope>`.
    pub fn index_text(&mut self, ordinal: u32, scope: Option<&str>, text: &str) {
        let (unigrams, bigrams) = self.analyzer.ngrams(text);
        if unigrams.is_empty() {
            self.add_document(ordinal);
            return;
        }
        for ngram in unigrams.iter().chain(bigrams.iter()) {
            self.add_term(ordinal, ngram);
            if let Some(scope) = scope {
                self.add_term(ordinal, &format!("{}:{}", scope, ngram));
            }
        }
        if let Some(scope) = scope {
            self.add_term(ordinal, &format!("availablefield:{}", scope));
        }
    }

    /// Index one author: scoped name terms plus plain keywords in both orders
    pub fn index_author(&mut self, ordinal: u32, given_name: &str, family_name: &str) {
        let given = given_name.trim().to_lowercase();
        let family = family_name.trim().to_lowercase();
        if !family.is_empty() {
            self.add_term(ordinal, &format!("author.familyname:{}", family));
        }
        if !given.is_empty() {
            self.add_term(ordinal, &format!("author.givenname:{}", given));
        }
        if !family.is_empty() && !given.is_empty() {
            self.add_term(ordinal, &format!("author.fullname:{} {}", given, family));
        }

        let forward = format!("{} {}", family, given);
        let reversed = format!("{} {}", given, family);
        for text in [forward, reversed] {
            let (unigrams, bigrams) = self.analyzer.ngrams(&text);
            for ngram in unigrams.iter().chain(bigrams.iter()) {
                self.add_term(ordinal, ngram);
            }
        }
        self.add_term(ordinal, "availablefield:author");
    }

    pub fn index_doi(&mut self, ordinal: u32, doi: &str) {
        let doi = doi.trim().to_lowercase();
        if doi.is_empty() {
            return;
        }
        self.add_term(ordinal, &doi);
        self.add_term(ordinal, &format!("doi:{}", doi));
        self.add_term(ordinal, "availablefield:doi");
    }

    pub fn index_year(&mut self, ordinal: u32, year: u32) {
        self.add_term(ordinal, &year.to_string());
        self.add_term(ordinal, &format!("publicationdate.year:{}", year));
        self.add_term(ordinal, "availablefield:publicationdate.year");
    }

    pub fn doc_count(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Write the shard to `path`, replacing any existing file
    pub fn finish<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let ordinals: Vec<u32> = self.doc_ids.iter().copied().collect();
        let bytes = ordinals.last().map_or(0, |&max| max as usize / 8 + 1);
        let packed_doc_ids = BitsetOps::from_positions(&ordinals, bytes);

        let mut info: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        info.insert(INFO_PACKED_DOC_IDS.to_string(), packed_doc_ids);
        info.insert(INFO_COLLECTION.to_string(), self.collection.as_bytes().to_vec());
        let info_bytes = bincode::serialize(&info)?;

        // BTreeMap iteration is sorted, as the fst builder requires
        let mut postings_bytes = Vec::new();
        let mut builder = MapBuilder::memory();
        for (term, ordinals) in &self.postings {
            builder.insert(term.as_bytes(), postings_bytes.len() as u64)?;
            let ordinals: Vec<u32> = ordinals.iter().copied().collect();
            DeltaEncoder::encode_sorted(&mut postings_bytes, &ordinals);
        }
        let dict_bytes = builder.into_inner()?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&info_bytes);
        hasher.update(&dict_bytes);
        hasher.update(&postings_bytes);

        let header = ShardHeader {
            version: ShardHeader::VERSION,
            checksum: hasher.finalize(),
            info_len: info_bytes.len() as u64,
            dict_len: dict_bytes.len() as u64,
            postings_len: postings_bytes.len() as u64,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&header.encode())?;
        file.write_all(&info_bytes)?;
        file.write_all(&dict_bytes)?;
        file.write_all(&postings_bytes)?;
        file.sync_all()?;

        info!(path = %path.display(), collection = %self.collection,
              docs = self.doc_ids.len(), terms = self.postings.len(), "wrote term shard");
        Ok(())
    }
}
