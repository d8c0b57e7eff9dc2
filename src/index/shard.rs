use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use fst::Map;
use tracing::debug;
use crate::bitset::ops::BitsetOps;
use crate::compression::delta::DeltaEncoder;
use crate::core::error::{Error, Result};
use crate::mmap::mmap_file::{MmapFile, MmapSlice};
use crate::query::ast::QueryNode;

/// Reserved info key holding the packed existence bitset
pub const INFO_PACKED_DOC_IDS: &str = "INFO:PACKED_DOC_IDS";
/// Reserved info key holding the owning collection name
pub const INFO_COLLECTION: &str = "INFO:COLLECTION";

pub const SHARD_EXTENSION: &str = "shard";

/// Fixed-size header at the start of every term shard file.
///
/// ```text
/// [ magic "LSTS" | version u32 | crc32(body) u32 | info_len u64 | dict_len u64 | postings_len u64 ]
/// [ info: bincode map ][ dictionary: fst term -> offset ][ postings: delta-vbyte lists ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHeader {
    pub version: u32,
    pub checksum: u32,
    pub info_len: u64,
    pub dict_len: u64,
    pub postings_len: u64,
}

impl ShardHeader {
    pub const MAGIC: [u8; 4] = *b"LSTS";
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 36;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12..20].copy_from_slice(&self.info_len.to_le_bytes());
        buf[20..28].copy_from_slice(&self.dict_len.to_le_bytes());
        buf[28..36].copy_from_slice(&self.postings_len.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::corrupted("shard file shorter than header"));
        }
        if data[0..4] != Self::MAGIC {
            return Err(Error::corrupted("bad shard magic"));
        }
        let u32_at = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        let u64_at = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[at..at + 8]);
            u64::from_le_bytes(bytes)
        };
        let header = ShardHeader {
            version: u32_at(4),
            checksum: u32_at(8),
            info_len: u64_at(12),
            dict_len: u64_at(20),
            postings_len: u64_at(28),
        };
        if header.version != Self::VERSION {
            return Err(Error::corrupted(format!("unsupported shard version {}", header.version)));
        }
        Ok(header)
    }
}

/// One immutable, memory-mapped partition of the inverted index.
///
/// Holds term -> sorted ordinal lists for the documents of a single
/// collection whose ordinals fall in this shard.
pub struct TermShard {
    id: String,
    path: PathBuf,
    collection: String,
    packed_doc_ids: Vec<u8>,
    info: BTreeMap<String, Vec<u8>>,
    dictionary: Map<MmapSlice>,
    postings: MmapSlice,
}

impl TermShard {
    /// Map and verify a shard file. The shard id is the file stem.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let id = path.file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::invalid_input(format!("shard path without name: {}", path.display())))?
            .to_string();

        let file = MmapFile::open_read_only(path)?;
        let header = ShardHeader::decode(file.data())?;

        let body = &file.data()[ShardHeader::SIZE..];
        if crc32fast::hash(body) != header.checksum {
            return Err(Error::corrupted(format!("checksum mismatch in shard {}", id)));
        }

        let info_start = ShardHeader::SIZE;
        let dict_start = info_start + header.info_len as usize;
        let postings_start = dict_start + header.dict_len as usize;
        let postings_end = postings_start + header.postings_len as usize;
        if postings_end != file.len {
            return Err(Error::corrupted(format!("section lengths of shard {} do not match file size", id)));
        }

        let info: BTreeMap<String, Vec<u8>> = bincode::deserialize(&file.data()[info_start..dict_start])?;
        let packed_doc_ids = info.get(INFO_PACKED_DOC_IDS)
            .cloned()
            .ok_or_else(|| Error::corrupted(format!("shard {} lacks {}", id, INFO_PACKED_DOC_IDS)))?;
        let collection = info.get(INFO_COLLECTION)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .ok_or_else(|| Error::corrupted(format!("shard {} lacks {}", id, INFO_COLLECTION)))?;

        let dictionary = Map::new(file.slice(dict_start..postings_start)?)?;
        let postings = file.slice(postings_start..postings_end)?;

        debug!(shard = %id, collection = %collection, terms = dictionary.len(), "opened term shard");

        Ok(TermShard {
            id,
            path: path.to_path_buf(),
            collection,
            packed_doc_ids,
            info,
            dictionary,
            postings,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn packed_doc_ids(&self) -> &[u8] {
        &self.packed_doc_ids
    }

    /// Number of ordinals this shard's bit arrays cover
    pub fn universe(&self) -> usize {
        self.packed_doc_ids.len() * 8
    }

    pub fn doc_count(&self) -> usize {
        BitsetOps::count_ones(&self.packed_doc_ids)
    }

    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Raw value of an info key, reserved keys included
    pub fn info(&self, key: &str) -> Option<&[u8]> {
        self.info.get(key).map(Vec::as_slice)
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.dictionary.contains_key(term)
    }

    /// Sorted ordinals stored under `term`; empty when the term is absent
    pub fn postings(&self, term: &str) -> Result<Vec<u32>> {
        let Some(offset) = self.dictionary.get(term) else {
            return Ok(Vec::new());
        };
        let region = self.postings.as_ref();
        let offset = offset as usize;
        if offset >= region.len() {
            return Err(Error::corrupted(format!("posting offset {} out of range in shard {}", offset, self.id)));
        }
        let (ordinals, _) = DeltaEncoder::decode_sorted(&region[offset..])?;
        Ok(ordinals)
    }

    /// Evaluate a query tree to a packed bit array over this shard's universe
    pub fn evaluate(&self, node: &QueryNode) -> Result<Vec<u8>> {
        let bytes = self.packed_doc_ids.len();
        match node {
            QueryNode::Leaf(term) if term.is_empty() => Ok(BitsetOps::ones(bytes)),
            QueryNode::Leaf(term) => {
                let ordinals = self.postings(term)?;
                Ok(BitsetOps::from_positions(&ordinals, bytes))
            }
            QueryNode::And(elements) => {
                let arrays = elements.iter()
                    .map(|e| self.evaluate(e))
                    .collect::<Result<Vec<_>>>()?;
                Ok(BitsetOps::and(arrays))
            }
            QueryNode::Or { elements, optional_after_pos } => {
                let arrays = elements.iter()
                    .map(|e| self.evaluate(e))
                    .collect::<Result<Vec<_>>>()?;
                Ok(BitsetOps::or(arrays, *optional_after_pos))
            }
            QueryNode::Not(element) => Ok(BitsetOps::not(self.evaluate(element)?)),
        }
    }
}
