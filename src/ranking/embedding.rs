use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocumentId;
use crate::mmap::mmap_file::MmapFile;

pub const EMBEDDING_EXTENSION: &str = "emb";

/// Bidirectional mapping between document ids and matrix rows.
///
/// `doc_id_to_pos[collection][ordinal]` is the row of that document, or
/// `-1` when the shard does not hold it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionMapping {
    pub doc_id_to_pos: BTreeMap<String, Vec<i64>>,
    pub pos_to_doc_id: Vec<DocumentId>,
}

impl PositionMapping {
    pub fn num_docs(&self) -> usize {
        self.pos_to_doc_id.len()
    }

    /// Row of `doc_id`, if it is resolvable and present
    pub fn position(&self, doc_id: &DocumentId) -> Option<u32> {
        let ordinal = doc_id.ordinal()?;
        let pos = *self.doc_id_to_pos.get(&doc_id.collection)?.get(ordinal)?;
        u32::try_from(pos).ok()
    }

    pub fn doc_id(&self, pos: u32) -> Option<&DocumentId> {
        self.pos_to_doc_id.get(pos as usize)
    }
}

#[derive(Serialize, Deserialize)]
struct EmbeddingBody {
    dim: usize,
    matrix: Vec<f32>,
    mapping: PositionMapping,
}

/// Header of an embedding shard file:
/// `[ magic "LSEM" | version u32 | crc32(body) u32 | body_len u64 ][ bincode body ]`
struct EmbeddingHeader {
    checksum: u32,
    body_len: u64,
}

impl EmbeddingHeader {
    const MAGIC: [u8; 4] = *b"LSEM";
    const VERSION: u32 = 1;
    const SIZE: usize = 20;

    fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&Self::MAGIC);
        buf[4..8].copy_from_slice(&Self::VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12..20].copy_from_slice(&self.body_len.to_le_bytes());
        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || data[0..4] != Self::MAGIC {
            return Err(Error::corrupted("not an embedding shard"));
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != Self::VERSION {
            return Err(Error::corrupted(format!("unsupported embedding shard version {}", version)));
        }
        let checksum = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&data[12..20]);
        Ok(EmbeddingHeader { checksum, body_len: u64::from_le_bytes(len) })
    }
}

/// Row-major embedding matrix of one shard plus its id mapping
pub struct EmbeddingShard {
    pub dim: usize,
    pub matrix: Vec<f32>,
    pub mapping: PositionMapping,
}

impl EmbeddingShard {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = MmapFile::open_read_only(path)?;
        let header = EmbeddingHeader::decode(file.data())?;

        let body = &file.data()[EmbeddingHeader::SIZE..];
        if body.len() as u64 != header.body_len {
            return Err(Error::corrupted(format!("truncated embedding shard {}", path.display())));
        }
        if crc32fast::hash(body) != header.checksum {
            return Err(Error::corrupted(format!("checksum mismatch in {}", path.display())));
        }

        let body: EmbeddingBody = bincode::deserialize(body)?;
        if body.dim == 0 || body.matrix.len() != body.dim * body.mapping.num_docs() {
            return Err(Error::corrupted(format!(
                "matrix of {} floats does not fit {} rows of dim {}",
                body.matrix.len(), body.mapping.num_docs(), body.dim)));
        }

        debug!(path = %path.display(), rows = body.mapping.num_docs(), dim = body.dim, "loaded embedding shard");
        Ok(EmbeddingShard { dim: body.dim, matrix: body.matrix, mapping: body.mapping })
    }

    pub fn num_docs(&self) -> usize {
        self.mapping.num_docs()
    }

    pub fn row(&self, pos: usize) -> &[f32] {
        &self.matrix[pos * self.dim..(pos + 1) * self.dim]
    }
}

/// Builds an embedding shard file
pub struct EmbeddingShardWriter {
    dim: usize,
    matrix: Vec<f32>,
    mapping: PositionMapping,
}

impl EmbeddingShardWriter {
    pub fn new(dim: usize) -> Self {
        EmbeddingShardWriter {
            dim,
            matrix: Vec::new(),
            mapping: PositionMapping::default(),
        }
    }

    /// Append one document's vector as the next row
    pub fn add(&mut self, doc_id: DocumentId, vector: &[f32]) -> Result<u32> {
        if vector.len() != self.dim {
            return Err(Error::new(ErrorKind::InvalidArgument,
                format!("vector of dim {} added to shard of dim {}", vector.len(), self.dim)));
        }
        let ordinal = doc_id.ordinal()
            .ok_or_else(|| Error::invalid_input(format!("document id {} has no ordinal", doc_id)))?;

        let pos = self.mapping.num_docs();
        let table = self.mapping.doc_id_to_pos.entry(doc_id.collection.clone()).or_default();
        if table.len() <= ordinal {
            table.resize(ordinal + 1, -1);
        }
        if table[ordinal] >= 0 {
            return Err(Error::invalid_input(format!("document {} added twice", doc_id)));
        }
        table[ordinal] = pos as i64;

        self.matrix.extend_from_slice(vector);
        self.mapping.pos_to_doc_id.push(doc_id);
        Ok(pos as u32)
    }

    pub fn len(&self) -> usize {
        self.mapping.num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finish<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let rows = self.len();
        let body = bincode::serialize(&EmbeddingBody {
            dim: self.dim,
            matrix: self.matrix,
            mapping: self.mapping,
        })?;
        let header = EmbeddingHeader {
            checksum: crc32fast::hash(&body),
            body_len: body.len() as u64,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(&header.encode())?;
        file.write_all(&body)?;
        file.sync_all()?;

        info!(path = %path.display(), rows, dim = self.dim, "wrote embedding shard");
        Ok(())
    }
}
