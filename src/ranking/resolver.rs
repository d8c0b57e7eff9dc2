use std::collections::BTreeMap;
use std::sync::Arc;
use roaring::RoaringBitmap;
use crate::bitset::ops::BitsetOps;
use crate::core::types::DocumentId;
use crate::index::sharded::KeywordMatches;
use crate::ranking::embedding::PositionMapping;

/// Candidate rows sent to a ranking worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateRange {
    /// No restriction
    All,
    /// Sorted row positions
    Positions(Vec<u32>),
    /// Packed bit array over row positions, used for large ranges
    Packed(Vec<u8>),
}

impl CandidateRange {
    /// Explicit sorted positions, or `None` for an unrestricted range
    pub fn into_positions(self) -> Option<Vec<u32>> {
        match self {
            CandidateRange::All => None,
            CandidateRange::Positions(positions) => Some(positions),
            CandidateRange::Packed(packed) => Some(BitsetOps::positions(&packed)),
        }
    }
}

/// Ordinal span of one collection inside an embedding shard
struct CollectionSpan {
    min: usize,
    max: usize,
}

/// Translates keyword matches and explicit ids into shard-local rows.
///
/// Precomputes, per collection, the smallest and largest ordinal the
/// shard holds so a corpus-wide match vector is only scanned over that
/// span.
pub struct IndexRangeResolver {
    mapping: Arc<PositionMapping>,
    spans: BTreeMap<String, CollectionSpan>,
}

impl IndexRangeResolver {
    pub fn new(mapping: Arc<PositionMapping>) -> Self {
        let spans = mapping.doc_id_to_pos.iter()
            .filter_map(|(collection, table)| {
                let min = table.iter().position(|&pos| pos >= 0)?;
                let max = table.iter().rposition(|&pos| pos >= 0)?;
                Some((collection.clone(), CollectionSpan { min, max }))
            })
            .collect();
        IndexRangeResolver { mapping, spans }
    }

    pub fn mapping(&self) -> &Arc<PositionMapping> {
        &self.mapping
    }

    pub fn num_docs(&self) -> usize {
        self.mapping.num_docs()
    }

    /// Candidate rows for this shard, or `None` when neither filter is given.
    ///
    /// Keyword matches for collections the shard does not hold contribute
    /// nothing; when both filters are given their intersection is returned.
    pub fn resolve(&self, keyword_filter: Option<&KeywordMatches>, doc_ids: Option<&[DocumentId]>) -> Option<Vec<u32>> {
        let from_keywords = keyword_filter.map(|filter| self.keyword_rows(filter));
        let from_ids = doc_ids.map(|ids| self.id_rows(ids));

        let rows = match (from_keywords, from_ids) {
            (Some(keywords), Some(ids)) => keywords & ids,
            (Some(rows), None) | (None, Some(rows)) => rows,
            (None, None) => return None,
        };
        Some(rows.iter().collect())
    }

    fn keyword_rows(&self, filter: &KeywordMatches) -> RoaringBitmap {
        let mut rows = RoaringBitmap::new();
        for (collection, span) in &self.spans {
            let Some(matches) = filter.get(collection) else {
                continue;
            };
            let Some(table) = self.mapping.doc_id_to_pos.get(collection) else {
                continue;
            };
            let end = span.max.min(matches.len().saturating_sub(1));
            for ordinal in span.min..=end {
                if !matches.get(ordinal) {
                    continue;
                }
                if let Ok(pos) = u32::try_from(table[ordinal]) {
                    rows.insert(pos);
                }
            }
        }
        rows
    }

    fn id_rows(&self, ids: &[DocumentId]) -> RoaringBitmap {
        ids.iter()
            .filter_map(|id| self.mapping.position(id))
            .collect()
    }

    /// Wrap resolved rows for transport, packing ranges longer than
    /// `num_docs / packed_divisor`
    pub fn candidate_range(&self, rows: Option<Vec<u32>>, packed_divisor: usize) -> CandidateRange {
        match rows {
            None => CandidateRange::All,
            Some(rows) if rows.len() > self.num_docs() / packed_divisor.max(1) => {
                let bytes = rows.last().map_or(0, |&max| max as usize / 8 + 1);
                CandidateRange::Packed(BitsetOps::from_positions(&rows, bytes))
            }
            Some(rows) => CandidateRange::Positions(rows),
        }
    }
}
