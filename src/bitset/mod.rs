pub mod ops;

use serde::{Serialize, Deserialize};
use crate::bitset::ops::BitsetOps;

/// Dense per-document match flags for one collection, indexed by ordinal
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchVector {
    bits: Vec<bool>,
}

impl MatchVector {
    pub fn new(bits: Vec<bool>) -> Self {
        MatchVector { bits }
    }

    pub fn from_packed(packed: &[u8]) -> Self {
        MatchVector { bits: BitsetOps::unpack_all(packed) }
    }

    pub fn from_positions(positions: &[u32], len: usize) -> Self {
        let mut bits = vec![false; len];
        for &pos in positions {
            if let Some(bit) = bits.get_mut(pos as usize) {
                *bit = true;
            }
        }
        MatchVector { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> bool {
        self.bits.get(ordinal).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn positions(&self) -> Vec<u32> {
        self.bits.iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i as u32))
            .collect()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    pub fn pack(&self) -> Vec<u8> {
        BitsetOps::pack(&self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_past_end_as_unmatched() {
        let mv = MatchVector::from_positions(&[2, 4], 6);
        assert!(mv.get(2));
        assert!(!mv.get(3));
        assert!(!mv.get(100));
        assert_eq!(mv.count(), 2);
        assert_eq!(mv.positions(), vec![2, 4]);
    }
}
