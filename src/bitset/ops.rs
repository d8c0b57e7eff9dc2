/// Operations over byte-packed bit arrays.
///
/// Bit `i` lives in byte `i / 8` at bit `i % 8` (least significant bit
/// first), so a packed array of `n` bytes covers ordinals `0..n * 8`.
pub struct BitsetOps;

impl BitsetOps {
    /// Pack a dense boolean vector, padding the last byte with zeros
    pub fn pack(bits: &[bool]) -> Vec<u8> {
        let mut packed = vec![0u8; bits.len().div_ceil(8)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                packed[i >> 3] |= 1 << (i & 7);
            }
        }
        packed
    }

    /// Unpack to exactly `len` booleans; missing bytes read as zero
    pub fn unpack(packed: &[u8], len: usize) -> Vec<bool> {
        (0..len).map(|i| Self::get(packed, i)).collect()
    }

    /// Unpack every bit of every byte
    pub fn unpack_all(packed: &[u8]) -> Vec<bool> {
        Self::unpack(packed, packed.len() * 8)
    }

    #[inline]
    pub fn get(packed: &[u8], i: usize) -> bool {
        packed.get(i >> 3).is_some_and(|byte| byte & (1 << (i & 7)) != 0)
    }

    #[inline]
    pub fn set(packed: &mut [u8], i: usize) {
        packed[i >> 3] |= 1 << (i & 7);
    }

    /// Packed array with `bytes` bytes and the given ordinals set.
    /// Ordinals beyond the array are ignored.
    pub fn from_positions(positions: &[u32], bytes: usize) -> Vec<u8> {
        let mut packed = vec![0u8; bytes];
        let limit = bytes * 8;
        for &pos in positions {
            let pos = pos as usize;
            if pos < limit {
                Self::set(&mut packed, pos);
            }
        }
        packed
    }

    pub fn ones(bytes: usize) -> Vec<u8> {
        vec![u8::MAX; bytes]
    }

    pub fn zeros(bytes: usize) -> Vec<u8> {
        vec![0u8; bytes]
    }

    /// Right-pad every array with zero bytes to the longest length
    pub fn zero_pad(arrays: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        let max_len = arrays.iter().map(Vec::len).max().unwrap_or(0);
        arrays.into_iter()
            .map(|mut arr| {
                arr.resize(max_len, 0);
                arr
            })
            .collect()
    }

    pub fn and(arrays: Vec<Vec<u8>>) -> Vec<u8> {
        if arrays.len() <= 1 {
            return arrays.into_iter().next().unwrap_or_default();
        }
        let mut iter = Self::zero_pad(arrays).into_iter();
        let mut result = iter.next().unwrap_or_default();
        for arr in iter {
            for (r, a) in result.iter_mut().zip(arr.iter()) {
                *r &= *a;
            }
        }
        result
    }

    /// OR with an optional tail.
    ///
    /// Arrays `0..=optional_after_pos` are always combined. If that already
    /// has a set bit, the remaining arrays are ignored; otherwise they are
    /// OR-ed in as well. `None` means every array is mandatory.
    pub fn or(arrays: Vec<Vec<u8>>, optional_after_pos: Option<usize>) -> Vec<u8> {
        if arrays.is_empty() {
            return Vec::new();
        }
        let last = arrays.len() - 1;
        let split = optional_after_pos.unwrap_or(last).min(last);

        let padded = Self::zero_pad(arrays);
        let mut result = vec![0u8; padded[0].len()];
        for arr in &padded[..=split] {
            Self::or_into(&mut result, arr);
        }
        if Self::any(&result) {
            return result;
        }
        for arr in &padded[split + 1..] {
            Self::or_into(&mut result, arr);
        }
        result
    }

    pub fn not(mut packed: Vec<u8>) -> Vec<u8> {
        for byte in packed.iter_mut() {
            *byte = !*byte;
        }
        packed
    }

    /// OR `other` into `target`, growing `target` if needed
    pub fn or_into(target: &mut Vec<u8>, other: &[u8]) {
        if target.len() < other.len() {
            target.resize(other.len(), 0);
        }
        for (t, o) in target.iter_mut().zip(other.iter()) {
            *t |= *o;
        }
    }

    pub fn any(packed: &[u8]) -> bool {
        packed.iter().any(|&b| b != 0)
    }

    pub fn count_ones(packed: &[u8]) -> usize {
        packed.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Sorted ordinals of all set bits
    pub fn positions(packed: &[u8]) -> Vec<u32> {
        let mut result = Vec::with_capacity(Self::count_ones(packed));
        for (byte_idx, &byte) in packed.iter().enumerate() {
            let mut rest = byte;
            while rest != 0 {
                let bit = rest.trailing_zeros();
                result.push((byte_idx as u32) * 8 + bit);
                rest &= rest - 1;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_keeps_odd_lengths() {
        for len in [0usize, 1, 3, 7, 9, 17] {
            let bits: Vec<bool> = (0..len).map(|i| i % 3 == 0).collect();
            let packed = BitsetOps::pack(&bits);
            assert_eq!(packed.len(), len.div_ceil(8));
            assert_eq!(BitsetOps::unpack(&packed, len), bits, "len {}", len);
        }
    }

    #[test]
    fn bit_order_is_lsb_first() {
        let packed = BitsetOps::pack(&[true, false, false, false, false, false, false, false, false, true]);
        assert_eq!(packed, vec![0b0000_0001, 0b0000_0010]);
        assert_eq!(BitsetOps::positions(&packed), vec![0, 9]);
    }

    #[test]
    fn and_pads_shorter_arrays_with_zeros() {
        let a = vec![0xFF, 0xFF];
        let b = vec![0x0F];
        assert_eq!(BitsetOps::and(vec![a, b]), vec![0x0F, 0x00]);
    }

    #[test]
    fn or_skips_optional_tail_when_head_matches() {
        let head = vec![0b0000_0001];
        let tail = vec![0b1000_0000];
        assert_eq!(BitsetOps::or(vec![head.clone(), tail.clone()], Some(0)), vec![0b0000_0001]);
        assert_eq!(BitsetOps::or(vec![head, tail], None), vec![0b1000_0001]);
    }

    #[test]
    fn or_falls_back_to_tail_when_head_is_empty() {
        let head = vec![0u8, 0u8];
        let tail = vec![0b0000_0100];
        assert_eq!(BitsetOps::or(vec![head, tail], Some(0)), vec![0b0000_0100, 0]);
    }

    #[test]
    fn or_clamps_out_of_range_split() {
        let arrays = vec![vec![0u8], vec![2u8]];
        assert_eq!(BitsetOps::or(arrays, Some(10)), vec![2u8]);
        assert!(BitsetOps::or(Vec::new(), None).is_empty());
    }

    #[test]
    fn not_flips_whole_bytes() {
        assert_eq!(BitsetOps::not(vec![0b1010_1010]), vec![0b0101_0101]);
    }

    #[test]
    fn from_positions_ignores_out_of_range() {
        let packed = BitsetOps::from_positions(&[1, 5, 64], 1);
        assert_eq!(packed, vec![0b0010_0010]);
        assert_eq!(BitsetOps::count_ones(&packed), 2);
    }
}
