use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, ErrorKind, Result};

/// Delta + VByte encoding for sorted, unique posting lists.
///
/// Layout: `vbyte(count) vbyte(first) vbyte(delta)*`
pub struct DeltaEncoder;

impl DeltaEncoder {
    pub fn encode_sorted(output: &mut Vec<u8>, nums: &[u32]) {
        VByteEncoder::encode_u32(output, nums.len() as u32);
        let mut prev = 0u32;
        for (i, &num) in nums.iter().enumerate() {
            let delta = if i == 0 { num } else { num - prev };
            VByteEncoder::encode_u32(output, delta);
            prev = num;
        }
    }

    /// Decode one list from the front of `data`, returns (values, bytes_consumed)
    pub fn decode_sorted(data: &[u8]) -> Result<(Vec<u32>, usize)> {
        let (count, mut pos) = VByteEncoder::decode_u32(data)?;
        let mut nums = Vec::with_capacity(count as usize);
        let mut prev = 0u32;

        for i in 0..count {
            let (delta, consumed) = VByteEncoder::decode_u32(&data[pos..])?;
            pos += consumed;
            let value = if i == 0 {
                delta
            } else {
                prev.checked_add(delta)
                    .ok_or_else(|| Error::new(ErrorKind::Corrupted, "posting delta overflow".to_string()))?
            };
            nums.push(value);
            prev = value;
        }

        Ok((nums, pos))
    }
}
