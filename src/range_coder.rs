//! 64-bit range coder: proportional projection onto `[low, high]`, common-prefix
//! bit emission, underflow (carry) bit hiding.
//!
//! Bit sink/source is an append-only `bit_vec::BitVec` buffer.

use crate::error::{Error, Result};
use crate::fenwick::FenwickTree;
use bit_vec::BitVec;

const N: u32 = 64;
const HIDE_LOW_GTE: u64 = 1u64 << (N - 2);
const HIDE_HIGH_LT: u64 = (1u64 << (N - 1)) + (1u64 << (N - 2));

/// Ceiling-rounded proportional projection of `point` out of `old_max` onto `new_max`,
/// clamped so the result never reaches `new_max`. `new_max` is `u128` because the
/// coder's range length can reach `2^64` (the full initial `[0, 2^64-1]` span).
pub fn project_to_range(point: u64, old_max: u64, new_max: u128) -> u128 {
    let point = point as u128;
    let old_max = old_max as u128;
    let scaled = (point * new_max + old_max - 1) / old_max;
    scaled.min(new_max - 1)
}

struct Core {
    low: u64,
    high: u64,
    hidden_bits: u32,
}

impl Core {
    fn new() -> Self {
        Core { low: 0, high: u64::MAX, hidden_bits: 0 }
    }

    /// Project `[lo, hi)` out of `total` onto the current `[low, high]` range.
    fn project(&mut self, lo: u64, hi: u64, total: u64) -> Result<()> {
        if lo == hi {
            return Err(Error::InvalidModel("zero-weight symbol presented for coding".into()));
        }
        let length = self.high as u128 - self.low as u128 + 1;
        let new_low = self.low + project_to_range(lo, total, length) as u64;
        let new_high = self.low + project_to_range(hi, total, length) as u64 - 1;
        if new_low >= new_high {
            return Err(Error::InvalidModel("projected range degenerated to empty".into()));
        }
        self.low = new_low;
        self.high = new_high;
        Ok(())
    }

    /// Pop the common-prefix digits, returning the conceptual "common_prefix" length
    /// (including any padding from newly-resolved hidden bits on the first digit).
    fn pop_common_prefix_len(&mut self, mut on_bit: impl FnMut(bool)) -> usize {
        let mut count = 0usize;
        let mut first = true;
        while (self.low >> (N - 1)) == (self.high >> (N - 1)) {
            let bit = (self.low >> (N - 1)) & 1 == 1;
            on_bit(bit);
            count += 1;
            if first {
                for _ in 0..self.hidden_bits {
                    on_bit(!bit);
                }
                count += self.hidden_bits as usize;
                self.hidden_bits = 0;
                first = false;
            }
            self.low = self.low.wrapping_mul(2);
            self.high = self.high.wrapping_mul(2).wrapping_add(1);
        }
        count
    }

    fn hide_bits(&mut self) {
        while self.low >= HIDE_LOW_GTE && self.high < HIDE_HIGH_LT {
            self.low = self.low.wrapping_mul(2).wrapping_sub(1u64 << (N - 1));
            self.high = self.high.wrapping_mul(2).wrapping_sub(1u64 << (N - 1)).wrapping_add(1);
            self.hidden_bits += 1;
        }
    }
}

/// Encoder half of the range coder: accumulates an output bit stream.
pub struct RangeEncoder {
    core: Core,
    bits: BitVec,
}

impl RangeEncoder {
    pub fn new() -> Self {
        RangeEncoder { core: Core::new(), bits: BitVec::new() }
    }

    /// Encode index `idx` against `dist`.
    pub fn encode(&mut self, dist: &FenwickTree, idx: usize) -> Result<()> {
        let total = dist.total();
        if total == 0 {
            return Err(Error::InvalidModel("empty distribution".into()));
        }
        let lo = dist.prefix_sum(idx);
        let hi = lo + dist.get(idx);
        self.core.project(lo, hi, total)?;
        let bits = &mut self.bits;
        self.core.pop_common_prefix_len(|bit| bits.push(bit));
        self.core.hide_bits();
        Ok(())
    }

    /// Finish encoding, returning the packed big-endian byte stream (final byte
    /// zero-padded at the right by `bit_vec`'s own `to_bytes`).
    pub fn finish(mut self) -> Vec<u8> {
        self.bits.push(true);
        self.bits.to_bytes()
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of bits. `next_bit` tolerates up to one byte's worth of trailing
/// zero padding past the end of the underlying slice (the final byte of a
/// real payload is itself zero-padded by the encoder) before reporting
/// `TruncatedInput`; `next_bit_for_fill` never errors, since the decoder's
/// initial window fill can legitimately need far more than a byte of padding
/// for a short payload and isn't itself evidence of truncation.
struct BitSource<'a> {
    bytes: &'a [u8],
    pos: usize,
    post_fill_overrun: u32,
}

impl<'a> BitSource<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        BitSource { bytes, pos: 0, post_fill_overrun: 0 }
    }

    fn raw_bit(&self) -> u64 {
        let byte_idx = self.pos / 8;
        if byte_idx < self.bytes.len() {
            ((self.bytes[byte_idx] >> (7 - (self.pos % 8))) & 1) as u64
        } else {
            0
        }
    }

    fn next_bit_for_fill(&mut self) -> u64 {
        let bit = self.raw_bit();
        self.pos += 1;
        bit
    }

    fn next_bit(&mut self) -> Result<u64> {
        let byte_idx = self.pos / 8;
        if byte_idx >= self.bytes.len() {
            if self.post_fill_overrun >= 8 {
                return Err(Error::TruncatedInput);
            }
            self.post_fill_overrun += 1;
        }
        let bit = self.raw_bit();
        self.pos += 1;
        Ok(bit)
    }
}

/// Decoder half of the range coder: consumes a packed bit stream.
pub struct RangeDecoder<'a> {
    core: Core,
    source: BitSource<'a>,
    window: u64,
}

impl<'a> RangeDecoder<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        let mut source = BitSource::new(payload);
        let mut window = 0u64;
        for _ in 0..N {
            window = (window << 1) | source.next_bit_for_fill();
        }
        RangeDecoder { core: Core::new(), source, window }
    }

    /// Decode one index against `dist`.
    pub fn decode(&mut self, dist: &FenwickTree) -> Result<usize> {
        let total = dist.total();
        if total == 0 {
            return Err(Error::InvalidModel("empty distribution".into()));
        }
        let length = self.core.high as u128 - self.core.low as u128 + 1;
        let point = self.window.wrapping_sub(self.core.low) as u128;

        let mut left = 0usize;
        let mut right = dist.len() - 1;
        let mut result = 0usize;
        while left <= right {
            let mid = (left + right) / 2;
            if project_to_range(dist.prefix_sum(mid), total, length) <= point {
                result = mid;
                left = mid + 1;
            } else {
                if mid == 0 {
                    break;
                }
                right = mid - 1;
            }
        }

        let lo = dist.prefix_sum(result);
        let hi = lo + dist.get(result);
        let old_hidden = self.core.hidden_bits;
        self.core.project(lo, hi, total)?;
        let common_len = self.core.pop_common_prefix_len(|_| {});
        self.core.hide_bits();
        let new_hidden = self.core.hidden_bits;

        if common_len == 0 {
            for _ in 0..(new_hidden - old_hidden) {
                let bit = self.source.next_bit()?;
                self.window = self.window.wrapping_mul(2).wrapping_sub(1u64 << (N - 1)).wrapping_add(bit);
            }
        } else {
            for _ in 0..(common_len as u32 - old_hidden) {
                let bit = self.source.next_bit()?;
                self.window = self.window.wrapping_mul(2).wrapping_add(bit);
            }
            for _ in 0..new_hidden {
                let bit = self.source.next_bit()?;
                self.window = self.window.wrapping_mul(2).wrapping_sub(1u64 << (N - 1)).wrapping_add(bit);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize) -> FenwickTree {
        let mut t = FenwickTree::new(n);
        for _ in 0..n {
            t.append(1);
        }
        t
    }

    #[test]
    fn project_to_range_is_ceiling_and_clamped() {
        assert_eq!(project_to_range(0, 10, 100), 0);
        assert_eq!(project_to_range(1, 10, 100), 10);
        assert_eq!(project_to_range(10, 10, 100), 99);
    }

    #[test]
    fn round_trips_a_single_symbol() {
        let dist = uniform(4);
        let mut enc = RangeEncoder::new();
        enc.encode(&dist, 2).unwrap();
        let payload = enc.finish();

        let mut dec = RangeDecoder::new(&payload);
        let idx = dec.decode(&dist).unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn round_trips_a_sequence_with_varying_distributions() {
        let mut enc = RangeEncoder::new();
        let mut dists = Vec::new();
        let mut indices = Vec::new();
        let mut t = FenwickTree::new(4);
        for w in [5u64, 1, 1, 1] {
            t.append(w);
        }
        for (i, idx) in [0usize, 3, 1, 0, 2, 3, 0].into_iter().enumerate() {
            t.add(idx, (i as i64) + 1);
            dists.push(t.clone());
            indices.push(idx);
            enc.encode(&t, idx).unwrap();
        }
        let payload = enc.finish();

        let mut dec = RangeDecoder::new(&payload);
        for (dist, expected) in dists.iter().zip(indices.iter()) {
            let got = dec.decode(dist).unwrap();
            assert_eq!(got, *expected);
        }
    }

    #[test]
    fn reports_truncated_input_past_the_padding_budget() {
        let dist = uniform(4);
        let mut enc = RangeEncoder::new();
        for idx in [1usize, 2, 3, 0, 1, 2, 3, 0, 1, 2] {
            enc.encode(&dist, idx).unwrap();
        }
        let payload = enc.finish();
        let truncated = &payload[..1.min(payload.len())];

        let mut dec = RangeDecoder::new(truncated);
        let mut saw_truncation = false;
        for _ in 0..10 {
            if dec.decode(&dist).is_err() {
                saw_truncation = true;
                break;
            }
        }
        assert!(saw_truncation);
    }

    #[test]
    fn rejects_zero_weight_symbol() {
        let mut t = FenwickTree::new(2);
        t.append(1);
        t.append(0);
        let mut enc = RangeEncoder::new();
        assert!(enc.encode(&t, 1).is_err());
    }
}
