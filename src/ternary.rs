//! Self-delimiting ternary variable-length integer coding used by the
//! capitalization header's position deltas: each ternary digit of `n`
//! (most-significant first) is packed as 2 bits (`0`→`00`, `1`→`01`, `2`→`10`),
//! terminated by `11`; zero encodes as the lone terminator.

use crate::error::{Error, Result};
use bit_vec::BitVec;

/// Append the ternary code for `n` onto `bits`.
pub fn encode_one(bits: &mut BitVec, n: u64) {
    if n == 0 {
        bits.push(true);
        bits.push(true);
        return;
    }
    let mut digits = Vec::new();
    let mut n = n;
    while n > 0 {
        digits.push((n % 3) as u8);
        n /= 3;
    }
    for &d in digits.iter().rev() {
        match d {
            0 => {
                bits.push(false);
                bits.push(false);
            }
            1 => {
                bits.push(false);
                bits.push(true);
            }
            2 => {
                bits.push(true);
                bits.push(false);
            }
            _ => unreachable!(),
        }
    }
    bits.push(true);
    bits.push(true);
}

/// Append the ternary codes for each of `ns`, concatenated with no separation
/// beyond each value's own terminator.
pub fn encode_many(bits: &mut BitVec, ns: impl IntoIterator<Item = u64>) {
    for n in ns {
        encode_one(bits, n);
    }
}

/// Reader over a 2-bit-group ternary stream.
pub struct Reader<'a> {
    bits: &'a BitVec,
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bits: &'a BitVec) -> Self {
        Reader { bits, pos: 0 }
    }

    /// Decode the next ternary-coded integer, or `TruncatedInput` if the stream
    /// runs out before a terminator is seen.
    pub fn next(&mut self) -> Result<u64> {
        let mut n: u64 = 0;
        loop {
            let d0 = self.read_bit()?;
            let d1 = self.read_bit()?;
            if d0 && d1 {
                return Ok(n);
            }
            n = n * 3 + if d1 { 1 } else if d0 { 2 } else { 0 };
        }
    }

    fn read_bit(&mut self) -> Result<bool> {
        let bit = self.bits.get(self.pos).ok_or(Error::TruncatedInput)?;
        self.pos += 1;
        Ok(bit)
    }

    /// Bit position the reader is currently at (byte-aligns a following field).
    pub fn bit_pos(&self) -> usize {
        self.pos
    }
}
