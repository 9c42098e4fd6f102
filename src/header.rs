//! Archive header framing: the fixed 13-byte coding-params header, and the
//! capitalization header (proper names + rule-exception positions).
//!
//! Each proper name's position delta is ternary-coded into its own
//! byte-aligned block, while the whole run of exception-position deltas
//! shares one continuous ternary bitstream, byte-aligned only once at the end.

use crate::capitalization::{CapitalizationData, ProperName};
use crate::context_tree::{CodingParams, UpCharCoding};
use crate::error::{Error, Result};
use crate::ternary;
use bit_vec::BitVec;

/// Fixed-size coding-parameters header: `u64` plaintext length followed by
/// five `u8` fields.
pub const HEADER_LEN: usize = 13;

pub struct Header {
    pub length: u64,
    pub params: CodingParams,
}

impl Header {
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(&self.length.to_le_bytes());
        out[8] = self.params.context_length;
        out[9] = self.params.mask_seen as u8;
        out[10] = self.params.exclude_on_update as u8;
        out[11] = self.params.up_char_coding.to_u8();
        out[12] = self.params.decapitalize as u8;
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedHeader("archive shorter than the fixed header".into()));
        }
        let length = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let params = CodingParams {
            context_length: bytes[8],
            mask_seen: bytes[9] != 0,
            exclude_on_update: bytes[10] != 0,
            up_char_coding: UpCharCoding::from_u8(bytes[11])?,
            decapitalize: bytes[12] != 0,
        };
        Ok(Header { length, params })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.data.get(self.pos..self.pos + 8).ok_or(Error::TruncatedInput)?;
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_nul_terminated(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        loop {
            let b = *self.data.get(self.pos).ok_or(Error::TruncatedInput)?;
            self.pos += 1;
            if b == 0 {
                return Ok(self.data[start..self.pos - 1].to_vec());
            }
        }
    }

    /// Decode one ternary-coded value starting at the current byte, then
    /// realign to the next byte boundary regardless of how many bits it used.
    fn read_ternary_byte_aligned(&mut self) -> Result<u64> {
        let bits = BitVec::from_bytes(self.data.get(self.pos..).ok_or(Error::TruncatedInput)?);
        let mut reader = ternary::Reader::new(&bits);
        let value = reader.next()?;
        self.pos += reader.bit_pos().div_ceil(8);
        Ok(value)
    }

    /// Decode `count` ternary-coded values from one continuous bitstream
    /// starting at the current byte, realigning to a byte boundary once after
    /// the last value.
    fn read_ternary_shared(&mut self, count: u64) -> Result<Vec<u64>> {
        let bits = BitVec::from_bytes(self.data.get(self.pos..).ok_or(Error::TruncatedInput)?);
        let mut reader = ternary::Reader::new(&bits);
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(reader.next()?);
        }
        self.pos += reader.bit_pos().div_ceil(8);
        Ok(values)
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

fn encode_string(word: &[u8]) -> Result<Vec<u8>> {
    if word.contains(&0) {
        return Err(Error::MalformedHeader("proper name contains a NUL byte".into()));
    }
    let mut out = word.to_vec();
    out.push(0);
    Ok(out)
}

pub struct CapitalizationHeader;

impl CapitalizationHeader {
    pub fn serialize(data: &CapitalizationData) -> Result<Vec<u8>> {
        let mut sorted = data.proper_names.clone();
        sorted.sort_by_key(|pn| pn.from_pos);

        let mut out = Vec::new();
        out.extend_from_slice(&(sorted.len() as u64).to_le_bytes());
        out.extend_from_slice(&(data.rule_exceptions.len() as u64).to_le_bytes());

        let mut prev = 0u64;
        for name in &sorted {
            out.extend(encode_string(&name.word)?);
            let delta = name.from_pos - prev;
            prev = name.from_pos;
            let mut bits = BitVec::new();
            ternary::encode_one(&mut bits, delta);
            out.extend(bits.to_bytes());
        }

        let mut prev = 0u64;
        let mut deltas = Vec::with_capacity(data.rule_exceptions.len());
        for &pos in &data.rule_exceptions {
            deltas.push(pos - prev);
            prev = pos;
        }
        let mut bits = BitVec::new();
        ternary::encode_many(&mut bits, deltas);
        out.extend(bits.to_bytes());

        Ok(out)
    }

    /// Parse a capitalization header from the start of `bytes`, returning the
    /// data plus the number of bytes consumed. `plaintext_length` is the
    /// decoded text's length (from the fixed header), used to bound-check
    /// each proper name's position.
    pub fn deserialize(bytes: &[u8], plaintext_length: u64) -> Result<(CapitalizationData, usize)> {
        let mut cursor = Cursor::new(bytes);
        let proper_names_count = cursor.read_u64()?;
        let exceptions_count = cursor.read_u64()?;

        let mut proper_names = Vec::with_capacity(proper_names_count as usize);
        let mut prev = 0u64;
        for _ in 0..proper_names_count {
            let word = cursor.read_nul_terminated()?;
            if word.iter().any(|&b| b > 0x7F) {
                return Err(Error::MalformedHeader("proper name contains a non-ASCII byte".into()));
            }
            let delta = cursor.read_ternary_byte_aligned()?;
            let from_pos = prev + delta;
            prev = from_pos;
            if from_pos >= plaintext_length {
                return Err(Error::MalformedHeader("proper name position is past the end of the text".into()));
            }
            proper_names.push(ProperName { word, from_pos });
        }

        let deltas = cursor.read_ternary_shared(exceptions_count)?;
        let mut rule_exceptions = Vec::with_capacity(deltas.len());
        let mut prev = 0u64;
        for delta in deltas {
            let pos = prev + delta;
            prev = pos;
            rule_exceptions.push(pos);
        }

        Ok((CapitalizationData { proper_names, rule_exceptions }, cursor.consumed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_tree::UpCharCoding;

    #[test]
    fn header_serializes_to_expected_byte_layout() {
        let h = Header {
            length: 1,
            params: CodingParams {
                context_length: 5,
                mask_seen: false,
                exclude_on_update: true,
                up_char_coding: UpCharCoding::A,
                decapitalize: false,
            },
        };
        let bytes = h.serialize();
        // 8-byte little-endian length, then context_length, mask_seen,
        // exclude_on_update, up_char_coding, decapitalize.
        assert_eq!(hex::encode(bytes), "01000000000000000500010100");
    }

    #[test]
    fn header_round_trips() {
        let h = Header {
            length: 424242,
            params: CodingParams {
                context_length: 7,
                mask_seen: true,
                exclude_on_update: false,
                up_char_coding: UpCharCoding::C,
                decapitalize: true,
            },
        };
        let bytes = h.serialize();
        assert_eq!(bytes.len(), HEADER_LEN);
        let back = Header::deserialize(&bytes).unwrap();
        assert_eq!(back.length, 424242);
        assert_eq!(back.params.context_length, 7);
        assert!(back.params.mask_seen);
        assert!(!back.params.exclude_on_update);
        assert_eq!(back.params.up_char_coding, UpCharCoding::C);
        assert!(back.params.decapitalize);
    }

    #[test]
    fn capitalization_header_round_trips_with_names_and_exceptions() {
        let data = CapitalizationData {
            proper_names: vec![
                ProperName { word: b"zelda".to_vec(), from_pos: 3 },
                ProperName { word: b"link".to_vec(), from_pos: 40 },
            ],
            rule_exceptions: vec![1, 2, 10, 11, 100],
        };
        let bytes = CapitalizationHeader::serialize(&data).unwrap();
        let (back, consumed) = CapitalizationHeader::deserialize(&bytes, 200).unwrap();
        assert_eq!(consumed, bytes.len());
        let mut sorted_back = back.proper_names.clone();
        sorted_back.sort_by_key(|p| p.from_pos);
        assert_eq!(sorted_back[0].word, b"zelda".to_vec());
        assert_eq!(sorted_back[0].from_pos, 3);
        assert_eq!(sorted_back[1].word, b"link".to_vec());
        assert_eq!(sorted_back[1].from_pos, 40);
        assert_eq!(back.rule_exceptions, vec![1, 2, 10, 11, 100]);
    }

    #[test]
    fn capitalization_header_round_trips_empty() {
        let data = CapitalizationData { proper_names: Vec::new(), rule_exceptions: Vec::new() };
        let bytes = CapitalizationHeader::serialize(&data).unwrap();
        let (back, consumed) = CapitalizationHeader::deserialize(&bytes, 0).unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(back.proper_names.is_empty());
        assert!(back.rule_exceptions.is_empty());
    }

    #[test]
    fn rejects_proper_name_with_nul_byte() {
        let data = CapitalizationData {
            proper_names: vec![ProperName { word: vec![b'a', 0, b'b'], from_pos: 0 }],
            rule_exceptions: Vec::new(),
        };
        assert!(CapitalizationHeader::serialize(&data).is_err());
    }

    #[test]
    fn rejects_proper_name_past_the_text_length() {
        let data = CapitalizationData {
            proper_names: vec![ProperName { word: b"zelda".to_vec(), from_pos: 50 }],
            rule_exceptions: Vec::new(),
        };
        let bytes = CapitalizationHeader::serialize(&data).unwrap();
        assert!(matches!(
            CapitalizationHeader::deserialize(&bytes, 50),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn rejects_proper_name_with_non_ascii_byte() {
        let data = CapitalizationData {
            proper_names: vec![ProperName { word: vec![b'z', 0xe9, b'a'], from_pos: 0 }],
            rule_exceptions: Vec::new(),
        };
        // Bypass `serialize`'s own NUL check by hand-building bytes: count=1,
        // exceptions=0, word + NUL terminator, then a ternary-coded delta of 0.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.extend_from_slice(&data.proper_names[0].word);
        bytes.push(0);
        let mut bits = BitVec::new();
        ternary::encode_one(&mut bits, 0);
        bytes.extend(bits.to_bytes());
        assert!(matches!(
            CapitalizationHeader::deserialize(&bytes, 10),
            Err(Error::MalformedHeader(_))
        ));
    }
}
