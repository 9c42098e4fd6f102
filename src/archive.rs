//! Top-level archive format: ties the capitalization front end, context-tree
//! model, and range coder together behind the byte layout in `header.rs`.

use crate::capitalization::{self, CapitalizationData};
use crate::context_tree::{CodingParams, ContextTree};
use crate::error::{Error, Result};
use crate::header::{CapitalizationHeader, Header, HEADER_LEN};
use crate::range_coder::{RangeDecoder, RangeEncoder};

/// Compress `input` under `params`, returning the full archive bytes.
pub fn compress(input: &[u8], params: CodingParams) -> Result<Vec<u8>> {
    let (text, cap_data): (Vec<u8>, Option<CapitalizationData>) = if params.decapitalize {
        let (lowered, data) = capitalization::decapitalize(input);
        (lowered, Some(data))
    } else {
        (input.to_vec(), None)
    };

    let header = Header { length: text.len() as u64, params };
    let mut out = header.serialize().to_vec();

    if let Some(data) = &cap_data {
        out.extend(CapitalizationHeader::serialize(data)?);
    }

    let mut tree = ContextTree::new(params);
    let mut encoder = RangeEncoder::new();
    for &b in &text {
        tree.encode(&mut encoder, b)?;
    }
    out.extend(encoder.finish());

    Ok(out)
}

/// Expand an archive produced by `compress`, returning the original bytes.
pub fn expand(archive: &[u8]) -> Result<Vec<u8>> {
    if archive.len() < HEADER_LEN {
        return Err(Error::MalformedHeader("archive shorter than the fixed header".into()));
    }
    let header = Header::deserialize(&archive[..HEADER_LEN])?;
    let mut rest = &archive[HEADER_LEN..];

    let cap_data = if header.params.decapitalize {
        if rest.is_empty() {
            return Err(Error::MalformedHeader("decapitalize flag set but capitalization header missing".into()));
        }
        let (data, consumed) = CapitalizationHeader::deserialize(rest, header.length).map_err(|e| match e {
            Error::TruncatedInput => {
                Error::MalformedHeader("decapitalize flag set but capitalization header missing".into())
            }
            other => other,
        })?;
        rest = &rest[consumed..];
        Some(data)
    } else {
        None
    };

    let mut tree = ContextTree::new(header.params);
    let mut decoder = RangeDecoder::new(rest);
    let mut text = Vec::with_capacity(header.length as usize);
    for _ in 0..header.length {
        text.push(tree.decode(&mut decoder)?);
    }

    match cap_data {
        Some(data) => Ok(capitalization::capitalize(&text, data)),
        None => Ok(text),
    }
}

/// Round-trip `original` through `compress`/`expand` and confirm it matches.
/// Used by the benchmark harness, not by normal `zip`/`unzip` operation.
pub fn verify_round_trip(original: &[u8], params: CodingParams) -> Result<()> {
    let archive = compress(original, params)?;
    let restored = expand(&archive)?;
    if restored.len() != original.len() {
        return Err(Error::RoundTripMismatch(original.len().min(restored.len())));
    }
    for (i, (a, b)) in original.iter().zip(restored.iter()).enumerate() {
        if a != b {
            return Err(Error::RoundTripMismatch(i));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_tree::UpCharCoding;

    fn params(decapitalize: bool) -> CodingParams {
        CodingParams { context_length: 5, mask_seen: false, exclude_on_update: false, up_char_coding: UpCharCoding::A, decapitalize }
    }

    #[test]
    fn round_trips_plain_bytes_without_decapitalize() {
        let input = b"The quick brown fox jumps over the lazy dog.".to_vec();
        let archive = compress(&input, params(false)).unwrap();
        let restored = expand(&archive).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn round_trips_with_decapitalize_and_proper_names() {
        let mut input = Vec::new();
        for _ in 0..10 {
            input.extend_from_slice(b"Zelda said hi. ");
        }
        let archive = compress(&input, params(true)).unwrap();
        let restored = expand(&archive).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn round_trips_empty_input() {
        let archive = compress(&[], params(false)).unwrap();
        let restored = expand(&archive).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn verify_round_trip_passes_on_consistent_archive() {
        let input = b"abcabcabc".to_vec();
        assert!(verify_round_trip(&input, params(false)).is_ok());
    }

    #[test]
    fn rejects_severely_truncated_archive() {
        let mut input = Vec::new();
        for _ in 0..50 {
            input.extend_from_slice(b"hello world, this is a longer sample of text. ");
        }
        let archive = compress(&input, params(false)).unwrap();
        let truncated = &archive[..HEADER_LEN + 1];
        assert!(expand(truncated).is_err());
    }

    #[test]
    fn rejects_archive_shorter_than_fixed_header() {
        assert!(expand(&[0u8; 3]).is_err());
    }

    #[test]
    fn reports_malformed_header_when_decapitalize_set_but_cap_header_missing() {
        let header = Header { length: 5, params: params(true) };
        let archive = header.serialize().to_vec();
        assert!(matches!(expand(&archive), Err(Error::MalformedHeader(_))));
    }
}
