//! Capitalization-normalization front end: strips case from the byte stream
//! fed to the context-tree coder, recording enough side information (a set of
//! recognized proper names and a list of positions where the mechanical
//! prediction rules disagreed with the actual text) to recapitalize exactly.

mod automata;
mod capitalizer;
mod decapitalizer;
mod name_cache;
mod proper_name_automaton;
mod trie;

pub use capitalizer::Capitalizer;
pub use decapitalizer::Decapitalizer;

/// A proper name recognized by the decapitalizer, with the byte position of
/// the occurrence that first crossed the promotion threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProperName {
    pub word: Vec<u8>,
    pub from_pos: u64,
}

/// Side information recorded by a `Decapitalizer` pass, enough for a
/// `Capitalizer` to reverse it exactly.
#[derive(Clone, Debug, Default)]
pub struct CapitalizationData {
    pub proper_names: Vec<ProperName>,
    pub rule_exceptions: Vec<u64>,
}

/// Lowercase the whole input, recording a `CapitalizationData` to reverse it.
pub fn decapitalize(text: &[u8]) -> (Vec<u8>, CapitalizationData) {
    let mut d = Decapitalizer::new();
    let mut out = Vec::with_capacity(text.len());
    for &c in text {
        out.extend(d.feed(c));
    }
    out.extend(d.feed_end());
    (out, d.into_capitalization_data())
}

/// Reapply a `CapitalizationData` recorded by `decapitalize` to a lowercased
/// byte stream.
pub fn capitalize(text: &[u8], data: CapitalizationData) -> Vec<u8> {
    let mut c = Capitalizer::new(data);
    let mut out = Vec::with_capacity(text.len());
    for &b in text {
        out.extend(c.feed(b));
    }
    out.extend(c.feed_end());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_mixed_case_paragraph() {
        let original = b"The Quick Brown fox. Zelda said Hi! Zelda left.\nZelda came back. Zelda waved. Zelda smiled. Zelda ran. Zelda jumped.";
        let (lowered, data) = decapitalize(original);
        assert_eq!(lowered, original.to_ascii_lowercase());
        let restored = capitalize(&lowered, data);
        assert_eq!(restored, original.to_vec());
    }

    #[test]
    fn round_trips_plain_ascii_text_with_no_proper_names() {
        let original = b"Hello there. How are you? I am fine!";
        let (lowered, data) = decapitalize(original);
        let restored = capitalize(&lowered, data);
        assert_eq!(restored, original.to_vec());
    }

    #[test]
    fn round_trips_empty_input() {
        let (lowered, data) = decapitalize(b"");
        assert!(lowered.is_empty());
        let restored = capitalize(&lowered, data);
        assert!(restored.is_empty());
    }
}
