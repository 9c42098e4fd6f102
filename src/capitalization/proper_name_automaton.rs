//! Buffers whole words and decides, from how often a word recurs capitalized
//! unexpectedly, whether it is a proper name.

use super::name_cache::NameCandidatesCache;
use super::ProperName;
use std::collections::HashMap;

const DEFAULT_BUFFER_SIZE: usize = 10000;
const DEFAULT_PROPER_NAME_THRESHOLD: i32 = 10;
const DEFAULT_NOT_A_PROPER_NAME_THRESHOLD: i32 = 0;

pub struct ProperNameAutomaton {
    cache: NameCandidatesCache,
    /// Confirmed proper names, keyed by lowercase spelling, value is the
    /// position of the occurrence that crossed the promotion threshold.
    proper_names: HashMap<Vec<u8>, u64>,
    pos: u64,
    word: Option<Vec<u8>>,
    word_start_pos: u64,
    /// Decided from the word's first byte only: is this occurrence a
    /// candidate for proper-name status (capitalized where not predicted)?
    word_is_candidate: bool,
}

impl ProperNameAutomaton {
    pub fn new() -> Self {
        ProperNameAutomaton {
            cache: NameCandidatesCache::new(
                DEFAULT_BUFFER_SIZE,
                DEFAULT_PROPER_NAME_THRESHOLD,
                DEFAULT_NOT_A_PROPER_NAME_THRESHOLD,
            ),
            proper_names: HashMap::new(),
            pos: 0,
            word: None,
            word_start_pos: 0,
            word_is_candidate: false,
        }
    }

    /// Feed the next byte `c`, with `predicted_capitalized` from the mechanical
    /// rule automata. Returns `(output, output_start_pos, flushed_word_is_known_name)`:
    /// `output` is empty while a word is still being buffered, or the flushed
    /// word plus `c` at a word boundary.
    pub fn feed_get_output(&mut self, c: u8, predicted_capitalized: bool) -> (Vec<u8>, u64, bool) {
        let pos = self.pos;
        self.pos += 1;

        if !c.is_ascii_alphabetic() {
            debug_assert!(!predicted_capitalized, "rule automata should never predict capitalization for a non-letter");
            if self.word.is_none() {
                return (vec![c], pos, false);
            }
            let (word, word_pos) = self.flush_word();
            let is_known = self.proper_names.contains_key(&to_ascii_lower(&word));
            let mut out = word;
            out.push(c);
            return (out, word_pos, is_known);
        }

        if self.word.is_none() {
            self.word_start_pos = pos;
            self.word_is_candidate = !predicted_capitalized && char::from(c).is_uppercase();
        }
        self.word.get_or_insert_with(Vec::new).push(c);
        (Vec::new(), pos, false)
    }

    /// Flush any word still buffered at end of stream.
    pub fn feed_end_and_get_output(&mut self) -> (Vec<u8>, u64, bool) {
        if self.word.is_none() {
            return (Vec::new(), self.pos, false);
        }
        let (word, word_pos) = self.flush_word();
        let is_known = self.proper_names.contains_key(&to_ascii_lower(&word));
        (word, word_pos, is_known)
    }

    pub fn get_proper_names(&self) -> Vec<ProperName> {
        self.proper_names.iter().map(|(word, &from_pos)| ProperName { word: word.clone(), from_pos }).collect()
    }

    fn flush_word(&mut self) -> (Vec<u8>, u64) {
        let word = self.word.take().expect("flush_word only called with a buffered word");
        let word_pos = self.word_start_pos;

        if word.first().is_some_and(|&b| char::from(b).is_lowercase()) {
            self.cache.found_as_not_proper_name(&word);
        }

        if !self.word_is_candidate {
            self.cache.found_as_maybe_not_proper_name(&word);
            return (word, word_pos);
        }

        let lower = to_ascii_lower(&word);
        if self.proper_names.contains_key(&lower) {
            return (word, word_pos);
        }
        if self.cache.found_as_proper_name(&word).is_some() {
            self.proper_names.insert(lower, word_pos);
        }
        (word, word_pos)
    }
}

impl Default for ProperNameAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

fn to_ascii_lower(word: &[u8]) -> Vec<u8> {
    word.iter().map(|b| b.to_ascii_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(a: &mut ProperNameAutomaton, s: &str, predicted: &[bool]) -> Vec<(Vec<u8>, u64, bool)> {
        s.bytes().zip(predicted.iter()).map(|(c, &p)| a.feed_get_output(c, p)).collect()
    }

    #[test]
    fn a_word_buffers_until_boundary() {
        let mut a = ProperNameAutomaton::new();
        let outs = feed_str(&mut a, "Rio ", &[false, false, false, false]);
        assert_eq!(outs[0], (Vec::new(), 0, false));
        assert_eq!(outs[3].0, b"Rio ".to_vec());
    }

    #[test]
    fn repeated_unpredicted_capitals_promote_to_proper_name() {
        let mut a = ProperNameAutomaton::new();
        for _ in 0..10 {
            feed_str(&mut a, "Rio ", &[false, false, false, false]);
        }
        assert_eq!(a.get_proper_names().len(), 1);
        assert_eq!(a.get_proper_names()[0].word, b"rio".to_vec());
    }

    #[test]
    fn lowercase_sighting_prevents_promotion() {
        let mut a = ProperNameAutomaton::new();
        for _ in 0..5 {
            feed_str(&mut a, "Rio ", &[false, false, false, false]);
        }
        feed_str(&mut a, "rio ", &[false, false, false, false]);
        for _ in 0..5 {
            feed_str(&mut a, "Rio ", &[false, false, false, false]);
        }
        assert!(a.get_proper_names().is_empty());
    }
}
