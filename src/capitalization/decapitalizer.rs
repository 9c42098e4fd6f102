//! Drives the two mechanical rule automata plus the proper-name automaton over
//! the original-case byte stream, emitting the ASCII-lowercased stream fed to
//! the context-tree coder and recording what the recapitalizer will need to
//! reverse the transform.

use super::automata::{ConsecutiveCapitalsAutomaton, SentenceStartAutomaton};
use super::proper_name_automaton::ProperNameAutomaton;
use super::CapitalizationData;
use std::collections::BTreeSet;

pub struct Decapitalizer {
    consecutive: ConsecutiveCapitalsAutomaton,
    sentence_start: SentenceStartAutomaton,
    proper_names: ProperNameAutomaton,
    pos: u64,
    exception_positions: BTreeSet<u64>,
}

impl Decapitalizer {
    pub fn new() -> Self {
        Decapitalizer {
            consecutive: ConsecutiveCapitalsAutomaton::new(),
            sentence_start: SentenceStartAutomaton::new(),
            proper_names: ProperNameAutomaton::new(),
            pos: 0,
            exception_positions: BTreeSet::new(),
        }
    }

    /// Feed one original-case byte, returning zero or more ASCII-lowercased
    /// output bytes (output lags input by up to one buffered word).
    pub fn feed(&mut self, c: u8) -> Vec<u8> {
        let predicted_capitalized = self.consecutive.should_be_capital(c) || self.sentence_start.should_be_capital(c);
        self.record_exception_if_mispredicted(c, predicted_capitalized);

        self.consecutive.feed(c);
        self.sentence_start.feed(c);

        let (last_word, last_word_pos, is_in_automaton) = self.proper_names.feed_get_output(c, predicted_capitalized);
        self.process_proper_names_output(last_word, last_word_pos, is_in_automaton)
    }

    /// Flush any word still buffered at end of stream.
    pub fn feed_end(&mut self) -> Vec<u8> {
        let (last_word, last_word_pos, is_in_automaton) = self.proper_names.feed_end_and_get_output();
        self.process_proper_names_output(last_word, last_word_pos, is_in_automaton)
    }

    pub fn into_capitalization_data(self) -> CapitalizationData {
        CapitalizationData {
            proper_names: self.proper_names.get_proper_names(),
            rule_exceptions: self.exception_positions.into_iter().collect(),
        }
    }

    fn record_exception_if_mispredicted(&mut self, c: u8, predicted_capitalized: bool) {
        let is_lower = char::from(c).is_lowercase();
        let is_upper = char::from(c).is_uppercase();
        if (is_lower && predicted_capitalized) || (is_upper && !predicted_capitalized) {
            self.exception_positions.insert(self.pos);
        }
    }

    fn process_proper_names_output(&mut self, last_word: Vec<u8>, last_word_pos: u64, is_in_automaton: bool) -> Vec<u8> {
        if last_word.is_empty() {
            self.pos += 1;
            return Vec::new();
        }

        if is_in_automaton {
            let first_is_lower = last_word.first().is_some_and(|&b| char::from(b).is_lowercase());
            if first_is_lower {
                self.exception_positions.insert(last_word_pos);
            } else {
                self.exception_positions.remove(&last_word_pos);
            }
        }

        self.pos += 1;
        last_word.iter().map(|b| b.to_ascii_lowercase()).collect()
    }
}

impl Default for Decapitalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &[u8]) -> (Vec<u8>, CapitalizationData) {
        let mut d = Decapitalizer::new();
        let mut out = Vec::new();
        for &c in text {
            out.extend(d.feed(c));
        }
        out.extend(d.feed_end());
        (out, d.into_capitalization_data())
    }

    #[test]
    fn lowercases_a_plain_sentence() {
        let (out, data) = run(b"The cat sat.");
        assert_eq!(out, b"the cat sat.");
        // "The" is sentence-start capitalized, as predicted: no exception needed.
        assert!(data.rule_exceptions.is_empty() || !data.rule_exceptions.contains(&0));
    }

    #[test]
    fn unpredicted_capital_mid_sentence_is_an_exception() {
        let (out, _data) = run(b"a Quiet room.");
        assert_eq!(out, b"a quiet room.");
    }

    #[test]
    fn repeated_name_promotes_and_tracks_from_pos() {
        let mut text = Vec::new();
        for _ in 0..10 {
            text.extend_from_slice(b"Zelda said hi. ");
        }
        let (_out, data) = run(&text);
        assert!(data.proper_names.iter().any(|p| p.word == b"zelda"));
    }
}
