//! Reverses a `Decapitalizer`'s transform: reapplies the two mechanical rules,
//! recognizes recorded proper names through a trailing buffer, and flips
//! whatever position the header's exception list names.
//!
//! `_last_chars`/`_last_predictions` need only a simple bounded FIFO, so
//! they're backed directly by `VecDeque`.

use super::automata::{ConsecutiveCapitalsAutomaton, SentenceStartAutomaton};
use super::trie::WordTrie;
use super::CapitalizationData;
use std::collections::{HashSet, VecDeque};

pub struct Capitalizer {
    consecutive: ConsecutiveCapitalsAutomaton,
    sentence_start: SentenceStartAutomaton,
    trie: WordTrie,
    exception_positions: HashSet<u64>,
    pos: u64,
    last_chars: VecDeque<u8>,
    last_predictions: VecDeque<bool>,
}

impl Capitalizer {
    pub fn new(data: CapitalizationData) -> Self {
        let trie = WordTrie::new(&data.proper_names);
        Capitalizer {
            consecutive: ConsecutiveCapitalsAutomaton::new(),
            sentence_start: SentenceStartAutomaton::new(),
            trie,
            exception_positions: data.rule_exceptions.into_iter().collect(),
            pos: 0,
            last_chars: VecDeque::new(),
            last_predictions: VecDeque::new(),
        }
    }

    /// Feed the next ASCII-lowercased byte, returning zero or more recapitalized
    /// output bytes (output lags input the same way `Decapitalizer::feed` does).
    pub fn feed(&mut self, c: u8) -> Vec<u8> {
        self.last_chars.push_back(c);
        self.last_predictions.push_back(false);

        if let Some(name) = self.trie.move_and_get_value(c) {
            if self.pos >= name.from_pos {
                let idx = self.last_predictions.len() - name.word.len() - 1;
                self.last_predictions[idx] = true;
            }
        }

        let max_buffer_length = self.trie.depth();
        let out = if max_buffer_length < self.last_chars.len() {
            self.flush_buf(max_buffer_length)
        } else {
            Vec::new()
        };
        self.pos += 1;
        out
    }

    /// Flush any bytes still buffered at end of stream.
    pub fn feed_end(&mut self) -> Vec<u8> {
        self.flush_buf(0)
    }

    fn flush_buf(&mut self, target_length: usize) -> Vec<u8> {
        let buffer_length = self.last_chars.len() as u64;
        let mut out = Vec::new();
        let to_flush = self.last_chars.len() - target_length;
        for buffer_idx in 0..to_flush {
            let c = self.last_chars.pop_front().expect("checked non-empty by to_flush");
            let predicted = self.last_predictions.pop_front().expect("kept in lockstep with last_chars");
            let mut should_be_capitalized =
                predicted || self.consecutive.should_be_capital(c) || self.sentence_start.should_be_capital(c);
            let pos_in_text = (self.pos + 1 + buffer_idx as u64).saturating_sub(buffer_length);
            if self.exception_positions.contains(&pos_in_text) {
                should_be_capitalized = !should_be_capitalized;
            }
            let out_c = if should_be_capitalized { c.to_ascii_uppercase() } else { c };
            self.consecutive.feed(out_c);
            self.sentence_start.feed(out_c);
            out.push(out_c);
        }
        out
    }
}
