//! Trie over lowercased proper-name spellings, used by the capitalizer to spot
//! a previously-recorded proper name as its bytes stream back in.

use super::ProperName;
use std::collections::HashMap;

struct State {
    depth: usize,
    word: Option<ProperName>,
    next: HashMap<u8, usize>,
}

impl State {
    fn new(depth: usize) -> Self {
        State { depth, word: None, next: HashMap::new() }
    }
}

const ROOT: usize = 0;
/// Dedicated sink state for "this byte run has left the trie" — a state, not a flag,
/// so `move_and_get_value` stays a uniform state-machine step.
const OFF_TRIE: usize = 1;

/// Trie keyed on lowercase proper-name bytes; tracks a cursor across successive
/// `move_and_get_value` calls and reports the matched name at each word boundary.
pub struct WordTrie {
    states: Vec<State>,
    current: usize,
}

impl WordTrie {
    pub fn new(names: &[ProperName]) -> Self {
        let mut states = vec![State::new(0), State::new(0)];
        for name in names {
            let mut cursor = ROOT;
            for (depth, &byte) in name.word.iter().enumerate() {
                cursor = match states[cursor].next.get(&byte) {
                    Some(&next) => next,
                    None => {
                        states.push(State::new(depth + 1));
                        let next = states.len() - 1;
                        states[cursor].next.insert(byte, next);
                        next
                    }
                };
            }
            states[cursor].word = Some(name.clone());
        }
        WordTrie { states, current: ROOT }
    }

    /// Depth of the trie cursor's current position.
    pub fn depth(&self) -> usize {
        self.states[self.current].depth
    }

    /// Feed the next lowercase byte of the word in progress. Returns `Some(name)`
    /// at a word boundary (`c` not ascii-alphabetic) if the just-finished word
    /// matched a recorded name, and resets the cursor to the root either way.
    pub fn move_and_get_value(&mut self, c: u8) -> Option<ProperName> {
        if let Some(&next) = self.states[self.current].next.get(&c) {
            self.current = next;
            return None;
        }
        if c.is_ascii_alphabetic() {
            self.current = OFF_TRIE;
            return None;
        }
        let found = self.states[self.current].word.clone();
        self.current = ROOT;
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(word: &str, from_pos: u64) -> ProperName {
        ProperName { word: word.as_bytes().to_vec(), from_pos }
    }

    #[test]
    fn matches_a_recorded_word_at_boundary() {
        let mut trie = WordTrie::new(&[name("john", 0)]);
        assert_eq!(trie.move_and_get_value(b'j'), None);
        assert_eq!(trie.move_and_get_value(b'o'), None);
        assert_eq!(trie.move_and_get_value(b'h'), None);
        assert_eq!(trie.move_and_get_value(b'n'), None);
        assert_eq!(trie.move_and_get_value(b' '), Some(name("john", 0)));
    }

    #[test]
    fn non_trie_letters_land_in_sink_until_boundary() {
        let mut trie = WordTrie::new(&[name("john", 0)]);
        trie.move_and_get_value(b'j');
        assert_eq!(trie.move_and_get_value(b'z'), None);
        assert_eq!(trie.current, OFF_TRIE);
        assert_eq!(trie.move_and_get_value(b' '), None);
        assert_eq!(trie.current, ROOT);
    }
}
