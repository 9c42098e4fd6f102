//! Fixed-capacity scored candidate cache used to decide when a recurring
//! capitalized word is promoted to a proper name.
//!
//! Needs stable per-word pointers (a word's score cell is mutated and evicted
//! in place, independent of FIFO order), which a plain `VecDeque` cannot
//! express — so this is a small slot arena addressed by stable pointer, in
//! the same arena/index-handle idiom as `context_tree::Node`.

use std::collections::{HashMap, VecDeque};

struct Candidate {
    word: Vec<u8>,
    score: i32,
}

/// Fixed-capacity slot arena addressed by stable pointer (slot index).
/// Eviction can happen out of insertion order (a lowercase sighting evicts
/// its candidate immediately, wherever it sits), so free slots are tracked
/// by an explicit free list rather than assumed contiguous, and insertion
/// order for `pop_oldest_ptr` is tracked by a separate queue of live pointers.
struct SlotRing {
    slots: Vec<Option<Candidate>>,
    free: Vec<usize>,
    order: VecDeque<usize>,
    size: usize,
}

impl SlotRing {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SlotRing {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).collect(),
            order: VecDeque::new(),
            size: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    /// Store `candidate` in a free slot, returning its stable pointer.
    fn add(&mut self, candidate: Candidate) -> usize {
        assert!(!self.is_full(), "name cache ring buffer is full");
        let ptr = self.free.pop().expect("is_full() false implies a free slot exists");
        self.slots[ptr] = Some(candidate);
        self.order.push_back(ptr);
        self.size += 1;
        ptr
    }

    fn get_by_pointer(&self, ptr: usize) -> Option<&Candidate> {
        self.slots[ptr].as_ref()
    }

    fn get_mut_by_pointer(&mut self, ptr: usize) -> Option<&mut Candidate> {
        self.slots[ptr].as_mut()
    }

    fn clear_by_pointer(&mut self, ptr: usize) {
        if self.slots[ptr].take().is_some() {
            self.size -= 1;
            self.free.push(ptr);
            self.order.retain(|&p| p != ptr);
        }
    }

    /// Logical FIFO front (the oldest still-present slot). Does not itself
    /// remove the slot's contents; the caller evicts it separately.
    fn pop_oldest_ptr(&mut self) -> usize {
        assert!(self.size > 0, "name cache ring buffer is empty");
        self.order.pop_front().expect("size > 0 implies a live entry remains in order")
    }
}

/// Tracks recurring capitalized words and promotes them to confirmed proper
/// names once their score crosses a threshold.
pub struct NameCandidatesCache {
    ring: SlotRing,
    word_to_ptr: HashMap<Vec<u8>, usize>,
    proper_name_threshold: i32,
    not_a_proper_name_threshold: i32,
}

impl NameCandidatesCache {
    pub fn new(buffer_size: usize, proper_name_threshold: i32, not_a_proper_name_threshold: i32) -> Self {
        NameCandidatesCache {
            ring: SlotRing::new(buffer_size),
            word_to_ptr: HashMap::new(),
            proper_name_threshold,
            not_a_proper_name_threshold,
        }
    }

    fn evict(&mut self, ptr: usize) {
        if let Some(candidate) = self.ring.get_by_pointer(ptr) {
            self.word_to_ptr.remove(&candidate.word);
        }
        self.ring.clear_by_pointer(ptr);
    }

    /// Record another capitalized-unexpectedly occurrence of `word`. Returns
    /// `Some(word)` once its score crosses the promotion threshold.
    pub fn found_as_proper_name(&mut self, word: &[u8]) -> Option<Vec<u8>> {
        if let Some(&ptr) = self.word_to_ptr.get(word) {
            let promoted = {
                let candidate = self.ring.get_mut_by_pointer(ptr).expect("pointer tracked in word_to_ptr is live");
                candidate.score += 1;
                candidate.score >= self.proper_name_threshold
            };
            if promoted {
                let word = word.to_vec();
                self.evict(ptr);
                return Some(word);
            }
            return None;
        }

        if self.ring.is_full() {
            let oldest = self.ring.pop_oldest_ptr();
            self.evict(oldest);
        }
        let ptr = self.ring.add(Candidate { word: word.to_vec(), score: 1 });
        self.word_to_ptr.insert(word.to_vec(), ptr);
        None
    }

    /// Record an occurrence that argues against `word` being a proper name.
    pub fn found_as_maybe_not_proper_name(&mut self, word: &[u8]) {
        if let Some(&ptr) = self.word_to_ptr.get(word) {
            let evict = {
                let candidate = self.ring.get_mut_by_pointer(ptr).expect("pointer tracked in word_to_ptr is live");
                candidate.score -= 1;
                candidate.score <= self.not_a_proper_name_threshold
            };
            if evict {
                self.evict(ptr);
            }
        }
    }

    /// Unconditionally evict `word` from candidacy, if present.
    pub fn found_as_not_proper_name(&mut self, word: &[u8]) {
        if let Some(&ptr) = self.word_to_ptr.get(word) {
            self.evict(ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_after_threshold_occurrences() {
        let mut cache = NameCandidatesCache::new(10, 3, -10);
        assert_eq!(cache.found_as_proper_name(b"Xander"), None);
        assert_eq!(cache.found_as_proper_name(b"Xander"), None);
        assert_eq!(cache.found_as_proper_name(b"Xander"), Some(b"Xander".to_vec()));
        // promotion evicts the candidate; a fresh round starts the score over.
        assert_eq!(cache.found_as_proper_name(b"Xander"), None);
    }

    #[test]
    fn lowercase_sighting_evicts_candidate() {
        let mut cache = NameCandidatesCache::new(10, 3, -10);
        cache.found_as_proper_name(b"Rio");
        cache.found_as_not_proper_name(b"Rio");
        assert_eq!(cache.found_as_proper_name(b"Rio"), None);
        assert!(!cache.word_to_ptr.contains_key(b"Rio".as_slice()));
    }

    #[test]
    fn eviction_below_threshold_drops_candidate() {
        let mut cache = NameCandidatesCache::new(10, 100, -1);
        cache.found_as_proper_name(b"Meh");
        cache.found_as_maybe_not_proper_name(b"Meh");
        cache.found_as_maybe_not_proper_name(b"Meh");
        assert!(!cache.word_to_ptr.contains_key(b"Meh".as_slice()));
    }

    #[test]
    fn full_buffer_evicts_oldest_on_new_candidate() {
        let mut cache = NameCandidatesCache::new(2, 100, -100);
        cache.found_as_proper_name(b"One");
        cache.found_as_proper_name(b"Two");
        cache.found_as_proper_name(b"Three");
        assert!(!cache.word_to_ptr.contains_key(b"One".as_slice()));
        assert!(cache.word_to_ptr.contains_key(b"Two".as_slice()));
        assert!(cache.word_to_ptr.contains_key(b"Three".as_slice()));
    }
}
