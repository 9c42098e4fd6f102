//! Left-context trie with per-node adaptive frequency distributions, escape
//! semantics, and the four novel-symbol weighting schemes. Nodes live in a
//! flat arena and refer to each other by index rather than through
//! shared-ownership reference counting, so parent/child/sibling links never
//! form a reference cycle.

use crate::error::{Error, Result};
use crate::fenwick::FenwickTree;
use crate::range_coder::{RangeDecoder, RangeEncoder};
use std::collections::{HashMap, HashSet, VecDeque};

const SIGMA: usize = 256;

/// Novel-symbol weighting scheme: controls how a node's distribution reacts
/// the first and second time a given byte is seen in that context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpCharCoding {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

impl UpCharCoding {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(UpCharCoding::A),
            2 => Ok(UpCharCoding::B),
            3 => Ok(UpCharCoding::C),
            4 => Ok(UpCharCoding::D),
            other => Err(Error::MalformedHeader(format!("bad up_char_coding value {other}"))),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Immutable configuration of the context tree, serialized verbatim into the
/// archive's fixed header.
#[derive(Clone, Copy, Debug)]
pub struct CodingParams {
    pub context_length: u8,
    pub mask_seen: bool,
    pub exclude_on_update: bool,
    pub up_char_coding: UpCharCoding,
    pub decapitalize: bool,
}

impl Default for CodingParams {
    fn default() -> Self {
        CodingParams {
            context_length: 5,
            mask_seen: false,
            exclude_on_update: false,
            up_char_coding: UpCharCoding::A,
            decapitalize: false,
        }
    }
}

type NodeId = usize;

struct Node {
    parent: Option<NodeId>,
    children: HashMap<u8, NodeId>,
    dist: FenwickTree,
    chars_to_indices: HashMap<u8, usize>,
    indices_to_chars: Vec<u8>,
    /// Scheme B only: symbols seen exactly once, not yet promoted to an index.
    seen_once: Option<HashSet<u8>>,
}

impl Node {
    fn new(parent: Option<NodeId>) -> Self {
        let mut dist = FenwickTree::new(1);
        dist.append(0);
        Node {
            parent,
            children: HashMap::new(),
            dist,
            chars_to_indices: HashMap::new(),
            indices_to_chars: vec![0; 1], // index 0 is the escape slot, byte value unused
            seen_once: None,
        }
    }

    fn char_count(&self) -> usize {
        self.chars_to_indices.len() + self.seen_once.as_ref().map_or(0, |s| s.len())
    }

    fn contains(&self, c: u8) -> bool {
        self.chars_to_indices.contains_key(&c) || self.seen_once.as_ref().is_some_and(|s| s.contains(&c))
    }

    fn alloc_index(&mut self, c: u8) -> usize {
        let idx = self.indices_to_chars.len();
        self.chars_to_indices.insert(c, idx);
        self.indices_to_chars.push(c);
        idx
    }

    /// Update this node's distribution for observed symbol `c` under `scheme`.
    ///
    /// Scheme B tracks pending (seen-once) symbols in a real per-node set:
    /// each pending symbol is promoted to an indexed one independently, on its
    /// own second occurrence (see DESIGN.md for why this is the intended
    /// behavior rather than a narrower single-slot version of it).
    fn add(&mut self, c: u8, scheme: UpCharCoding) {
        if let Some(&idx) = self.chars_to_indices.get(&c) {
            match scheme {
                UpCharCoding::D => self.dist.add(idx, 2),
                _ => self.dist.add(idx, 1),
            }
            return;
        }

        match scheme {
            UpCharCoding::A => {
                let _ = self.alloc_index(c);
                self.dist.set(0, 1);
                self.dist.append(1);
            }
            UpCharCoding::B => {
                let pending = self.seen_once.get_or_insert_with(HashSet::new);
                if pending.contains(&c) {
                    pending.remove(&c);
                    if pending.is_empty() {
                        self.seen_once = None;
                    }
                    let _ = self.alloc_index(c);
                    self.dist.append(1);
                } else {
                    pending.insert(c);
                    self.dist.add(0, 1);
                }
            }
            UpCharCoding::C | UpCharCoding::D => {
                let _ = self.alloc_index(c);
                self.dist.append(1);
                self.dist.add(0, 1);
            }
        }
    }
}

/// Synthetic order-(-1) context: uniform over the whole byte alphabet (or
/// lowercase-only alphabet under `decapitalize`), never escapes.
struct PseudoRoot {
    /// `index_to_byte[i]` is the byte coded at index `i`.
    index_to_byte: Vec<u8>,
    byte_to_index: HashMap<u8, usize>,
    dist: FenwickTree,
}

impl PseudoRoot {
    fn new(decapitalize: bool) -> Self {
        let alphabet: Vec<u8> = (0..SIGMA as u32)
            .map(|c| c as u8)
            .filter(|&b| !(decapitalize && (b as char).is_ascii_uppercase()))
            .collect();
        let mut dist = FenwickTree::new(alphabet.len());
        for _ in &alphabet {
            dist.append(1);
        }
        let byte_to_index = alphabet.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        PseudoRoot { index_to_byte: alphabet, byte_to_index, dist }
    }

    /// Update for an observed symbol. Every byte already has a permanent index
    /// here, so this is always the "existing symbol" case of the weighting
    /// scheme: scheme D doubles the increment, the others add one.
    fn add(&mut self, c: u8, scheme: UpCharCoding) {
        let idx = self.byte_to_index[&c];
        match scheme {
            UpCharCoding::D => self.dist.add(idx, 2),
            _ => self.dist.add(idx, 1),
        }
    }
}

/// Variable-order adaptive context model driving the range coder.
pub struct ContextTree {
    params: CodingParams,
    pseudo_root: PseudoRoot,
    arena: Vec<Node>,
    root: Option<NodeId>,
    window: VecDeque<u8>,
}

/// Which node resolved (or attempted to resolve) a symbol, used to pick the
/// update-tree starting rule under `exclude_on_update`.
enum EncodingCtx {
    PseudoRoot,
    Node(NodeId),
}

impl ContextTree {
    pub fn new(params: CodingParams) -> Self {
        ContextTree {
            pseudo_root: PseudoRoot::new(params.decapitalize),
            params,
            arena: Vec::new(),
            root: None,
            window: VecDeque::with_capacity(params.context_length.max(1) as usize),
        }
    }

    fn go_down(&self) -> Option<NodeId> {
        let mut current = self.root?;
        for &c in self.window.iter().rev() {
            match self.arena[current].children.get(&c) {
                Some(&child) => current = child,
                None => return Some(current),
            }
        }
        Some(current)
    }

    fn extend_down(&mut self) -> NodeId {
        if self.root.is_none() {
            self.arena.push(Node::new(None));
            self.root = Some(self.arena.len() - 1);
        }
        let mut current = self.root.unwrap();
        for &c in self.window.iter().rev() {
            current = match self.arena[current].children.get(&c) {
                Some(&child) => child,
                None => {
                    self.arena.push(Node::new(Some(current)));
                    let child = self.arena.len() - 1;
                    self.arena[current].children.insert(c, child);
                    child
                }
            };
        }
        current
    }

    fn slide_window(&mut self, c: u8) {
        self.window.push_back(c);
        let k = self.params.context_length.max(1) as usize;
        while self.window.len() > k {
            self.window.pop_front();
        }
    }

    /// Encode byte `c`, emitting (distribution, index) pairs to `encoder`.
    pub fn encode(&mut self, encoder: &mut RangeEncoder, c: u8) -> Result<()> {
        let encoding_ctx = if self.params.mask_seen {
            self.encode_masked(encoder, c)?
        } else {
            self.encode_unmasked(encoder, c)?
        };
        self.update_tree(c, encoding_ctx);
        self.slide_window(c);
        Ok(())
    }

    fn encode_unmasked(&mut self, encoder: &mut RangeEncoder, c: u8) -> Result<EncodingCtx> {
        let mut current = self.go_down();
        loop {
            match current {
                None => {
                    let idx = *self.pseudo_root.byte_to_index.get(&c).expect("pseudo-root covers all codeable bytes");
                    encoder.encode(&self.pseudo_root.dist, idx)?;
                    return Ok(EncodingCtx::PseudoRoot);
                }
                Some(id) => {
                    let node = &self.arena[id];
                    if let Some(&idx) = node.chars_to_indices.get(&c) {
                        encoder.encode(&node.dist, idx)?;
                        return Ok(EncodingCtx::Node(id));
                    }
                    encoder.encode(&node.dist, 0)?;
                    current = node.parent;
                }
            }
        }
    }

    fn encode_masked(&mut self, encoder: &mut RangeEncoder, c: u8) -> Result<EncodingCtx> {
        let mut current = self.go_down();
        let mut excluded: HashSet<u8> = HashSet::new();
        loop {
            match current {
                None => {
                    let index_to_byte = &self.pseudo_root.index_to_byte;
                    let (view, mapping) =
                        self.pseudo_root.dist.masked_view(|i| !excluded.contains(&index_to_byte[i]));
                    let target = mapping
                        .iter()
                        .position(|&orig| index_to_byte[orig] == c)
                        .expect("pseudo-root masked view always retains the codeable byte");
                    encoder.encode(&view, target)?;
                    return Ok(EncodingCtx::PseudoRoot);
                }
                Some(id) => {
                    let node = &self.arena[id];
                    let (view, mapping) = node.dist.masked_view(|i| i == 0 || !excluded.contains(&node.indices_to_chars[i]));
                    let target = node
                        .chars_to_indices
                        .get(&c)
                        .and_then(|&orig| mapping.iter().position(|&m| m == orig));
                    if let Some(target) = target {
                        encoder.encode(&view, target)?;
                        return Ok(EncodingCtx::Node(id));
                    }
                    encoder.encode(&view, 0)?;
                    for &b in node.indices_to_chars.iter().skip(1) {
                        excluded.insert(b);
                    }
                    current = node.parent;
                }
            }
        }
    }

    /// Decode one byte, consuming bits from `decoder`.
    pub fn decode(&mut self, decoder: &mut RangeDecoder) -> Result<u8> {
        let (byte, encoding_ctx) = if self.params.mask_seen {
            self.decode_masked(decoder)?
        } else {
            self.decode_unmasked(decoder)?
        };
        self.update_tree(byte, encoding_ctx);
        self.slide_window(byte);
        Ok(byte)
    }

    fn decode_unmasked(&mut self, decoder: &mut RangeDecoder) -> Result<(u8, EncodingCtx)> {
        let mut current = self.go_down();
        loop {
            match current {
                None => {
                    let idx = decoder.decode(&self.pseudo_root.dist)?;
                    let byte = *self
                        .pseudo_root
                        .index_to_byte
                        .get(idx)
                        .ok_or_else(|| Error::InvalidModel("pseudo-root index out of range".into()))?;
                    return Ok((byte, EncodingCtx::PseudoRoot));
                }
                Some(id) => {
                    let node = &self.arena[id];
                    let idx = decoder.decode(&node.dist)?;
                    if idx == 0 {
                        current = node.parent;
                    } else {
                        let byte = node.indices_to_chars[idx];
                        return Ok((byte, EncodingCtx::Node(id)));
                    }
                }
            }
        }
    }

    fn decode_masked(&mut self, decoder: &mut RangeDecoder) -> Result<(u8, EncodingCtx)> {
        let mut current = self.go_down();
        let mut excluded: HashSet<u8> = HashSet::new();
        loop {
            match current {
                None => {
                    let retain_idx: Vec<usize> = self
                        .pseudo_root
                        .index_to_byte
                        .iter()
                        .enumerate()
                        .filter(|(_, &b)| !excluded.contains(&b))
                        .map(|(i, _)| i)
                        .collect();
                    let (view, mapping) = self.pseudo_root.dist.masked_view(|i| retain_idx.contains(&i));
                    let target = decoder.decode(&view)?;
                    let byte = self.pseudo_root.index_to_byte[mapping[target]];
                    return Ok((byte, EncodingCtx::PseudoRoot));
                }
                Some(id) => {
                    let node = &self.arena[id];
                    let (view, mapping) = node.dist.masked_view(|i| i == 0 || !excluded.contains(&node.indices_to_chars[i]));
                    let target = decoder.decode(&view)?;
                    if target == 0 {
                        for &b in node.indices_to_chars.iter().skip(1) {
                            excluded.insert(b);
                        }
                        current = node.parent;
                    } else {
                        let byte = node.indices_to_chars[mapping[target]];
                        return Ok((byte, EncodingCtx::Node(id)));
                    }
                }
            }
        }
    }

    fn update_tree(&mut self, c: u8, encoding_ctx: EncodingCtx) {
        let deepest = self.extend_down();

        if !self.params.exclude_on_update {
            let mut current = Some(deepest);
            while let Some(id) = current {
                self.arena[id].add(c, self.params.up_char_coding);
                current = self.arena[id].parent;
            }
            return;
        }

        let encoding_node = match encoding_ctx {
            EncodingCtx::PseudoRoot => None,
            EncodingCtx::Node(id) => Some(id),
        };

        if Some(deepest) != encoding_node {
            let mut current = deepest;
            loop {
                self.arena[current].add(c, self.params.up_char_coding);
                if Some(current) == encoding_node {
                    break;
                }
                match self.arena[current].parent {
                    Some(p) => current = p,
                    None => {
                        // Exhausted all real nodes without matching encoding_node: the
                        // symbol escaped all the way through, so the walk continues
                        // onto the pseudo-root and updates it once.
                        self.pseudo_root.add(c, self.params.up_char_coding);
                        break;
                    }
                }
            }
        } else {
            let mut current = Some(deepest);
            loop {
                match current {
                    None => break,
                    Some(id) => {
                        let count = self.arena[id].char_count();
                        if !(count == 0 || (count == 1 && self.arena[id].contains(c))) {
                            break;
                        }
                        self.arena[id].add(c, self.params.up_char_coding);
                        current = self.arena[id].parent;
                    }
                }
            }
        }
    }
}
