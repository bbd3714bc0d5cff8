//! Ternary search trie mapping byte strings to dictionary codes.
//!
//! Nodes live in a single arena and refer to each other by index, so lookups
//! and inserts are loops rather than recursion.

use std::cmp::Ordering;

/// Index of a node in the arena.
type NodeId = u32;

#[derive(Debug, Clone, Copy)]
enum Link {
    Lo,
    Eq,
    Hi,
}

#[derive(Debug, Clone)]
struct Node {
    byte: u8,
    lo: Option<NodeId>,
    eq: Option<NodeId>,
    hi: Option<NodeId>,
    value: Option<u32>,
}

impl Node {
    fn new(byte: u8) -> Self {
        Node {
            byte,
            lo: None,
            eq: None,
            hi: None,
            value: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TernarySearchTrie {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    len: usize,
}

impl TernarySearchTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        TernarySearchTrie {
            nodes: Vec::with_capacity(nodes),
            root: None,
            len: 0,
        }
    }

    /// Number of keys with a value.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn alloc(&mut self, byte: u8) -> NodeId {
        self.nodes.push(Node::new(byte));
        (self.nodes.len() - 1) as NodeId
    }

    /// Associate `value` with `key`, replacing any previous value.
    /// Empty keys are ignored.
    pub fn put(&mut self, key: &[u8], value: u32) {
        if key.is_empty() {
            return;
        }

        let mut id = match self.root {
            Some(id) => id,
            None => {
                let id = self.alloc(key[0]);
                self.root = Some(id);
                id
            }
        };

        let mut depth = 0;
        loop {
            let byte = key[depth];
            let node = &self.nodes[id as usize];
            let link = match byte.cmp(&node.byte) {
                Ordering::Less => Link::Lo,
                Ordering::Greater => Link::Hi,
                Ordering::Equal if depth + 1 < key.len() => {
                    depth += 1;
                    Link::Eq
                }
                Ordering::Equal => {
                    if self.nodes[id as usize].value.replace(value).is_none() {
                        self.len += 1;
                    }
                    return;
                }
            };

            id = match self.child(id, link) {
                Some(next) => next,
                None => {
                    let next = self.alloc(key[depth]);
                    *self.child_mut(id, link) = Some(next);
                    next
                }
            };
        }
    }

    fn child(&self, id: NodeId, link: Link) -> Option<NodeId> {
        let node = &self.nodes[id as usize];
        match link {
            Link::Lo => node.lo,
            Link::Eq => node.eq,
            Link::Hi => node.hi,
        }
    }

    fn child_mut(&mut self, id: NodeId, link: Link) -> &mut Option<NodeId> {
        let node = &mut self.nodes[id as usize];
        match link {
            Link::Lo => &mut node.lo,
            Link::Eq => &mut node.eq,
            Link::Hi => &mut node.hi,
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<u32> {
        if key.is_empty() {
            return None;
        }
        let mut cursor = self.root;
        let mut depth = 0;
        while let Some(id) = cursor {
            let node = &self.nodes[id as usize];
            let byte = key[depth];
            if byte < node.byte {
                cursor = node.lo;
            } else if byte > node.byte {
                cursor = node.hi;
            } else if depth + 1 < key.len() {
                depth += 1;
                cursor = node.eq;
            } else {
                return node.value;
            }
        }
        None
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Longest key that is a prefix of `text[start..]`, as its length and
    /// value. `None` when no key matches even one byte.
    pub fn longest_prefix_of(&self, text: &[u8], start: usize) -> Option<(usize, u32)> {
        let mut best = None;
        let mut cursor = self.root;
        let mut pos = start;
        while pos < text.len() {
            let Some(id) = cursor else { break };
            let node = &self.nodes[id as usize];
            let byte = text[pos];
            if byte < node.byte {
                cursor = node.lo;
            } else if byte > node.byte {
                cursor = node.hi;
            } else {
                pos += 1;
                if let Some(value) = node.value {
                    best = Some((pos - start, value));
                }
                cursor = node.eq;
            }
        }
        best
    }
}
