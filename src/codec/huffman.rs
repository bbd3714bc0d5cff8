//! Huffman coding over bytes.
//!
//! A compressed stream is laid out big-endian as
//!
//! ```text
//! [tree length: u32][tree bytes][bit count: u64][codewords]
//! ```
//!
//! The tree is written in pre-order: a `0` tag bit for an internal node, a `1`
//! tag bit followed by the eight bits of the byte value for a leaf. Tag and
//! codeword bits are packed MSB-first and the last byte of each section is
//! zero-padded. Decoding stops after exactly `bit count` bits.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::debug;

use crate::bits::{BitReader, BitWriter, ByteReader};
use crate::codec::Compression;
use crate::error::{Error, Result, Stage};

/// A tree over 256 symbols never has more nodes than this.
const MAX_TREE_NODES: usize = 2 * 256 - 1;

/// Codewords are held in a `u64`.
const MAX_CODE_LEN: u8 = 64;

/// Occurrence count of every byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; 256],
}

impl FrequencyTable {
    pub fn new() -> Self {
        FrequencyTable { counts: [0; 256] }
    }

    pub fn from_bytes(input: &[u8]) -> Self {
        let mut table = Self::new();
        table.count(input);
        table
    }

    /// Add the bytes of `input` to the running counts.
    pub fn count(&mut self, input: &[u8]) {
        for &byte in input {
            self.counts[byte as usize] += 1;
        }
    }

    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of byte values that occur at least once.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Byte values with a nonzero count, in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(byte, &count)| (byte as u8, count))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents a node in the Huffman tree.
///
/// Trees read back from a stream carry zero frequencies; only their shape
/// and leaf values are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffmanNode {
    /// A leaf node contains a byte value and its frequency.
    Leaf { byte: u8, freq: u64 },
    /// An internal node with left and right children and combined frequency.
    Internal {
        freq: u64,
        left: Box<HuffmanNode>,
        right: Box<HuffmanNode>,
    },
}

impl HuffmanNode {
    /// Returns the frequency of the node.
    pub fn freq(&self) -> u64 {
        match self {
            HuffmanNode::Leaf { freq, .. } => *freq,
            HuffmanNode::Internal { freq, .. } => *freq,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            HuffmanNode::Leaf { .. } => 1,
            HuffmanNode::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }
}

/// Priority queue entry. `BinaryHeap` is a max-heap, so the ordering is
/// reversed: lowest frequency first, then lowest sequence number.
///
/// Leaves take their byte value as sequence number and internal nodes take
/// 256, 257, ... in creation order, which makes tree construction
/// independent of hash or heap iteration order.
#[derive(Debug)]
struct QueueEntry {
    freq: u64,
    seq: u32,
    node: Box<HuffmanNode>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build the Huffman tree given a frequency table.
/// Returns `None` if the frequency table is empty.
///
/// The first node popped from the queue becomes the left child of the merged
/// node. A table with one distinct byte yields a lone leaf.
pub fn build_huffman_tree(freq: &FrequencyTable) -> Option<HuffmanNode> {
    let mut heap = BinaryHeap::with_capacity(freq.distinct());
    for (byte, count) in freq.iter() {
        heap.push(QueueEntry {
            freq: count,
            seq: byte as u32,
            node: Box::new(HuffmanNode::Leaf { byte, freq: count }),
        });
    }

    let mut next_seq = 256;
    loop {
        let left = heap.pop()?;
        let Some(right) = heap.pop() else {
            return Some(*left.node);
        };
        let combined = left.freq + right.freq;
        heap.push(QueueEntry {
            freq: combined,
            seq: next_seq,
            node: Box::new(HuffmanNode::Internal {
                freq: combined,
                left: left.node,
                right: right.node,
            }),
        });
        next_seq += 1;
    }
}

/// A codeword: the low `len` bits of `bits`, most-significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub len: u8,
}

/// Codeword for every byte value present in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: [Option<Code>; 256],
}

impl CodeTable {
    /// Assign codes by depth-first traversal, `0` on left edges and `1` on
    /// right edges. A lone leaf gets the 1-bit code `0`.
    pub fn from_tree(tree: &HuffmanNode) -> Result<Self> {
        let mut table = CodeTable {
            codes: [None; 256],
        };
        match tree {
            HuffmanNode::Leaf { byte, .. } => {
                table.codes[*byte as usize] = Some(Code { bits: 0, len: 1 });
            }
            HuffmanNode::Internal { .. } => table.assign(tree, 0, 0)?,
        }
        Ok(table)
    }

    fn assign(&mut self, node: &HuffmanNode, bits: u64, len: u8) -> Result<()> {
        match node {
            HuffmanNode::Leaf { byte, .. } => {
                self.codes[*byte as usize] = Some(Code { bits, len });
            }
            HuffmanNode::Internal { left, right, .. } => {
                if len == MAX_CODE_LEN {
                    return Err(Error::invalid("Huffman code longer than 64 bits"));
                }
                self.assign(left, bits << 1, len + 1)?;
                self.assign(right, (bits << 1) | 1, len + 1)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, byte: u8) -> Option<Code> {
        self.codes[byte as usize]
    }

    /// Assigned codes in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(byte, code)| code.map(|code| (byte as u8, code)))
    }
}

/// Serialize a tree as pre-order tag bits with 8-bit leaf payloads.
pub fn serialize_tree(tree: &HuffmanNode) -> Vec<u8> {
    fn write(node: &HuffmanNode, writer: &mut BitWriter) {
        match node {
            HuffmanNode::Leaf { byte, .. } => {
                writer.write_bit(true);
                writer.write_bits(*byte as u64, 8);
            }
            HuffmanNode::Internal { left, right, .. } => {
                writer.write_bit(false);
                write(left, writer);
                write(right, writer);
            }
        }
    }

    let mut writer = BitWriter::new();
    write(tree, &mut writer);
    writer.finish().0
}

/// Rebuild a tree written by [`serialize_tree`].
///
/// Fails if the tag stream ends early, describes more nodes than a byte
/// alphabet allows, repeats a leaf value, or is followed by whole unused bytes.
pub fn deserialize_tree(bytes: &[u8]) -> Result<HuffmanNode> {
    struct TreeReader<'a> {
        bits: BitReader<'a>,
        nodes: usize,
        seen: [bool; 256],
    }

    impl TreeReader<'_> {
        fn node(&mut self) -> Result<HuffmanNode> {
            self.nodes += 1;
            if self.nodes > MAX_TREE_NODES {
                return Err(Error::malformed(
                    Stage::Tree,
                    format!("more than {MAX_TREE_NODES} nodes"),
                ));
            }
            let tag = self
                .bits
                .read_bit()
                .ok_or_else(|| Error::malformed(Stage::Tree, "tag stream ends early"))?;
            if tag {
                let byte = self
                    .bits
                    .read_bits(8)
                    .ok_or_else(|| Error::malformed(Stage::Tree, "leaf value cut short"))?
                    as u8;
                if std::mem::replace(&mut self.seen[byte as usize], true) {
                    return Err(Error::malformed(
                        Stage::Tree,
                        format!("duplicate leaf {byte:#04x}"),
                    ));
                }
                Ok(HuffmanNode::Leaf { byte, freq: 0 })
            } else {
                let left = Box::new(self.node()?);
                let right = Box::new(self.node()?);
                Ok(HuffmanNode::Internal {
                    freq: 0,
                    left,
                    right,
                })
            }
        }
    }

    let mut reader = TreeReader {
        bits: BitReader::new(bytes),
        nodes: 0,
        seen: [false; 256],
    };
    let tree = reader.node()?;
    if reader.bits.remaining() >= 8 {
        return Err(Error::malformed(
            Stage::Tree,
            format!(
                "{} unused bytes after the tree",
                reader.bits.remaining() / 8
            ),
        ));
    }
    Ok(tree)
}

/// Encode input bytes with the provided code table.
///
/// Returns the packed codewords and the number of meaningful bits.
pub fn encode_bits(table: &CodeTable, input: &[u8]) -> Result<(Vec<u8>, u64)> {
    let mut writer = BitWriter::with_capacity(input.len() * 8);
    for &byte in input {
        let code = table
            .get(byte)
            .ok_or_else(|| Error::invalid(format!("byte {byte:#04x} has no Huffman code")))?;
        writer.write_bits(code.bits, code.len as u32);
    }
    Ok(writer.finish())
}

/// Decode exactly `bit_count` bits of `data` by walking the tree.
///
/// A bit of `1` moves to the right child and `0` to the left. When the tree
/// is a lone leaf, every bit stands for one occurrence of that leaf.
pub fn decode_bits(tree: &HuffmanNode, data: &[u8], bit_count: u64) -> Result<Vec<u8>> {
    let mut reader = BitReader::with_len(data, bit_count)
        .ok_or_else(|| Error::truncated(Stage::Payload, bit_count, data.len() as u64 * 8))?;

    if let HuffmanNode::Leaf { byte, .. } = tree {
        return Ok(vec![*byte; reader.remaining()]);
    }

    let mut output = Vec::new();
    let mut node = tree;
    let mut depth = 0usize;
    while let Some(bit) = reader.read_bit() {
        if let HuffmanNode::Internal { left, right, .. } = node {
            node = if bit { &**right } else { &**left };
            depth += 1;
        }
        if let HuffmanNode::Leaf { byte, .. } = node {
            output.push(*byte);
            node = tree;
            depth = 0;
        }
    }

    if depth != 0 {
        // The stored count stops partway through a codeword.
        return Err(Error::truncated(Stage::Payload, bit_count + 1, bit_count));
    }
    Ok(output)
}

/// Compress `input` into the self-describing Huffman layout.
///
/// Empty input produces a zero-length tree and a zero bit count.
///
/// # Example
///
/// ```
/// use seqzip::codec::huffman;
///
/// let packed = huffman::encode(b"ACGTTTTT").unwrap();
/// assert_eq!(huffman::decode(&packed).unwrap(), b"ACGTTTTT");
/// ```
pub fn encode(input: &[u8]) -> Result<Vec<u8>> {
    let freq = FrequencyTable::from_bytes(input);
    let tree = build_huffman_tree(&freq);

    let tree_bytes = tree.as_ref().map(serialize_tree).unwrap_or_default();
    let tree_len = u32::try_from(tree_bytes.len())
        .map_err(|_| Error::invalid("serialized tree does not fit a u32 length"))?;

    let mut output = Vec::with_capacity(12 + tree_bytes.len() + input.len() / 2);
    output.extend_from_slice(&tree_len.to_be_bytes());
    output.extend_from_slice(&tree_bytes);

    // Bit count placeholder, patched once the codewords are written.
    let bit_count_at = output.len();
    output.extend_from_slice(&[0u8; 8]);

    let mut bit_count = 0;
    if let Some(tree) = &tree {
        let table = CodeTable::from_tree(tree)?;
        let (payload, bits) = encode_bits(&table, input)?;
        output.extend_from_slice(&payload);
        bit_count = bits;
        debug!(
            "huffman: {} leaves, {} input bytes -> {} bits",
            tree.leaf_count(),
            input.len(),
            bits
        );
    }
    output[bit_count_at..bit_count_at + 8].copy_from_slice(&bit_count.to_be_bytes());

    Ok(output)
}

/// Decompress a stream produced by [`encode`].
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = ByteReader::new(data);
    let tree_len = reader.read_u32(Stage::Header)? as usize;
    if tree_len > reader.remaining() {
        return Err(Error::malformed(
            Stage::Header,
            format!(
                "tree length {tree_len} exceeds the {} bytes that follow",
                reader.remaining()
            ),
        ));
    }
    let tree_bytes = reader.take(tree_len, Stage::Header)?;
    let bit_count = reader.read_u64(Stage::Header)?;
    let payload = reader.rest();

    if tree_bytes.is_empty() {
        if bit_count == 0 && payload.is_empty() {
            return Ok(Vec::new());
        }
        return Err(Error::malformed(
            Stage::Tree,
            "tree has no leaves but the stream declares data",
        ));
    }

    let tree = deserialize_tree(tree_bytes)?;
    let output = decode_bits(&tree, payload, bit_count)?;

    let used = bit_count.div_ceil(8);
    if payload.len() as u64 > used {
        return Err(Error::malformed(
            Stage::Payload,
            format!(
                "{} bytes follow the declared {bit_count} bits",
                payload.len() as u64 - used
            ),
        ));
    }

    debug!(
        "huffman: {} bits -> {} output bytes",
        bit_count,
        output.len()
    );
    Ok(output)
}

/// Huffman coder behind the [`Compression`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanCodec;

impl Compression for HuffmanCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        encode(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        decode(data)
    }
}
