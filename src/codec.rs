//! Byte-stream codecs.
//!
//! This module provides three independent lossless codecs:
//! - Huffman coding with the tree stored in the stream
//! - LZW dictionary coding over a ternary search trie
//! - The Burrows-Wheeler block transform
//!
//! Each codec builds all of its working state (tree, trie, permutation) inside
//! a single call, so codec values can be shared freely between threads.
//!
//! # Examples
//!
//! ```rust
//! use seqzip::codec::{Compression, HuffmanCodec, LzwCodec};
//!
//! let reads = b"ACGTACGTTTGACCA";
//! for codec in [&HuffmanCodec as &dyn Compression, &LzwCodec::default()] {
//!     let packed = codec.compress(reads).unwrap();
//!     assert_eq!(codec.decompress(&packed).unwrap(), reads);
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Trait for compression algorithms
pub trait Compression {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the compressed data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub mod bwt;
pub mod huffman;
pub mod lzw;
pub mod tst;

pub use bwt::BwtCodec;
pub use huffman::{
    build_huffman_tree, deserialize_tree, serialize_tree, CodeTable, FrequencyTable, HuffmanCodec,
    HuffmanNode,
};
pub use lzw::{EncodeSummary, LzwCodec};
pub use tst::TernarySearchTrie;

/// The formats a file can be compressed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Huffman,
    Lzw,
    Bwt,
    /// The record-aware FASTQ container.
    Fastq,
}

impl CodecKind {
    pub const ALL: [CodecKind; 4] = [
        CodecKind::Huffman,
        CodecKind::Lzw,
        CodecKind::Bwt,
        CodecKind::Fastq,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Huffman => "huffman",
            CodecKind::Lzw => "lzw",
            CodecKind::Bwt => "bwt",
            CodecKind::Fastq => "fastq",
        }
    }

    /// File extension given to compressed output, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CodecKind::Huffman => "huffman",
            CodecKind::Lzw => "lzw",
            CodecKind::Bwt => "bwt",
            CodecKind::Fastq => "mix",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s) || kind.extension() == s)
            .ok_or_else(|| Error::invalid(format!("unknown codec {s:?}")))
    }
}

#[cfg(test)]
mod tests;
