//! Compression codecs for genomic sequence files.
//!
//! [`codec`] holds the three standalone byte codecs (Huffman, LZW and the
//! Burrows-Wheeler Transform) and [`fastq`] combines them into a container
//! that codes each line of a FASTQ record with the codec that fits it.

pub mod bits;
pub mod codec;
pub mod error;
pub mod fastq;

pub use codec::{BwtCodec, CodecKind, Compression, HuffmanCodec, LzwCodec};
pub use error::{Error, Result, Stage};
pub use fastq::FastqCodec;
