//! Burrows-Wheeler Transform over fixed-size blocks.
//!
//! Each block of at most `block_size` source bytes gets a sentinel appended,
//! which must not occur in the block itself. The transformed block is the last
//! column of the sorted rotation matrix and has the same length as the
//! sentinel-terminated block, so no row index needs to be stored: the inverse
//! finds the original row by looking for the sentinel.
//!
//! The transform does not shrink data on its own; it groups similar contexts
//! so that a later entropy or dictionary coder has an easier job.

use std::cmp::Ordering;

use log::{debug, trace};

use crate::bits::ByteReader;
use crate::codec::Compression;
use crate::error::{Error, Result, Stage};

/// Source bytes per block.
///
/// Rotations are compared byte by byte, so a block made of one repeated byte
/// costs on the order of `block_size^2 * log(block_size)` byte comparisons.
/// Lower the block size for highly repetitive input.
pub const DEFAULT_BLOCK_SIZE: usize = 100 * 1024;
pub const DEFAULT_SENTINEL: u8 = 0x00;

/// Block transform with a configurable block size and sentinel byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BwtCodec {
    block_size: usize,
    sentinel: u8,
}

impl BwtCodec {
    pub fn new(block_size: usize, sentinel: u8) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::invalid("BWT block size must be at least 1"));
        }
        Ok(BwtCodec {
            block_size,
            sentinel,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    /// Transform `input` block by block.
    ///
    /// Fails with [`Error::SentinelCollision`] if any block contains the
    /// sentinel byte.
    pub fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let blocks = input.len().div_ceil(self.block_size);
        let mut output = Vec::with_capacity(input.len() + blocks);
        for (index, block) in input.chunks(self.block_size).enumerate() {
            if let Some(offset) = block.iter().position(|&b| b == self.sentinel) {
                return Err(Error::SentinelCollision {
                    sentinel: self.sentinel,
                    block: index,
                    offset,
                });
            }
            output.extend_from_slice(&encode_block(block, self.sentinel));
            trace!("bwt: encoded block {} ({} bytes)", index, block.len());
        }
        debug!(
            "bwt: {} input bytes in {} blocks of up to {}",
            input.len(),
            blocks,
            self.block_size
        );
        Ok(output)
    }

    /// Invert [`encode`](Self::encode). The stream is split into chunks of
    /// `block_size + 1` bytes; the last chunk may be shorter.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let chunk = self.block_size + 1;
        let mut output = Vec::with_capacity(data.len());
        for (index, block) in data.chunks(chunk).enumerate() {
            let decoded = decode_block(block, self.sentinel).map_err(|err| match err {
                Error::MalformedHeader { stage, reason } => Error::MalformedHeader {
                    stage,
                    reason: format!("block {index}: {reason}"),
                },
                other => other,
            })?;
            output.extend_from_slice(&decoded);
        }
        debug!(
            "bwt: {} transformed bytes -> {} output bytes",
            data.len(),
            output.len()
        );
        Ok(output)
    }
}

impl BwtCodec {
    /// [`encode`](Self::encode) behind a header holding the block size (u32,
    /// big-endian) and the sentinel, so the stream decodes on its own.
    pub fn encode_framed(&self, input: &[u8]) -> Result<Vec<u8>> {
        let block_size = u32::try_from(self.block_size)
            .map_err(|_| Error::invalid("BWT block size does not fit a u32"))?;
        let stream = self.encode(input)?;
        let mut output = Vec::with_capacity(stream.len() + 5);
        output.extend_from_slice(&block_size.to_be_bytes());
        output.push(self.sentinel);
        output.extend_from_slice(&stream);
        Ok(output)
    }

    /// Decode a stream written by [`encode_framed`](Self::encode_framed)
    /// with the block size and sentinel stored in it.
    pub fn decode_framed(data: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(data);
        let block_size = reader.read_u32(Stage::Header)?;
        let sentinel = reader.read_u8(Stage::Header)?;
        let codec = BwtCodec::new(block_size as usize, sentinel)
            .map_err(|_| Error::malformed(Stage::Header, format!("BWT block size {block_size}")))?;
        codec.decode(reader.rest())
    }
}

impl Default for BwtCodec {
    fn default() -> Self {
        BwtCodec {
            block_size: DEFAULT_BLOCK_SIZE,
            sentinel: DEFAULT_SENTINEL,
        }
    }
}

impl Compression for BwtCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.encode(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decode(data)
    }
}

/// Applies the Burrows-Wheeler Transform to one block.
///
/// # Algorithm
///
/// 1. Append the sentinel to the block.
/// 2. Sort the rotation start positions, comparing rotations byte by byte
///    around the block.
/// 3. Output the byte preceding each rotation, i.e. the last column of the
///    sorted matrix.
///
/// The caller guarantees that `block` does not contain `sentinel`.
///
/// # Examples
///
/// ```
/// use seqzip::codec::bwt::encode_block;
///
/// assert_eq!(encode_block(b"banana", 0), b"annb\0aa");
/// ```
pub fn encode_block(block: &[u8], sentinel: u8) -> Vec<u8> {
    let mut text = Vec::with_capacity(block.len() + 1);
    text.extend_from_slice(block);
    text.push(sentinel);
    let n = text.len();

    let mut rotations: Vec<usize> = (0..n).collect();
    rotations.sort_unstable_by(|&a, &b| compare_rotations(&text, a, b));

    rotations
        .iter()
        .map(|&start| text[(start + n - 1) % n])
        .collect()
}

/// Compare the rotations of `text` starting at `a` and `b`.
fn compare_rotations(text: &[u8], a: usize, b: usize) -> Ordering {
    let n = text.len();
    for k in 0..n {
        let ord = text[(a + k) % n].cmp(&text[(b + k) % n]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Invert [`encode_block`], returning the block without its sentinel.
///
/// Stable-sorting the positions of the last column by byte value gives, for
/// every row, the row that starts one byte later in the source. Starting from
/// the row whose last byte is the sentinel (the unrotated source) and
/// following that permutation visits the source bytes in order.
pub fn decode_block(block: &[u8], sentinel: u8) -> Result<Vec<u8>> {
    if block.is_empty() {
        return Ok(Vec::new());
    }

    let mut sentinels = block
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == sentinel)
        .map(|(i, _)| i);
    let row = sentinels.next().ok_or_else(|| {
        Error::malformed(
            Stage::Payload,
            format!("no sentinel {sentinel:#04x} in transformed block"),
        )
    })?;
    if let Some(extra) = sentinels.next() {
        return Err(Error::malformed(
            Stage::Payload,
            format!("sentinel {sentinel:#04x} repeated at offsets {row} and {extra}"),
        ));
    }

    let mut next: Vec<usize> = (0..block.len()).collect();
    next.sort_by_key(|&i| block[i]);

    let mut output = Vec::with_capacity(block.len() - 1);
    let mut p = row;
    for _ in 1..block.len() {
        p = next[p];
        output.push(block[p]);
    }
    Ok(output)
}
