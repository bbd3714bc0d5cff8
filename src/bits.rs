//! MSB-first bit packing shared by the codecs.
//!
//! Every codec in this crate writes bits most-significant first and pads the
//! final partial byte with zeros. The padding never carries meaning: readers
//! stop on a count stored elsewhere (a bit total, or "fewer bits left than one
//! code").

use bitvec::prelude::*;

use crate::error::{Error, Result, Stage};

/// Accumulates bits most-significant first and packs them into bytes.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bits: BitVec::new(),
        }
    }

    pub fn with_capacity(bits: usize) -> Self {
        BitWriter {
            bits: BitVec::with_capacity(bits),
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Write the low `width` bits of `value`, most-significant first.
    pub fn write_bits(&mut self, value: u64, width: u32) {
        debug_assert!(width <= 64);
        for i in (0..width).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    /// Left-align the trailing partial byte and return the packed bytes with
    /// the number of meaningful bits.
    pub fn finish(mut self) -> (Vec<u8>, u64) {
        let len = self.bits.len();
        let padded = len.div_ceil(8) * 8;
        self.bits.resize(padded, false);
        (self.bits.into_vec(), len as u64)
    }
}

/// Reads bits most-significant first from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            bits: data.view_bits::<Msb0>(),
            pos: 0,
        }
    }

    /// A reader over the first `bit_len` bits of `data`, or `None` if the
    /// slice is shorter than that.
    pub fn with_len(data: &'a [u8], bit_len: u64) -> Option<Self> {
        let bits = data.view_bits::<Msb0>();
        let bit_len = usize::try_from(bit_len).ok()?;
        if bit_len > bits.len() {
            return None;
        }
        Some(BitReader {
            bits: &bits[..bit_len],
            pos: 0,
        })
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        let bit = *self.bits.get(self.pos)?;
        self.pos += 1;
        Some(bit)
    }

    /// Read `width` bits as an unsigned value. Consumes nothing and returns
    /// `None` when fewer than `width` bits remain.
    pub fn read_bits(&mut self, width: u32) -> Option<u64> {
        debug_assert!(width <= 64);
        let width = width as usize;
        if self.remaining() < width {
            return None;
        }
        let mut value = 0u64;
        for bit in self.bits[self.pos..self.pos + width].iter().by_vals() {
            value = (value << 1) | bit as u64;
        }
        self.pos += width;
        Some(value)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }
}

/// Reads big-endian fields and length-delimited slices from a byte buffer,
/// reporting shortfalls as truncation of the given stage.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, len: usize, stage: Stage) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(Error::truncated(
                stage,
                len as u64 * 8,
                available as u64 * 8,
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, stage: Stage) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, stage)?);
        Ok(buf)
    }

    pub(crate) fn read_u8(&mut self, stage: Stage) -> Result<u8> {
        Ok(self.take_array::<1>(stage)?[0])
    }

    pub(crate) fn read_u32(&mut self, stage: Stage) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array(stage)?))
    }

    pub(crate) fn read_u64(&mut self, stage: Stage) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array(stage)?))
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}
