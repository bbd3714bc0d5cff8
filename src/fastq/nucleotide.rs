//! Two-bit packing of nucleotide sequences.

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result, Stage};

/// A nucleotide and its 2-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Base {
    A = 0b00,
    T = 0b01,
    G = 0b10,
    C = 0b11,
}

impl Base {
    /// Only uppercase `ACGT`; anything else cannot be packed losslessly.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'A' => Some(Base::A),
            b'T' => Some(Base::T),
            b'G' => Some(Base::G),
            b'C' => Some(Base::C),
            _ => None,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Base::A,
            0b01 => Base::T,
            0b10 => Base::G,
            _ => Base::C,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Base::A => b'A',
            Base::T => b'T',
            Base::G => b'G',
            Base::C => b'C',
        }
    }
}

/// Pack a sequence four bases per byte, first base in the high bits.
/// Returns `None` if the sequence holds anything but `ACGT`.
pub fn pack(seq: &[u8]) -> Option<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(seq.len() * 2);
    for &b in seq {
        writer.write_bits(Base::from_byte(b)? as u64, 2);
    }
    Some(writer.finish().0)
}

/// Number of bytes [`pack`] produces for `bases` bases.
pub fn packed_len(bases: usize) -> usize {
    bases.div_ceil(4)
}

/// Unpack `count` bases from the front of `data`.
pub fn unpack(data: &[u8], count: usize) -> Result<Vec<u8>> {
    let bits = count as u64 * 2;
    let mut reader = BitReader::with_len(data, bits)
        .ok_or_else(|| Error::truncated(Stage::Payload, bits, data.len() as u64 * 8))?;
    let mut seq = Vec::with_capacity(count);
    while let Some(code) = reader.read_bits(2) {
        seq.push(Base::from_code(code as u8).to_byte());
    }
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(pack(b"ATGC"), Some(vec![0b00_01_10_11]));
        assert_eq!(pack(b"C"), Some(vec![0b11_00_00_00]));
        assert_eq!(pack(b""), Some(vec![]));
    }

    #[test]
    fn test_unpack() {
        let packed = pack(b"GATTACA").unwrap();
        assert_eq!(packed.len(), packed_len(7));
        assert_eq!(unpack(&packed, 7).unwrap(), b"GATTACA");
    }

    #[test]
    fn test_rejects_non_acgt() {
        assert_eq!(pack(b"ACGN"), None);
        assert_eq!(pack(b"acgt"), None);
    }

    #[test]
    fn test_unpack_short_input() {
        assert!(matches!(
            unpack(&[0xFF], 5),
            Err(Error::TruncatedStream { needed: 10, available: 8, .. })
        ));
    }

    #[test]
    fn test_base_round_trip() {
        for b in [b'A', b'C', b'G', b'T'] {
            let base = Base::from_byte(b).unwrap();
            assert_eq!(Base::from_code(base as u8), base);
            assert_eq!(base.to_byte(), b);
        }
    }
}
