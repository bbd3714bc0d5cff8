//! LZW dictionary coding with fixed-width codes.
//!
//! Codes `0..256` stand for the single bytes. Code 256 is reserved and never
//! emitted, so new strings are numbered from 257 up to `2^code_width - 1`.
//! Once the table is full the encoder keeps emitting existing codes without
//! adding new ones. A bare stream carries no header: the code width travels in
//! the codec value, in the container that wraps the stream, or in the one-byte
//! prefix written by [`LzwCodec::encode_framed`].

use log::{debug, trace};

use crate::bits::{BitReader, BitWriter, ByteReader};
use crate::codec::tst::TernarySearchTrie;
use crate::codec::Compression;
use crate::error::{Error, Result, Stage};

/// Number of single-byte codes.
pub const ALPHABET_SIZE: u32 = 256;

/// Slot between the single bytes and the first learned string.
pub const RESERVED_CODE: u32 = ALPHABET_SIZE;

pub const MIN_CODE_WIDTH: u32 = 9;
pub const MAX_CODE_WIDTH: u32 = 24;
pub const DEFAULT_CODE_WIDTH: u32 = 16;

/// How an encode call used the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Codes written to the stream.
    pub codes_emitted: usize,
    /// The code the next learned string would have received.
    pub next_code: u32,
    /// Whether the dictionary filled up and stopped learning.
    pub saturated: bool,
}

/// LZW coder with a configurable code width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzwCodec {
    code_width: u32,
}

impl LzwCodec {
    /// Create a coder emitting `code_width`-bit codes.
    ///
    /// The width must be in `9..=24`: wide enough for the 257 initial codes,
    /// narrow enough to keep the decode table in memory.
    pub fn new(code_width: u32) -> Result<Self> {
        if !(MIN_CODE_WIDTH..=MAX_CODE_WIDTH).contains(&code_width) {
            return Err(Error::invalid(format!(
                "LZW code width must be between {MIN_CODE_WIDTH} and {MAX_CODE_WIDTH}, got {code_width}"
            )));
        }
        Ok(LzwCodec { code_width })
    }

    pub fn code_width(&self) -> u32 {
        self.code_width
    }

    /// Size of the code space, `2^code_width`.
    pub fn max_codes(&self) -> u32 {
        1 << self.code_width
    }

    /// Compresses the input data using the LZW algorithm.
    ///
    /// # Details
    ///
    /// At each position the longest dictionary string that prefixes the rest
    /// of the input is found in a ternary search trie and its code is written.
    /// If input remains after the match and the table has room, the match
    /// extended by the following byte is learned under the next code.
    ///
    /// # Example
    ///
    /// ```
    /// use seqzip::codec::lzw::LzwCodec;
    ///
    /// let lzw = LzwCodec::default();
    /// let compressed = lzw.encode(b"TOBEORNOTTOBE");
    /// assert_eq!(lzw.decode(&compressed).unwrap(), b"TOBEORNOTTOBE");
    /// ```
    pub fn encode(&self, input: &[u8]) -> Vec<u8> {
        self.encode_with_summary(input).0
    }

    /// Like [`encode`](Self::encode), also reporting dictionary usage.
    pub fn encode_with_summary(&self, input: &[u8]) -> (Vec<u8>, EncodeSummary) {
        let max = self.max_codes();
        let mut trie = TernarySearchTrie::with_capacity(ALPHABET_SIZE as usize * 2);
        seed_single_bytes(&mut trie);

        let mut writer = BitWriter::with_capacity(input.len() * self.code_width as usize / 2);
        let mut next_code = RESERVED_CODE + 1;
        let mut codes_emitted = 0;
        let mut saturated = false;

        let mut pos = 0;
        while pos < input.len() {
            // Every single byte is seeded, so a match of at least one byte
            // always exists.
            let (len, code) = trie
                .longest_prefix_of(input, pos)
                .unwrap_or((1, input[pos] as u32));
            writer.write_bits(code as u64, self.code_width);
            codes_emitted += 1;

            if pos + len < input.len() {
                if next_code < max {
                    trie.put(&input[pos..pos + len + 1], next_code);
                    next_code += 1;
                } else if !saturated {
                    saturated = true;
                    trace!("lzw: dictionary full at input offset {}", pos);
                }
            }
            pos += len;
        }

        let (bytes, bits) = writer.finish();
        debug!(
            "lzw: {} input bytes -> {} codes ({} bits), next code {}{}",
            input.len(),
            codes_emitted,
            bits,
            next_code,
            if saturated { ", saturated" } else { "" }
        );

        (
            bytes,
            EncodeSummary {
                codes_emitted,
                next_code,
                saturated,
            },
        )
    }

    /// Split a stream into its codes.
    ///
    /// Fewer than `code_width` trailing bits are padding; eight or more
    /// means the stream was cut short.
    pub fn codes(&self, data: &[u8]) -> Result<Vec<u32>> {
        let mut reader = BitReader::new(data);
        let mut codes = Vec::with_capacity(data.len() * 8 / self.code_width as usize);
        while let Some(code) = reader.read_bits(self.code_width) {
            codes.push(code as u32);
        }
        let leftover = reader.remaining() as u64;
        if leftover >= 8 {
            return Err(Error::truncated(
                Stage::Payload,
                self.code_width as u64,
                leftover,
            ));
        }
        Ok(codes)
    }

    /// Decompresses a stream produced by [`encode`](Self::encode) with the
    /// same code width.
    ///
    /// # Details
    ///
    /// The table is rebuilt in lockstep with the encoder. A code equal to the
    /// next free slot refers to the string being learned, which is the
    /// previous string followed by its own first byte. Any other code that is
    /// not yet in the table is rejected.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let codes = self.codes(data)?;
        let Some((&first, rest)) = codes.split_first() else {
            return Ok(Vec::new());
        };

        let max = self.max_codes();
        // Slot 256 stays empty.
        let mut table: Vec<Vec<u8>> = (0..ALPHABET_SIZE).map(|b| vec![b as u8]).collect();
        table.push(Vec::new());
        let mut next_code = RESERVED_CODE + 1;

        if first >= ALPHABET_SIZE {
            return Err(Error::UnknownCode {
                stage: Stage::Payload,
                code: first,
                next: next_code,
            });
        }

        let mut output = Vec::with_capacity(data.len() * 2);
        let mut val = table[first as usize].clone();

        for &code in rest {
            output.extend_from_slice(&val);

            let s = if code == next_code {
                let mut s = val.clone();
                s.push(val[0]);
                s
            } else if code < next_code && code != RESERVED_CODE {
                table[code as usize].clone()
            } else {
                return Err(Error::UnknownCode {
                    stage: Stage::Payload,
                    code,
                    next: next_code,
                });
            };

            if next_code < max {
                let mut entry = val;
                entry.push(s[0]);
                table.push(entry);
                next_code += 1;
            }
            val = s;
        }
        output.extend_from_slice(&val);

        debug!(
            "lzw: {} codes -> {} output bytes, next code {}",
            codes.len(),
            output.len(),
            next_code
        );
        Ok(output)
    }
}

impl LzwCodec {
    /// [`encode`](Self::encode) behind a one-byte code width, so the stream
    /// can be decoded without knowing how it was configured.
    pub fn encode_framed(&self, input: &[u8]) -> Vec<u8> {
        let stream = self.encode(input);
        let mut output = Vec::with_capacity(stream.len() + 1);
        output.push(self.code_width as u8);
        output.extend_from_slice(&stream);
        output
    }

    /// Decode a stream written by [`encode_framed`](Self::encode_framed)
    /// with the code width stored in it.
    pub fn decode_framed(data: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(data);
        let width = reader.read_u8(Stage::Header)?;
        let codec = LzwCodec::new(width as u32)
            .map_err(|_| Error::malformed(Stage::Header, format!("LZW code width {width}")))?;
        codec.decode(reader.rest())
    }
}

impl Default for LzwCodec {
    fn default() -> Self {
        LzwCodec {
            code_width: DEFAULT_CODE_WIDTH,
        }
    }
}

impl Compression for LzwCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.encode(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decode(data)
    }
}

/// Insert codes `0..256` for the single bytes, middle values first so the
/// top of the trie stays shallow.
fn seed_single_bytes(trie: &mut TernarySearchTrie) {
    let mut ranges = vec![(0u32, ALPHABET_SIZE)];
    while let Some((lo, hi)) = ranges.pop() {
        if lo >= hi {
            continue;
        }
        let mid = lo + (hi - lo) / 2;
        trie.put(&[mid as u8], mid);
        ranges.push((lo, mid));
        ranges.push((mid + 1, hi));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let lzw = LzwCodec::default();
        let (compressed, summary) = lzw.encode_with_summary(b"");
        assert!(compressed.is_empty());
        assert_eq!(summary.codes_emitted, 0);
        assert_eq!(summary.next_code, RESERVED_CODE + 1);
        assert_eq!(lzw.decode(&compressed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_single_character() {
        let lzw = LzwCodec::default();
        let compressed = lzw.encode(b"A");
        assert_eq!(compressed, vec![0x00, 0x41]);
        assert_eq!(lzw.decode(&compressed).unwrap(), b"A");
    }

    #[test]
    fn test_repeated_pattern_codes() {
        let lzw = LzwCodec::default();
        let (compressed, summary) = lzw.encode_with_summary(b"ABABABABAB");
        assert_eq!(lzw.codes(&compressed).unwrap(), vec![65, 66, 257, 259, 258, 66]);
        // AB, BA, ABA, ABAB, BAB were learned.
        assert_eq!(summary.next_code, 262);
        assert!(!summary.saturated);
        assert_eq!(lzw.decode(&compressed).unwrap(), b"ABABABABAB");
    }

    #[test]
    fn test_code_equal_to_next_slot() {
        // "AAAAAA" -> A, AA (learned while being emitted), AAA.
        let lzw = LzwCodec::default();
        let compressed = lzw.encode(b"AAAAAA");
        assert_eq!(lzw.codes(&compressed).unwrap(), vec![65, 257, 258]);
        assert_eq!(lzw.decode(&compressed).unwrap(), b"AAAAAA");
    }

    #[test]
    fn test_simple_string() {
        let lzw = LzwCodec::default();
        let input = b"TOBEORNOTTOBEORTOBEORNOT";
        let compressed = lzw.encode(input);
        assert!(compressed.len() < input.len() * 2);
        assert_eq!(lzw.decode(&compressed).unwrap(), input);
    }

    #[test]
    fn test_odd_code_width_padding() {
        let lzw = LzwCodec::new(9).unwrap();
        let input = b"abracadabra abracadabra abracadabra";
        let (compressed, summary) = lzw.encode_with_summary(input);
        let bits = summary.codes_emitted * 9;
        assert_eq!(compressed.len(), bits.div_ceil(8));
        assert_eq!(lzw.decode(&compressed).unwrap(), input);
    }

    #[test]
    fn test_non_ascii() {
        let lzw = LzwCodec::new(12).unwrap();
        let input = "这是一段测试这是一段测试".as_bytes();
        assert_eq!(lzw.decode(&lzw.encode(input)).unwrap(), input);
    }

    #[test]
    fn test_dictionary_saturates() {
        let lzw = LzwCodec::new(9).unwrap();
        let input: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 251) as u8).collect();
        let (compressed, summary) = lzw.encode_with_summary(&input);
        assert!(summary.saturated);
        assert_eq!(summary.next_code, 512);
        assert!(lzw.codes(&compressed).unwrap().iter().all(|&c| c < 512));
        assert_eq!(lzw.decode(&compressed).unwrap(), input);
    }

    #[test]
    fn test_rejects_bad_widths() {
        assert!(matches!(LzwCodec::new(8), Err(Error::InvalidInput(_))));
        assert!(matches!(LzwCodec::new(25), Err(Error::InvalidInput(_))));
        assert_eq!(LzwCodec::new(24).unwrap().max_codes(), 1 << 24);
    }

    #[test]
    fn test_decode_rejects_unknown_code() {
        let lzw = LzwCodec::default();
        let mut writer = BitWriter::new();
        writer.write_bits(65, 16);
        writer.write_bits(300, 16);
        let (data, _) = writer.finish();
        match lzw.decode(&data) {
            Err(Error::UnknownCode { code, next, .. }) => {
                assert_eq!(code, 300);
                assert_eq!(next, 257);
            }
            other => panic!("expected unknown code, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_reserved_code() {
        let lzw = LzwCodec::default();
        let mut writer = BitWriter::new();
        writer.write_bits(65, 16);
        writer.write_bits(RESERVED_CODE as u64, 16);
        let (data, _) = writer.finish();
        assert!(matches!(lzw.decode(&data), Err(Error::UnknownCode { code: 256, .. })));
    }

    #[test]
    fn test_decode_rejects_learned_first_code() {
        let lzw = LzwCodec::default();
        let data = 257u16.to_be_bytes();
        assert!(matches!(lzw.decode(&data), Err(Error::UnknownCode { code: 257, .. })));
    }

    #[test]
    fn test_decode_rejects_partial_code() {
        let lzw = LzwCodec::default();
        let mut compressed = lzw.encode(b"ABABABABAB");
        compressed.push(0x41);
        assert!(matches!(
            lzw.decode(&compressed),
            Err(Error::TruncatedStream { stage: Stage::Payload, .. })
        ));
    }

    #[test]
    fn test_framed_stream_carries_width() {
        let input = b"ACGTACGTTTGACCAACGTACGT".repeat(8);
        let framed = LzwCodec::new(12).unwrap().encode_framed(&input);
        assert_eq!(framed[0], 12);
        assert_eq!(LzwCodec::decode_framed(&framed).unwrap(), input);
    }

    #[test]
    fn test_framed_empty_input() {
        let framed = LzwCodec::default().encode_framed(b"");
        assert_eq!(framed, vec![16]);
        assert_eq!(LzwCodec::decode_framed(&framed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_framed_rejects_bad_width() {
        let mut framed = LzwCodec::default().encode_framed(b"ACGT");
        framed[0] = 30;
        assert!(matches!(
            LzwCodec::decode_framed(&framed),
            Err(Error::MalformedHeader { stage: Stage::Header, .. })
        ));
        assert!(matches!(
            LzwCodec::decode_framed(&[]),
            Err(Error::TruncatedStream { stage: Stage::Header, .. })
        ));
    }

    #[test]
    fn test_next_code_never_decreases() {
        let lzw = LzwCodec::new(10).unwrap();
        let mut input = Vec::new();
        let mut last = RESERVED_CODE + 1;
        for chunk in b"ACGTTGCAACGTNNACGT".chunks(3).cycle().take(200) {
            input.extend_from_slice(chunk);
            let (_, summary) = lzw.encode_with_summary(&input);
            assert!(summary.next_code >= last);
            assert!(summary.next_code <= lzw.max_codes());
            last = summary.next_code;
        }
    }
}
