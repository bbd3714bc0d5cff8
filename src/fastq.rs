//! Record-aware container for FASTQ text.
//!
//! Every FASTQ record spans four lines, and each line role gets the codec
//! that suits it:
//!
//! - identifier lines are LZW coded, each with a fresh dictionary;
//! - sequence lines are packed two bits per base, or LZW coded when they hold
//!   anything besides uppercase `ACGT`;
//! - separator lines that are a bare `+` cost one tag byte;
//! - quality lines share one Huffman tree built over all of them.
//!
//! Container layout, integers big-endian:
//!
//! ```text
//! "SQZM" | version u8 | flags u8 | line count u32 | LZW code width u8
//! quality tree length u32 | quality tree bytes
//! then, per line, by role (line index mod 4):
//!   identifier: u32 length | LZW stream
//!   sequence:   0u8 | u32 base count | packed bases
//!            or 1u8 | u32 length | LZW stream
//!   separator:  0u8
//!            or 1u8 | u32 length | LZW stream
//!   quality:    u32 bit count | codeword bytes
//! ```
//!
//! Flag bit 0 records whether the input ended with a newline, so inputs with
//! and without a final newline, as well as partial final records, come back
//! byte for byte.

use log::{debug, trace};

use crate::bits::ByteReader;
use crate::codec::huffman::{self, CodeTable, FrequencyTable, HuffmanNode};
use crate::codec::lzw::LzwCodec;
use crate::codec::Compression;
use crate::error::{Error, Result, Stage};

pub mod nucleotide;

pub const MAGIC: &[u8; 4] = b"SQZM";
pub const VERSION: u8 = 1;

const FLAG_TRAILING_NEWLINE: u8 = 0b0000_0001;

const TAG_PACKED: u8 = 0;
const TAG_LZW: u8 = 1;

/// Role of a line within its four-line record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Identifier,
    Sequence,
    Separator,
    Quality,
}

impl LineKind {
    /// Role of the line at zero-based `index` in the file.
    pub fn of(index: usize) -> Self {
        match index % 4 {
            0 => LineKind::Identifier,
            1 => LineKind::Sequence,
            2 => LineKind::Separator,
            _ => LineKind::Quality,
        }
    }
}

/// Split `input` on `\n`, dropping the empty piece after a final newline.
/// Also returns whether that final newline was present.
pub fn split_lines(input: &[u8]) -> (Vec<&[u8]>, bool) {
    if input.is_empty() {
        return (Vec::new(), false);
    }
    let mut lines: Vec<&[u8]> = input.split(|&b| b == b'\n').collect();
    let trailing = input.last() == Some(&b'\n');
    if trailing {
        lines.pop();
    }
    (lines, trailing)
}

/// FASTQ container codec. The LZW code width used for identifier and
/// fallback lines is stored in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FastqCodec {
    lzw: LzwCodec,
}

#[derive(Debug, Default)]
struct LineStats {
    packed_sequences: usize,
    lzw_sequences: usize,
    bare_separators: usize,
    quality_bits: u64,
}

impl FastqCodec {
    pub fn new(code_width: u32) -> Result<Self> {
        Ok(FastqCodec {
            lzw: LzwCodec::new(code_width)?,
        })
    }

    pub fn code_width(&self) -> u32 {
        self.lzw.code_width()
    }

    pub fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let (lines, trailing) = split_lines(input);
        let line_count = u32::try_from(lines.len())
            .map_err(|_| Error::invalid("more than u32::MAX lines"))?;

        let mut freq = FrequencyTable::new();
        for (index, line) in lines.iter().enumerate() {
            if LineKind::of(index) == LineKind::Quality {
                freq.count(line);
            }
        }
        let tree = huffman::build_huffman_tree(&freq);
        let table = tree.as_ref().map(CodeTable::from_tree).transpose()?;
        let tree_bytes = tree.as_ref().map(huffman::serialize_tree).unwrap_or_default();

        let mut output = Vec::with_capacity(input.len() / 2 + 16);
        output.extend_from_slice(MAGIC);
        output.push(VERSION);
        output.push(if trailing { FLAG_TRAILING_NEWLINE } else { 0 });
        output.extend_from_slice(&line_count.to_be_bytes());
        output.push(self.lzw.code_width() as u8);
        write_len(&mut output, tree_bytes.len())?;
        output.extend_from_slice(&tree_bytes);

        let mut stats = LineStats::default();
        for (index, &line) in lines.iter().enumerate() {
            match LineKind::of(index) {
                LineKind::Identifier => self.write_lzw(&mut output, line)?,
                LineKind::Sequence => match nucleotide::pack(line) {
                    Some(packed) => {
                        output.push(TAG_PACKED);
                        write_len(&mut output, line.len())?;
                        output.extend_from_slice(&packed);
                        stats.packed_sequences += 1;
                    }
                    None => {
                        trace!("fastq: line {} is not plain ACGT, using LZW", index);
                        output.push(TAG_LZW);
                        self.write_lzw(&mut output, line)?;
                        stats.lzw_sequences += 1;
                    }
                },
                LineKind::Separator => {
                    if line == b"+" {
                        output.push(TAG_PACKED);
                        stats.bare_separators += 1;
                    } else {
                        output.push(TAG_LZW);
                        self.write_lzw(&mut output, line)?;
                    }
                }
                LineKind::Quality => {
                    let (bytes, bits) = match &table {
                        Some(table) => huffman::encode_bits(table, line)?,
                        None => (Vec::new(), 0),
                    };
                    let count = u32::try_from(bits).map_err(|_| {
                        Error::invalid(format!("quality line {index} needs {bits} bits"))
                    })?;
                    output.extend_from_slice(&count.to_be_bytes());
                    output.extend_from_slice(&bytes);
                    stats.quality_bits += bits;
                }
            }
        }

        debug!(
            "fastq: {} lines, {} packed / {} LZW sequences, {} bare separators, {} quality bits, {} -> {} bytes",
            lines.len(),
            stats.packed_sequences,
            stats.lzw_sequences,
            stats.bare_separators,
            stats.quality_bits,
            input.len(),
            output.len()
        );
        Ok(output)
    }

    fn write_lzw(&self, output: &mut Vec<u8>, line: &[u8]) -> Result<()> {
        let stream = self.lzw.encode(line);
        write_len(output, stream.len())?;
        output.extend_from_slice(&stream);
        Ok(())
    }

    /// Decode a container. The code width comes from the container header,
    /// not from `self`.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut reader = ByteReader::new(data);

        let magic = reader.take(MAGIC.len(), Stage::Header)?;
        if magic != MAGIC {
            return Err(Error::malformed(Stage::Header, "not a FASTQ container"));
        }
        let version = reader.read_u8(Stage::Header)?;
        if version != VERSION {
            return Err(Error::malformed(
                Stage::Header,
                format!("unsupported container version {version}"),
            ));
        }
        let flags = reader.read_u8(Stage::Header)?;
        if flags & !FLAG_TRAILING_NEWLINE != 0 {
            return Err(Error::malformed(
                Stage::Header,
                format!("unknown flags {flags:#010b}"),
            ));
        }
        let line_count = reader.read_u32(Stage::Header)? as usize;
        let width = reader.read_u8(Stage::Header)?;
        let lzw = LzwCodec::new(width as u32)
            .map_err(|_| Error::malformed(Stage::Header, format!("LZW code width {width}")))?;

        let tree_len = reader.read_u32(Stage::Header)? as usize;
        let tree = if tree_len == 0 {
            None
        } else {
            Some(huffman::deserialize_tree(reader.take(tree_len, Stage::Tree)?)?)
        };

        let mut output = Vec::with_capacity(data.len() * 3);
        for index in 0..line_count {
            if index > 0 {
                output.push(b'\n');
            }
            match LineKind::of(index) {
                LineKind::Identifier => output.extend(read_lzw(&mut reader, &lzw)?),
                LineKind::Sequence => match reader.read_u8(Stage::Payload)? {
                    TAG_PACKED => {
                        let count = reader.read_u32(Stage::Payload)? as usize;
                        let packed = reader.take(nucleotide::packed_len(count), Stage::Payload)?;
                        output.extend(nucleotide::unpack(packed, count)?);
                    }
                    TAG_LZW => output.extend(read_lzw(&mut reader, &lzw)?),
                    tag => return Err(bad_tag(index, tag)),
                },
                LineKind::Separator => match reader.read_u8(Stage::Payload)? {
                    TAG_PACKED => output.push(b'+'),
                    TAG_LZW => output.extend(read_lzw(&mut reader, &lzw)?),
                    tag => return Err(bad_tag(index, tag)),
                },
                LineKind::Quality => {
                    output.extend(read_quality(&mut reader, tree.as_ref())?);
                }
            }
        }
        if line_count > 0 && flags & FLAG_TRAILING_NEWLINE != 0 {
            output.push(b'\n');
        }

        if !reader.is_empty() {
            return Err(Error::malformed(
                Stage::Payload,
                format!("{} bytes after the last line", reader.remaining()),
            ));
        }

        debug!(
            "fastq: {} lines, {} -> {} bytes",
            line_count,
            data.len(),
            output.len()
        );
        Ok(output)
    }
}

impl Compression for FastqCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.encode(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decode(data)
    }
}

fn write_len(output: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::invalid(format!("length {len} does not fit a u32")))?;
    output.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn read_lzw(reader: &mut ByteReader<'_>, lzw: &LzwCodec) -> Result<Vec<u8>> {
    let len = reader.read_u32(Stage::Payload)? as usize;
    lzw.decode(reader.take(len, Stage::Payload)?)
}

fn read_quality(reader: &mut ByteReader<'_>, tree: Option<&HuffmanNode>) -> Result<Vec<u8>> {
    let bits = reader.read_u32(Stage::Payload)? as u64;
    if bits == 0 {
        return Ok(Vec::new());
    }
    let tree = tree.ok_or_else(|| {
        Error::malformed(Stage::Tree, "quality line has data but no tree was stored")
    })?;
    let len = usize::try_from(bits.div_ceil(8))
        .map_err(|_| Error::malformed(Stage::Payload, format!("quality bit count {bits}")))?;
    if len > reader.remaining() {
        return Err(Error::truncated(
            Stage::Payload,
            bits,
            reader.remaining() as u64 * 8,
        ));
    }
    huffman::decode_bits(tree, reader.take(len, Stage::Payload)?, bits)
}

fn bad_tag(index: usize, tag: u8) -> Error {
    Error::malformed(Stage::Payload, format!("line {index}: unknown tag {tag}"))
}
