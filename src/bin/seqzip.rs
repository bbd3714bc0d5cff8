use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, LevelFilter};

use seqzip::codec::{bwt, lzw, BwtCodec, CodecKind, Compression, HuffmanCodec, LzwCodec};
use seqzip::fastq::FastqCodec;
use seqzip::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "seqzip", version, about = "Compress genomic sequence files")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// More output; repeat for debug and trace logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a file
    Compress(Job),
    /// Restore a compressed file
    Decompress(Job),
}

#[derive(clap::Args, Debug)]
struct Job {
    /// The file to read
    input: PathBuf,

    /// Where to write the result; derived from the input name if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Codec to use. Decompression infers it from the input extension
    #[arg(short, long, value_enum)]
    codec: Option<CodecArg>,

    /// Bits per LZW code when compressing; decompression reads it from the file
    #[arg(long, default_value_t = lzw::DEFAULT_CODE_WIDTH)]
    code_width: u32,

    /// Source bytes per BWT block when compressing; decompression reads it from the file
    #[arg(long, default_value_t = bwt::DEFAULT_BLOCK_SIZE)]
    block_size: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CodecArg {
    Huffman,
    Lzw,
    Bwt,
    Fastq,
}

impl From<CodecArg> for CodecKind {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::Huffman => CodecKind::Huffman,
            CodecArg::Lzw => CodecKind::Lzw,
            CodecArg::Bwt => CodecKind::Bwt,
            CodecArg::Fastq => CodecKind::Fastq,
        }
    }
}

/// `.lzw` and `.bwt` outputs lead with their settings, so decompression
/// never depends on the flags it was given.
fn compress_bytes(kind: CodecKind, job: &Job, input: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CodecKind::Huffman => HuffmanCodec.compress(input),
        CodecKind::Lzw => Ok(LzwCodec::new(job.code_width)?.encode_framed(input)),
        CodecKind::Bwt => {
            BwtCodec::new(job.block_size, bwt::DEFAULT_SENTINEL)?.encode_framed(input)
        }
        CodecKind::Fastq => FastqCodec::new(job.code_width)?.compress(input),
    }
}

fn decompress_bytes(kind: CodecKind, input: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CodecKind::Huffman => HuffmanCodec.decompress(input),
        CodecKind::Lzw => LzwCodec::decode_framed(input),
        CodecKind::Bwt => BwtCodec::decode_framed(input),
        CodecKind::Fastq => FastqCodec::default().decompress(input),
    }
}

/// `reads.fastq` becomes `reads.<extension>`.
fn compressed_path(input: &Path, kind: CodecKind) -> PathBuf {
    input.with_extension(kind.extension())
}

/// `reads.mix` becomes `reads.fastq`, or `reads1.fastq`, `reads2.fastq`, ...
/// when that name is taken.
fn decompressed_path(input: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let stem = input.with_extension("");
    let stem = stem.as_os_str().to_string_lossy();
    let candidate = PathBuf::from(format!("{stem}.fastq"));
    if !exists(&candidate) {
        return candidate;
    }
    (1u64..)
        .map(|n| PathBuf::from(format!("{stem}{n}.fastq")))
        .find(|path| !exists(path))
        .unwrap_or(candidate)
}

fn infer_kind(input: &Path) -> Result<CodecKind> {
    input
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(CodecKind::from_extension)
        .ok_or_else(|| {
            Error::invalid(format!(
                "cannot tell the codec of {}; pass --codec",
                input.display()
            ))
        })
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}

fn run(command: Command) -> Result<()> {
    let start = Instant::now();
    let (job, compress) = match command {
        Command::Compress(job) => (job, true),
        Command::Decompress(job) => (job, false),
    };

    let kind = match job.codec {
        Some(arg) => CodecKind::from(arg),
        None if compress => CodecKind::Fastq,
        None => infer_kind(&job.input)?,
    };

    let input = fs::read(&job.input)?;
    let (output, path) = if compress {
        let path = job
            .output
            .clone()
            .unwrap_or_else(|| compressed_path(&job.input, kind));
        (compress_bytes(kind, &job, &input)?, path)
    } else {
        let path = job
            .output
            .clone()
            .unwrap_or_else(|| decompressed_path(&job.input, |p| p.exists()));
        (decompress_bytes(kind, &input)?, path)
    };
    write_file(&path, &output)?;

    let ratio = if input.is_empty() {
        0.0
    } else {
        output.len() as f64 / input.len() as f64
    };
    info!(
        "{} {} ({} bytes) -> {} ({} bytes), ratio {:.3}, {:.2?}",
        kind,
        job.input.display(),
        input.len(),
        path.display(),
        output.len(),
        ratio,
        start.elapsed()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_path() {
        assert_eq!(
            compressed_path(Path::new("data/reads.fastq"), CodecKind::Fastq),
            PathBuf::from("data/reads.mix")
        );
        assert_eq!(
            compressed_path(Path::new("reads"), CodecKind::Huffman),
            PathBuf::from("reads.huffman")
        );
    }

    #[test]
    fn test_decompressed_path_free() {
        assert_eq!(
            decompressed_path(Path::new("reads.mix"), |_| false),
            PathBuf::from("reads.fastq")
        );
    }

    #[test]
    fn test_decompressed_path_numbers_taken_names() {
        let taken = [PathBuf::from("reads.fastq"), PathBuf::from("reads1.fastq")];
        assert_eq!(
            decompressed_path(Path::new("reads.lzw"), |p| taken.iter().any(|t| t == p)),
            PathBuf::from("reads2.fastq")
        );
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(infer_kind(Path::new("x.bwt")).unwrap(), CodecKind::Bwt);
        assert_eq!(infer_kind(Path::new("x.mix")).unwrap(), CodecKind::Fastq);
        assert!(infer_kind(Path::new("x.gz")).is_err());
    }

    fn job(args: &[&str]) -> Job {
        let mut argv = vec!["seqzip", "compress", "reads"];
        argv.extend_from_slice(args);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Compress(job) => job,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_decompress_ignores_flags_given_at_compress_time() {
        let input = b"@r1\nACGTTGCA\n+\nIIIIHHHH\n".repeat(40);
        let tuned = job(&["--code-width", "11", "--block-size", "64"]);
        for kind in [CodecKind::Huffman, CodecKind::Lzw, CodecKind::Bwt, CodecKind::Fastq] {
            let packed = compress_bytes(kind, &tuned, &input).unwrap();
            assert_eq!(decompress_bytes(kind, &packed).unwrap(), input, "{kind}");
        }
    }

    #[test]
    fn test_compress_rejects_bad_settings() {
        let input = b"ACGT";
        assert!(compress_bytes(CodecKind::Lzw, &job(&["--code-width", "4"]), input).is_err());
        assert!(compress_bytes(CodecKind::Bwt, &job(&["--block-size", "0"]), input).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from([
            "seqzip",
            "-vv",
            "compress",
            "reads.fastq",
            "--codec",
            "lzw",
            "--code-width",
            "12",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Compress(job) => {
                assert!(matches!(job.codec, Some(CodecArg::Lzw)));
                assert_eq!(job.code_width, 12);
                assert_eq!(job.block_size, bwt::DEFAULT_BLOCK_SIZE);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
