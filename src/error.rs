//! Error type shared by every codec and the FASTQ container.

use std::fmt;

use thiserror::Error;

/// The part of a compressed stream that was being read when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fixed-size fields at the front of a stream (lengths, counts, magic).
    Header,
    /// The serialized Huffman tree.
    Tree,
    /// The coded payload following the header.
    Payload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Header => write!(f, "header"),
            Stage::Tree => write!(f, "tree"),
            Stage::Payload => write!(f, "payload"),
        }
    }
}

/// Errors produced while encoding or decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// A length, tag or marker in the stream is inconsistent with its contents.
    #[error("malformed {stage}: {reason}")]
    MalformedHeader { stage: Stage, reason: String },

    /// A code refers to a dictionary slot that does not exist yet.
    #[error("unknown code {code} in {stage} (next assignable code is {next})")]
    UnknownCode { stage: Stage, code: u32, next: u32 },

    /// The stream ends before the declared amount of data.
    #[error("truncated {stage}: needed {needed} bits, {available} available")]
    TruncatedStream {
        stage: Stage,
        needed: u64,
        available: u64,
    },

    /// A BWT block contains its own sentinel byte.
    #[error("sentinel {sentinel:#04x} occurs in block {block} at offset {offset}")]
    SentinelCollision {
        sentinel: u8,
        block: usize,
        offset: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn malformed(stage: Stage, reason: impl Into<String>) -> Self {
        Error::MalformedHeader {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(stage: Stage, needed: u64, available: u64) -> Self {
        Error::TruncatedStream {
            stage,
            needed,
            available,
        }
    }

    /// The stage a decode failed in, if the error came from reading a stream.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::MalformedHeader { stage, .. }
            | Error::UnknownCode { stage, .. }
            | Error::TruncatedStream { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;
