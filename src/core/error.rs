//! Error types for FastChainDiff
//!
//! Defines all error types used throughout the library.

use crate::core::chain::ChainParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for chain difference calling
#[derive(Debug, Error)]
pub enum ChainDiffError {
    /// Chain file parsing errors (always fatal)
    #[error("Chain parse error: {0}")]
    ChainParse(#[from] ChainParseError),

    /// Sequence lookup failed while processing a chain
    #[error("Chain {chain_id} (line {line}): {source}")]
    Sequence {
        chain_id: String,
        line: usize,
        source: SequenceError,
    },

    /// Block lengths do not add up to the span declared in the header
    #[error(
        "Chain {chain_id} (line {line}): blocks end at reference {reference_cursor}, target {target_cursor}; \
         header declares reference {reference_stop}, target {target_stop}"
    )]
    InconsistentChain {
        chain_id: String,
        line: usize,
        reference_cursor: u64,
        reference_stop: u64,
        target_cursor: u64,
        target_stop: u64,
    },

    /// Opening or indexing a sequence source failed
    #[error("Sequence source error: {0}")]
    Source(#[from] SequenceError),

    /// Failed to set up the worker pool
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by an indexed sequence source
#[derive(Debug, Error)]
pub enum SequenceError {
    /// Sequence name not present in the index
    #[error("Sequence not found: {0}")]
    UnknownSequence(String),

    /// Requested interval runs past the end of the sequence
    #[error("Interval {name}:{start}-{end} exceeds sequence length {length}")]
    OutOfRange {
        name: String,
        start: u64,
        end: u64,
        length: u64,
    },

    /// start > end
    #[error("Invalid interval: start ({start}) > end ({end})")]
    InvalidRange { start: u64, end: u64 },

    /// Malformed `.fai` entry or FASTA layout
    #[error("Invalid FASTA index for {path}: {message}")]
    InvalidIndex { path: PathBuf, message: String },

    /// I/O error while opening or mapping a FASTA file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SequenceError {
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, SequenceError::OutOfRange { .. })
    }
}

/// Result type alias for FastChainDiff operations
pub type Result<T> = std::result::Result<T, ChainDiffError>;

/// Result type alias for sequence lookups
pub type SequenceResult<T> = std::result::Result<T, SequenceError>;
