//! Core difference-calling functionality
//!
//! This module contains the chain file parser, the coordinate walker,
//! the difference classifier and the indexed sequence sources.

mod chain;
pub mod classify;
mod coords;
mod differ;
pub mod dna;
mod error;
pub mod io;
pub mod sequence;
mod walker;

pub use chain::{
    parse_chain_bytes, Block, BlockEntry, ChainEvent, ChainHeader, ChainParseError, ChainParseErrorKind,
    ChainReader, ChainRecord, ChainRecords,
};
pub use classify::{
    classify_gap, compare_match_windows, Allele, GapClass, GapWindows, Structural, VariantCall, VariantKind,
    DEFAULT_SV_THRESHOLD,
};
pub use coords::{map_interval, map_position, Strand};
pub use differ::{ChainDiffer, ChainOutcome, DiffConfig, SkipReason};
pub use error::{ChainDiffError, Result, SequenceError, SequenceResult};
pub use io::{create_output, detect_compression, open_input, CompressionFormat, OutputWriter, DEFAULT_BUFFER_SIZE};
pub use sequence::{IndexedFasta, MemorySequences, SequenceSource};
pub use walker::{CoordinateWalker, GapSpan, MatchSpan, WalkerState};
