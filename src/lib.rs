//! FastChainDiff - variant calls from pairwise genome alignments
//!
//! Walks UCSC chain files in both coordinate systems, compares the aligned
//! sequence of a reference and a target genome, and reports the differences
//! as BED tracks and VCFs placed on either assembly.
//!
//! # Features
//!
//! - Lazy, line-oriented chain parsing (plain, gzip, bzip2)
//! - Memory-mapped FASTA access through `.fai` indexes (noodles-fasta)
//! - SNV, insertion, deletion and indel calls with symbolic alleles for large events
//! - Parallel processing with rayon, output kept in input order
//!
//! # Example
//!
//! ```ignore
//! use fast_chaindiff::{ChainReader, CallEmitter, DiffConfig, IndexedFasta, convert_chain};
//!
//! let reference = IndexedFasta::open("hg19.fa")?;
//! let target = IndexedFasta::open("hg38.fa")?;
//! let records = ChainReader::from_path("hg19ToHg38.chain".as_ref())?.records();
//!
//! let mut emitter = CallEmitter::new(std::io::stdout(), std::io::stderr());
//! let stats = convert_chain(records, &reference, &target, &DiffConfig::default(), &mut emitter, 1)?;
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    parse_chain_bytes, ChainDiffError, ChainDiffer, ChainHeader, ChainOutcome, ChainParseError, ChainReader,
    ChainRecord, DiffConfig, IndexedFasta, MemorySequences, SequenceSource, Strand, VariantCall, VariantKind,
};
pub use formats::{convert_chain, CallEmitter, ConversionStats};
