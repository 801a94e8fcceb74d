//! Output formats
//!
//! Renderers for the alignment/difference BED tracks and the VCF, plus the
//! driver that runs a chain stream through the differ into them.

pub mod bed;
pub mod emit;
pub mod vcf;

pub use bed::{alignment_extent, difference_extent, target_alignment_extent, track_line, BedExtent, ItemColor};
pub use emit::{convert_chain, CallEmitter, ConversionStats, EmitterOutputs};
pub use vcf::{write_header, VcfRecord};
