//! BED extent records
//!
//! Renders chains and variant calls as 9-column BED lines with an `itemRgb`
//! colour, ready for a genome browser track.

use crate::core::{ChainHeader, Strand, VariantCall, VariantKind};
use std::fmt;

/// `itemRgb` colour of a BED record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemColor(pub u8, pub u8, pub u8);

impl ItemColor {
    pub const ALIGNMENT: ItemColor = ItemColor(0, 104, 183);
    pub const SNV: ItemColor = ItemColor(238, 120, 0);
    pub const INSERTION: ItemColor = ItemColor(199, 0, 103);
    pub const DELETION: ItemColor = ItemColor(215, 0, 53);
    pub const INDEL: ItemColor = ItemColor(234, 85, 80);

    pub fn for_kind(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Snv => Self::SNV,
            VariantKind::Insertion => Self::INSERTION,
            VariantKind::Deletion => Self::DELETION,
            VariantKind::Indel => Self::INDEL,
        }
    }
}

impl fmt::Display for ItemColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

/// One BED9 line: `chrom start end name 0 strand thickStart thickEnd itemRgb`
///
/// The thick region always equals the record extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedExtent {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
    pub strand: Strand,
    pub color: Option<ItemColor>,
}

impl fmt::Display for BedExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t0\t{}\t{}\t{}\t",
            self.chrom, self.start, self.end, self.name, self.strand, self.start, self.end
        )?;
        match self.color {
            Some(color) => write!(f, "{}", color),
            None => f.write_str("0"),
        }
    }
}

/// Extent of a whole chain on the reference, labelled with its target interval
pub fn alignment_extent(header: &ChainHeader) -> BedExtent {
    let (target_start, target_end) = header
        .target_interval()
        .unwrap_or((header.target_start, header.target_stop));
    BedExtent {
        chrom: header.reference_name.clone(),
        start: header.reference_start,
        end: header.reference_stop,
        name: format!(
            "chain:{}{}:{}-{}",
            header.target_strand, header.target_name, target_start, target_end
        ),
        strand: header.target_strand,
        color: Some(ItemColor::ALIGNMENT),
    }
}

/// Extent of a whole chain on the target, labelled with its reference interval
pub fn target_alignment_extent(header: &ChainHeader) -> BedExtent {
    let (target_start, target_end) = header
        .target_interval()
        .unwrap_or((header.target_start, header.target_stop));
    BedExtent {
        chrom: header.target_name.clone(),
        start: target_start,
        end: target_end,
        name: format!(
            "chain:{}{}:{}-{}",
            header.target_strand, header.reference_name, header.reference_start, header.reference_stop
        ),
        strand: header.target_strand,
        color: None,
    }
}

/// Extent of one variant call on the reference
pub fn difference_extent(call: &VariantCall) -> BedExtent {
    let name = match call.target_end {
        Some(target_end) => format!(
            "{}:{}{}:{}-{}:{}>{}",
            call.kind,
            call.target_strand,
            call.target_name,
            call.target_pos,
            target_end,
            call.reference_allele,
            call.target_allele
        ),
        None => format!(
            "{}:{}{}:{}:{}>{}",
            call.kind, call.target_strand, call.target_name, call.target_pos, call.reference_allele, call.target_allele
        ),
    };
    BedExtent {
        chrom: call.reference_name.clone(),
        start: call.reference_start(),
        end: call.reference_end,
        name,
        strand: call.target_strand,
        color: Some(ItemColor::for_kind(call.kind)),
    }
}

/// UCSC track line for a `--track-name` and a track role
/// (`alignment` or `difference`)
pub fn track_line(track_name: &str, role: &str) -> String {
    format!(
        "track name=\"{0} {1}\" description=\"{0} {1}\" visibility=2 itemRgb=\"On\"",
        track_name, role
    )
}
