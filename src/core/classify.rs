//! Difference classifier
//!
//! Decides, for the sequence windows of one block, which variant calls (if
//! any) the block produces. The functions here are pure: windows are
//! fetched by the caller, already upper-cased and, for minus-strand chains,
//! reverse-complemented into reference orientation.

use crate::core::chain::ChainHeader;
use crate::core::coords::Strand;
use crate::core::dna::{complement_base, revcomp, same_base};
use crate::core::walker::{GapSpan, MatchSpan};

/// Windows longer than this are reported as symbolic alleles by default
pub const DEFAULT_SV_THRESHOLD: usize = 100;

/// Variant class of an emitted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Snv,
    Insertion,
    Deletion,
    Indel,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Snv => "SNV",
            VariantKind::Insertion => "INS",
            VariantKind::Deletion => "DEL",
            VariantKind::Indel => "INDEL",
        }
    }

    /// The same event seen from the target assembly
    pub fn mirrored(&self) -> Self {
        match self {
            VariantKind::Insertion => VariantKind::Deletion,
            VariantKind::Deletion => VariantKind::Insertion,
            other => *other,
        }
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a gap block, decided once from its two lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapClass {
    /// 0/0: nothing unaligned
    Match,
    /// 1/1: a substitution the aligner encoded as a gap
    Substitution,
    /// 0/n
    Insertion,
    /// n/0
    Deletion,
    /// m/n, both non-zero
    IndelBlock,
}

impl GapClass {
    pub fn of(reference_gap: u64, target_gap: u64) -> Self {
        match (reference_gap, target_gap) {
            (0, 0) => GapClass::Match,
            (1, 1) => GapClass::Substitution,
            (0, _) => GapClass::Insertion,
            (_, 0) => GapClass::Deletion,
            _ => GapClass::IndelBlock,
        }
    }

    /// One side is empty, so the windows start one base early
    pub fn is_anchored(&self) -> bool {
        matches!(self, GapClass::Insertion | GapClass::Deletion)
    }

    pub fn kind(&self) -> Option<VariantKind> {
        match self {
            GapClass::Match => None,
            GapClass::Substitution => Some(VariantKind::Snv),
            GapClass::Insertion => Some(VariantKind::Insertion),
            GapClass::Deletion => Some(VariantKind::Deletion),
            GapClass::IndelBlock => Some(VariantKind::Indel),
        }
    }
}

/// Sequence windows to fetch for a gap block
///
/// Reference coordinates are absolute; target coordinates are local to the
/// chain's target strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapWindows {
    pub class: GapClass,
    pub reference_start: u64,
    pub reference_end: u64,
    pub target_start: u64,
    pub target_end: u64,
}

impl GapWindows {
    pub fn new(span: &GapSpan) -> Self {
        let class = GapClass::of(span.reference_gap, span.target_gap);
        let anchor = u64::from(class.is_anchored());
        Self {
            class,
            reference_start: span.reference_start.saturating_sub(anchor),
            reference_end: span.reference_start + span.reference_gap,
            target_start: span.target_start.saturating_sub(anchor),
            target_end: span.target_start + span.target_gap,
        }
    }
}

/// Allele text as shown in labels and VCF records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allele {
    Literal(String),
    /// Window too long to spell out; only its length is kept
    Truncated(usize),
}

impl Allele {
    pub fn from_window(window: &[u8], threshold: usize) -> Self {
        if window.len() > threshold {
            Allele::Truncated(window.len())
        } else {
            Allele::Literal(String::from_utf8_lossy(window).into_owned())
        }
    }

    fn base(base: u8) -> Self {
        Allele::Literal((base as char).to_string())
    }

    /// Allele text on the opposite strand; truncated alleles keep their length
    pub fn reverse_complement(&self) -> Self {
        match self {
            Allele::Literal(bases) => Allele::Literal(String::from_utf8_lossy(&revcomp(bases.as_bytes())).into_owned()),
            Allele::Truncated(len) => Allele::Truncated(*len),
        }
    }
}

impl std::fmt::Display for Allele {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allele::Literal(bases) => f.write_str(bases),
            Allele::Truncated(len) => write!(f, "[LEN:{}]", len),
        }
    }
}

/// Symbolic representation of a call whose windows exceed the threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structural {
    /// Size-based type; may differ from the call's gap-based kind
    pub sv_type: VariantKind,
    /// `len(target window) - len(reference window)`
    pub sv_length: i64,
    /// First base of the reference window
    pub sv_ref: char,
    /// First base of the target window on the target's plus strand
    pub target_sv_ref: char,
    /// 1-based inclusive end on the reference
    pub end: u64,
}

/// One difference between the reference and the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCall {
    pub kind: VariantKind,
    pub chain_id: String,
    pub reference_name: String,
    /// 1-based position of the first reference base
    pub reference_pos: u64,
    /// 0-based exclusive end of the reference window
    pub reference_end: u64,
    pub reference_allele: Allele,
    pub target_allele: Allele,
    pub target_name: String,
    pub target_strand: Strand,
    /// 0-based absolute target position
    pub target_pos: u64,
    /// Absolute exclusive end of the target window (gap calls other than SNV)
    pub target_end: Option<u64>,
    pub structural: Option<Structural>,
}

impl VariantCall {
    /// 0-based start of the reference window
    pub fn reference_start(&self) -> u64 {
        self.reference_pos - 1
    }

    pub fn is_structural(&self) -> bool {
        self.structural.is_some()
    }
}

/// Compare the two windows of a match block base by base
///
/// `target_window` is the absolute target interval of the block and
/// `target` its bases in reference orientation. Every case-insensitive
/// mismatch yields one SNV call.
pub fn compare_match_windows(
    header: &ChainHeader,
    span: &MatchSpan,
    target_window: (u64, u64),
    reference: &[u8],
    target: &[u8],
) -> Vec<VariantCall> {
    reference
        .iter()
        .zip(target)
        .enumerate()
        .filter(|(_, (r, t))| !same_base(**r, **t))
        .map(|(i, (&r, &t))| {
            let offset = i as u64;
            let target_pos = match header.target_strand {
                Strand::Plus => target_window.0 + offset,
                Strand::Minus => target_window.1 - offset - 1,
            };
            VariantCall {
                kind: VariantKind::Snv,
                chain_id: header.chain_id.clone(),
                reference_name: header.reference_name.clone(),
                reference_pos: span.reference_start + offset + 1,
                reference_end: span.reference_start + offset + 1,
                reference_allele: Allele::base(r),
                target_allele: Allele::base(t),
                target_name: header.target_name.clone(),
                target_strand: header.target_strand,
                target_pos,
                target_end: None,
                structural: None,
            }
        })
        .collect()
}

/// Classify the windows of a gap block
///
/// `target_window` is the absolute target interval of `windows`.
/// Returns `None` for 0/0 gaps and when both windows hold the same bases.
pub fn classify_gap(
    header: &ChainHeader,
    windows: &GapWindows,
    target_window: (u64, u64),
    reference: &[u8],
    target: &[u8],
    sv_threshold: usize,
) -> Option<VariantCall> {
    let kind = windows.class.kind()?;
    if reference.eq_ignore_ascii_case(target) {
        return None;
    }

    let structural = (reference.len() > sv_threshold || target.len() > sv_threshold).then(|| {
        let sv_type = if reference.len() == 1 {
            VariantKind::Insertion
        } else if target.len() == 1 {
            VariantKind::Deletion
        } else {
            VariantKind::Indel
        };
        Structural {
            sv_type,
            sv_length: target.len() as i64 - reference.len() as i64,
            sv_ref: reference.first().map(|&b| b as char).unwrap_or('N'),
            target_sv_ref: match header.target_strand {
                Strand::Plus => target.first().copied(),
                Strand::Minus => target.last().map(|&b| complement_base(b)),
            }
            .map(char::from)
            .unwrap_or('N'),
            end: windows.reference_end,
        }
    });

    let (target_pos, target_end) = target_window;

    Some(VariantCall {
        kind,
        chain_id: header.chain_id.clone(),
        reference_name: header.reference_name.clone(),
        reference_pos: windows.reference_start + 1,
        reference_end: windows.reference_end,
        reference_allele: Allele::from_window(reference, sv_threshold),
        target_allele: Allele::from_window(target, sv_threshold),
        target_name: header.target_name.clone(),
        target_strand: header.target_strand,
        target_pos,
        target_end: (kind != VariantKind::Snv).then_some(target_end),
        structural,
    })
}
