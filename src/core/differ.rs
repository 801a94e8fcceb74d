//! Per-chain difference pipeline
//!
//! Drives one [`ChainRecord`] through the coordinate walker and the
//! classifier, fetching sequence windows from the two sources. Chains are
//! independent: a [`ChainDiffer`] holds only shared read-only state, so one
//! differ can serve many threads.

use crate::core::chain::{Block, ChainRecord};
use crate::core::classify::{
    classify_gap, compare_match_windows, GapClass, GapWindows, VariantCall, DEFAULT_SV_THRESHOLD,
};
use crate::core::dna::revcomp_inplace;
use crate::core::error::{ChainDiffError, Result, SequenceError};
use crate::core::sequence::SequenceSource;
use crate::core::walker::CoordinateWalker;
use log::{debug, warn};

/// Options controlling which calls are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Windows longer than this are reported as symbolic alleles
    pub sv_threshold: usize,
    /// Compare match blocks base by base and report SNVs
    pub compare_matches: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            sv_threshold: DEFAULT_SV_THRESHOLD,
            compare_matches: false,
        }
    }
}

/// Why a chain produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownReferenceSequence,
    UnknownTargetSequence,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UnknownReferenceSequence => write!(f, "reference sequence not found"),
            SkipReason::UnknownTargetSequence => write!(f, "target sequence not found"),
        }
    }
}

/// Result of diffing one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Skipped(SkipReason),
    Processed { calls: Vec<VariantCall> },
}

impl ChainOutcome {
    pub fn calls(&self) -> &[VariantCall] {
        match self {
            ChainOutcome::Skipped(_) => &[],
            ChainOutcome::Processed { calls } => calls,
        }
    }
}

/// Computes variant calls for chains against a reference and a target source
pub struct ChainDiffer<'a, R: ?Sized, T: ?Sized> {
    reference: &'a R,
    target: &'a T,
    config: DiffConfig,
}

impl<'a, R, T> ChainDiffer<'a, R, T>
where
    R: SequenceSource + ?Sized,
    T: SequenceSource + ?Sized,
{
    pub fn new(reference: &'a R, target: &'a T, config: DiffConfig) -> Self {
        Self {
            reference,
            target,
            config,
        }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Walk every block of `record` and collect its calls
    ///
    /// Chains on sequences missing from either source are skipped without
    /// any lookup. Fetch failures and block sums that disagree with the
    /// header are fatal.
    pub fn diff_chain(&self, record: &ChainRecord) -> Result<ChainOutcome> {
        let header = &record.header;

        let Some(reference_length) = self.reference.length(&header.reference_name) else {
            warn!(
                "Skipping chain {} (line {}): reference sequence {} not found",
                header.chain_id, record.line, header.reference_name
            );
            return Ok(ChainOutcome::Skipped(SkipReason::UnknownReferenceSequence));
        };
        let Some(target_length) = self.target.length(&header.target_name) else {
            warn!(
                "Skipping chain {} (line {}): target sequence {} not found",
                header.chain_id, record.line, header.target_name
            );
            return Ok(ChainOutcome::Skipped(SkipReason::UnknownTargetSequence));
        };

        if reference_length != header.reference_length {
            warn!(
                "Chain {} (line {}): header length {} for {} disagrees with reference sequence length {}",
                header.chain_id, record.line, header.reference_length, header.reference_name, reference_length
            );
        }
        if target_length != header.target_length {
            warn!(
                "Chain {} (line {}): header length {} for {} disagrees with target sequence length {}",
                header.chain_id, record.line, header.target_length, header.target_name, target_length
            );
        }

        debug!(
            "Chain {}: {}:{}-{} -> {}:{}-{} ({}), {} blocks",
            header.chain_id,
            header.reference_name,
            header.reference_start,
            header.reference_stop,
            header.target_name,
            header.target_start,
            header.target_stop,
            header.target_strand,
            record.blocks.len()
        );

        let mut walker = CoordinateWalker::new(header, record.line);
        let mut calls = Vec::new();

        for entry in &record.blocks {
            match entry.block {
                Block::Match { length } => {
                    let span = walker.advance_match(length);
                    if !self.config.compare_matches {
                        continue;
                    }
                    let reference =
                        self.fetch_reference(record, entry.line, span.reference_start, span.reference_start + length)?;
                    let window = target_window(&walker, record, entry.line, span.target_start, span.target_start + length)?;
                    let target = self.fetch_target(record, entry.line, window)?;
                    calls.extend(compare_match_windows(header, &span, window, &reference, &target));
                }
                Block::Gap {
                    reference_gap,
                    target_gap,
                } => {
                    let span = walker.advance_gap(reference_gap, target_gap);
                    let windows = GapWindows::new(&span);
                    if windows.class == GapClass::Match {
                        continue;
                    }
                    let reference =
                        self.fetch_reference(record, entry.line, windows.reference_start, windows.reference_end)?;
                    let window = target_window(&walker, record, entry.line, windows.target_start, windows.target_end)?;
                    let target = self.fetch_target(record, entry.line, window)?;
                    calls.extend(classify_gap(
                        header,
                        &windows,
                        window,
                        &reference,
                        &target,
                        self.config.sv_threshold,
                    ));
                }
            }
        }

        walker.finish()?;
        Ok(ChainOutcome::Processed { calls })
    }

    fn fetch_reference(&self, record: &ChainRecord, line: usize, start: u64, end: u64) -> Result<Vec<u8>> {
        self.reference
            .fetch(&record.header.reference_name, start, end)
            .map_err(|source| fetch_error(record, line, source))
    }

    /// Fetch an absolute target window, returned in reference orientation
    fn fetch_target(&self, record: &ChainRecord, line: usize, (start, end): (u64, u64)) -> Result<Vec<u8>> {
        let mut bases = self
            .target
            .fetch(&record.header.target_name, start, end)
            .map_err(|source| fetch_error(record, line, source))?;
        if record.header.target_strand.is_minus() {
            revcomp_inplace(&mut bases);
        }
        Ok(bases)
    }
}

/// Absolute target interval of a chain-local window
fn target_window(
    walker: &CoordinateWalker<'_>,
    record: &ChainRecord,
    line: usize,
    start: u64,
    end: u64,
) -> Result<(u64, u64)> {
    walker.target_interval(start, end).ok_or_else(|| {
        fetch_error(
            record,
            line,
            SequenceError::OutOfRange {
                name: record.header.target_name.clone(),
                start,
                end,
                length: record.header.target_length,
            },
        )
    })
}

fn fetch_error(record: &ChainRecord, line: usize, source: SequenceError) -> ChainDiffError {
    ChainDiffError::Sequence {
        chain_id: record.header.chain_id.clone(),
        line,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::parse_chain_bytes;
    use crate::core::classify::{Allele, VariantKind};
    use crate::core::sequence::MemorySequences;

    fn sources(reference: &[(&str, &str)], target: &[(&str, &str)]) -> (MemorySequences, MemorySequences) {
        let mut r = MemorySequences::new();
        for (name, seq) in reference {
            r.insert(*name, seq);
        }
        let mut t = MemorySequences::new();
        for (name, seq) in target {
            t.insert(*name, seq);
        }
        (r, t)
    }

    fn compare() -> DiffConfig {
        DiffConfig {
            compare_matches: true,
            ..DiffConfig::default()
        }
    }

    fn single(chain: &str) -> ChainRecord {
        parse_chain_bytes(chain.as_bytes()).unwrap().remove(0)
    }

    #[test]
    fn test_snv_in_match_block() {
        let (r, t) = sources(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACCTAC")]);
        let differ = ChainDiffer::new(&r, &t, compare());
        let record = single("chain 1 chr1 10 + 0 10 chr1 10 + 0 10 1\n10\n");

        let outcome = differ.diff_chain(&record).unwrap();
        let calls = outcome.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, VariantKind::Snv);
        assert_eq!(calls[0].reference_pos, 7);
        assert_eq!(calls[0].reference_allele.to_string(), "G");
        assert_eq!(calls[0].target_allele.to_string(), "C");
    }

    #[test]
    fn test_match_blocks_not_compared_by_default() {
        let (r, t) = sources(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACCTAC")]);
        let differ = ChainDiffer::new(&r, &t, DiffConfig::default());
        let record = single("chain 1 chr1 10 + 0 10 chr1 10 + 0 10 1\n10\n");
        assert_eq!(differ.diff_chain(&record).unwrap(), ChainOutcome::Processed { calls: vec![] });
    }

    #[test]
    fn test_insertion_gap() {
        let (r, t) = sources(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTTTTTTACGTAC")]);
        let differ = ChainDiffer::new(&r, &t, DiffConfig::default());
        let record = single("chain 1 chr1 10 + 0 10 chr1 15 + 0 15 1\n4 0 5\n6\n");

        let outcome = differ.diff_chain(&record).unwrap();
        let calls = outcome.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, VariantKind::Insertion);
        assert_eq!(calls[0].reference_pos, 4);
        assert_eq!(calls[0].reference_allele, Allele::Literal("T".into()));
        assert_eq!(calls[0].target_allele, Allele::Literal("TTTTTT".into()));
    }

    #[test]
    fn test_minus_strand_target_is_reverse_complemented() {
        // Target genome is the reverse complement of ACGTACCTAC
        let (r, t) = sources(&[("chr1", "ACGTACGTAC")], &[("chrT", "GTAGGTACGT")]);
        let differ = ChainDiffer::new(&r, &t, compare());
        let record = single("chain 1 chr1 10 + 0 10 chrT 10 - 0 10 7\n10\n");

        let outcome = differ.diff_chain(&record).unwrap();
        let calls = outcome.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].reference_pos, 7);
        assert_eq!(calls[0].target_allele.to_string(), "C");
        // Reference base 7 pairs with the complement of target base 4 (1-based)
        assert_eq!(calls[0].target_pos, 3);
    }

    #[test]
    fn test_minus_strand_blocks_past_target_length() {
        let (r, t) = sources(&[("chr1", "ACGTACGTACGTACGTACGT")], &[("chrT", "ACGTACGTAC")]);
        let differ = ChainDiffer::new(&r, &t, compare());
        // Header span is valid, the block runs two bases past the target length
        let record = single("chain 1 chr1 20 + 0 12 chrT 10 - 0 10 1\n12\n");

        match differ.diff_chain(&record) {
            Err(ChainDiffError::Sequence { chain_id, line, source }) => {
                assert_eq!(chain_id, "1");
                assert_eq!(line, 2);
                assert!(source.is_out_of_range());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sequences_are_skipped() {
        let (r, t) = sources(&[("chr1", "ACGT")], &[("chr1", "ACGT")]);
        let differ = ChainDiffer::new(&r, &t, compare());

        let record = single("chain 1 chrX 4 + 0 4 chr1 4 + 0 4 1\n4\n");
        assert_eq!(
            differ.diff_chain(&record).unwrap(),
            ChainOutcome::Skipped(SkipReason::UnknownReferenceSequence)
        );

        let record = single("chain 1 chr1 4 + 0 4 chrY 4 + 0 4 2\n4\n");
        assert_eq!(
            differ.diff_chain(&record).unwrap(),
            ChainOutcome::Skipped(SkipReason::UnknownTargetSequence)
        );
    }

    #[test]
    fn test_out_of_range_fetch_names_chain() {
        let (r, t) = sources(&[("chr1", "ACGT")], &[("chr1", "ACGTACGT")]);
        let differ = ChainDiffer::new(&r, &t, compare());
        let record = single("chain 1 chr1 8 + 0 8 chr1 8 + 0 8 c42\n8\n");

        match differ.diff_chain(&record) {
            Err(ChainDiffError::Sequence { chain_id, line, source }) => {
                assert_eq!(chain_id, "c42");
                assert_eq!(line, 2);
                assert!(source.is_out_of_range());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_block_sum_mismatch_is_fatal() {
        let (r, t) = sources(&[("chr1", "ACGTACGT")], &[("chr1", "ACGTACGT")]);
        let differ = ChainDiffer::new(&r, &t, DiffConfig::default());
        let record = single("chain 1 chr1 8 + 0 8 chr1 8 + 0 8 1\n6\n");

        assert!(matches!(
            differ.diff_chain(&record),
            Err(ChainDiffError::InconsistentChain { .. })
        ));
    }
}
