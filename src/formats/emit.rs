//! Call emitter and conversion driver
//!
//! [`CallEmitter`] renders chain outcomes into the alignment BED and the
//! VCF, plus the optional target-side BED, difference BED and target VCF.
//! [`convert_chain`] drives a whole chain stream through a [`ChainDiffer`]
//! and the emitter, sequentially or on a rayon pool. Output order always
//! follows input order.

use crate::core::{
    ChainDiffError, ChainDiffer, ChainOutcome, ChainParseError, ChainRecord, DiffConfig, OutputWriter, Result,
    SequenceSource, SkipReason, VariantKind,
};
use crate::formats::bed::{alignment_extent, difference_extent, target_alignment_extent, track_line};
use crate::formats::vcf::{write_header, VcfRecord};
use log::{debug, info};
use rayon::prelude::*;
use std::io::{self, Write};

/// Number of chains diffed together per parallel batch
const CHAIN_BATCH_SIZE: usize = 256;

/// Conversion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    pub chains: usize,
    pub processed: usize,
    pub skipped_unknown_reference: usize,
    pub skipped_unknown_target: usize,
    pub snv: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub indels: usize,
    /// Calls reported with a symbolic allele (also counted under their kind)
    pub structural: usize,
}

impl ConversionStats {
    pub fn record(&mut self, outcome: &ChainOutcome) {
        self.chains += 1;
        match outcome {
            ChainOutcome::Skipped(SkipReason::UnknownReferenceSequence) => self.skipped_unknown_reference += 1,
            ChainOutcome::Skipped(SkipReason::UnknownTargetSequence) => self.skipped_unknown_target += 1,
            ChainOutcome::Processed { calls } => {
                self.processed += 1;
                for call in calls {
                    match call.kind {
                        VariantKind::Snv => self.snv += 1,
                        VariantKind::Insertion => self.insertions += 1,
                        VariantKind::Deletion => self.deletions += 1,
                        VariantKind::Indel => self.indels += 1,
                    }
                    if call.is_structural() {
                        self.structural += 1;
                    }
                }
            }
        }
    }

    pub fn calls(&self) -> usize {
        self.snv + self.insertions + self.deletions + self.indels
    }

    pub fn skipped(&self) -> usize {
        self.skipped_unknown_reference + self.skipped_unknown_target
    }
}

/// Writers handed back by [`CallEmitter::finish`]
pub struct EmitterOutputs<W> {
    pub alignment: W,
    pub target_alignment: Option<W>,
    pub difference: Option<W>,
    pub variants: W,
    pub target_variants: Option<W>,
}

impl EmitterOutputs<OutputWriter> {
    /// Finish every file, reporting the first failure
    pub fn close(self) -> io::Result<()> {
        let writers = [
            Some(self.alignment),
            self.target_alignment,
            self.difference,
            Some(self.variants),
            self.target_variants,
        ];
        let mut first_error = None;
        for writer in writers.into_iter().flatten() {
            if let Err(e) = writer.finish() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Renders chain outcomes into the output streams
pub struct CallEmitter<W: Write> {
    alignment: W,
    target_alignment: Option<W>,
    difference: Option<W>,
    variants: W,
    target_variants: Option<W>,
}

impl<W: Write> CallEmitter<W> {
    pub fn new(alignment: W, variants: W) -> Self {
        Self {
            alignment,
            target_alignment: None,
            difference: None,
            variants,
            target_variants: None,
        }
    }

    /// Also write one BED record per call
    pub fn with_difference(mut self, writer: W) -> Self {
        self.difference = Some(writer);
        self
    }

    /// Also write each chain's extent on the target genome
    pub fn with_target_alignment(mut self, writer: W) -> Self {
        self.target_alignment = Some(writer);
        self
    }

    /// Also write every call as a VCF record on the target assembly
    pub fn with_target_variants(mut self, writer: W) -> Self {
        self.target_variants = Some(writer);
        self
    }

    /// Write track lines (when a track name is given) and the VCF header
    pub fn write_headers(
        &mut self,
        track_name: Option<&str>,
        contigs: &[(String, u64)],
        reference: Option<&str>,
    ) -> io::Result<()> {
        if let Some(name) = track_name {
            writeln!(self.alignment, "{}", track_line(name, "alignment"))?;
            if let Some(difference) = self.difference.as_mut() {
                writeln!(difference, "{}", track_line(name, "difference"))?;
            }
        }
        write_header(&mut self.variants, contigs, reference)
    }

    /// Write the target VCF header, if a target VCF is attached
    pub fn write_target_header(&mut self, contigs: &[(String, u64)], target: Option<&str>) -> io::Result<()> {
        match self.target_variants.as_mut() {
            Some(writer) => write_header(writer, contigs, target),
            None => Ok(()),
        }
    }

    /// Write every record of one chain; skipped chains produce nothing
    pub fn emit(&mut self, record: &ChainRecord, outcome: &ChainOutcome) -> io::Result<()> {
        let ChainOutcome::Processed { calls } = outcome else {
            return Ok(());
        };

        writeln!(self.alignment, "{}", alignment_extent(&record.header))?;
        if let Some(target_alignment) = self.target_alignment.as_mut() {
            writeln!(target_alignment, "{}", target_alignment_extent(&record.header))?;
        }
        for call in calls {
            if let Some(difference) = self.difference.as_mut() {
                writeln!(difference, "{}", difference_extent(call))?;
            }
            writeln!(self.variants, "{}", VcfRecord::from_call(call))?;
            if let Some(target_variants) = self.target_variants.as_mut() {
                writeln!(target_variants, "{}", VcfRecord::target_from_call(call))?;
            }
        }
        Ok(())
    }

    /// Flush all streams and hand the writers back
    pub fn finish(mut self) -> io::Result<EmitterOutputs<W>> {
        self.alignment.flush()?;
        if let Some(w) = self.target_alignment.as_mut() {
            w.flush()?;
        }
        if let Some(w) = self.difference.as_mut() {
            w.flush()?;
        }
        self.variants.flush()?;
        if let Some(w) = self.target_variants.as_mut() {
            w.flush()?;
        }
        Ok(EmitterOutputs {
            alignment: self.alignment,
            target_alignment: self.target_alignment,
            difference: self.difference,
            variants: self.variants,
            target_variants: self.target_variants,
        })
    }
}

/// Diff every chain of `records` and emit the results in input order
///
/// # Arguments
/// * `records` - Chain records, typically from [`crate::core::ChainReader::records`]
/// * `reference` - Reference sequence source
/// * `target` - Target sequence source
/// * `config` - Diff options
/// * `emitter` - Output streams (headers already written)
/// * `threads` - Worker threads (1 = sequential)
///
/// The first fatal error stops the run; chains before it are already
/// written.
pub fn convert_chain<I, R, T, W>(
    records: I,
    reference: &R,
    target: &T,
    config: &DiffConfig,
    emitter: &mut CallEmitter<W>,
    threads: usize,
) -> Result<ConversionStats>
where
    I: Iterator<Item = std::result::Result<ChainRecord, ChainParseError>>,
    R: SequenceSource + Sync + ?Sized,
    T: SequenceSource + Sync + ?Sized,
    W: Write,
{
    let differ = ChainDiffer::new(reference, target, *config);
    let stats = if threads > 1 {
        convert_parallel(records, &differ, emitter, threads)?
    } else {
        convert_sequential(records, &differ, emitter)?
    };
    info!(
        "Processed {} of {} chains: {} calls ({} structural), {} skipped",
        stats.processed,
        stats.chains,
        stats.calls(),
        stats.structural,
        stats.skipped()
    );
    Ok(stats)
}

fn convert_sequential<I, R, T, W>(
    records: I,
    differ: &ChainDiffer<'_, R, T>,
    emitter: &mut CallEmitter<W>,
) -> Result<ConversionStats>
where
    I: Iterator<Item = std::result::Result<ChainRecord, ChainParseError>>,
    R: SequenceSource + ?Sized,
    T: SequenceSource + ?Sized,
    W: Write,
{
    let mut stats = ConversionStats::default();
    for record in records {
        let record = record?;
        let outcome = differ.diff_chain(&record)?;
        emitter.emit(&record, &outcome)?;
        stats.record(&outcome);
    }
    Ok(stats)
}

/// Parallel conversion using rayon
///
/// Chains are read in batches; each batch is diffed on the pool and then
/// emitted in its original order before the next batch is read.
fn convert_parallel<I, R, T, W>(
    mut records: I,
    differ: &ChainDiffer<'_, R, T>,
    emitter: &mut CallEmitter<W>,
    threads: usize,
) -> Result<ConversionStats>
where
    I: Iterator<Item = std::result::Result<ChainRecord, ChainParseError>>,
    R: SequenceSource + Sync + ?Sized,
    T: SequenceSource + Sync + ?Sized,
    W: Write,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ChainDiffError::ThreadPool(e.to_string()))?;

    let mut stats = ConversionStats::default();
    loop {
        let mut batch = Vec::with_capacity(CHAIN_BATCH_SIZE);
        let mut parse_error = None;
        for record in records.by_ref() {
            match record {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() == CHAIN_BATCH_SIZE {
                        break;
                    }
                }
                Err(e) => {
                    parse_error = Some(e);
                    break;
                }
            }
        }
        if batch.is_empty() && parse_error.is_none() {
            break;
        }

        debug!("Diffing batch of {} chains", batch.len());
        let outcomes: Vec<Result<ChainOutcome>> =
            pool.install(|| batch.par_iter().map(|record| differ.diff_chain(record)).collect());

        for (record, outcome) in batch.iter().zip(outcomes) {
            let outcome = outcome?;
            emitter.emit(record, &outcome)?;
            stats.record(&outcome);
        }
        if let Some(e) = parse_error {
            return Err(e.into());
        }
    }
    Ok(stats)
}
