//! FastChainDiff CLI entry point
//!
//! Creates alignment/difference BED tracks and a VCF from a chain file and
//! the two genomes it aligns.

use anyhow::Context;
use clap::{ArgAction, Parser};
use fast_chaindiff::core::{
    create_output, ChainReader, DiffConfig, IndexedFasta, OutputWriter, SequenceSource, DEFAULT_SV_THRESHOLD,
};
use fast_chaindiff::formats::{convert_chain, CallEmitter};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fast-chaindiff")]
#[command(about = "Create BED and VCF files from the differences described by a chain file")]
#[command(version)]
#[command(author = "FastChainDiff Contributors")]
struct Cli {
    /// Chain file (plain, gzip or bzip2; '-' for stdin)
    chain: PathBuf,

    /// Reference genome FASTA (uses <fasta>.fai when present)
    #[arg(short = 'r', long)]
    reference: PathBuf,

    /// Target genome FASTA (uses <fasta>.fai when present)
    #[arg(short = 't', long)]
    target: PathBuf,

    /// Alignment BED output, one record per chain
    #[arg(short = 'b', long)]
    bed: PathBuf,

    /// Difference BED output, one record per call (enables match comparison)
    #[arg(short = 'd', long = "diff-bed")]
    diff_bed: Option<PathBuf>,

    /// Alignment BED on target coordinates
    #[arg(long = "target-bed")]
    target_bed: Option<PathBuf>,

    /// VCF output ('.gz' suffix compresses)
    #[arg(short = 'o', long)]
    vcf: PathBuf,

    /// VCF output placed on the target assembly
    #[arg(long = "target-vcf")]
    target_vcf: Option<PathBuf>,

    /// Write UCSC track lines named after this
    #[arg(short = 'n', long = "track-name")]
    track_name: Option<String>,

    /// Windows longer than this are reported as symbolic alleles
    #[arg(long = "sv-threshold", default_value_t = DEFAULT_SV_THRESHOLD)]
    sv_threshold: usize,

    /// Report SNVs inside match blocks even without --diff-bed
    #[arg(long = "compare-matches")]
    compare_matches: bool,

    /// Number of threads
    #[arg(short = 'j', long, default_value = "1")]
    threads: usize,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_fasta(path: &Path) -> anyhow::Result<IndexedFasta> {
    let start = Instant::now();
    eprintln!("Loading FASTA: {:?}", path);
    let fasta = IndexedFasta::open(path).with_context(|| format!("Failed to open FASTA {:?}", path))?;
    eprintln!(
        "{} sequences loaded in {:.2}s",
        fasta.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(fasta)
}

fn create(path: &Path) -> anyhow::Result<OutputWriter> {
    create_output(path).with_context(|| format!("Failed to create {:?}", path))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let start = Instant::now();

    let reference = load_fasta(&cli.reference)?;
    let target = load_fasta(&cli.target)?;

    let config = DiffConfig {
        sv_threshold: cli.sv_threshold,
        compare_matches: cli.compare_matches || cli.diff_bed.is_some(),
    };

    let mut emitter = CallEmitter::new(create(&cli.bed)?, create(&cli.vcf)?);
    if let Some(path) = &cli.diff_bed {
        emitter = emitter.with_difference(create(path)?);
    }
    if let Some(path) = &cli.target_bed {
        emitter = emitter.with_target_alignment(create(path)?);
    }
    if let Some(path) = &cli.target_vcf {
        emitter = emitter.with_target_variants(create(path)?);
    }
    let reference_name = cli.reference.display().to_string();
    emitter.write_headers(cli.track_name.as_deref(), &reference.contigs(), Some(&reference_name))?;
    let target_name = cli.target.display().to_string();
    emitter.write_target_header(&target.contigs(), Some(&target_name))?;

    eprintln!("Processing chain file: {:?}", cli.chain);
    let records = ChainReader::from_path(&cli.chain)
        .with_context(|| format!("Failed to open chain file {:?}", cli.chain))?
        .records();
    let result = convert_chain(records, &reference, &target, &config, &mut emitter, cli.threads);

    // Chains written before a failure stay on disk
    let closed = emitter.finish().and_then(|outputs| outputs.close());
    let stats = result.with_context(|| format!("Failed to process {:?}", cli.chain))?;
    closed.context("Failed to finish output")?;

    eprintln!("\n=== Conversion Statistics ===");
    eprintln!("Chains:          {}", stats.chains);
    eprintln!("Processed:       {}", stats.processed);
    eprintln!("Skipped:         {}", stats.skipped());
    eprintln!("  - No reference: {}", stats.skipped_unknown_reference);
    eprintln!("  - No target:    {}", stats.skipped_unknown_target);
    eprintln!("SNV:             {}", stats.snv);
    eprintln!("Insertions:      {}", stats.insertions);
    eprintln!("Deletions:       {}", stats.deletions);
    eprintln!("Indels:          {}", stats.indels);
    eprintln!("Structural:      {}", stats.structural);
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
