//! End-to-end tests: chain text and FASTA files in, BED and VCF text out

use fast_chaindiff::core::{
    create_output, open_input, ChainDiffError, ChainParseErrorKind, ChainReader, DiffConfig, IndexedFasta,
    SequenceSource,
};
use fast_chaindiff::formats::{convert_chain, CallEmitter, ConversionStats};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_fasta(dir: &Path, file: &str, sequences: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(file);
    let mut text = String::new();
    for (name, seq) in sequences {
        text.push_str(&format!(">{}\n", name));
        for chunk in seq.as_bytes().chunks(60) {
            text.push_str(std::str::from_utf8(chunk).unwrap());
            text.push('\n');
        }
    }
    std::fs::write(&path, text).unwrap();
    path
}

struct Outputs {
    bed: String,
    diff: String,
    target_bed: String,
    vcf: String,
    target_vcf: String,
}

fn run(
    chain: &str,
    reference: &IndexedFasta,
    target: &IndexedFasta,
    config: DiffConfig,
    threads: usize,
) -> (Result<ConversionStats, ChainDiffError>, Outputs) {
    let mut emitter = CallEmitter::new(Vec::new(), Vec::new())
        .with_difference(Vec::new())
        .with_target_alignment(Vec::new())
        .with_target_variants(Vec::new());
    emitter.write_headers(Some("test"), &reference.contigs(), None).unwrap();
    emitter.write_target_header(&target.contigs(), None).unwrap();

    let records = ChainReader::new(BufReader::new(chain.as_bytes())).records();
    let result = convert_chain(records, reference, target, &config, &mut emitter, threads);
    let out = emitter.finish().unwrap();

    let text = |bytes: Vec<u8>| String::from_utf8(bytes).unwrap();
    (
        result,
        Outputs {
            bed: text(out.alignment),
            diff: text(out.difference.unwrap()),
            target_bed: text(out.target_alignment.unwrap()),
            vcf: text(out.variants),
            target_vcf: text(out.target_variants.unwrap()),
        },
    )
}

fn data_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.starts_with('#') && !l.starts_with("track")).collect()
}

fn genomes(sequences_ref: &[(&str, &str)], sequences_tgt: &[(&str, &str)]) -> (TempDir, IndexedFasta, IndexedFasta) {
    let dir = tempfile::tempdir().unwrap();
    let reference = IndexedFasta::open(write_fasta(dir.path(), "reference.fa", sequences_ref)).unwrap();
    let target = IndexedFasta::open(write_fasta(dir.path(), "target.fa", sequences_tgt)).unwrap();
    (dir, reference, target)
}

fn compare() -> DiffConfig {
    DiffConfig {
        compare_matches: true,
        ..DiffConfig::default()
    }
}

#[test]
fn test_single_snv_in_match() {
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACCTAC")]);
    let (result, out) = run("chain 1 chr1 10 + 0 10 chr1 10 + 0 10 1\n10\n\n", &reference, &target, compare(), 1);

    let stats = result.unwrap();
    assert_eq!(stats.snv, 1);
    assert_eq!(data_lines(&out.vcf), vec!["chr1\t7\t.\tG\tC\t.\t.\tTARGET_CHROM=chr1;TARGET_POS=7;CHAIN_ID=1;STRAND=+"]);
    assert_eq!(
        data_lines(&out.target_vcf),
        vec!["chr1\t7\t.\tC\tG\t.\t.\tTARGET_CHROM=chr1;TARGET_POS=7;CHAIN_ID=1;STRAND=+"]
    );
    assert_eq!(data_lines(&out.diff), vec!["chr1\t6\t7\tSNV:+chr1:6:G>C\t0\t+\t6\t7\t238,120,0"]);
    assert_eq!(data_lines(&out.bed), vec!["chr1\t0\t10\tchain:+chr1:0-10\t0\t+\t0\t10\t0,104,183"]);
    assert_eq!(data_lines(&out.target_bed), vec!["chr1\t0\t10\tchain:+chr1:0-10\t0\t+\t0\t10\t0"]);
}

#[test]
fn test_anchored_insertion() {
    let (_dir, reference, target) = genomes(&[("chr2", "GGGGGCCCCC")], &[("chr2", "GGGGGTTTTTCCCCC")]);
    let (result, out) = run(
        "chain 1 chr2 10 + 0 10 chr2 15 + 0 15 2\n5 0 5\n5\n",
        &reference,
        &target,
        compare(),
        1,
    );

    assert_eq!(result.unwrap().insertions, 1);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr2\t5\t.\tG\tGTTTTT\t.\t.\tTARGET_CHROM=chr2;TARGET_POS=5;CHAIN_ID=2;STRAND=+"]
    );
    assert_eq!(
        data_lines(&out.diff),
        vec!["chr2\t4\t5\tINS:+chr2:4-10:G>GTTTTT\t0\t+\t4\t5\t199,0,103"]
    );
}

#[test]
fn test_large_insertion_is_symbolic() {
    let reference_seq = format!("{}{}", "A".repeat(20), "C".repeat(20));
    let target_seq = format!("{}{}{}", "A".repeat(20), "T".repeat(150), "C".repeat(20));
    let (_dir, reference, target) = genomes(&[("chr3", &reference_seq)], &[("chr3", &target_seq)]);
    let (result, out) = run(
        "chain 1 chr3 40 + 0 40 chr3 190 + 0 190 3\n20 0 150\n20\n",
        &reference,
        &target,
        DiffConfig::default(),
        1,
    );

    let stats = result.unwrap();
    assert_eq!(stats.structural, 1);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr3\t20\t.\tA\t<INS>\t.\t.\tTARGET_CHROM=chr3;TARGET_POS=20;END=20;SVTYPE=INS;SVLEN=150;CHAIN_ID=3;STRAND=+"]
    );
    assert_eq!(
        data_lines(&out.diff),
        vec!["chr3\t19\t20\tINS:+chr3:19-170:A>[LEN:151]\t0\t+\t19\t20\t199,0,103"]
    );
}

#[test]
fn test_large_deletion_is_symbolic() {
    let reference_seq = format!("{}{}{}", "A".repeat(20), "G".repeat(120), "C".repeat(20));
    let target_seq = format!("{}{}", "A".repeat(20), "C".repeat(20));
    let (_dir, reference, target) = genomes(&[("chr4", &reference_seq)], &[("chr4", &target_seq)]);
    let (result, out) = run(
        "chain 1 chr4 160 + 0 160 chr4 40 + 0 40 4\n20 120 0\n20\n",
        &reference,
        &target,
        DiffConfig::default(),
        1,
    );

    assert_eq!(result.unwrap().deletions, 1);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr4\t20\t.\tA\t<DEL>\t.\t.\tTARGET_CHROM=chr4;TARGET_POS=20;END=140;SVTYPE=DEL;SVLEN=-120;CHAIN_ID=4;STRAND=+"]
    );
}

#[test]
fn test_minus_strand_chain() {
    // Target genome holds the reverse complement of the aligned sequence
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTAC")], &[("chrB", "GTAGGTACGT")]);
    let (result, out) = run("chain 1 chr1 10 + 0 10 chrB 10 - 0 10 5\n10\n", &reference, &target, compare(), 1);

    assert_eq!(result.unwrap().snv, 1);
    assert_eq!(data_lines(&out.bed), vec!["chr1\t0\t10\tchain:-chrB:0-10\t0\t-\t0\t10\t0,104,183"]);
    // Reference base 7 pairs with the complement of chrB base 4
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr1\t7\t.\tG\tC\t.\t.\tTARGET_CHROM=chrB;TARGET_POS=4;CHAIN_ID=5;STRAND=-"]
    );
    assert_eq!(
        data_lines(&out.target_vcf),
        vec!["chrB\t4\t.\tG\tC\t.\t.\tTARGET_CHROM=chr1;TARGET_POS=7;CHAIN_ID=5;STRAND=-"]
    );
}

#[test]
fn test_minus_strand_insertion() {
    // Reference-oriented target is ACGT TT AC
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTAC")], &[("chrT", "GTAAACGT")]);
    let (result, out) = run("chain 1 chr1 6 + 0 6 chrT 8 - 0 8 6\n4 0 2\n2\n", &reference, &target, compare(), 1);

    let stats = result.unwrap();
    assert_eq!(stats.insertions, 1);
    assert_eq!(stats.snv, 0);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr1\t4\t.\tT\tTTT\t.\t.\tTARGET_CHROM=chrT;TARGET_POS=3;CHAIN_ID=6;STRAND=-"]
    );
    assert_eq!(
        data_lines(&out.diff),
        vec!["chr1\t3\t4\tINS:-chrT:2-5:T>TTT\t0\t-\t3\t4\t199,0,103"]
    );
    assert_eq!(
        data_lines(&out.target_vcf),
        vec!["chrT\t3\t.\tAAA\tA\t.\t.\tTARGET_CHROM=chr1;TARGET_POS=4;CHAIN_ID=6;STRAND=-"]
    );
}

#[test]
fn test_minus_strand_deletion() {
    // Reference-oriented target is ACGT AC, the TT at reference 5-6 is gone
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTTTAC")], &[("chrT", "GTACGT")]);
    let (result, out) = run("chain 1 chr1 8 + 0 8 chrT 6 - 0 6 7\n4 2 0\n2\n", &reference, &target, compare(), 1);

    let stats = result.unwrap();
    assert_eq!(stats.deletions, 1);
    assert_eq!(stats.snv, 0);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr1\t4\t.\tTTT\tT\t.\t.\tTARGET_CHROM=chrT;TARGET_POS=3;CHAIN_ID=7;STRAND=-"]
    );
    assert_eq!(
        data_lines(&out.diff),
        vec!["chr1\t3\t6\tDEL:-chrT:2-3:TTT>T\t0\t-\t3\t6\t215,0,53"]
    );
    assert_eq!(
        data_lines(&out.target_vcf),
        vec!["chrT\t3\t.\tA\tAAA\t.\t.\tTARGET_CHROM=chr1;TARGET_POS=4;CHAIN_ID=7;STRAND=-"]
    );
}

#[test]
fn test_minus_strand_large_insertion_is_symbolic() {
    let reference_seq = format!("{}{}", "A".repeat(20), "C".repeat(20));
    // Reverse complement of A*20 T*150 C*20
    let target_seq = format!("{}{}{}", "G".repeat(20), "A".repeat(150), "T".repeat(20));
    let (_dir, reference, target) = genomes(&[("chr3", &reference_seq)], &[("chrT", &target_seq)]);
    let (result, out) = run(
        "chain 1 chr3 40 + 0 40 chrT 190 - 0 190 8\n20 0 150\n20\n",
        &reference,
        &target,
        compare(),
        1,
    );

    let stats = result.unwrap();
    assert_eq!(stats.structural, 1);
    assert_eq!(stats.snv, 0);
    assert_eq!(
        data_lines(&out.vcf),
        vec!["chr3\t20\t.\tA\t<INS>\t.\t.\tTARGET_CHROM=chrT;TARGET_POS=21;END=20;SVTYPE=INS;SVLEN=150;CHAIN_ID=8;STRAND=-"]
    );
    assert_eq!(
        data_lines(&out.diff),
        vec!["chr3\t19\t20\tINS:-chrT:20-171:A>[LEN:151]\t0\t-\t19\t20\t199,0,103"]
    );
    assert_eq!(
        data_lines(&out.target_vcf),
        vec!["chrT\t21\t.\tA\t<DEL>\t.\t.\tTARGET_CHROM=chr3;TARGET_POS=20;END=171;SVTYPE=DEL;SVLEN=-150;CHAIN_ID=8;STRAND=-"]
    );
}

#[test]
fn test_minus_strand_blocks_past_target_end_fail() {
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTACGTACGTACGT")], &[("chrT", "ACGTACGTAC")]);
    let (result, out) = run("chain 1 chr1 20 + 0 12 chrT 10 - 0 10 1\n12\n", &reference, &target, compare(), 1);

    match result {
        Err(ChainDiffError::Sequence { chain_id, line, source }) => {
            assert_eq!(chain_id, "1");
            assert_eq!(line, 2);
            assert!(source.is_out_of_range());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(data_lines(&out.vcf).is_empty());
}

#[test]
fn test_broken_data_line_reports_parse_error() {
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACGTAC")]);
    let (result, out) = run("chain 1 chr1 10 + 0 10 chr1 10 + 0 10 1\n4 1 1\nxx\n4\n", &reference, &target, compare(), 1);

    match result {
        Err(ChainDiffError::ChainParse(e)) => {
            assert!(e.is_kind(ChainParseErrorKind::InvalidNumber));
            assert_eq!(e.line_number, Some(3));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(data_lines(&out.bed).is_empty());
}

#[test]
fn test_unknown_reference_skipped() {
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACCTAC")]);
    let chain = "chain 1 chrZ 10 + 0 10 chr1 10 + 0 10 1\n4 1 1\n5\n\n\
                 chain 1 chr1 10 + 0 10 chr1 10 + 0 10 2\n10\n";
    let (result, out) = run(chain, &reference, &target, compare(), 1);

    let stats = result.unwrap();
    assert_eq!(stats.chains, 2);
    assert_eq!(stats.skipped_unknown_reference, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(data_lines(&out.bed).len(), 1);
    assert_eq!(data_lines(&out.vcf).len(), 1);
}

#[test]
fn test_bad_reference_strand_aborts_after_prior_chains() {
    let (_dir, reference, target) = genomes(&[("chr1", "ACGTACGTAC")], &[("chr1", "ACGTACCTAC")]);
    let chain = "chain 1 chr1 10 + 0 10 chr1 10 + 0 10 1\n10\n\n\
                 chain 1 chr1 10 - 0 10 chr1 10 + 0 10 2\n10\n\n\
                 chain 1 chr1 10 + 0 10 chr1 10 + 0 10 3\n10\n";

    for threads in [1, 4] {
        let (result, out) = run(chain, &reference, &target, compare(), threads);
        match result {
            Err(ChainDiffError::ChainParse(e)) => {
                assert!(e.is_kind(ChainParseErrorKind::MalformedHeader));
                assert_eq!(e.line_number, Some(4));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(data_lines(&out.bed), vec!["chr1\t0\t10\tchain:+chr1:0-10\t0\t+\t0\t10\t0,104,183"]);
        assert_eq!(data_lines(&out.vcf).len(), 1);
    }
}

/// Deterministic pseudo-random genome
fn genome(length: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..length)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

#[test]
fn test_parallel_matches_sequential() {
    let reference_seq = genome(30_000, 7);
    let mut target_seq = reference_seq.clone();
    for pos in (0..target_seq.len()).step_by(97) {
        target_seq[pos] = if target_seq[pos] == b'A' { b'C' } else { b'A' };
    }
    let reference_seq = String::from_utf8(reference_seq).unwrap();
    let target_seq = String::from_utf8(target_seq).unwrap();
    let (_dir, reference, target) = genomes(&[("chrP", &reference_seq)], &[("chrP", &target_seq)]);

    let mut chain = String::new();
    for i in 0..1000u64 {
        let start = i * 30;
        chain.push_str(&format!(
            "chain {} chrP 30000 + {} {} chrP 30000 + {} {} {}\n10 2 2\n18\n\n",
            1000 - i,
            start,
            start + 30,
            start,
            start + 30,
            i
        ));
    }

    let (sequential, seq_out) = run(&chain, &reference, &target, compare(), 1);
    let (parallel, par_out) = run(&chain, &reference, &target, compare(), 4);

    let sequential = sequential.unwrap();
    assert_eq!(sequential, parallel.unwrap());
    assert_eq!(sequential.chains, 1000);
    assert!(sequential.snv > 0);
    assert_eq!(seq_out.bed, par_out.bed);
    assert_eq!(seq_out.diff, par_out.diff);
    assert_eq!(seq_out.vcf, par_out.vcf);
    assert_eq!(seq_out.target_vcf, par_out.target_vcf);
}

#[test]
fn test_fai_index_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fasta(dir.path(), "genome.fa", &[("chrA", "ACGTACGTACGT"), ("chrB", "TTTT")]);
    std::fs::write(dir.path().join("genome.fa.fai"), "chrA\t12\t6\t12\t13\nchrB\t4\t25\t4\t5\n").unwrap();

    let fasta = IndexedFasta::open(&path).unwrap();
    assert_eq!(fasta.contigs(), vec![("chrA".to_string(), 12), ("chrB".to_string(), 4)]);
    assert_eq!(fasta.fetch("chrB", 1, 3).unwrap(), b"TT".to_vec());
}

#[test]
fn test_gzip_vcf_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.vcf.gz");
    let mut writer = create_output(&path).unwrap();
    writeln!(writer, "##fileformat=VCFv4.2").unwrap();
    writer.finish().unwrap();

    let mut text = String::new();
    open_input(&path).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "##fileformat=VCFv4.2\n");
}
