//! Indexed sequence sources
//!
//! Random access to genome sequence by name and half-open, zero-based
//! interval. [`IndexedFasta`] memory-maps a FASTA file and locates bases
//! through its `.fai` index; [`MemorySequences`] keeps everything in memory.
//! Both are read-only after construction and can be shared across threads.

use crate::core::dna::normalize_case;
use crate::core::error::{SequenceError, SequenceResult};
use log::{debug, info};
use memmap2::Mmap;
use noodles_fasta::fai;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Random-access view of a set of named sequences
pub trait SequenceSource {
    /// Length of a sequence, `None` if it is not present
    fn length(&self, name: &str) -> Option<u64>;

    /// Upper-cased bases of `name` over `[start, end)`
    fn fetch(&self, name: &str, start: u64, end: u64) -> SequenceResult<Vec<u8>>;

    /// All sequences with their lengths, in file order
    fn contigs(&self) -> Vec<(String, u64)>;

    fn has(&self, name: &str) -> bool {
        self.length(name).is_some()
    }
}

fn check_interval(name: &str, start: u64, end: u64, length: u64) -> SequenceResult<()> {
    if start > end {
        return Err(SequenceError::InvalidRange { start, end });
    }
    if end > length {
        return Err(SequenceError::OutOfRange {
            name: name.to_string(),
            start,
            end,
            length,
        });
    }
    Ok(())
}

/// Memory-mapped FASTA with a samtools `.fai` index
pub struct IndexedFasta {
    mmap: Mmap,
    records: Vec<fai::Record>,
    lookup: HashMap<String, usize>,
}

impl IndexedFasta {
    /// Open a FASTA file, reading `<path>.fai` when present and indexing
    /// the file otherwise
    pub fn open<P: AsRef<Path>>(path: P) -> SequenceResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the FASTA is treated as read-only input for the lifetime of the map
        let mmap = unsafe { Mmap::map(&file)? };

        let mut fai_path = path.as_os_str().to_owned();
        fai_path.push(".fai");
        let fai_path = PathBuf::from(fai_path);

        let index = if fai_path.exists() {
            debug!("Reading FASTA index {}", fai_path.display());
            fai::io::Reader::new(BufReader::new(File::open(&fai_path)?))
                .read_index()
                .map_err(|e| invalid_index(&fai_path, e))?
        } else {
            info!("No index found for {}, scanning sequence layout", path.display());
            noodles_fasta::fs::index(path).map_err(|e| invalid_index(path, e))?
        };

        let fasta = Self::from_records(mmap, index.into(), path)?;
        info!("Opened {} ({} sequences)", path.display(), fasta.records.len());
        Ok(fasta)
    }

    fn from_records(mmap: Mmap, records: Vec<fai::Record>, path: &Path) -> SequenceResult<Self> {
        let mut lookup = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let bad_layout = record.length() > 0
                && (record.line_bases() == 0 || record.line_width() < record.line_bases());
            if bad_layout {
                return Err(SequenceError::InvalidIndex {
                    path: path.to_path_buf(),
                    message: format!("invalid line layout for '{}'", record_name(record)),
                });
            }
            lookup.insert(record_name(record), i);
        }
        Ok(Self { mmap, records, lookup })
    }

    /// Number of indexed sequences
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, name: &str) -> SequenceResult<&fai::Record> {
        self.lookup
            .get(name)
            .map(|&i| &self.records[i])
            .ok_or_else(|| SequenceError::UnknownSequence(name.to_string()))
    }
}

fn record_name(record: &fai::Record) -> String {
    String::from_utf8_lossy(record.name()).into_owned()
}

fn invalid_index(path: &Path, error: std::io::Error) -> SequenceError {
    match error.kind() {
        ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
            SequenceError::InvalidIndex {
                path: path.to_path_buf(),
                message: error.to_string(),
            }
        }
        _ => SequenceError::Io(error),
    }
}

impl SequenceSource for IndexedFasta {
    fn length(&self, name: &str) -> Option<u64> {
        self.lookup.get(name).map(|&i| self.records[i].length())
    }

    fn fetch(&self, name: &str, start: u64, end: u64) -> SequenceResult<Vec<u8>> {
        let record = self.record(name)?;
        check_interval(name, start, end, record.length())?;

        let line_bases = record.line_bases();
        let mut bases = Vec::with_capacity((end - start) as usize);
        let mut pos = start;
        while pos < end {
            let column = pos % line_bases;
            let take = (line_bases - column).min(end - pos);
            let byte = record.offset() + (pos / line_bases) * record.line_width() + column;
            let chunk = self
                .mmap
                .get(byte as usize..(byte + take) as usize)
                .ok_or_else(|| SequenceError::OutOfRange {
                    name: name.to_string(),
                    start,
                    end,
                    length: record.length(),
                })?;
            bases.extend_from_slice(chunk);
            pos += take;
        }
        normalize_case(&mut bases);
        Ok(bases)
    }

    fn contigs(&self) -> Vec<(String, u64)> {
        self.records.iter().map(|r| (record_name(r), r.length())).collect()
    }
}

/// In-memory sequence collection
#[derive(Debug, Clone, Default)]
pub struct MemorySequences {
    order: Vec<String>,
    sequences: HashMap<String, Vec<u8>>,
}

impl MemorySequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sequence
    pub fn insert(&mut self, name: impl Into<String>, sequence: impl AsRef<[u8]>) {
        let name = name.into();
        let mut bases = sequence.as_ref().to_vec();
        normalize_case(&mut bases);
        if self.sequences.insert(name.clone(), bases).is_none() {
            self.order.push(name);
        }
    }

    /// Load every record of a FASTA stream
    pub fn from_fasta<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut sequences = Self::new();
        let mut name: Option<String> = None;
        let mut bases = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if let Some(header) = line.strip_prefix('>') {
                if let Some(done) = name.take() {
                    sequences.insert(done, std::mem::take(&mut bases));
                }
                name = Some(header.split_whitespace().next().unwrap_or("").to_string());
            } else {
                bases.extend(line.trim().bytes());
            }
        }
        if let Some(done) = name {
            sequences.insert(done, bases);
        }
        Ok(sequences)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl SequenceSource for MemorySequences {
    fn length(&self, name: &str) -> Option<u64> {
        self.sequences.get(name).map(|s| s.len() as u64)
    }

    fn fetch(&self, name: &str, start: u64, end: u64) -> SequenceResult<Vec<u8>> {
        let sequence = self
            .sequences
            .get(name)
            .ok_or_else(|| SequenceError::UnknownSequence(name.to_string()))?;
        check_interval(name, start, end, sequence.len() as u64)?;
        Ok(sequence[start as usize..end as usize].to_vec())
    }

    fn contigs(&self) -> Vec<(String, u64)> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.sequences[name].len() as u64))
            .collect()
    }
}
