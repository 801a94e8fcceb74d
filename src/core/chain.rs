//! Chain file parsing
//!
//! Turns UCSC chain text into a lazy stream of typed events.
//!
//! # Chain File Format
//!
//! ```text
//! chain score rName rSize + rStart rStop tName tSize tStrand tStart tStop id
//! size dr dt
//! size dr dt
//! size
//! ```
//!
//! - Header line starts with "chain"; the reference strand is always `+`
//! - Data lines contain: size (ungapped block), dr (reference gap), dt (target gap)
//! - Last data line has only size (no gaps)
//!
//! A `size dr dt` line produces a [`Block::Match`] followed by a [`Block::Gap`];
//! the final `size` line produces the terminal [`Block::Match`].

use crate::core::coords::{map_interval, Strand};
use crate::core::io::open_input;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Error type for chain file parsing
///
/// Carries the line number and a short excerpt of the offending line so
/// fatal errors can be traced back to the input.
#[derive(Debug, Clone)]
pub struct ChainParseError {
    /// Human-readable error message
    pub message: String,
    /// Line number where the error occurred (1-based)
    pub line_number: Option<usize>,
    /// The kind of error that occurred
    pub kind: ChainParseErrorKind,
    /// The problematic content (if available)
    pub content: Option<String>,
}

/// Specific kinds of chain parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainParseErrorKind {
    /// Header has too few fields, wrong keyword, or a reference strand other than '+'
    MalformedHeader,
    /// Target strand is neither '+' nor '-'
    InvalidStrand,
    /// Failed to parse a numeric value
    InvalidNumber,
    /// start > stop, or stop > sequence length
    InvalidCoordinates,
    /// Data line with the wrong number of fields or a zero-length block
    InvalidDataLine,
    /// Data line outside of an open chain
    UnexpectedDataLine,
    /// Chain ended on a gap line without its terminal block
    UnterminatedChain,
    /// I/O error during reading
    IoError,
}

impl std::fmt::Display for ChainParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line_number, &self.content) {
            (Some(line), Some(content)) => write!(f, "Line {}: {} ({})", line, self.message, content),
            (Some(line), None) => write!(f, "Line {}: {}", line, self.message),
            (None, _) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ChainParseError {}

impl ChainParseError {
    /// Create an error with full context
    pub fn with_context(
        message: impl Into<String>,
        line_number: usize,
        kind: ChainParseErrorKind,
        content: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            line_number: Some(line_number),
            kind,
            content,
        }
    }

    /// Create a malformed header error
    pub fn malformed_header(message: impl Into<String>, line_number: usize, content: &str) -> Self {
        Self::with_context(
            message,
            line_number,
            ChainParseErrorKind::MalformedHeader,
            Some(content.chars().take(100).collect()),
        )
    }

    /// Create an invalid data line error
    pub fn invalid_data_line(message: impl Into<String>, line_number: usize, content: &str) -> Self {
        Self::with_context(
            message,
            line_number,
            ChainParseErrorKind::InvalidDataLine,
            Some(content.chars().take(100).collect()),
        )
    }

    /// Create an invalid strand error
    pub fn invalid_strand(strand: &str, line_number: usize) -> Self {
        Self::with_context(
            format!("Invalid target strand '{}', expected '+' or '-'", strand),
            line_number,
            ChainParseErrorKind::InvalidStrand,
            None,
        )
    }

    /// Create an invalid number error
    pub fn invalid_number(field: &str, value: &str, line_number: usize) -> Self {
        Self::with_context(
            format!("Invalid {} value '{}': expected a non-negative integer", field, value),
            line_number,
            ChainParseErrorKind::InvalidNumber,
            None,
        )
    }

    /// Create an invalid coordinates error
    pub fn invalid_coordinates(message: impl Into<String>, line_number: usize) -> Self {
        Self::with_context(message, line_number, ChainParseErrorKind::InvalidCoordinates, None)
    }

    pub fn unexpected_data_line(line_number: usize, content: &str) -> Self {
        Self::with_context(
            "Data line does not belong to an open chain",
            line_number,
            ChainParseErrorKind::UnexpectedDataLine,
            Some(content.chars().take(100).collect()),
        )
    }

    pub fn unterminated_chain(chain_line: usize, line_number: usize) -> Self {
        Self::with_context(
            format!("Chain starting at line {} ends without a terminal block", chain_line),
            line_number,
            ChainParseErrorKind::UnterminatedChain,
            None,
        )
    }

    /// Check if this is a specific kind of error
    pub fn is_kind(&self, kind: ChainParseErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<std::io::Error> for ChainParseError {
    fn from(e: std::io::Error) -> Self {
        Self {
            message: format!("IO error: {}", e),
            line_number: None,
            kind: ChainParseErrorKind::IoError,
            content: None,
        }
    }
}

/// Parsed chain header
///
/// The reference side is always on the plus strand. Target coordinates
/// (`target_start`, `target_stop`) are local to `target_strand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeader {
    pub score: u64,
    pub reference_name: String,
    pub reference_length: u64,
    pub reference_start: u64,
    pub reference_stop: u64,
    pub target_name: String,
    pub target_length: u64,
    pub target_strand: Strand,
    pub target_start: u64,
    pub target_stop: u64,
    pub chain_id: String,
}

impl ChainHeader {
    /// Parse a chain header line
    ///
    /// Format: chain score rName rSize + rStart rStop tName tSize tStrand tStart tStop id
    pub fn parse(line: &str, line_number: usize) -> Result<Self, ChainParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() < 12 {
            return Err(ChainParseError::malformed_header(
                format!("Expected 12+ fields, got {}", fields.len()),
                line_number,
                line,
            ));
        }

        if fields[0] != "chain" {
            return Err(ChainParseError::malformed_header(
                format!("Expected 'chain' keyword, got '{}'", fields[0]),
                line_number,
                line,
            ));
        }

        if fields[4] != "+" {
            return Err(ChainParseError::malformed_header(
                format!("Reference strand must be '+', got '{}'", fields[4]),
                line_number,
                line,
            ));
        }

        let number = |index: usize, name: &str| {
            fields[index]
                .parse::<u64>()
                .map_err(|_| ChainParseError::invalid_number(name, fields[index], line_number))
        };

        let score = number(1, "score")?;
        let reference_name = fields[2].to_string();
        let reference_length = number(3, "reference size")?;
        let reference_start = number(5, "reference start")?;
        let reference_stop = number(6, "reference stop")?;

        let target_name = fields[7].to_string();
        let target_length = number(8, "target size")?;
        let target_strand = Strand::from_field(fields[9])
            .ok_or_else(|| ChainParseError::invalid_strand(fields[9], line_number))?;
        let target_start = number(10, "target start")?;
        let target_stop = number(11, "target stop")?;

        check_span("Reference", reference_start, reference_stop, reference_length, line_number)?;
        check_span("Target", target_start, target_stop, target_length, line_number)?;

        // Chain ID is optional (field 12)
        let chain_id = fields.get(12).map(|s| s.to_string()).unwrap_or_default();

        Ok(Self {
            score,
            reference_name,
            reference_length,
            reference_start,
            reference_stop,
            target_name,
            target_length,
            target_strand,
            target_start,
            target_stop,
            chain_id,
        })
    }

    /// Target span of the whole chain in absolute target coordinates
    ///
    /// `None` only for a header whose target stop lies past its length.
    pub fn target_interval(&self) -> Option<(u64, u64)> {
        map_interval(self.target_strand, self.target_length, self.target_start, self.target_stop)
    }
}

fn check_span(side: &str, start: u64, stop: u64, length: u64, line_number: usize) -> Result<(), ChainParseError> {
    if start > stop {
        return Err(ChainParseError::invalid_coordinates(
            format!("{} start ({}) > {} stop ({})", side, start, side.to_lowercase(), stop),
            line_number,
        ));
    }
    if stop > length {
        return Err(ChainParseError::invalid_coordinates(
            format!("{} stop ({}) > {} size ({})", side, stop, side.to_lowercase(), length),
            line_number,
        ));
    }
    Ok(())
}

/// One alignment block of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// Ungapped span of `length` bases on both sides
    Match { length: u64 },
    /// Unaligned bases following a match
    Gap { reference_gap: u64, target_gap: u64 },
}

/// Typed event produced by [`ChainReader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Header { line: usize, header: ChainHeader },
    Block { line: usize, block: Block },
}

/// Data line in a chain file (size, dr, dt)
#[derive(Debug, Clone, Copy)]
struct DataLine {
    size: u64,
    gap: Option<(u64, u64)>,
}

impl DataLine {
    /// Parse a data line (middle line with 3 fields or last line with 1 field)
    fn parse(line: &str, line_number: usize) -> Result<Self, ChainParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() != 1 && fields.len() != 3 {
            return Err(ChainParseError::invalid_data_line(
                format!("Expected 1 or 3 fields, got {}", fields.len()),
                line_number,
                line,
            ));
        }

        let size = fields[0]
            .parse::<u64>()
            .map_err(|_| ChainParseError::invalid_number("block size", fields[0], line_number))?;
        if size == 0 {
            return Err(ChainParseError::invalid_data_line(
                "Block size must be greater than 0",
                line_number,
                line,
            ));
        }

        if fields.len() == 1 {
            return Ok(Self { size, gap: None });
        }

        let reference_gap = fields[1]
            .parse::<u64>()
            .map_err(|_| ChainParseError::invalid_number("reference gap (dr)", fields[1], line_number))?;
        let target_gap = fields[2]
            .parse::<u64>()
            .map_err(|_| ChainParseError::invalid_number("target gap (dt)", fields[2], line_number))?;
        Ok(Self {
            size,
            gap: Some((reference_gap, target_gap)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// No chain opened yet
    Idle,
    /// Header read, expecting data lines
    Open,
    /// Last data line carried a gap; a terminal block must follow
    Gapped,
    /// Terminal block seen
    Closed,
}

/// Lazy chain event reader
///
/// Reads one line at a time into a reused buffer. After the first error the
/// iterator is exhausted.
pub struct ChainReader<R: BufRead> {
    reader: R,
    buffer: String,
    line_number: usize,
    chain_line: usize,
    state: ReaderState,
    pending: Option<ChainEvent>,
    finished: bool,
}

impl<R: BufRead> ChainReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(1024),
            line_number: 0,
            chain_line: 0,
            state: ReaderState::Idle,
            pending: None,
            finished: false,
        }
    }

    /// Group the events into whole chains
    pub fn records(self) -> ChainRecords<Self> {
        ChainRecords::new(self)
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn read_event(&mut self) -> Result<Option<ChainEvent>, ChainParseError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                if self.state == ReaderState::Gapped {
                    return Err(ChainParseError::unterminated_chain(self.chain_line, self.line_number));
                }
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.split_whitespace().next() == Some("chain") {
                if self.state == ReaderState::Gapped {
                    return Err(ChainParseError::unterminated_chain(self.chain_line, self.line_number));
                }
                let header = ChainHeader::parse(line, self.line_number)?;
                self.state = ReaderState::Open;
                self.chain_line = self.line_number;
                return Ok(Some(ChainEvent::Header {
                    line: self.line_number,
                    header,
                }));
            }

            if matches!(self.state, ReaderState::Idle | ReaderState::Closed) {
                return Err(ChainParseError::unexpected_data_line(self.line_number, line));
            }

            let data = DataLine::parse(line, self.line_number)?;
            let line_number = self.line_number;
            match data.gap {
                Some((reference_gap, target_gap)) => {
                    self.state = ReaderState::Gapped;
                    self.pending = Some(ChainEvent::Block {
                        line: line_number,
                        block: Block::Gap {
                            reference_gap,
                            target_gap,
                        },
                    });
                }
                None => self.state = ReaderState::Closed,
            }
            return Ok(Some(ChainEvent::Block {
                line: line_number,
                block: Block::Match { length: data.size },
            }));
        }
    }
}

impl ChainReader<Box<dyn BufRead + Send>> {
    /// Open a chain file (plain, gzip or bzip2; `-` for stdin)
    pub fn from_path(path: &Path) -> Result<Self, ChainParseError> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> Iterator for ChainReader<R> {
    type Item = Result<ChainEvent, ChainParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.take() {
            return Some(Ok(event));
        }
        if self.finished {
            return None;
        }
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// A block together with the input line it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    pub line: usize,
    pub block: Block,
}

/// One complete chain: header plus its blocks in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRecord {
    /// Line number of the header
    pub line: usize,
    pub header: ChainHeader,
    pub blocks: Vec<BlockEntry>,
}

impl ChainRecord {
    pub fn new(line: usize, header: ChainHeader) -> Self {
        Self {
            line,
            header,
            blocks: Vec::new(),
        }
    }

    /// The last block is the terminal ungapped block
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.blocks.last(),
            Some(BlockEntry {
                block: Block::Match { .. },
                ..
            })
        )
    }
}

/// Groups a [`ChainEvent`] stream into [`ChainRecord`]s
///
/// A chain is yielded once the next header (or the end of input) is seen.
/// When the event stream fails, a chain already closed by its terminal
/// block is yielded first and the error right after it. A chain cut off
/// mid-way is dropped and only the error is returned.
pub struct ChainRecords<I> {
    events: I,
    current: Option<ChainRecord>,
    pending_error: Option<ChainParseError>,
}

impl<I> ChainRecords<I>
where
    I: Iterator<Item = Result<ChainEvent, ChainParseError>>,
{
    pub fn new(events: I) -> Self {
        Self {
            events,
            current: None,
            pending_error: None,
        }
    }
}

impl<I> Iterator for ChainRecords<I>
where
    I: Iterator<Item = Result<ChainEvent, ChainParseError>>,
{
    type Item = Result<ChainRecord, ChainParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        loop {
            match self.events.next() {
                Some(Ok(ChainEvent::Header { line, header })) => {
                    if let Some(done) = self.current.replace(ChainRecord::new(line, header)) {
                        return Some(Ok(done));
                    }
                }
                Some(Ok(ChainEvent::Block { line, block })) => match self.current.as_mut() {
                    Some(record) => record.blocks.push(BlockEntry { line, block }),
                    None => {
                        return Some(Err(ChainParseError::with_context(
                            "Block event without a preceding header",
                            line,
                            ChainParseErrorKind::UnexpectedDataLine,
                            None,
                        )))
                    }
                },
                Some(Err(e)) => match self.current.take() {
                    Some(done) if done.is_terminated() => {
                        self.pending_error = Some(e);
                        return Some(Ok(done));
                    }
                    _ => return Some(Err(e)),
                },
                None => return self.current.take().map(Ok),
            }
        }
    }
}

/// Parse a whole chain file held in memory
pub fn parse_chain_bytes(data: &[u8]) -> Result<Vec<ChainRecord>, ChainParseError> {
    ChainReader::new(BufReader::new(data)).records().collect()
}
