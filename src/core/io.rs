//! Input/output helpers
//!
//! Opens chain input with transparent decompression and creates buffered
//! (optionally gzip-compressed) output writers.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Default buffer size for readers and writers (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

impl CompressionFormat {
    /// Detect the format from the extension first, then from magic bytes
    fn detect(extension: &str, magic: &[u8]) -> Self {
        if extension == "gz" || magic.starts_with(&[0x1f, 0x8b]) {
            CompressionFormat::Gzip
        } else if extension == "bz2" || magic.starts_with(b"BZh") {
            CompressionFormat::Bzip2
        } else {
            CompressionFormat::Plain
        }
    }
}

/// Detect compression format from file path and/or content
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;
    Ok(CompressionFormat::detect(extension, &magic[..bytes_read]))
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Open an input file for line reading
///
/// - `-` reads standard input (uncompressed)
/// - `.gz` extension or gzip magic bytes (1f 8b)
/// - `.bz2` extension or bzip2 magic bytes (42 5a 68)
/// - plain text otherwise
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, io::stdin())));
    }

    let file = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = match detect_compression(path)? {
        CompressionFormat::Gzip => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            flate2::read::MultiGzDecoder::new(file),
        )),
        CompressionFormat::Bzip2 => Box::new(BufReader::with_capacity(
            DEFAULT_BUFFER_SIZE,
            bzip2::read::BzDecoder::new(file),
        )),
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    };
    Ok(reader)
}

/// Buffered output stream returned by [`create_output`]
///
/// Gzip streams must be closed with [`OutputWriter::finish`] so the
/// trailer is written and its errors are reported.
pub enum OutputWriter {
    Plain(BufWriter<Box<dyn Write + Send>>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    /// Flush the buffers and terminate a gzip member
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.write_all(buf),
            OutputWriter::Gzip(encoder) => encoder.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Create an output writer
///
/// Paths ending in `.gz` are gzip-compressed; `-` writes to standard output.
pub fn create_output(path: &Path) -> io::Result<OutputWriter> {
    if is_stdio(path) {
        let stdout: Box<dyn Write + Send> = Box::new(io::stdout());
        return Ok(OutputWriter::Plain(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, stdout)));
    }

    let file = File::create(path)?;
    let gzip = path.extension().and_then(|e| e.to_str()) == Some("gz");
    let writer = if gzip {
        OutputWriter::Gzip(GzEncoder::new(
            BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file),
            Compression::default(),
        ))
    } else {
        let file: Box<dyn Write + Send> = Box::new(file);
        OutputWriter::Plain(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))
    };
    Ok(writer)
}
