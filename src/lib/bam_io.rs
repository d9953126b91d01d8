//! BAM file I/O.
//!
//! Headers are read and serialized with noodles. Records travel as raw bytes:
//! [`RawBamReader`] yields each record's bytes after the `block_size` prefix and
//! [`RawBamWriter`] writes them back the same way, so the fixing core never
//! pays for a full decode.
//!
//! # Threading
//!
//! With `threads > 1` the BGZF layer decompresses and compresses on a pool of
//! worker threads; otherwise everything happens on the calling thread.
//!
//! A path of `-` reads from stdin or writes to stdout.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::num::NonZero;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use matefix_raw_bam::RawRecord;
use noodles::bgzf::io::multithreaded_writer::Builder as MultithreadedWriterBuilder;
use noodles::bgzf::io::writer::{Builder as BgzfWriterBuilder, CompressionLevel};
use noodles::bgzf::io::{
    MultithreadedReader, MultithreadedWriter, Reader as BgzfReader, Writer as BgzfWriter,
};
use noodles::sam::Header;

use crate::stream::{RecordSink, RecordSource};

type InputStream = Box<dyn Read + Send>;
type OutputStream = Box<dyn Write + Send>;

/// Single- or multi-threaded BGZF reader.
pub enum BgzfReaderEnum {
    SingleThreaded(BgzfReader<InputStream>),
    MultiThreaded(MultithreadedReader<InputStream>),
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::SingleThreaded(r) => r.read(buf),
            Self::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Self::SingleThreaded(r) => r.fill_buf(),
            Self::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::SingleThreaded(r) => r.consume(amt),
            Self::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// Single- or multi-threaded BGZF writer.
pub enum BgzfWriterEnum {
    SingleThreaded(BgzfWriter<OutputStream>),
    MultiThreaded(MultithreadedWriter<OutputStream>),
}

impl Write for BgzfWriterEnum {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::SingleThreaded(w) => w.write(buf),
            Self::MultiThreaded(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::SingleThreaded(w) => w.flush(),
            Self::MultiThreaded(w) => w.flush(),
        }
    }
}

impl BgzfWriterEnum {
    /// Flush outstanding blocks and write the BGZF EOF marker.
    ///
    /// # Errors
    ///
    /// Returns an error if a block cannot be compressed or written.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::SingleThreaded(w) => w.finish().map(drop),
            Self::MultiThreaded(mut w) => w.finish().map(drop),
        }
    }
}

/// Reads raw BAM records, positioned after the header.
pub struct RawBamReader<R> {
    inner: R,
}

impl<R: Read> RawBamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next record's bytes into `record`.
    ///
    /// Returns `Ok(false)` if the stream ends cleanly before the next record.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the stream ends part way through a record.
    pub fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool> {
        let Some(block_size) = self.read_block_size()? else {
            return Ok(false);
        };
        let buf = record.as_mut_vec();
        buf.clear();
        buf.try_reserve(block_size).map_err(io::Error::other)?;
        buf.resize(block_size, 0);
        self.inner.read_exact(buf)?;
        Ok(true)
    }

    /// `None` at end of stream; a partial prefix is an error.
    fn read_block_size(&mut self) -> io::Result<Option<usize>> {
        let mut buf = [0u8; 4];
        loop {
            match self.inner.read(&mut buf[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        self.inner.read_exact(&mut buf[1..])?;
        usize::try_from(u32::from_le_bytes(buf))
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<R: Read> RecordSource for RawBamReader<R> {
    fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool> {
        RawBamReader::read_record(self, record)
    }
}

/// Writes a BAM header and raw record bytes.
pub struct RawBamWriter {
    inner: BgzfWriterEnum,
}

impl RawBamWriter {
    #[must_use]
    pub fn new(inner: BgzfWriterEnum) -> Self {
        Self { inner }
    }

    /// Write the magic, header text and binary reference dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is too large for BAM or writing fails.
    pub fn write_header(&mut self, header: &Header) -> io::Result<()> {
        self.inner.write_all(b"BAM\x01")?;

        let mut sam_writer = noodles::sam::io::Writer::new(Vec::new());
        sam_writer.write_header(header)?;
        let text = sam_writer.into_inner();
        self.inner.write_all(&to_i32(text.len())?.to_le_bytes())?;
        self.inner.write_all(&text)?;

        let references = header.reference_sequences();
        self.inner.write_all(&to_i32(references.len())?.to_le_bytes())?;
        for (name, map) in references {
            self.inner.write_all(&to_i32(name.len() + 1)?.to_le_bytes())?;
            self.inner.write_all(name)?;
            self.inner.write_all(&[0])?;
            self.inner.write_all(&to_i32(map.length().get())?.to_le_bytes())?;
        }
        Ok(())
    }

    /// Write one record, prefixed with its `block_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_raw_record(&mut self, record: &[u8]) -> io::Result<()> {
        let block_size = u32::try_from(record.len())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.inner.write_all(&block_size.to_le_bytes())?;
        self.inner.write_all(record)
    }

    /// # Errors
    ///
    /// Returns an error if the final blocks cannot be written.
    pub fn finish(self) -> io::Result<()> {
        self.inner.finish()
    }
}

impl RecordSink for RawBamWriter {
    fn write_record(&mut self, record: &RawRecord) -> io::Result<()> {
        self.write_raw_record(record.as_bytes())
    }
}

fn to_i32(n: usize) -> io::Result<i32> {
    i32::try_from(n).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// True if `path` names standard input.
///
/// ```
/// use matefix_lib::bam_io::is_stdin_path;
///
/// assert!(is_stdin_path("-"));
/// assert!(is_stdin_path("/dev/stdin"));
/// assert!(!is_stdin_path("input.bam"));
/// ```
pub fn is_stdin_path<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref().to_string_lossy();
    path == "-" || path == "/dev/stdin"
}

/// True if `path` names standard output.
pub fn is_stdout_path<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref().to_string_lossy();
    path == "-" || path == "/dev/stdout"
}

fn worker_count(threads: usize) -> Option<NonZero<usize>> {
    NonZero::new(threads).filter(|n| n.get() > 1)
}

/// Open a BAM for raw record reading and return it with its header.
///
/// # Errors
///
/// Returns an error if the input cannot be opened or its header cannot be parsed.
pub fn create_raw_bam_reader<P: AsRef<Path>>(
    path: P,
    threads: usize,
) -> Result<(RawBamReader<BgzfReaderEnum>, Header)> {
    let path = path.as_ref();
    let input: InputStream = if is_stdin_path(path) {
        Box::new(io::stdin())
    } else {
        Box::new(
            File::open(path)
                .with_context(|| format!("Failed to open input BAM: {}", path.display()))?,
        )
    };

    let bgzf_reader = match worker_count(threads) {
        Some(n) => BgzfReaderEnum::MultiThreaded(MultithreadedReader::with_worker_count(n, input)),
        None => BgzfReaderEnum::SingleThreaded(BgzfReader::new(input)),
    };

    let mut bam_reader = noodles::bam::io::Reader::from(bgzf_reader);
    let header = bam_reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path.display()))?;

    Ok((RawBamReader::new(bam_reader.into_inner()), header))
}

/// Default BGZF compression level for output BAMs.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Map a numeric level onto a BGZF compression level; 0 writes stored (uncompressed) blocks.
///
/// # Errors
///
/// Returns an error if `level` is above the highest level the DEFLATE backend supports.
pub fn compression_level(level: u32) -> Result<CompressionLevel> {
    u8::try_from(level)
        .ok()
        .and_then(CompressionLevel::new)
        .ok_or_else(|| {
            anyhow!("Invalid compression level {level}; expected 0-{}", CompressionLevel::BEST.get())
        })
}

/// Create a BAM compressed at `compression_level` and write `header` to it.
///
/// # Errors
///
/// Returns an error if the compression level is out of range, or the output cannot be
/// created, or the header cannot be written.
pub fn create_raw_bam_writer<P: AsRef<Path>>(
    path: P,
    header: &Header,
    threads: usize,
    compression_level: u32,
) -> Result<RawBamWriter> {
    let path = path.as_ref();
    let level = self::compression_level(compression_level)?;
    let output: OutputStream = if is_stdout_path(path) {
        Box::new(io::stdout())
    } else {
        Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output BAM: {}", path.display()))?,
        )
    };

    let bgzf_writer = match worker_count(threads) {
        Some(n) => BgzfWriterEnum::MultiThreaded(
            MultithreadedWriterBuilder::default()
                .set_worker_count(n)
                .set_compression_level(level)
                .build_from_writer(output),
        ),
        None => BgzfWriterEnum::SingleThreaded(
            BgzfWriterBuilder::default().set_compression_level(level).build_from_writer(output),
        ),
    };

    let mut writer = RawBamWriter::new(bgzf_writer);
    writer
        .write_header(header)
        .with_context(|| format!("Failed to write header to: {}", path.display()))?;
    Ok(writer)
}
