//! A single spilled run: writer and reader halves of the same on-disk format.
//!
//! The on-disk frame shape itself (length prefix, payload, CRC32 trailer) is
//! owned entirely by [`SpillCodec`]; this module only provisions the
//! temporary file and counts bytes for the compaction cohort heuristic.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;

use graphos_common::utils::error::Result;
use tempfile::NamedTempFile;

use super::codec::SpillCodec;
use crate::execution::RunCursor;

/// A sealed spill file, not yet reopened for reading.
///
/// Keeps the [`NamedTempFile`] handle alive so the underlying path is
/// deleted automatically once every cursor derived from it is dropped.
pub struct SpillRun<T> {
    temp: NamedTempFile,
    bytes: u64,
    _marker: PhantomData<T>,
}

impl<T: SpillCodec> SpillRun<T> {
    /// Bytes written to this run, used to pick the smallest-files-first
    /// compaction cohort.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Reopens the run for streaming reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be reopened.
    pub fn into_cursor(self) -> Result<SpillFileReader<T>> {
        SpillFileReader::open(self.temp)
    }
}

/// Counts bytes passed through an inner writer, so `SpillFile` can track
/// `bytes_written` without needing to know the codec's frame layout.
struct CountingWriter<'a, W> {
    inner: &'a mut W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// A writer for a single spill file.
pub struct SpillFile<T> {
    writer: BufWriter<File>,
    temp: NamedTempFile,
    bytes_written: u64,
    _marker: PhantomData<T>,
}

impl<T: SpillCodec> SpillFile<T> {
    /// Allocates a fresh, uniquely-named temporary file.
    ///
    /// `size_hint`, when given, is an advisory pre-allocation in bytes; it is
    /// ignored if the filesystem refuses it.
    ///
    /// # Errors
    ///
    /// Returns an error if no temporary file could be created.
    pub fn create(size_hint: Option<u64>) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("graphos-sort-")
            .suffix(".run")
            .tempfile()?;

        if let Some(hint) = size_hint {
            if let Err(err) = temp.as_file().set_len(hint) {
                tracing::debug!(error = %err, hint, "ignoring advisory spill file size hint");
            }
        }

        let file = temp.reopen()?;
        Ok(Self {
            writer: BufWriter::new(file),
            temp,
            bytes_written: 0,
            _marker: PhantomData,
        })
    }

    /// Appends one record to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_record(&mut self, record: &T) -> Result<()> {
        let mut counting = CountingWriter {
            inner: &mut self.writer,
            count: 0,
        };
        record.encode(&mut counting)?;
        self.bytes_written += counting.count;
        Ok(())
    }

    /// Flushes the writer and truncates away any unused pre-allocated tail,
    /// returning a handle over the sealed run.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush or truncation fails.
    pub fn seal(mut self) -> Result<SpillRun<T>> {
        self.writer.flush()?;
        self.writer.get_ref().set_len(self.bytes_written)?;
        Ok(SpillRun {
            temp: self.temp,
            bytes: self.bytes_written,
            _marker: PhantomData,
        })
    }
}

/// A streaming, one-record-lookahead cursor over a sealed spill file.
pub struct SpillFileReader<T> {
    reader: BufReader<File>,
    next: Option<T>,
    _temp: NamedTempFile,
}

impl<T: SpillCodec> SpillFileReader<T> {
    fn open(temp: NamedTempFile) -> Result<Self> {
        let file = temp.reopen()?;
        let mut reader = BufReader::new(file);
        let next = T::decode(&mut reader)?;
        Ok(Self {
            reader,
            next,
            _temp: temp,
        })
    }
}

impl<T: SpillCodec> RunCursor<T> for SpillFileReader<T> {
    fn peek(&self) -> Option<&T> {
        self.next.as_ref()
    }

    fn pop(&mut self) -> Result<Option<T>> {
        let Some(current) = self.next.take() else {
            return Ok(None);
        };
        self.next = T::decode(&mut self.reader)?;
        Ok(Some(current))
    }
}
