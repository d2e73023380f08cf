//! Zip archive sink shared by all pack workers.
//!
//! Zip is a sequential format: once an entry header is written, every byte
//! up to the next header belongs to that entry. The sink therefore only
//! hands out its writer inside [`ArchiveSink::with_exclusive`], which holds
//! the lock from header creation until the entry's content is fully written.

use chrono::{Datelike, Local, Timelike};
use std::collections::HashSet;
use std::io::{self, Seek, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::PackError;

/// Largest size the classic 32-bit zip size fields can carry.
pub const ZIP32_MAX: u64 = u32::MAX as u64;

/// Declared size of an entry: the 32-bit header field and the real size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySize {
    /// Value for the 32-bit field; capped at `u32::MAX` when ZIP64 is used.
    pub declared: u32,
    /// Real uncompressed size.
    pub actual: u64,
}

impl EntrySize {
    pub fn new(actual: u64) -> Self {
        let declared = u32::try_from(actual).unwrap_or(u32::MAX);
        Self { declared, actual }
    }

    /// True when the size only fits in the ZIP64 extra field.
    pub fn needs_zip64(&self) -> bool {
        self.actual > ZIP32_MAX
    }
}

/// Header fields of a new entry.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub size: EntrySize,
    pub modified: SystemTime,
    pub unix_mode: u32,
}

impl EntryMeta {
    pub fn new(size: u64, modified: SystemTime, unix_mode: u32) -> Self {
        Self {
            size: EntrySize::new(size),
            modified,
            unix_mode,
        }
    }

    /// Meta for a file on disk.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o777
        };
        #[cfg(not(unix))]
        let mode = 0o644;
        Self::new(
            meta.len(),
            meta.modified().unwrap_or_else(|_| SystemTime::now()),
            mode,
        )
    }

    fn options(&self) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_time(self.modified))
            .unix_permissions(self.unix_mode)
            .large_file(self.size.needs_zip64())
    }
}

fn zip_time(t: SystemTime) -> DateTime {
    let local: chrono::DateTime<Local> = t.into();
    let year = u16::try_from(local.year()).unwrap_or(1980);
    DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

struct SinkState<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    names: HashSet<String>,
}

/// Append-only zip container guarded for use from many threads.
pub struct ArchiveSink<W: Write + Seek> {
    state: Mutex<SinkState<W>>,
}

impl<W: Write + Seek> ArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                zip: Some(ZipWriter::new(inner)),
                names: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SinkState<W>>, PackError> {
        self.state.lock().map_err(|_| PackError::SinkPoisoned)
    }

    /// Run `f` with sole access to the archive. No other caller can start or
    /// write an entry until `f` returns.
    pub fn with_exclusive<T, F>(&self, f: F) -> Result<T, PackError>
    where
        F: FnOnce(&mut EntryWriter<'_, W>) -> Result<T, PackError>,
    {
        let mut guard = self.lock()?;
        let SinkState { zip, names } = &mut *guard;
        let zip = zip.as_mut().ok_or(PackError::SinkClosed)?;
        let mut writer = EntryWriter {
            zip,
            names,
            open: false,
        };
        f(&mut writer)
    }

    /// Number of entries started so far.
    pub fn entry_count(&self) -> Result<usize, PackError> {
        Ok(self.lock()?.names.len())
    }

    /// Write the central directory and return the underlying writer.
    /// Later calls to [`with_exclusive`](Self::with_exclusive) fail with `SinkClosed`.
    pub fn finish(&self) -> Result<W, PackError> {
        let mut guard = self.lock()?;
        let zip = guard.zip.take().ok_or(PackError::SinkClosed)?;
        Ok(zip.finish()?)
    }
}

/// Access to the archive inside an exclusive section.
pub struct EntryWriter<'a, W: Write + Seek> {
    zip: &'a mut ZipWriter<W>,
    names: &'a mut HashSet<String>,
    open: bool,
}

impl<W: Write + Seek> EntryWriter<'_, W> {
    /// Start a deflate-compressed entry; subsequent writes go into it.
    pub fn start_entry(&mut self, name: &str, meta: &EntryMeta) -> Result<(), PackError> {
        if self.names.contains(name) {
            return Err(PackError::DuplicateEntry(name.to_string()));
        }
        self.zip.start_file(name.to_string(), meta.options())?;
        self.names.insert(name.to_string());
        self.open = true;
        Ok(())
    }
}

impl<W: Write + Seek> Write for EntryWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "no archive entry started",
            ));
        }
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}
