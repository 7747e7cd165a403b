//! File sessions mediating all keyword reads and writes
//!
//! An [EclFile] is the single owner of an open file handle. Reads resolve
//! through the [FileIndex](crate::FileIndex) built at open time and hand back
//! lazy [KeywordRecord](crate::KeywordRecord)s; writes append framed records
//! and extend the index in step.
//!
//! One session means one handle and single-threaded access. Any number of
//! independent read-only sessions may open the same path concurrently, since
//! a fully written file is immutable. A session opened for writing must not
//! overlap in time with any other session on the same path; that exclusivity
//! is the caller's to enforce, it is not detected here.

// standard library
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

// crate modules
use crate::codec::ByteOrder;
use crate::error::{Error, Result};
use crate::index::{FileIndex, IndexEntry};
use crate::keyword::{self, KeywordRecord, LazyHandle};

// external crates
use log::debug;

/// Access mode of a file session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reads only
    Read,
    /// Fresh file, truncating anything present, writes only
    Write,
    /// Existing or fresh file, reads and appended writes
    ReadWrite,
}

/// Physical representation of a file
///
/// A property of the whole file, never mixed within one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Fortran-framed binary records
    Binary,
    /// ASCII records in Fortran list layouts
    Formatted,
}

/// Shared state between a session and its lazy records
#[derive(Debug)]
pub(crate) struct Backing {
    pub(crate) file: Option<File>,
    pub(crate) order: ByteOrder,
    pub(crate) format: FileFormat,
    pub(crate) payload_reads: u64,
}

/// An open keyword file session
///
/// See the [module docs](self) for the concurrency contract.
#[derive(Debug)]
pub struct EclFile {
    path: PathBuf,
    mode: OpenMode,
    backing: Rc<RefCell<Backing>>,
    index: FileIndex,
    write_offset: u64,
}

impl EclFile {
    /// Open a file and, in readable modes, scan its record index
    ///
    /// The byte order and format are per-file, per-open settings supplied by
    /// the caller; see [probe_byte_order](crate::probe_byte_order) for the
    /// heuristic when the order of a binary file is unknown.
    pub fn open<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        format: FileFormat,
        order: ByteOrder,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::ReadWrite => options.read(true).write(true).create(true),
        };
        let mut file = options.open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;

        let index = match mode {
            OpenMode::Write => FileIndex::default(),
            _ => FileIndex::scan(&mut file, order, format),
        };
        let write_offset = file.seek(SeekFrom::End(0))?;
        debug!(
            "opened {} with {} indexed records",
            path.display(),
            index.len()
        );

        Ok(EclFile {
            path,
            mode,
            backing: Rc::new(RefCell::new(Backing {
                file: Some(file),
                order,
                format,
                payload_reads: 0,
            })),
            index,
            write_offset,
        })
    }

    /// The path this session was opened on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte order supplied at open time
    pub fn byte_order(&self) -> ByteOrder {
        self.backing.borrow().order
    }

    /// Format supplied at open time
    pub fn format(&self) -> FileFormat {
        self.backing.borrow().format
    }

    /// The record index scanned at open time
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Number of physical payload reads performed so far
    ///
    /// Lazy materialisation reads each payload at most once, so this also
    /// counts the records actually touched.
    pub fn payload_reads(&self) -> u64 {
        self.backing.borrow().payload_reads
    }

    /// Fetch one keyword occurrence as a lazily materialised record
    ///
    /// Only the header is consulted here; the payload stays on disk until
    /// the record is first accessed.
    pub fn read_keyword(&self, name: &str, occurrence: usize) -> Result<KeywordRecord> {
        if self.backing.borrow().file.is_none() {
            return Err(Error::UseAfterClose);
        }
        let entry = self
            .index
            .lookup(name, occurrence)
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
                occurrence,
            })?;
        Ok(KeywordRecord::lazy(
            entry.name.clone(),
            entry.ktype,
            entry.count,
            LazyHandle {
                session: Rc::clone(&self.backing),
                data_offset: entry.data_offset,
            },
        ))
    }

    /// Fetch the record behind an index entry directly
    ///
    /// Convenience for callers iterating [FileIndex::entries]; equivalent to
    /// [read_keyword](EclFile::read_keyword) with the entry's own name and
    /// occurrence.
    pub fn read_keyword_at(&self, entry: &IndexEntry) -> Result<KeywordRecord> {
        self.read_keyword(&entry.name, entry.occurrence)
    }

    /// Append one record at the write cursor and extend the index
    ///
    /// The declared count of any [KeywordRecord] built through this crate
    /// always equals its payload length; the [Error::SizeMismatch] guard here
    /// backs that invariant against future record constructors.
    pub fn append_keyword(&mut self, record: &KeywordRecord) -> Result<()> {
        if self.backing.borrow().file.is_none() {
            return Err(Error::UseAfterClose);
        }
        if self.mode == OpenMode::Read {
            return Err(Error::ReadOnlySession);
        }

        let data = record.materialise()?;
        if data.len() != record.count() {
            return Err(Error::SizeMismatch {
                name: record.name().to_string(),
                declared: record.count(),
                actual: data.len(),
            });
        }

        let offset = self.write_offset;
        let header_len;
        {
            let mut backing = self.backing.borrow_mut();
            let order = backing.order;
            let format = backing.format;
            let file = backing.file.as_mut().ok_or(Error::UseAfterClose)?;
            file.seek(SeekFrom::Start(offset))?;
            header_len = match format {
                FileFormat::Binary => {
                    keyword::write_binary_record(file, order, record.name(), data)?
                }
                FileFormat::Formatted => {
                    keyword::write_formatted_record(file, record.name(), data)?
                }
            };
            self.write_offset = file.stream_position()?;
        }

        self.index.append_entry(
            record.name().to_string(),
            record.ktype(),
            record.count(),
            offset,
            offset + header_len,
            self.write_offset - offset,
        );
        Ok(())
    }

    /// Release the file handle
    ///
    /// Idempotent. Afterwards every read or write on this session fails with
    /// [Error::UseAfterClose] and any still-unmaterialised lazy record fails
    /// with [Error::SessionClosed]. Dropping the session has the same
    /// effect, so the descriptor is released on every exit path.
    pub fn close(&mut self) {
        self.backing.borrow_mut().file = None;
    }
}

impl Drop for EclFile {
    fn drop(&mut self) {
        // lazy records only keep the shared state alive, never the handle
        self.backing.borrow_mut().file = None;
    }
}
