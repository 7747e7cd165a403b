//! Single-pass record index over a keyword file
//!
//! One forward scan reads every record header and seeks past the payloads,
//! leaving a table of byte extents that makes any later keyword access a
//! single seek. Payload bytes are never touched in binary mode.
//!
//! A damaged file does not discard what was already found: scanning stops at
//! the first unreadable header and the index built so far stays usable, with
//! the cause retained on the index for the caller to inspect.

// standard library
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Seek};
use std::ops::Range;

// crate modules
use crate::codec::{self, ByteOrder, WireScalar};
use crate::error::{Error, Result};
use crate::file::FileFormat;
use crate::keyword::KeywordType;
use crate::parsers;

// ecltools modules
use ecltools_utils::{f, StringExt};

// external crates
use log::{debug, warn};

/// Keyword name that delimits report steps in unified restart files
pub const STEP_SENTINEL: &str = "SEQNUM";

/// Byte extent and header of one record occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Record name, trailing pad trimmed
    pub name: String,
    /// 0-based counter among occurrences of the same name
    pub occurrence: usize,
    /// Declared element type
    pub ktype: KeywordType,
    /// Declared element count
    pub count: usize,
    /// Byte offset of the record start (header frame)
    pub offset: u64,
    /// Byte offset of the first payload byte or value line
    pub data_offset: u64,
    /// Total on-disk span of the record in bytes
    pub byte_len: u64,
}

/// Lookup table of every record in a file, in physical order
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: Vec<IndexEntry>,
    by_name: HashMap<String, Vec<usize>>,
    scan_error: Option<Error>,
}

impl FileIndex {
    /// Scan a stream from its current position into an index
    ///
    /// Never fails outright: anything that stops the scan early (corrupt
    /// header, truncation, I/O failure) is recorded on the returned index and
    /// the complete entries collected so far remain valid. A clean end of
    /// file at a record boundary is not an error.
    pub fn scan<R: Read + Seek>(reader: &mut R, order: ByteOrder, format: FileFormat) -> Self {
        let mut index = FileIndex::default();
        let outcome = match format {
            FileFormat::Binary => index.scan_binary(reader, order),
            FileFormat::Formatted => index.scan_formatted(reader),
        };
        if let Err(error) = outcome {
            warn!(
                "index scan stopped after {} records: {error}",
                index.entries.len()
            );
            index.scan_error = Some(error);
        }
        debug!("indexed {} keyword records", index.entries.len());
        index
    }

    fn scan_binary<R: Read + Seek>(&mut self, reader: &mut R, order: ByteOrder) -> Result<()> {
        loop {
            let offset = reader.stream_position()?;
            let (name, ktype, count) = match read_binary_header(reader, order, offset)? {
                Some(header) => header,
                None => return Ok(()),
            };

            // skip the payload sub-blocks without reading them
            let width = ktype.element_width();
            let limit = ktype.block_limit();
            let mut remaining = count;
            while remaining > 0 {
                let elements = remaining.min(limit);
                let skipped = codec::skip_framed(reader, order).map_err(|e| corrupt(offset, e))?;
                if skipped != elements * width {
                    return Err(Error::CorruptHeader {
                        offset,
                        reason: f!(
                            "payload block of {skipped} bytes, expected {}",
                            elements * width
                        ),
                    });
                }
                remaining -= elements;
            }

            let end = reader.stream_position()?;
            self.append_entry(name, ktype, count, offset, offset + 24, end - offset);
        }
    }

    fn scan_formatted<R: Read + Seek>(&mut self, reader: &mut R) -> Result<()> {
        let mut position = reader.stream_position()?;
        let mut lines = BufReader::new(reader);
        let mut line = String::new();
        loop {
            line.clear();
            if lines.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let offset = position;
            position += line.len() as u64;
            if line.trim().is_empty() {
                continue;
            }

            let (name, count, ktype) = parsers::header_line(line.trim_end())
                .map_err(|e| corrupt(offset, e))?;
            if count < 0 {
                return Err(Error::CorruptHeader {
                    offset,
                    reason: f!("negative element count {count}"),
                });
            }
            let count = count as usize;
            let data_offset = position;

            // walk the value lines without keeping the data
            let mut seen = 0;
            while seen < count {
                line.clear();
                let read = lines.read_line(&mut line)?;
                if read == 0 {
                    return Err(Error::CorruptHeader {
                        offset,
                        reason: f!("file ends after {seen} of {count} values"),
                    });
                }
                position += read as u64;
                if line.trim().is_empty() {
                    continue;
                }
                seen += count_values(line.trim_end(), ktype).map_err(|e| corrupt(offset, e))?;
            }
            if seen > count {
                return Err(Error::CorruptHeader {
                    offset,
                    reason: f!("found {seen} values, expected {count}"),
                });
            }

            self.append_entry(name, ktype, count, offset, data_offset, position - offset);
        }
    }

    pub(crate) fn append_entry(
        &mut self,
        name: String,
        ktype: KeywordType,
        count: usize,
        offset: u64,
        data_offset: u64,
        byte_len: u64,
    ) {
        let slots = self.by_name.entry(name.clone()).or_default();
        let occurrence = slots.len();
        slots.push(self.entries.len());
        self.entries.push(IndexEntry {
            name,
            occurrence,
            ktype,
            count,
            offset,
            data_offset,
            byte_len,
        });
    }

    /// The entry for one occurrence of a name, if present
    pub fn lookup(&self, name: &str, occurrence: usize) -> Option<&IndexEntry> {
        self.by_name
            .get(name)
            .and_then(|slots| slots.get(occurrence))
            .map(|&slot| &self.entries[slot])
    }

    /// Number of occurrences of a name
    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, Vec::len)
    }

    /// All entries in physical file order
    ///
    /// The iterator is restartable; it walks the in-memory table and never
    /// touches file-handle state.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Total number of indexed records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no records were indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// False when the scan stopped early on damage
    pub fn is_complete(&self) -> bool {
        self.scan_error.is_none()
    }

    /// Whatever stopped the scan early, if anything did
    pub fn scan_error(&self) -> Option<&Error> {
        self.scan_error.as_ref()
    }

    /// Entry ranges of each report step
    ///
    /// Derived from the indexed occurrences of the [STEP_SENTINEL] keyword
    /// without re-scanning the file. Each range starts at its sentinel;
    /// records before the first sentinel (or a file with none) form a single
    /// leading range.
    pub fn report_steps(&self) -> Vec<Range<usize>> {
        let marks: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name == STEP_SENTINEL)
            .map(|(slot, _)| slot)
            .collect();

        if marks.is_empty() {
            return if self.entries.is_empty() {
                Vec::new()
            } else {
                vec![0..self.entries.len()]
            };
        }

        let mut steps = Vec::with_capacity(marks.len() + 1);
        if marks[0] > 0 {
            steps.push(0..marks[0]);
        }
        for pair in marks.windows(2) {
            steps.push(pair[0]..pair[1]);
        }
        steps.push(marks[marks.len() - 1]..self.entries.len());
        steps
    }
}

/// Read one 16-byte binary record header
///
/// `Ok(None)` is a clean end of file exactly at a record boundary; anything
/// else that falls short is damage.
fn read_binary_header<R: Read>(
    reader: &mut R,
    order: ByteOrder,
    offset: u64,
) -> Result<Option<(String, KeywordType, usize)>> {
    let mut frame = [0u8; 4];
    match codec::fill_exact(reader, &mut frame) {
        Err(Error::Truncated { found: 0, .. }) => return Ok(None),
        Err(e) => return Err(corrupt(offset, e)),
        Ok(()) => {}
    }
    let head = i32::from_bytes(&frame, order);
    if head != 16 {
        return Err(Error::CorruptHeader {
            offset,
            reason: f!("header frame length {head}, expected 16"),
        });
    }

    let mut body = [0u8; 16];
    codec::fill_exact(reader, &mut body).map_err(|e| corrupt(offset, e))?;
    let tail: i32 = codec::read_scalar(reader, order).map_err(|e| corrupt(offset, e))?;
    if tail != 16 {
        return Err(corrupt(
            offset,
            Error::FrameMismatch { head: 16, tail },
        ));
    }

    let raw_name = String::from_utf8_lossy(&body[..8]).to_string();
    if !raw_name.is_keyword_field() {
        return Err(Error::CorruptHeader {
            offset,
            reason: f!("unprintable name field {raw_name:?}"),
        });
    }
    let count = i32::from_bytes(&body[8..12], order);
    if count < 0 {
        return Err(Error::CorruptHeader {
            offset,
            reason: f!("negative element count {count}"),
        });
    }
    let ktype = KeywordType::from_tag(&body[12..16]).ok_or_else(|| Error::CorruptHeader {
        offset,
        reason: f!(
            "unrecognised type tag {:?}",
            String::from_utf8_lossy(&body[12..16])
        ),
    })?;

    Ok(Some((
        raw_name.trim_end().to_string(),
        ktype,
        count as usize,
    )))
}

/// Count the parseable values on one formatted line
fn count_values(line: &str, ktype: KeywordType) -> Result<usize> {
    Ok(match ktype {
        KeywordType::Integer => parsers::int_line(line)?.len(),
        KeywordType::Real | KeywordType::Double => parsers::real_line(line)?.len(),
        KeywordType::Logical => parsers::logical_line(line)?.len(),
        KeywordType::Char => parsers::char_line(line)?.len(),
        KeywordType::Message => 0,
    })
}

fn corrupt(offset: u64, error: Error) -> Error {
    match error {
        already @ Error::CorruptHeader { .. } => already,
        other => Error::CorruptHeader {
            offset,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::{write_binary_record, KeywordData};
    use std::io::Cursor;

    const ORDER: ByteOrder = ByteOrder::BigEndian;

    fn sample_file() -> Vec<u8> {
        let mut buf = Vec::new();
        write_binary_record(&mut buf, ORDER, "INTEHEAD", &KeywordData::Int(vec![1, 2, 3])).unwrap();
        write_binary_record(&mut buf, ORDER, "PORO", &KeywordData::Real(vec![0.25; 10])).unwrap();
        write_binary_record(
            &mut buf,
            ORDER,
            "INTEHEAD",
            &KeywordData::Int(vec![9, 8, 7, 6]),
        )
        .unwrap();
        buf
    }

    #[test]
    fn scan_finds_every_record_in_order() {
        let mut cursor = Cursor::new(sample_file());
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);

        assert!(index.is_complete());
        assert_eq!(index.len(), 3);
        assert_eq!(index.count("INTEHEAD"), 2);
        assert_eq!(index.count("PORO"), 1);
        assert_eq!(index.count("ZCORN"), 0);

        let names: Vec<&str> = index.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["INTEHEAD", "PORO", "INTEHEAD"]);

        // restartable: a second pass sees the same entries
        assert_eq!(index.entries().count(), 3);
    }

    #[test]
    fn entries_carry_exact_byte_extents() {
        let mut cursor = Cursor::new(sample_file());
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);

        let first = index.lookup("INTEHEAD", 0).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.data_offset, 24);
        assert_eq!(first.byte_len, 24 + 8 + 12);

        let second = index.lookup("PORO", 0).unwrap();
        assert_eq!(second.offset, first.byte_len);

        let third = index.lookup("INTEHEAD", 1).unwrap();
        assert_eq!(third.occurrence, 1);
        assert_eq!(third.count, 4);
    }

    #[test]
    fn truncation_salvages_complete_entries() {
        let mut buf = sample_file();
        // chop the last record off in the middle of its payload
        buf.truncate(buf.len() - 10);

        let mut cursor = Cursor::new(buf);
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);

        assert!(!index.is_complete());
        assert_eq!(index.len(), 2);
        assert!(matches!(
            index.scan_error(),
            Some(Error::CorruptHeader { .. })
        ));
    }

    #[test]
    fn unknown_type_tag_stops_the_scan() {
        let mut buf = sample_file();
        // corrupt the type tag of the first record, inside the header frame
        buf[16..20].copy_from_slice(b"XXXX");

        let mut cursor = Cursor::new(buf);
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);
        assert_eq!(index.len(), 0);
        assert!(!index.is_complete());
    }

    #[test]
    fn report_steps_split_on_the_sentinel() {
        let mut buf = Vec::new();
        for step in 0..3 {
            write_binary_record(&mut buf, ORDER, "SEQNUM", &KeywordData::Int(vec![step])).unwrap();
            write_binary_record(&mut buf, ORDER, "PRESSURE", &KeywordData::Real(vec![1.0]))
                .unwrap();
            write_binary_record(&mut buf, ORDER, "SWAT", &KeywordData::Real(vec![0.2])).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);
        assert_eq!(index.report_steps(), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn files_without_a_sentinel_are_one_step() {
        let mut cursor = Cursor::new(sample_file());
        let index = FileIndex::scan(&mut cursor, ORDER, FileFormat::Binary);
        assert_eq!(index.report_steps(), vec![0..3]);
    }
}
