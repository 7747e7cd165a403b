//! Keyword records, the atomic unit of the file format
//!
//! A record is a named, typed, counted block of data. Records read from a
//! file hold only their header until the payload is actually requested, at
//! which point one seek and one read against the backing session fills an
//! internal cache.

// standard library
use std::cell::{OnceCell, RefCell};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

// crate modules
use crate::codec::{self, ByteOrder, WireScalar};
use crate::error::{Error, Result};
use crate::file::{Backing, FileFormat};
use crate::parsers;

// ecltools modules
use ecltools_utils::{f, StringExt, ValueExt};

/// Maximum elements per physical block for numeric and logical payloads
///
/// Large payloads are split into framed sub-blocks of at most this many
/// elements, a format constant inherited from the original tooling.
pub const NUMERIC_BLOCK_LIMIT: usize = 1000;

/// Maximum elements per physical block for character payloads
pub const CHAR_BLOCK_LIMIT: usize = 105;

/// Element type of a keyword record
///
/// A closed set: every codec boundary matches exhaustively on these, so a
/// width disagreement between declared type and decoded data cannot slip
/// through silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordType {
    /// 4-byte signed integers, tag `INTE`
    Integer,
    /// 4-byte floats, tag `REAL`
    Real,
    /// 8-byte floats, tag `DOUB`
    Double,
    /// Logicals carried as 4-byte integers, tag `LOGI`
    Logical,
    /// Fixed 8-character space-padded strings, tag `CHAR`
    Char,
    /// Payload-free marker records, tag `MESS`
    Message,
}

impl KeywordType {
    /// The 4-character tag written in record headers
    pub fn tag(&self) -> &'static str {
        match self {
            KeywordType::Integer => "INTE",
            KeywordType::Real => "REAL",
            KeywordType::Double => "DOUB",
            KeywordType::Logical => "LOGI",
            KeywordType::Char => "CHAR",
            KeywordType::Message => "MESS",
        }
    }

    /// Inverse of [KeywordType::tag], `None` for unrecognised tags
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"INTE" => Some(KeywordType::Integer),
            b"REAL" => Some(KeywordType::Real),
            b"DOUB" => Some(KeywordType::Double),
            b"LOGI" => Some(KeywordType::Logical),
            b"CHAR" => Some(KeywordType::Char),
            b"MESS" => Some(KeywordType::Message),
            _ => None,
        }
    }

    /// Width of one element on disk in bytes
    pub fn element_width(&self) -> usize {
        match self {
            KeywordType::Integer | KeywordType::Real | KeywordType::Logical => 4,
            KeywordType::Double | KeywordType::Char => 8,
            KeywordType::Message => 0,
        }
    }

    /// Elements per physical sub-block in binary mode
    pub fn block_limit(&self) -> usize {
        match self {
            KeywordType::Char => CHAR_BLOCK_LIMIT,
            _ => NUMERIC_BLOCK_LIMIT,
        }
    }
}

impl std::fmt::Display for KeywordType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Typed payload of one keyword record
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordData {
    /// `INTE` elements
    Int(Vec<i32>),
    /// `REAL` elements
    Real(Vec<f32>),
    /// `DOUB` elements
    Double(Vec<f64>),
    /// `LOGI` elements
    Logical(Vec<bool>),
    /// `CHAR` elements, trailing padding trimmed
    Chars(Vec<String>),
    /// `MESS` marker, no payload
    Message,
}

impl KeywordData {
    /// Element type of this payload
    pub fn ktype(&self) -> KeywordType {
        match self {
            KeywordData::Int(_) => KeywordType::Integer,
            KeywordData::Real(_) => KeywordType::Real,
            KeywordData::Double(_) => KeywordType::Double,
            KeywordData::Logical(_) => KeywordType::Logical,
            KeywordData::Chars(_) => KeywordType::Char,
            KeywordData::Message => KeywordType::Message,
        }
    }

    /// Number of elements held
    pub fn len(&self) -> usize {
        match self {
            KeywordData::Int(v) => v.len(),
            KeywordData::Real(v) => v.len(),
            KeywordData::Double(v) => v.len(),
            KeywordData::Logical(v) => v.len(),
            KeywordData::Chars(v) => v.len(),
            KeywordData::Message => 0,
        }
    }

    /// True for zero elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a binary payload, reassembling multi-block splits
    pub(crate) fn read_binary<R: Read>(
        reader: &mut R,
        order: ByteOrder,
        ktype: KeywordType,
        count: usize,
    ) -> Result<Self> {
        if ktype == KeywordType::Message {
            return Ok(KeywordData::Message);
        }
        let raw = read_raw_blocks(reader, order, count, ktype)?;
        Ok(match ktype {
            KeywordType::Integer => KeywordData::Int(decode_scalars(&raw, order)),
            KeywordType::Real => KeywordData::Real(decode_scalars(&raw, order)),
            KeywordType::Double => KeywordData::Double(decode_scalars(&raw, order)),
            KeywordType::Logical => KeywordData::Logical(
                decode_scalars::<i32>(&raw, order)
                    .into_iter()
                    .map(|v| v != 0)
                    .collect(),
            ),
            KeywordType::Char => KeywordData::Chars(
                raw.chunks_exact(8)
                    .map(|c| String::from_utf8_lossy(c).trim_end().to_string())
                    .collect(),
            ),
            KeywordType::Message => unreachable!("handled above"),
        })
    }

    /// Parse a formatted payload, returning the data and bytes consumed
    pub(crate) fn read_formatted<R: BufRead>(
        reader: &mut R,
        ktype: KeywordType,
        count: usize,
    ) -> Result<(Self, u64)> {
        let mut consumed = 0u64;
        let data = match ktype {
            KeywordType::Integer => KeywordData::Int(collect_formatted(
                reader,
                count,
                &mut consumed,
                parsers::int_line,
            )?),
            KeywordType::Real => KeywordData::Real(
                collect_formatted(reader, count, &mut consumed, parsers::real_line)?
                    .into_iter()
                    .map(|v| v as f32)
                    .collect(),
            ),
            KeywordType::Double => KeywordData::Double(collect_formatted(
                reader,
                count,
                &mut consumed,
                parsers::real_line,
            )?),
            KeywordType::Logical => KeywordData::Logical(collect_formatted(
                reader,
                count,
                &mut consumed,
                parsers::logical_line,
            )?),
            KeywordType::Char => KeywordData::Chars(collect_formatted(
                reader,
                count,
                &mut consumed,
                parsers::char_line,
            )?),
            KeywordType::Message => KeywordData::Message,
        };
        Ok((data, consumed))
    }
}

/// Read and concatenate the framed sub-blocks of one binary payload
fn read_raw_blocks<R: Read>(
    reader: &mut R,
    order: ByteOrder,
    count: usize,
    ktype: KeywordType,
) -> Result<Vec<u8>> {
    let width = ktype.element_width();
    let limit = ktype.block_limit();
    let mut raw = Vec::with_capacity(count * width);
    let mut remaining = count;
    while remaining > 0 {
        let elements = remaining.min(limit);
        let block = codec::read_framed(reader, order)?;
        if block.len() != elements * width {
            return Err(Error::Truncated {
                expected: elements * width,
                found: block.len(),
            });
        }
        raw.extend_from_slice(&block);
        remaining -= elements;
    }
    Ok(raw)
}

fn decode_scalars<T: WireScalar>(raw: &[u8], order: ByteOrder) -> Vec<T> {
    raw.chunks_exact(T::WIDTH)
        .map(|chunk| T::from_bytes(chunk, order))
        .collect()
}

/// Accumulate formatted values line by line until `count` is reached
fn collect_formatted<R: BufRead, T>(
    reader: &mut R,
    count: usize,
    consumed: &mut u64,
    parse_line: impl Fn(&str) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(count);
    let mut line = String::new();
    while values.len() < count {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::Truncated {
                expected: count,
                found: values.len(),
            });
        }
        *consumed += read as u64;
        if line.trim().is_empty() {
            continue;
        }
        let mut parsed = parse_line(line.trim_end())?;
        if values.len() + parsed.len() > count {
            return Err(Error::ParseError(f!(
                "found more values than the declared {count}"
            )));
        }
        values.append(&mut parsed);
    }
    Ok(values)
}

/// Emit one full binary record, returning the header span in bytes
pub(crate) fn write_binary_record<W: Write>(
    writer: &mut W,
    order: ByteOrder,
    name: &str,
    data: &KeywordData,
) -> Result<u64> {
    let mut header = Vec::with_capacity(16);
    header.extend_from_slice(name.keyword_field().as_bytes());
    (data.len() as i32).put_bytes(&mut header, order);
    header.extend_from_slice(data.ktype().tag().as_bytes());
    codec::write_framed(writer, &header, order)?;

    match data {
        KeywordData::Int(v) => write_scalar_blocks(writer, v, order, data.ktype()),
        KeywordData::Real(v) => write_scalar_blocks(writer, v, order, data.ktype()),
        KeywordData::Double(v) => write_scalar_blocks(writer, v, order, data.ktype()),
        KeywordData::Logical(v) => {
            let ints: Vec<i32> = v.iter().map(|&b| if b { -1 } else { 0 }).collect();
            write_scalar_blocks(writer, &ints, order, data.ktype())
        }
        KeywordData::Chars(v) => {
            for chunk in v.chunks(CHAR_BLOCK_LIMIT) {
                let mut block = Vec::with_capacity(chunk.len() * 8);
                for s in chunk {
                    block.extend_from_slice(s.keyword_field().as_bytes());
                }
                codec::write_framed(writer, &block, order)?;
            }
            Ok(())
        }
        KeywordData::Message => Ok(()),
    }?;

    // 4-byte frame + 16-byte header + 4-byte frame
    Ok(24)
}

fn write_scalar_blocks<T: WireScalar, W: Write>(
    writer: &mut W,
    values: &[T],
    order: ByteOrder,
    ktype: KeywordType,
) -> Result<()> {
    for chunk in values.chunks(ktype.block_limit()) {
        let mut block = Vec::with_capacity(chunk.len() * T::WIDTH);
        for value in chunk {
            value.put_bytes(&mut block, order);
        }
        codec::write_framed(writer, &block, order)?;
    }
    Ok(())
}

/// Emit one full formatted record, returning the header line span in bytes
pub(crate) fn write_formatted_record<W: Write>(
    writer: &mut W,
    name: &str,
    data: &KeywordData,
) -> Result<u64> {
    let header = f!(
        " '{}' {:>11} '{}'\n",
        name.keyword_field(),
        data.len(),
        data.ktype().tag()
    );
    put_text(writer, &header)?;

    // mantissa digits must round-trip the element type exactly: 9 for f32,
    // 17 for f64
    match data {
        KeywordData::Int(v) => put_lines(writer, v, 6, |value| f!("{value:>12}")),
        KeywordData::Real(v) => put_lines(writer, v, 4, |value| f!("{:>17}", value.fortran(9, 'E'))),
        KeywordData::Double(v) => {
            put_lines(writer, v, 3, |value| f!("{:>24}", value.fortran(17, 'D')))
        }
        KeywordData::Logical(v) => {
            put_lines(writer, v, 25, |value| {
                f!("{:>3}", if *value { "T" } else { "F" })
            })
        }
        KeywordData::Chars(v) => put_lines(writer, v, 7, |value| f!(" '{}'", value.keyword_field())),
        KeywordData::Message => Ok(()),
    }?;

    Ok(header.len() as u64)
}

fn put_lines<T, W: Write>(
    writer: &mut W,
    values: &[T],
    per_line: usize,
    render: impl Fn(&T) -> String,
) -> Result<()> {
    for chunk in values.chunks(per_line) {
        let line: String = chunk.iter().map(&render).collect();
        put_text(writer, &line)?;
        put_text(writer, "\n")?;
    }
    Ok(())
}

fn put_text<W: Write>(writer: &mut W, text: &str) -> Result<()> {
    writer.write_all(text.as_bytes()).map_err(|_| Error::WriteFailed {
        expected: text.len(),
    })
}

/// Handle back to the session a lazy record was read from
#[derive(Debug)]
pub(crate) struct LazyHandle {
    pub(crate) session: Rc<RefCell<Backing>>,
    pub(crate) data_offset: u64,
}

impl LazyHandle {
    /// One seek + one read of the payload bytes
    fn read(&self, ktype: KeywordType, count: usize) -> Result<KeywordData> {
        let mut backing = self.session.borrow_mut();
        let order = backing.order;
        let format = backing.format;
        backing.payload_reads += 1;
        let file = backing.file.as_mut().ok_or(Error::SessionClosed)?;
        file.seek(SeekFrom::Start(self.data_offset))?;
        match format {
            FileFormat::Binary => KeywordData::read_binary(file, order, ktype, count),
            FileFormat::Formatted => {
                let mut reader = BufReader::new(file);
                KeywordData::read_formatted(&mut reader, ktype, count).map(|(data, _)| data)
            }
        }
    }
}

/// One named, typed, counted record
///
/// Constructed either eagerly from data in memory, or lazily by
/// [EclFile::read_keyword](crate::EclFile::read_keyword) with the payload
/// left on disk until first access.
#[derive(Debug)]
pub struct KeywordRecord {
    name: String,
    ktype: KeywordType,
    count: usize,
    payload: OnceCell<KeywordData>,
    backing: Option<LazyHandle>,
}

impl KeywordRecord {
    /// An in-memory record from a name and payload
    ///
    /// The name must fit the 8-character header field, as must every element
    /// of a `CHAR` payload.
    ///
    /// ```rust
    /// # use ecltools_eclio::{KeywordData, KeywordRecord};
    /// let kw = KeywordRecord::new("ACTNUM", KeywordData::Int(vec![1, 0, 1])).unwrap();
    /// assert_eq!(kw.count(), 3);
    /// ```
    pub fn new(name: &str, data: KeywordData) -> Result<Self> {
        let name = name.trim_end();
        if name.len() > 8 {
            return Err(Error::NameTooLong(name.to_string()));
        }
        if let KeywordData::Chars(strings) = &data {
            if let Some(long) = strings.iter().find(|s| s.len() > 8) {
                return Err(Error::StringTooLong(long.clone()));
            }
        }
        let record = KeywordRecord {
            name: name.to_string(),
            ktype: data.ktype(),
            count: data.len(),
            payload: OnceCell::new(),
            backing: None,
        };
        // freshly created cell, set cannot fail
        let _ = record.payload.set(data);
        Ok(record)
    }

    /// A header-only record whose payload reads lazily through `handle`
    pub(crate) fn lazy(
        name: String,
        ktype: KeywordType,
        count: usize,
        handle: LazyHandle,
    ) -> Self {
        KeywordRecord {
            name,
            ktype,
            count,
            payload: OnceCell::new(),
            backing: Some(handle),
        }
    }

    /// Record name, trailing pad trimmed
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared element type
    pub fn ktype(&self) -> KeywordType {
        self.ktype
    }

    /// Declared element count
    pub fn count(&self) -> usize {
        self.count
    }

    /// The `(name, type, count)` header triple
    ///
    /// Always available, even before the payload has been materialised.
    pub fn header(&self) -> (&str, KeywordType, usize) {
        (&self.name, self.ktype, self.count)
    }

    /// True once the payload is held in memory
    pub fn is_materialised(&self) -> bool {
        self.payload.get().is_some()
    }

    /// Force the payload into memory
    ///
    /// Idempotent: the first call performs exactly one seek and one read
    /// against the backing session, repeat calls return the cached payload.
    /// Fails with [Error::SessionClosed] if the session has since closed.
    pub fn materialise(&self) -> Result<&KeywordData> {
        if let Some(data) = self.payload.get() {
            return Ok(data);
        }
        let handle = self.backing.as_ref().ok_or(Error::SessionClosed)?;
        let data = handle.read(self.ktype, self.count)?;
        Ok(self.payload.get_or_init(|| data))
    }

    /// `INTE` elements, or [Error::TypeMismatch]
    pub fn ints(&self) -> Result<&[i32]> {
        match self.materialise()? {
            KeywordData::Int(v) => Ok(v),
            other => Err(self.type_mismatch(KeywordType::Integer, other)),
        }
    }

    /// `REAL` elements, or [Error::TypeMismatch]
    pub fn reals(&self) -> Result<&[f32]> {
        match self.materialise()? {
            KeywordData::Real(v) => Ok(v),
            other => Err(self.type_mismatch(KeywordType::Real, other)),
        }
    }

    /// `DOUB` elements, or [Error::TypeMismatch]
    pub fn doubles(&self) -> Result<&[f64]> {
        match self.materialise()? {
            KeywordData::Double(v) => Ok(v),
            other => Err(self.type_mismatch(KeywordType::Double, other)),
        }
    }

    /// `LOGI` elements, or [Error::TypeMismatch]
    pub fn logicals(&self) -> Result<&[bool]> {
        match self.materialise()? {
            KeywordData::Logical(v) => Ok(v),
            other => Err(self.type_mismatch(KeywordType::Logical, other)),
        }
    }

    /// `CHAR` elements, or [Error::TypeMismatch]
    pub fn chars(&self) -> Result<&[String]> {
        match self.materialise()? {
            KeywordData::Chars(v) => Ok(v),
            other => Err(self.type_mismatch(KeywordType::Char, other)),
        }
    }

    fn type_mismatch(&self, expected: KeywordType, found: &KeywordData) -> Error {
        Error::TypeMismatch {
            name: self.name.clone(),
            expected,
            found: found.ktype(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip_binary(data: KeywordData, order: ByteOrder) -> KeywordData {
        let mut buf = Vec::new();
        write_binary_record(&mut buf, order, "TEST", &data).unwrap();
        let mut cursor = Cursor::new(&buf[24..]);
        KeywordData::read_binary(&mut cursor, order, data.ktype(), data.len()).unwrap()
    }

    #[test]
    fn binary_payloads_round_trip() {
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let cases = [
                KeywordData::Int(vec![4, 11, 12, 15]),
                KeywordData::Real(vec![1.0, -2.5, 0.0]),
                KeywordData::Double(vec![std::f64::consts::PI]),
                KeywordData::Logical(vec![true, false, true]),
                KeywordData::Chars(vec!["PROD".to_string(), "INJ-1".to_string()]),
                KeywordData::Int(vec![]),
                KeywordData::Message,
            ];
            for data in cases {
                assert_eq!(round_trip_binary(data.clone(), order), data);
            }
        }
    }

    #[test]
    fn multi_block_payload_reassembles() {
        let values: Vec<i32> = (0..2500).collect();
        let data = KeywordData::Int(values.clone());

        let mut buf = Vec::new();
        write_binary_record(&mut buf, ByteOrder::BigEndian, "BIG", &data).unwrap();
        // 24 header bytes + 3 blocks of (1000, 1000, 500) elements with frames
        assert_eq!(buf.len(), 24 + 2500 * 4 + 3 * 8);

        let mut cursor = Cursor::new(&buf[24..]);
        let read =
            KeywordData::read_binary(&mut cursor, ByteOrder::BigEndian, KeywordType::Integer, 2500)
                .unwrap();
        assert_eq!(read, KeywordData::Int(values));
    }

    #[test]
    fn formatted_payloads_round_trip() {
        let cases = [
            KeywordData::Int(vec![-3, 0, 7, 1000000]),
            KeywordData::Real(vec![0.0625, -12.5, 0.0]),
            KeywordData::Double(vec![1.0e-10, 2.0]),
            KeywordData::Logical(vec![false, true]),
            KeywordData::Chars(vec!["OP 1".to_string(), String::new()]),
        ];
        for data in cases {
            let mut buf = Vec::new();
            let header_len = write_formatted_record(&mut buf, "TEST", &data).unwrap();
            let text = String::from_utf8(buf).unwrap();
            let mut reader = text[header_len as usize..].as_bytes();
            let (read, _) =
                KeywordData::read_formatted(&mut reader, data.ktype(), data.len()).unwrap();
            assert_eq!(read, data);
        }
    }

    #[test]
    fn formatted_real_layout_is_fortran_style() {
        let mut buf = Vec::new();
        write_formatted_record(
            &mut buf,
            "PORO",
            &KeywordData::Real(vec![0.25, 0.25, 0.25, 0.25, 0.25]),
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), " 'PORO    '           5 'REAL'");
        // four values per line, 17-character fields
        assert_eq!(
            lines.next().unwrap(),
            "  0.250000000E+00  0.250000000E+00  0.250000000E+00  0.250000000E+00"
        );
        assert_eq!(lines.next().unwrap(), "  0.250000000E+00");
    }

    #[test]
    fn formatted_floats_survive_to_the_last_bit() {
        // walk consecutive f32 bit patterns, which differ well below any
        // rounded decimal rendering would show
        let reals: Vec<f32> = (0..200).map(|i| f32::from_bits(0.1f32.to_bits() + i)).collect();
        let doubles: Vec<f64> = (0..200)
            .map(|i| f64::from_bits(0.1f64.to_bits() + i))
            .collect();

        for data in [
            KeywordData::Real(reals),
            KeywordData::Double(doubles),
            KeywordData::Real(vec![f32::MIN_POSITIVE, f32::MAX, -1.0e-30]),
            KeywordData::Double(vec![f64::MIN_POSITIVE, f64::MAX, -1.0e-300]),
        ] {
            let mut buf = Vec::new();
            let header_len = write_formatted_record(&mut buf, "SWEEP", &data).unwrap();
            let text = String::from_utf8(buf).unwrap();
            let mut reader = text[header_len as usize..].as_bytes();
            let (read, _) =
                KeywordData::read_formatted(&mut reader, data.ktype(), data.len()).unwrap();
            assert_eq!(read, data);
        }
    }

    #[test]
    fn logicals_encode_as_minus_one() {
        let mut buf = Vec::new();
        write_binary_record(
            &mut buf,
            ByteOrder::BigEndian,
            "LOGIHEAD",
            &KeywordData::Logical(vec![true, false]),
        )
        .unwrap();
        // one framed block: length 8, true as all-bits-set, false as zero
        assert_eq!(
            &buf[24..],
            &[0, 0, 0, 8, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 8]
        );
    }

    #[test]
    fn typed_access_enforces_element_type() {
        let kw = KeywordRecord::new("ACTNUM", KeywordData::Int(vec![1, 0])).unwrap();
        assert_eq!(kw.ints().unwrap(), &[1, 0]);
        let err = kw.reals().unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: KeywordType::Real,
                found: KeywordType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn construction_validates_field_widths() {
        assert!(matches!(
            KeywordRecord::new("TOOLONGNAME", KeywordData::Message),
            Err(Error::NameTooLong(_))
        ));
        assert!(matches!(
            KeywordRecord::new(
                "WELLS",
                KeywordData::Chars(vec!["NINECHARSX".to_string()])
            ),
            Err(Error::StringTooLong(_))
        ));
    }

    #[test]
    fn empty_keyword_round_trips() {
        let data = round_trip_binary(KeywordData::Real(vec![]), ByteOrder::BigEndian);
        assert_eq!(data, KeywordData::Real(vec![]));
    }
}
