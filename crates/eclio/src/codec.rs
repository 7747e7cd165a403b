//! Low-level byte layout primitives
//!
//! Everything on disk is fixed-width scalars in a caller-supplied byte order,
//! optionally wrapped in Fortran sequential record frames (a 4-byte length
//! field before and after every physical block). The byte order is a property
//! of the whole file and is never guessed here; see [probe_byte_order] for
//! the heuristic.
//!
//! [probe_byte_order]: crate::probe_byte_order

// standard library
use std::io::{Read, Seek, SeekFrom, Write};

// crate modules
use crate::error::{Error, Result};

/// Byte order of every scalar in a file
///
/// Big endian is the conventional default for the binary format, written by
/// simulators on big-endian workstations long after those disappeared.
/// Little-endian files exist and are supported by explicit opt-in at open
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Network order, the format default
    BigEndian,
    /// Explicit opt-in for non-conventional files
    LittleEndian,
}

mod private {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Fixed-width scalars that appear in the on-disk layout
///
/// Sealed to the three widths the format actually uses. Logicals and
/// character data are carried as `i32` and raw 8-byte fields respectively by
/// the layer above.
pub trait WireScalar: private::Sealed + Sized + Copy {
    /// Element width on disk in bytes
    const WIDTH: usize;

    /// Decode one scalar from exactly `WIDTH` bytes
    fn from_bytes(bytes: &[u8], order: ByteOrder) -> Self;

    /// Append the on-disk encoding of one scalar
    fn put_bytes(&self, out: &mut Vec<u8>, order: ByteOrder);
}

macro_rules! impl_wire_scalar {
    ($($t:ty),*) => {$(
        impl WireScalar for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn from_bytes(bytes: &[u8], order: ByteOrder) -> Self {
                let raw: [u8; std::mem::size_of::<$t>()] =
                    bytes.try_into().unwrap_or([0; std::mem::size_of::<$t>()]);
                match order {
                    ByteOrder::BigEndian => <$t>::from_be_bytes(raw),
                    ByteOrder::LittleEndian => <$t>::from_le_bytes(raw),
                }
            }

            fn put_bytes(&self, out: &mut Vec<u8>, order: ByteOrder) {
                match order {
                    ByteOrder::BigEndian => out.extend_from_slice(&self.to_be_bytes()),
                    ByteOrder::LittleEndian => out.extend_from_slice(&self.to_le_bytes()),
                }
            }
        }
    )*};
}

impl_wire_scalar!(i32, f32, f64);

/// Fill `buf` completely or report how far the stream actually went
///
/// All-or-nothing contract: a short stream never hands partial data to the
/// caller.
pub(crate) fn fill_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::Truncated {
                    expected: buf.len(),
                    found: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read one scalar in the given byte order
pub fn read_scalar<T: WireScalar, R: Read>(reader: &mut R, order: ByteOrder) -> Result<T> {
    let mut buf = [0u8; 8];
    fill_exact(reader, &mut buf[..T::WIDTH])?;
    Ok(T::from_bytes(&buf[..T::WIDTH], order))
}

/// Read a contiguous block of `count` scalars
pub fn read_block<T: WireScalar, R: Read>(
    reader: &mut R,
    count: usize,
    order: ByteOrder,
) -> Result<Vec<T>> {
    let mut raw = vec![0u8; count * T::WIDTH];
    fill_exact(reader, &mut raw)?;
    Ok(raw
        .chunks_exact(T::WIDTH)
        .map(|chunk| T::from_bytes(chunk, order))
        .collect())
}

/// Write one scalar in the given byte order
pub fn write_scalar<T: WireScalar, W: Write>(
    writer: &mut W,
    value: T,
    order: ByteOrder,
) -> Result<()> {
    let mut out = Vec::with_capacity(T::WIDTH);
    value.put_bytes(&mut out, order);
    write_all(writer, &out)
}

/// Write a contiguous block of scalars
pub fn write_block<T: WireScalar, W: Write>(
    writer: &mut W,
    values: &[T],
    order: ByteOrder,
) -> Result<()> {
    let mut out = Vec::with_capacity(values.len() * T::WIDTH);
    for value in values {
        value.put_bytes(&mut out, order);
    }
    write_all(writer, &out)
}

/// Read one Fortran-framed physical block into raw bytes
///
/// The leading and trailing length fields must agree exactly, and the length
/// must be non-negative.
pub fn read_framed<R: Read>(reader: &mut R, order: ByteOrder) -> Result<Vec<u8>> {
    let head: i32 = read_scalar(reader, order)?;
    if head < 0 {
        return Err(Error::FrameMismatch { head, tail: head });
    }
    let mut payload = vec![0u8; head as usize];
    fill_exact(reader, &mut payload)?;
    let tail: i32 = read_scalar(reader, order)?;
    if head != tail {
        return Err(Error::FrameMismatch { head, tail });
    }
    Ok(payload)
}

/// Skip one Fortran-framed physical block without reading the payload
///
/// Returns the payload length that was skipped. Used by the index scan, which
/// only ever looks at headers.
pub fn skip_framed<R: Read + Seek>(reader: &mut R, order: ByteOrder) -> Result<usize> {
    let head: i32 = read_scalar(reader, order)?;
    if head < 0 {
        return Err(Error::FrameMismatch { head, tail: head });
    }
    reader.seek(SeekFrom::Current(head as i64))?;
    let tail: i32 = read_scalar(reader, order)?;
    if head != tail {
        return Err(Error::FrameMismatch { head, tail });
    }
    Ok(head as usize)
}

/// Write one Fortran-framed physical block
///
/// Both length fields are emitted automatically, transparently to callers.
pub fn write_framed<W: Write>(writer: &mut W, payload: &[u8], order: ByteOrder) -> Result<()> {
    write_scalar(writer, payload.len() as i32, order)?;
    write_all(writer, payload)?;
    write_scalar(writer, payload.len() as i32, order)
}

/// `write_all` with the short-write failure folded into the crate error
fn write_all<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes).map_err(|_| Error::WriteFailed {
        expected: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalar_round_trip_both_orders() {
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
            let mut buf = Vec::new();
            write_scalar(&mut buf, 42_i32, order).unwrap();
            write_scalar(&mut buf, -1.5_f32, order).unwrap();
            write_scalar(&mut buf, 2.75_f64, order).unwrap();

            let mut cursor = Cursor::new(buf);
            assert_eq!(read_scalar::<i32, _>(&mut cursor, order).unwrap(), 42);
            assert_eq!(read_scalar::<f32, _>(&mut cursor, order).unwrap(), -1.5);
            assert_eq!(read_scalar::<f64, _>(&mut cursor, order).unwrap(), 2.75);
        }
    }

    #[test]
    fn big_endian_layout_is_network_order() {
        let mut buf = Vec::new();
        write_scalar(&mut buf, 1_i32, ByteOrder::BigEndian).unwrap();
        assert_eq!(buf, [0, 0, 0, 1]);
    }

    #[test]
    fn block_read_is_all_or_nothing() {
        let mut buf = Vec::new();
        write_block(&mut buf, &[1_i32, 2, 3], ByteOrder::BigEndian).unwrap();
        buf.truncate(10);

        let mut cursor = Cursor::new(buf);
        let err = read_block::<i32, _>(&mut cursor, 3, ByteOrder::BigEndian).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                expected: 12,
                found: 10
            }
        ));
    }

    #[test]
    fn framed_round_trip() {
        let mut buf = Vec::new();
        write_framed(&mut buf, b"abcdefgh", ByteOrder::BigEndian).unwrap();
        assert_eq!(buf.len(), 8 + 8);

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_framed(&mut cursor, ByteOrder::BigEndian).unwrap(),
            b"abcdefgh"
        );
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let mut buf = Vec::new();
        write_framed(&mut buf, b"abcd", ByteOrder::BigEndian).unwrap();
        let end = buf.len();
        buf[end - 1] = 99;

        let mut cursor = Cursor::new(buf);
        let err = read_framed(&mut cursor, ByteOrder::BigEndian).unwrap_err();
        assert!(matches!(err, Error::FrameMismatch { head: 4, .. }));
    }

    #[test]
    fn skip_framed_reports_payload_length() {
        let mut buf = Vec::new();
        write_framed(&mut buf, &[0u8; 32], ByteOrder::BigEndian).unwrap();
        write_framed(&mut buf, b"next", ByteOrder::BigEndian).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(skip_framed(&mut cursor, ByteOrder::BigEndian).unwrap(), 32);
        assert_eq!(
            read_framed(&mut cursor, ByteOrder::BigEndian).unwrap(),
            b"next"
        );
    }
}
