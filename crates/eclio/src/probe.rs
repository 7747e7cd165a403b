//! Byte-order heuristic for binary files
//!
//! The byte order is not stored in the stream itself, so when it is unknown
//! the only option is to test which candidate makes the first record header
//! decode sensibly. This lives outside the codec on purpose; the codec never
//! guesses.

// standard library
use std::fs::File;
use std::io::Read;
use std::path::Path;

// crate modules
use crate::codec::{ByteOrder, WireScalar};
use crate::error::{Error, Result};
use crate::keyword::KeywordType;

// ecltools modules
use ecltools_utils::StringExt;

/// Guess the byte order of a binary keyword file
///
/// Checks, under each candidate order, that the first record header frames
/// decode to the fixed 16-byte header length, that the name field is
/// printable and that the type tag is recognised. Returns `None` when
/// neither order fits (not a binary keyword file, or too short).
///
/// ```rust, no_run
/// # use ecltools_eclio::probe_byte_order;
/// let order = probe_byte_order("CASE.EGRID").unwrap();
/// ```
pub fn probe_byte_order<P: AsRef<Path>>(path: P) -> Result<Option<ByteOrder>> {
    let mut file = File::open(path.as_ref()).map_err(|source| Error::Open {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    // header frame + name + count + tag + trailing frame
    let mut head = [0u8; 24];
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..])? {
            0 => return Ok(None),
            n => filled += n,
        }
    }

    for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
        let frame = i32::from_bytes(&head[..4], order);
        let tail = i32::from_bytes(&head[20..24], order);
        if frame != 16 || tail != 16 {
            continue;
        }
        let name = String::from_utf8_lossy(&head[4..12]).to_string();
        if name.is_keyword_field() && KeywordType::from_tag(&head[16..20]).is_some() {
            return Ok(Some(order));
        }
    }
    Ok(None)
}
