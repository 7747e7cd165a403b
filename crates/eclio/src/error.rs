//! Result and Error types for ecltools-eclio

use crate::keyword::KeywordType;

/// Type alias for `Result<T, eclio::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `ecltools-eclio` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying file I/O error
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    /// Failure to open the file at all
    #[error("could not open \"{path}\"")]
    Open {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Stream ended before the requested bytes were available
    #[error("truncated stream (expected {expected} bytes, found {found})")]
    Truncated { expected: usize, found: usize },

    /// Short or failed write to the output stream
    #[error("failed to write {expected} bytes to output stream")]
    WriteFailed { expected: usize },

    /// Leading and trailing Fortran record frames disagree
    #[error("fortran frame mismatch (head {head}, tail {tail})")]
    FrameMismatch { head: i32, tail: i32 },

    /// A record header could not be interpreted
    #[error("corrupt record header at byte {offset}: {reason}")]
    CorruptHeader { offset: u64, reason: String },

    /// No such keyword occurrence in the file index
    #[error("keyword \"{name}\" occurrence {occurrence} not found")]
    NotFound { name: String, occurrence: usize },

    /// Typed access through the wrong element type
    #[error("keyword \"{name}\" holds {found} elements, not {expected}")]
    TypeMismatch {
        name: String,
        expected: KeywordType,
        found: KeywordType,
    },

    /// Lazy payload requested after the backing session was closed
    #[error("backing file session closed before the payload was materialised")]
    SessionClosed,

    /// Declared element count disagrees with the payload length
    #[error("keyword \"{name}\" declares {declared} elements but holds {actual}")]
    SizeMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    /// Read or write attempted on a closed session
    #[error("operation on a closed file session")]
    UseAfterClose,

    /// Write attempted on a session opened read-only
    #[error("file session is not open for writing")]
    ReadOnlySession,

    /// Keyword names are limited to the 8-character header field
    #[error("keyword name \"{0}\" exceeds 8 characters")]
    NameTooLong(String),

    /// Character elements are limited to 8 characters each
    #[error("string element \"{0}\" exceeds 8 characters")]
    StringTooLong(String),

    /// Formatted-mode text failed to parse
    #[error("formatted parser failed: {0}")]
    ParseError(String),
}
