//! Module for keyword-record simulation file I/O
//!
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
pub mod codec;
mod error;
mod file;
mod index;
mod keyword;
mod parsers;
mod probe;

// Inline anything important for a nice public API
#[doc(inline)]
pub use codec::ByteOrder;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use file::{EclFile, FileFormat, OpenMode};

#[doc(inline)]
pub use index::{FileIndex, IndexEntry, STEP_SENTINEL};

#[doc(inline)]
pub use keyword::{
    KeywordData, KeywordRecord, KeywordType, CHAR_BLOCK_LIMIT, NUMERIC_BLOCK_LIMIT,
};

#[doc(inline)]
pub use probe::probe_byte_order;
