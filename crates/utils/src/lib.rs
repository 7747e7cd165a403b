//! Common utility for extended `std` types
//!
//! These are left public for convenience.
//!
//! For example, padding a keyword name to its fixed 8-character field or
//! writing a number in the Fortran list formats is useful in both the file
//! layer and the grid layer.

// Alias for the format! macro
pub use std::format as f;

// Modules
mod string_ext;
mod value_ext;

// Flatten
pub use string_ext::StringExt;
pub use value_ext::ValueExt;
