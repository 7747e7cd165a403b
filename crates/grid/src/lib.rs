//! Module for corner-point grid geometry and grid file binding
//!
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod binding;
mod cell;
mod error;
mod grid;

// Inline anything important for a nice public API
#[doc(inline)]
pub use binding::{read_grid, write_grid, write_summary_json};

#[doc(inline)]
pub use cell::Cell;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use grid::{
    CellRange, CoarseGroup, CompareOptions, GridDims, GridGeometry, GroupId, LocalRefinement,
    RefinementId,
};
