//! Result and Error types for ecltools-grid

/// Type alias for `Result<T, grid::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `ecltools-grid` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failure in the underlying keyword file layer
    #[error("keyword file error")]
    File(#[from] ecltools_eclio::Error),

    /// Failure to serialise a summary to JSON
    #[error("failed serde JSON operation")]
    JSONError(#[from] serde_json::Error),

    /// Cell or index outside the grid
    #[error("index {index} out of range (limit {limit})")]
    IndexOutOfRange { index: usize, limit: usize },

    /// Geometry array length disagrees with the declared dimensions
    #[error("inconsistent \"{keyword}\" length (expected {expected}, found {found})")]
    InconsistentDimensions {
        keyword: String,
        expected: usize,
        found: usize,
    },

    /// Refinement parent range intersects a sibling refinement
    #[error("refinement parent range overlaps existing refinement {existing}")]
    OverlappingRefinement { existing: usize },

    /// Refinement parent range exceeds the parent grid
    #[error("refinement parent range exceeds grid dimensions")]
    OutOfBounds,

    /// Cell already belongs to another coarse group
    #[error("cell {cell} already belongs to coarse group {group}")]
    CellAlreadyGrouped { cell: usize, group: usize },
}
