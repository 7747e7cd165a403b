//! `ecltools` is a semi-modular toolkit of libraries for reservoir
//! simulation output files
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of toolkit crates.
#[doc(inline)]
pub use ecltools_utils as utils;

#[cfg(feature = "eclio")]
#[cfg_attr(docsrs, doc(cfg(feature = "eclio")))]
#[doc(inline)]
pub use ecltools_eclio as eclio;

#[cfg(feature = "grid")]
#[cfg_attr(docsrs, doc(cfg(feature = "grid")))]
#[doc(inline)]
pub use ecltools_grid as grid;
