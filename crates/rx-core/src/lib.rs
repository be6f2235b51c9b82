//! # rx-core
//!
//! Shared building blocks for rarexsec: the error type every crate reports
//! through, and the closed tag sets that describe where a sample comes from
//! (`Source`, `Slice`, `Origin`), how it is normalised (`Exposure`) and which
//! physics category an event falls into (`Channel`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Channel, Exposure, Origin, Slice, Source};
