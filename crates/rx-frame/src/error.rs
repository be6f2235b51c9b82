//! Error type for frame construction and evaluation.

use crate::column::ColumnKind;
use thiserror::Error;

/// Errors raised while declaring or reducing a frame.
///
/// All of these surface when the frame graph is built or a reducer is
/// requested, never from inside the per-event loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A referenced column does not exist.
    #[error("missing column: '{0}'")]
    MissingColumn(String),

    /// A column exists but has the wrong shape.
    #[error("column '{name}' is {found:?}, expected {expected:?}")]
    KindMismatch {
        /// Column name.
        name: String,
        /// Shape required by the caller.
        expected: ColumnKind,
        /// Shape found in the frame.
        found: ColumnKind,
    },

    /// A column with this name is already present.
    #[error("column already defined: '{0}'")]
    DuplicateColumn(String),

    /// A column's length disagrees with the rest of the set.
    #[error("column '{name}' has {found} entries, expected {expected}")]
    LengthMismatch {
        /// Column name.
        name: String,
        /// Entries in the column set.
        expected: usize,
        /// Entries in the offending column.
        found: usize,
    },

    /// Column sets cannot be concatenated.
    #[error("incompatible column sets: {0}")]
    Incompatible(String),

    /// Expression parse error.
    #[error("expression error: {0}")]
    Expression(String),
}

/// Result alias for frame operations.
pub type Result<T> = std::result::Result<T, FrameError>;
