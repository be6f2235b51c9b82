//! # rx-frame
//!
//! Lazy columnar frames over per-event data.
//!
//! A [`Frame`] is an immutable handle to a chain of column definitions and
//! filters on top of a [`ColumnSet`]. Building a frame never touches event
//! data; reducers ([`Frame::count`], [`Frame::sum`], [`Frame::take_f64`],
//! [`Frame::for_each`]) evaluate the chain in parallel over fixed-size chunks.
//!
//! ## Example
//!
//! ```
//! use rx_frame::{Column, ColumnSet, Frame};
//!
//! let cols = ColumnSet::new()
//!     .with_column("pt", Column::from(vec![10.0, 25.0, 40.0]))
//!     .unwrap()
//!     .with_column("w", Column::from(vec![1.0, 0.5, 2.0]))
//!     .unwrap();
//!
//! let frame = Frame::new(cols)
//!     .define_f64("pt2", &["pt"], |r| r.f64(0) * r.f64(0))
//!     .unwrap()
//!     .filter_expr("pt > 20")
//!     .unwrap();
//!
//! assert_eq!(frame.count(), 2);
//! assert_eq!(frame.sum("w").unwrap(), 2.5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod error;
pub mod expr;
pub mod frame;

pub use column::{Column, ColumnKind, ColumnSet, JaggedCol};
pub use error::{FrameError, Result};
pub use expr::CompiledExpr;
pub use frame::{DEFAULT_CHUNK_SIZE, Frame, Row, ScalarType};
