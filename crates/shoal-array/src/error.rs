//! Error type for array construction and row access.

use std::error::Error;
use std::fmt;

/// Errors from [`Array`](crate::Array) and [`Record`](crate::Record)
/// construction and row access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// Backing data length does not match the product of the shape.
    ShapeDataMismatch {
        /// Elements implied by the shape.
        expected: usize,
        /// Elements actually supplied.
        got: usize,
    },
    /// A row operation was applied to a rank-0 array.
    RankZero,
    /// A row range exceeded the array's leading dimension.
    RowRangeOutOfBounds {
        /// Start of the requested range.
        start: usize,
        /// End (exclusive) of the requested range.
        end: usize,
        /// Rows available.
        rows: usize,
    },
    /// A single row index exceeded the array's leading dimension.
    RowOutOfBounds {
        /// The requested row.
        index: usize,
        /// Rows available.
        rows: usize,
    },
    /// A record was assembled with the wrong number of field arrays.
    FieldCountMismatch {
        /// Arrays supplied.
        got: usize,
        /// Fields declared by the schema.
        expected: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeDataMismatch { expected, got } => {
                write!(f, "shape implies {expected} elements, data has {got}")
            }
            Self::RankZero => write!(f, "row access on a rank-0 array"),
            Self::RowRangeOutOfBounds { start, end, rows } => {
                write!(f, "row range [{start}, {end}) out of bounds ({rows} rows)")
            }
            Self::RowOutOfBounds { index, rows } => {
                write!(f, "row {index} out of bounds ({rows} rows)")
            }
            Self::FieldCountMismatch { got, expected } => {
                write!(f, "record has {got} arrays, schema declares {expected} fields")
            }
        }
    }
}

impl Error for ArrayError {}
