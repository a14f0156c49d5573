//! Shared error types, organized by subsystem: schema validation,
//! action demultiplexing, and the state buffer queue.

use std::error::Error;
use std::fmt;

use crate::id::OrderToken;

/// Errors from record schema construction and validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecError {
    /// A field was declared with an empty name.
    EmptyName,
    /// A field name was declared more than once.
    DuplicateField {
        /// The offending field name.
        name: String,
    },
    /// A user field used a reserved bookkeeping name.
    ReservedField {
        /// The offending field name.
        name: String,
    },
    /// A shape had a non-positive dimension or a misplaced −1 sentinel.
    InvalidShape {
        /// The offending dimensions as declared.
        dims: Vec<i64>,
    },
    /// `max_num_players` was zero.
    NoPlayers,
    /// A schema is missing the bookkeeping layout its role requires.
    MalformedSchema {
        /// Description of the layout violation.
        reason: String,
    },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "field name is empty"),
            Self::DuplicateField { name } => write!(f, "duplicate field '{name}'"),
            Self::ReservedField { name } => {
                write!(f, "field name '{name}' is reserved for bookkeeping")
            }
            Self::InvalidShape { dims } => {
                write!(f, "invalid shape {dims:?}: -1 is only valid as the leading dimension and all other dimensions must be >= 1")
            }
            Self::NoPlayers => write!(f, "max_num_players must be at least 1"),
            Self::MalformedSchema { reason } => write!(f, "malformed schema: {reason}"),
        }
    }
}

impl Error for SpecError {}

/// Errors from demultiplexing one environment's actions out of a batch.
///
/// These indicate a malformed batch or a driver-side indexing defect and
/// are never masked: proceeding would corrupt agent attribution.
#[derive(Clone, Debug, PartialEq)]
pub enum DemuxError {
    /// The batch carries a different number of field arrays than the
    /// action schema declares.
    FieldCountMismatch {
        /// Arrays present in the batch.
        got: usize,
        /// Fields declared by the schema.
        expected: usize,
    },
    /// Multi-player mode requires the owner column at field index 1.
    MissingOwnerColumn,
    /// The environment's batch row index exceeds the batch's row count.
    EnvIndexOutOfRange {
        /// The requested row index.
        index: usize,
        /// Rows available in the batch.
        rows: usize,
    },
    /// An owner-column entry is not a non-negative integer.
    MalformedOwnerId {
        /// Row position of the offending entry.
        row: usize,
        /// The raw value found there.
        value: f32,
    },
}

impl fmt::Display for DemuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCountMismatch { got, expected } => {
                write!(f, "action batch has {got} field arrays, schema declares {expected}")
            }
            Self::MissingOwnerColumn => {
                write!(f, "multi-player demux requires the owner column at action field 1")
            }
            Self::EnvIndexOutOfRange { index, rows } => {
                write!(f, "env batch index {index} out of range ({rows} rows)")
            }
            Self::MalformedOwnerId { row, value } => {
                write!(f, "owner column row {row} holds {value}, expected a non-negative integer")
            }
        }
    }
}

impl Error for DemuxError {}

/// Errors from the state buffer queue's allocation/publication protocol.
///
/// Backpressure is *not* represented here: a saturated queue blocks the
/// allocating caller rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been closed; no further slots will be issued or
    /// published.
    Closed,
    /// The order token is below the consumer cursor.
    StaleOrder {
        /// The rejected token.
        order: OrderToken,
        /// The next token the consumer will accept.
        next: OrderToken,
    },
    /// The order token is already held by an outstanding slot.
    DuplicateOrder {
        /// The rejected token.
        order: OrderToken,
    },
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "state buffer queue is closed"),
            Self::StaleOrder { order, next } => {
                write!(f, "order token {order} is stale (consumer cursor at {next})")
            }
            Self::DuplicateOrder { order } => {
                write!(f, "order token {order} is already outstanding")
            }
        }
    }
}

impl Error for QueueError {}
