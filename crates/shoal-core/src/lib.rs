//! Core types for the Shoal environment pool.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers, field shape declarations, record schemas, and error
//! types shared by the rest of the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod shape;

pub use error::{DemuxError, QueueError, SpecError};
pub use id::{EnvId, OrderToken};
pub use shape::{RecordSpec, ShapeSpec, PLAYER_DIM};
