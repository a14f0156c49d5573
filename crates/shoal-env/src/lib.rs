//! Per-environment execution core.
//!
//! One [`Env`] owns one simulation instance's lifecycle across repeated
//! reset/step cycles. Each step it slices the environment's own actions
//! out of the shared batched action record, runs the simulation hook,
//! and publishes the resulting state into the shared
//! [`StateBufferQueue`](shoal_queue::StateBufferQueue) at the step's
//! order token. Simulation logic plugs in through the [`Simulation`]
//! trait; the orchestration layer never locks in the common path — all
//! coordination lives in the queue's allocation protocol.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod config;
pub mod context;
mod demux;
pub mod env;
pub mod error;
pub mod sim;

pub use action::{ActionBatch, ActionView};
pub use config::{EnvConfig, EnvSpec};
pub use context::{EnvContext, StateWriter};
pub use env::{DemuxMode, Env};
pub use error::StepError;
pub use sim::{SimError, Simulation};
