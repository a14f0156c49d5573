//! Shoal: a vectorized reinforcement-learning environment pool.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Shoal sub-crates. For most users, adding `shoal` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use shoal::prelude::*;
//! use shoal::envs::DriftSim;
//!
//! // Four drift environments stepped by two worker threads.
//! let config = PoolConfig {
//!     num_envs: 4,
//!     num_threads: Some(2),
//!     queue_capacity: None,
//! };
//! let pool = EnvPool::new(DriftSim::spec(42), config, |_| {
//!     DriftSim::builder().build().unwrap()
//! })
//! .unwrap();
//!
//! // Reset everything and drain the initial states, in order.
//! pool.reset_all().unwrap();
//! for (i, state) in pool.recv_batch(4).unwrap().iter().enumerate() {
//!     assert_eq!(state.record.get("env_id").unwrap().scalar(), i as f32);
//!     assert_eq!(state.record.get("elapsed_step").unwrap().scalar(), 0.0);
//! }
//!
//! // One batched step: env ids, per-player owner column, pushes.
//! let ids: Vec<f32> = (0..4).map(|i| i as f32).collect();
//! pool.send(vec![
//!     Array::from_vec(&[4], ids.clone()).unwrap(),
//!     Array::from_vec(&[4], ids).unwrap(),
//!     Array::from_vec(&[4], vec![0.5; 4]).unwrap(),
//! ])
//! .unwrap();
//! let states = pool.recv_batch(4).unwrap();
//! assert_eq!(
//!     states[0].record.get("elapsed_step").unwrap().scalar(),
//!     1.0
//! );
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `shoal-core` | IDs, shapes, record schemas, error types |
//! | [`array`] | `shoal-array` | `Array` views and named `Record`s |
//! | [`queue`] | `shoal-queue` | The ordered state buffer queue |
//! | [`env`] | `shoal-env` | The `Simulation` trait and `Env` core |
//! | [`pool`] | `shoal-pool` | The worker-thread pool |
//! | [`envs`] | `shoal-envs` | Reference simulations |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, schemas, and error enums (`shoal-core`).
pub use shoal_core as types;

/// Array views and named records (`shoal-array`).
pub use shoal_array as array;

/// The bounded order-preserving state buffer queue (`shoal-queue`).
pub use shoal_queue as queue;

/// The per-environment execution core (`shoal-env`).
///
/// The [`env::Simulation`] trait is the main extension point for
/// user-defined simulation logic.
pub use shoal_env as env;

/// The worker-thread pool driving batched environments (`shoal-pool`).
pub use shoal_pool as pool;

/// Reference simulation implementations (`shoal-envs`).
///
/// Includes [`envs::DriftSim`] (single-player) and [`envs::RelaySim`]
/// (multi-player).
pub use shoal_envs as envs;

/// Common imports for typical Shoal usage.
///
/// ```rust
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    // Core identifiers and schemas
    pub use shoal_core::{EnvId, OrderToken, RecordSpec, ShapeSpec};

    // Errors
    pub use shoal_core::{DemuxError, QueueError, SpecError};

    // Storage
    pub use shoal_array::{Array, Record};

    // Queue
    pub use shoal_queue::{PublishedState, StateBufferQueue, StateSlot};

    // Execution core
    pub use shoal_env::{
        ActionBatch, ActionView, Env, EnvConfig, EnvContext, EnvSpec, SimError, Simulation,
        StateWriter, StepError,
    };

    // Pool
    pub use shoal_pool::{EnvPool, MetricsSnapshot, PoolConfig, PoolError};
}
