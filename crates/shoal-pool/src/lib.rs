//! Worker-thread pool driving batched Shoal environments.
//!
//! [`EnvPool`] owns N [`Env`](shoal_env::Env) instances, a shared
//! [`StateBufferQueue`](shoal_queue::StateBufferQueue), and a pool of
//! worker threads fed over a crossbeam channel. The driver sends one
//! batched action record per round and receives completed state records
//! in order-token order, regardless of which environment finished
//! computing first.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod pool;

pub use config::{PoolConfig, PoolError};
pub use metrics::{MetricsSnapshot, PoolMetrics};
pub use pool::EnvPool;

pub use shoal_queue::PublishedState;
