//! Reference simulations for the Shoal environment pool.
//!
//! Two small but complete [`Simulation`](shoal_env::Simulation)
//! implementations that double as living documentation of the
//! execution-core contract: allocate exactly once per hook, tolerate
//! empty player sets, and draw all randomness from the context RNG.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod drift;
pub mod relay;

pub use drift::DriftSim;
pub use relay::RelaySim;
