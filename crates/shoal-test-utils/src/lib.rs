//! Test utilities and mock simulations for Shoal development.
//!
//! Provides [`MockSim`] — a call-recording [`Simulation`] with
//! configurable misbehavior for exercising the orchestration layer's
//! fault paths — plus ready-made specs and action batches.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod fixtures;

pub use fixtures::{multi_batch, multi_player_spec, single_batch, single_player_spec, MockSim};

use shoal_env::Simulation;

// Compile-time assertion: the mock must satisfy the pool's bounds.
const _: fn() = || {
    fn assert<T: Simulation>() {}
    assert::<MockSim>();
};
