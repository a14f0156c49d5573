//! The [`Simulation`] capability trait and its error type.

use std::error::Error;
use std::fmt;

use shoal_core::QueueError;

use crate::action::ActionView;
use crate::context::EnvContext;

/// Errors from simulation-specific `reset`/`step` code.
///
/// The context's allocation failures surface here too, so hooks can
/// propagate every failure with `?`.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// The simulation hook failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The demultiplexed action view is unusable for this simulation.
    InvalidAction {
        /// Description of what is wrong with the action.
        reason: String,
    },
    /// The state buffer queue rejected the slot allocation.
    Allocation(QueueError),
    /// The hook allocated a second state slot within one step.
    DoubleAllocation,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::InvalidAction { reason } => write!(f, "invalid action: {reason}"),
            Self::Allocation(e) => write!(f, "state allocation failed: {e}"),
            Self::DoubleAllocation => write!(f, "state slot allocated twice in one step"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Allocation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<QueueError> for SimError {
    fn from(e: QueueError) -> Self {
        Self::Allocation(e)
    }
}

/// The capability contract a simulation supplies to its [`Env`](crate::Env).
///
/// All three methods are required — there are no default bodies. The
/// original design surfaced a missing override as a runtime fault; here
/// the compiler enforces the contract instead.
///
/// # Contract
///
/// - `reset` and `step` must call
///   [`EnvContext::allocate`](crate::EnvContext::allocate) (or
///   [`allocate_single`](crate::EnvContext::allocate_single)) exactly
///   once and fill the returned writer's fields. A step that returns
///   without allocating is a hard fault in the orchestration layer.
/// - `step` must tolerate an action view with zero player rows: a
///   multi-player environment can have no active agents on a given step.
/// - `is_done` must be side-effect free; it is queried after each hook
///   to fill the published record's `done` flag.
/// - Randomness must come from [`EnvContext::rng`](crate::EnvContext::rng)
///   so trajectories replay deterministically for a fixed seed.
pub trait Simulation: Send + 'static {
    /// Begin a new episode and allocate+fill the initial state.
    fn reset(&mut self, ctx: &mut EnvContext<'_>) -> Result<(), SimError>;

    /// Advance one step under `action` and allocate+fill the resulting
    /// state.
    fn step(&mut self, ctx: &mut EnvContext<'_>, action: &ActionView) -> Result<(), SimError>;

    /// Whether the current episode has terminated.
    fn is_done(&self) -> bool;
}
