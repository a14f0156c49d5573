//! Step orchestration errors.

use std::error::Error;
use std::fmt;

use shoal_core::{DemuxError, EnvId};

use crate::sim::SimError;

/// Errors from one [`Env::env_step`](crate::Env::env_step) call.
///
/// Everything here is fail-fast: a step that errors publishes nothing,
/// and the contract-violation variants (`NotReset`, `NoActionBound`,
/// `MissingAllocation`) indicate driver or simulation defects, not
/// recoverable runtime conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A non-reset step was requested before the first reset.
    NotReset,
    /// A non-reset step was requested with no action batch bound.
    NoActionBound,
    /// Demultiplexing the environment's actions from the batch failed.
    Demux(DemuxError),
    /// The simulation hook failed (includes allocation failures raised
    /// through the context).
    Sim(SimError),
    /// The simulation hook returned without allocating a state slot, so
    /// the step has no state to publish.
    MissingAllocation {
        /// The offending environment.
        env_id: EnvId,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReset => write!(f, "step requested before the first reset"),
            Self::NoActionBound => write!(f, "step requested with no action batch bound"),
            Self::Demux(e) => write!(f, "action demux failed: {e}"),
            Self::Sim(e) => write!(f, "simulation failed: {e}"),
            Self::MissingAllocation { env_id } => {
                write!(f, "env {env_id}: step finished without allocating a state slot")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Demux(e) => Some(e),
            Self::Sim(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DemuxError> for StepError {
    fn from(e: DemuxError) -> Self {
        Self::Demux(e)
    }
}

impl From<SimError> for StepError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}
