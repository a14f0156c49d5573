//! Pool configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use shoal_core::{EnvId, SpecError};
use shoal_env::StepError;

/// Sizing configuration for an [`EnvPool`](crate::EnvPool).
///
/// The per-environment configuration (player mode, seed) travels in the
/// [`EnvSpec`](shoal_env::EnvSpec); this struct only sizes the pool
/// around it.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of environment instances.
    pub num_envs: usize,
    /// Worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[2, 16]`).
    pub num_threads: Option<usize>,
    /// Outstanding state slots. `None` = `2 * num_envs` (one round in
    /// flight, one round ahead). Must be at least `num_envs` — see the
    /// queue's deadlock contract.
    pub queue_capacity: Option<usize>,
}

impl PoolConfig {
    /// A config for `num_envs` environments with auto-detected sizing.
    pub fn new(num_envs: usize) -> Self {
        Self {
            num_envs,
            num_threads: None,
            queue_capacity: None,
        }
    }

    /// Check all structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Config`] for a zero environment count or a
    /// queue capacity below `num_envs`.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.num_envs == 0 {
            return Err(PoolError::Config {
                reason: "num_envs must be at least 1".to_string(),
            });
        }
        if let Some(capacity) = self.queue_capacity {
            if capacity < self.num_envs {
                return Err(PoolError::Config {
                    reason: format!(
                        "queue_capacity ({capacity}) below num_envs ({}); \
                         a full round could deadlock on allocation",
                        self.num_envs
                    ),
                });
            }
        }
        Ok(())
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_threads(&self) -> usize {
        match self.num_threads {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(2, 16)
            }
        }
    }

    /// Resolve the queue capacity, defaulting to `2 * num_envs`.
    pub fn resolved_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(2 * self.num_envs)
    }
}

/// Errors from pool construction, dispatch, and draining.
#[derive(Clone, Debug, PartialEq)]
pub enum PoolError {
    /// Pool sizing invariant violated.
    Config {
        /// Description of the violation.
        reason: String,
    },
    /// The environment spec failed validation.
    Spec(SpecError),
    /// An inbound action batch does not match the action schema.
    Batch {
        /// Description of the mismatch.
        reason: String,
    },
    /// A dispatched environment id is outside the pool.
    UnknownEnv {
        /// The offending id.
        env_id: EnvId,
    },
    /// A worker's step failed; the pool is closed (fail-fast).
    Step(StepError),
    /// The pool has shut down.
    Closed,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid pool config: {reason}"),
            Self::Spec(e) => write!(f, "invalid env spec: {e}"),
            Self::Batch { reason } => write!(f, "malformed action batch: {reason}"),
            Self::UnknownEnv { env_id } => write!(f, "unknown env id {env_id}"),
            Self::Step(e) => write!(f, "worker step failed: {e}"),
            Self::Closed => write!(f, "pool is closed"),
        }
    }
}

impl Error for PoolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spec(e) => Some(e),
            Self::Step(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpecError> for PoolError {
    fn from(e: SpecError) -> Self {
        Self::Spec(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_envs_rejected() {
        let cfg = PoolConfig::new(0);
        assert!(matches!(cfg.validate(), Err(PoolError::Config { .. })));
    }

    #[test]
    fn capacity_below_num_envs_rejected() {
        let cfg = PoolConfig {
            num_envs: 8,
            num_threads: None,
            queue_capacity: Some(4),
        };
        assert!(matches!(cfg.validate(), Err(PoolError::Config { .. })));
    }

    #[test]
    fn default_capacity_is_two_rounds() {
        let cfg = PoolConfig::new(8);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.resolved_queue_capacity(), 16);
    }

    #[test]
    fn explicit_thread_count_clamped() {
        let mut cfg = PoolConfig::new(1);
        cfg.num_threads = Some(0);
        assert_eq!(cfg.resolved_threads(), 1);
        cfg.num_threads = Some(500);
        assert_eq!(cfg.resolved_threads(), 64);
    }

    #[test]
    fn auto_thread_count_in_range() {
        let cfg = PoolConfig::new(1);
        let threads = cfg.resolved_threads();
        assert!((2..=16).contains(&threads), "auto count {threads} out of [2,16]");
    }
}
