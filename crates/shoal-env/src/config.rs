//! Environment configuration and the combined spec handed to [`Env`](crate::Env).

use std::sync::Arc;

use shoal_core::{RecordSpec, ShapeSpec, SpecError};

/// Per-environment configuration shared by every instance in a pool.
#[derive(Clone, Copy, Debug)]
pub struct EnvConfig {
    /// Maximum concurrently active agents per environment. `1` selects
    /// the single-player demultiplexing mode for the instance's lifetime.
    pub max_num_players: usize,
    /// Base RNG seed; each instance derives its own seed from
    /// `seed + env_id`, so a pool re-run with the same base seed
    /// reproduces identical trajectories.
    pub seed: u64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_num_players: 1,
            seed: 0,
        }
    }
}

/// Everything an [`Env`](crate::Env) needs to know about its schemas.
///
/// Build the schemas with [`RecordSpec::action`] and
/// [`RecordSpec::state`] — those builders lay out the bookkeeping
/// fields [`validate`](Self::validate) checks for.
#[derive(Clone, Debug)]
pub struct EnvSpec {
    /// Shared per-environment configuration.
    pub config: EnvConfig,
    /// Ordered action field schema (owner column at index 1).
    pub action_spec: Arc<RecordSpec>,
    /// Ordered state field schema (bookkeeping fields at indices 0..=3).
    pub state_spec: Arc<RecordSpec>,
}

impl EnvSpec {
    /// Build and validate a spec from user-declared fields.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] for invalid user fields or a zero
    /// `max_num_players`.
    pub fn new<'a, A, S>(
        config: EnvConfig,
        action_fields: A,
        state_fields: S,
    ) -> Result<Self, SpecError>
    where
        A: IntoIterator<Item = (&'a str, ShapeSpec)>,
        S: IntoIterator<Item = (&'a str, ShapeSpec)>,
    {
        let spec = Self {
            config,
            action_spec: Arc::new(RecordSpec::action(action_fields)?),
            state_spec: Arc::new(RecordSpec::state(state_fields)?),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the structural invariants the execution core relies on.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::NoPlayers`] for `max_num_players == 0` and
    /// [`SpecError::MalformedSchema`] if either schema is missing its
    /// bookkeeping layout.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.config.max_num_players == 0 {
            return Err(SpecError::NoPlayers);
        }
        check_field(
            &self.action_spec,
            RecordSpec::ACTION_ENV_ID,
            shoal_core::shape::ENV_ID,
            "action",
        )?;
        check_field(
            &self.action_spec,
            RecordSpec::ACTION_PLAYERS_ENV_ID,
            shoal_core::shape::PLAYERS_ENV_ID,
            "action",
        )?;
        check_field(
            &self.state_spec,
            RecordSpec::STATE_DONE,
            shoal_core::shape::DONE,
            "state",
        )?;
        check_field(
            &self.state_spec,
            RecordSpec::STATE_ENV_ID,
            shoal_core::shape::ENV_ID,
            "state",
        )?;
        check_field(
            &self.state_spec,
            RecordSpec::STATE_ELAPSED_STEP,
            shoal_core::shape::ELAPSED_STEP,
            "state",
        )?;
        check_field(
            &self.state_spec,
            RecordSpec::STATE_PLAYERS_ENV_ID,
            shoal_core::shape::PLAYERS_ENV_ID,
            "state",
        )?;
        Ok(())
    }

    /// Whether instances built from this spec demultiplex in
    /// single-player mode.
    pub fn is_single_player(&self) -> bool {
        self.config.max_num_players == 1
    }
}

fn check_field(
    spec: &RecordSpec,
    index: usize,
    expected: &str,
    role: &str,
) -> Result<(), SpecError> {
    match spec.get_index(index) {
        Some((name, _)) if name == expected => Ok(()),
        Some((name, _)) => Err(SpecError::MalformedSchema {
            reason: format!("{role} field {index} is '{name}', expected '{expected}'"),
        }),
        None => Err(SpecError::MalformedSchema {
            reason: format!("{role} schema has no field {index} ('{expected}')"),
        }),
    }
}
