//! The [`Env`] lifecycle orchestrator.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use shoal_core::{EnvId, OrderToken, RecordSpec};
use shoal_queue::{StateBufferQueue, StateSlot};

use crate::action::{ActionBatch, ActionView};
use crate::config::EnvSpec;
use crate::context::EnvContext;
use crate::demux;
use crate::error::StepError;
use crate::sim::Simulation;

/// Which demultiplexing algorithm an instance runs, fixed at
/// construction from `max_num_players`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemuxMode {
    /// Exactly one agent per environment; the environment's batch index
    /// is its agent row.
    Single,
    /// Variable agent count; rows are collected from the owner column.
    Multi,
}

struct BoundAction {
    batch: Arc<ActionBatch>,
    env_index: usize,
}

/// One environment instance: a [`Simulation`] plus the lifecycle state
/// that drives it through repeated reset/step cycles against a shared
/// [`StateBufferQueue`].
///
/// The driver calls [`set_action`](Self::set_action) to bind the
/// current shared batch, then [`env_step`](Self::env_step) once per
/// step. The instance never mutates the batch and holds no locks; the
/// queue's allocation protocol is the only synchronization point.
pub struct Env<S: Simulation> {
    env_id: EnvId,
    spec: EnvSpec,
    mode: DemuxMode,
    /// Cached per-field player-indexed flags, in action schema order.
    player_fields: Vec<bool>,
    /// `None` until the first reset.
    elapsed_step: Option<u64>,
    rng: ChaCha8Rng,
    bound: Option<BoundAction>,
    /// Slot leased by the current step's hook, awaiting publication.
    pending: Option<StateSlot>,
    sim: S,
}

impl<S: Simulation> Env<S> {
    /// Create an instance for `env_id` running `sim`.
    ///
    /// The instance RNG is seeded from `spec.config.seed + env_id`, so a
    /// pool re-run with the same base seed reproduces identical
    /// trajectories.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`](shoal_core::SpecError) if the spec fails
    /// validation.
    pub fn new(spec: EnvSpec, env_id: EnvId, sim: S) -> Result<Self, shoal_core::SpecError> {
        spec.validate()?;
        let seed = spec.config.seed.wrapping_add(u64::from(env_id.0));
        let mode = if spec.is_single_player() {
            DemuxMode::Single
        } else {
            DemuxMode::Multi
        };
        let player_fields = spec
            .action_spec
            .iter()
            .map(|(_, shape)| shape.is_player_indexed())
            .collect();
        Ok(Self {
            env_id,
            spec,
            mode,
            player_fields,
            elapsed_step: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            bound: None,
            pending: None,
            sim,
        })
    }

    /// This instance's pool-wide id.
    pub fn env_id(&self) -> EnvId {
        self.env_id
    }

    /// The demultiplexing mode fixed at construction.
    pub fn mode(&self) -> DemuxMode {
        self.mode
    }

    /// Steps taken this episode; `None` before the first reset.
    pub fn elapsed_step(&self) -> Option<u64> {
        self.elapsed_step
    }

    /// The spec this instance was built from.
    pub fn spec(&self) -> &EnvSpec {
        &self.spec
    }

    /// The wrapped simulation.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Mutable access to the wrapped simulation.
    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Bind the shared action batch and this environment's row index
    /// within it. Must precede every non-reset step; the binding stays
    /// valid until replaced.
    pub fn set_action(&mut self, batch: Arc<ActionBatch>, env_index: usize) {
        self.bound = Some(BoundAction { batch, env_index });
    }

    /// Run one step: reset the simulation or demultiplex-and-step it,
    /// then publish the state it allocated at `order`.
    ///
    /// On any error the leased slot (if any) is aborted and nothing is
    /// published.
    ///
    /// # Errors
    ///
    /// See [`StepError`]; all variants are fail-fast.
    pub fn env_step(
        &mut self,
        queue: &StateBufferQueue,
        order: OrderToken,
        reset: bool,
    ) -> Result<(), StepError> {
        let result = self.step_inner(queue, order, reset);
        if result.is_err() {
            // Abort any slot leased before the failure so the queue's
            // capacity is released.
            self.pending = None;
        }
        result
    }

    fn step_inner(
        &mut self,
        queue: &StateBufferQueue,
        order: OrderToken,
        reset: bool,
    ) -> Result<(), StepError> {
        let elapsed = if reset {
            0
        } else {
            match self.elapsed_step {
                Some(n) => n + 1,
                None => return Err(StepError::NotReset),
            }
        };
        self.elapsed_step = Some(elapsed);

        if reset {
            let mut ctx = EnvContext {
                queue,
                order,
                env_id: self.env_id,
                elapsed_step: elapsed,
                rng: &mut self.rng,
                slot: &mut self.pending,
            };
            self.sim.reset(&mut ctx).map_err(StepError::Sim)?;
        } else {
            let action = self.parse_action()?;
            let mut ctx = EnvContext {
                queue,
                order,
                env_id: self.env_id,
                elapsed_step: elapsed,
                rng: &mut self.rng,
                slot: &mut self.pending,
            };
            self.sim.step(&mut ctx, &action).map_err(StepError::Sim)?;
        }

        self.finalize()
    }

    /// Demultiplex this environment's view of the bound batch.
    fn parse_action(&self) -> Result<ActionView, StepError> {
        let bound = self.bound.as_ref().ok_or(StepError::NoActionBound)?;
        let raw = match self.mode {
            DemuxMode::Single => demux::demux_single(
                bound.batch.arrays(),
                bound.env_index,
                &self.player_fields,
            )?,
            DemuxMode::Multi => demux::demux_multi(
                bound.batch.arrays(),
                self.env_id,
                bound.env_index,
                &self.player_fields,
            )?,
        };
        Ok(ActionView::new(
            Arc::clone(&self.spec.action_spec),
            raw.arrays,
            raw.player_num,
        ))
    }

    /// Publish the slot the hook leased; a step that never allocated is
    /// a hard fault.
    fn finalize(&mut self) -> Result<(), StepError> {
        let mut slot = self.pending.take().ok_or(StepError::MissingAllocation {
            env_id: self.env_id,
        })?;
        if let Some(cell) = slot.field_mut(RecordSpec::STATE_DONE) {
            cell[0] = if self.sim.is_done() { 1.0 } else { 0.0 };
        }
        slot.publish();
        Ok(())
    }
}
