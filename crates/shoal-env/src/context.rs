//! The context handed to simulation hooks.

use rand_chacha::ChaCha8Rng;

use shoal_core::{EnvId, OrderToken, RecordSpec};
use shoal_queue::{StateBufferQueue, StateSlot};

use crate::sim::SimError;

/// Per-step context passed to [`Simulation`](crate::Simulation) hooks.
///
/// Gives the hook its identity, the step counter, the instance RNG, and
/// the one operation that matters: [`allocate`](Self::allocate), which
/// leases this step's output slot from the queue. The context owns the
/// pending slot until the orchestration layer publishes it after the
/// hook returns.
pub struct EnvContext<'a> {
    pub(crate) queue: &'a StateBufferQueue,
    pub(crate) order: OrderToken,
    pub(crate) env_id: EnvId,
    pub(crate) elapsed_step: u64,
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) slot: &'a mut Option<StateSlot>,
}

impl EnvContext<'_> {
    /// This environment's pool-wide id.
    pub fn env_id(&self) -> EnvId {
        self.env_id
    }

    /// Steps taken this episode, the current one included; 0 during a
    /// reset.
    pub fn elapsed_step(&self) -> u64 {
        self.elapsed_step
    }

    /// The instance RNG, seeded deterministically from the pool seed and
    /// this environment's id.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }

    /// Lease this step's output slot, sized for `player_num` agent rows.
    ///
    /// Blocks under queue backpressure. The slot's `env_id` and
    /// `elapsed_step` fields are filled immediately and `env_id` is
    /// broadcast into `players.env_id` for every agent row; the `done`
    /// flag is filled from [`Simulation::is_done`](crate::Simulation::is_done)
    /// right before publication. The returned writer exposes only
    /// non-reserved fields.
    ///
    /// # Errors
    ///
    /// - [`SimError::DoubleAllocation`] on a second call within one step.
    /// - [`SimError::Allocation`] if the queue rejects the order token or
    ///   is closed.
    pub fn allocate(&mut self, player_num: usize) -> Result<StateWriter<'_>, SimError> {
        if self.slot.is_some() {
            return Err(SimError::DoubleAllocation);
        }
        let mut slot = self.queue.allocate(player_num, self.order)?;

        let env_id = self.env_id.0 as f32;
        if let Some(cell) = slot.field_mut(RecordSpec::STATE_ENV_ID) {
            cell[0] = env_id;
        }
        if let Some(cell) = slot.field_mut(RecordSpec::STATE_ELAPSED_STEP) {
            cell[0] = self.elapsed_step as f32;
        }
        if let Some(ids) = slot.field_mut(RecordSpec::STATE_PLAYERS_ENV_ID) {
            ids.fill(env_id);
        }

        Ok(StateWriter {
            slot: self.slot.insert(slot),
        })
    }

    /// [`allocate`](Self::allocate) for the common single-agent case.
    pub fn allocate_single(&mut self) -> Result<StateWriter<'_>, SimError> {
        self.allocate(1)
    }
}

/// Mutable access to the user fields of a leased state slot.
///
/// Reserved bookkeeping fields are owned by the orchestration layer and
/// are not reachable through the writer.
pub struct StateWriter<'a> {
    slot: &'a mut StateSlot,
}

impl StateWriter<'_> {
    /// Agent rows the slot was sized for.
    pub fn player_num(&self) -> usize {
        self.slot.player_num()
    }

    /// The named user field's buffer, zero-filled at allocation.
    ///
    /// Returns `None` for unknown or reserved field names.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        if RecordSpec::is_reserved(name) {
            return None;
        }
        self.slot.field_mut_by_name(name)
    }

    /// Write a scalar user field.
    ///
    /// Returns `false` if the field is unknown, reserved, or not
    /// single-element.
    pub fn write_scalar(&mut self, name: &str, value: f32) -> bool {
        match self.field_mut(name) {
            Some(buf) if buf.len() == 1 => {
                buf[0] = value;
                true
            }
            _ => false,
        }
    }
}
