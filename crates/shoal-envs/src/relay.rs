//! A multi-player roster game.
//!
//! Every active player votes each step; a vote below 0.5 retires the
//! player at the end of the step. The episode ends when the roster is
//! empty or the horizon runs out. The active roster shrinks over time,
//! so a pool of relay sims exercises variable player counts — including
//! steps where an environment has no active players at all.

use shoal_core::ShapeSpec;
use shoal_env::{ActionView, EnvConfig, EnvContext, EnvSpec, SimError, Simulation};

/// A roster of up to `max_players` players that retire by voting.
///
/// Action fields: `vote [-1]` (one scalar row per active player, in
/// roster order). State fields: `obs [-1, 2]` = player slot and
/// remaining roster size per active player; `reward [-1]` = 1.0 for a
/// player who stays, 0.0 for one who retires.
#[derive(Debug)]
pub struct RelaySim {
    max_players: usize,
    horizon: u64,
    /// `active[slot]` — whether the player in `slot` is still playing.
    active: Vec<bool>,
    done: bool,
}

impl RelaySim {
    /// Create a sim with `max_players` roster slots and the given
    /// horizon.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `max_players` or `horizon` is zero.
    pub fn new(max_players: usize, horizon: u64) -> Result<Self, String> {
        if max_players == 0 {
            return Err("max_players must be at least 1".to_string());
        }
        if horizon == 0 {
            return Err("horizon must be at least 1".to_string());
        }
        Ok(Self {
            max_players,
            horizon,
            active: vec![false; max_players],
            done: false,
        })
    }

    /// The spec a pool of relay sims runs under.
    pub fn spec(seed: u64, max_players: usize) -> EnvSpec {
        EnvSpec::new(
            EnvConfig {
                max_num_players: max_players,
                seed,
            },
            [("vote", ShapeSpec::per_player(&[]))],
            [
                ("obs", ShapeSpec::per_player(&[2])),
                ("reward", ShapeSpec::per_player(&[])),
            ],
        )
        .expect("relay schema is valid")
    }

    /// Roster slots still playing.
    pub fn active_players(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Slot indices of active players, in roster order.
    fn active_slots(&self) -> Vec<usize> {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Allocate for the given roster rows and fill `obs`/`reward`.
    fn write_state(
        &self,
        ctx: &mut EnvContext<'_>,
        slots: &[usize],
        rewards: &[f32],
    ) -> Result<(), SimError> {
        let remaining = self.active_players() as f32;
        let mut writer = ctx.allocate(slots.len())?;
        if let Some(obs) = writer.field_mut("obs") {
            for (row, &slot) in slots.iter().enumerate() {
                obs[row * 2] = slot as f32;
                obs[row * 2 + 1] = remaining;
            }
        }
        if let Some(out) = writer.field_mut("reward") {
            out.copy_from_slice(rewards);
        }
        Ok(())
    }
}

impl Simulation for RelaySim {
    fn reset(&mut self, ctx: &mut EnvContext<'_>) -> Result<(), SimError> {
        self.active.fill(true);
        self.done = false;
        let slots = self.active_slots();
        let rewards = vec![0.0; slots.len()];
        self.write_state(ctx, &slots, &rewards)
    }

    fn step(&mut self, ctx: &mut EnvContext<'_>, action: &ActionView) -> Result<(), SimError> {
        let votes = action.get("vote").ok_or_else(|| SimError::InvalidAction {
            reason: "missing 'vote' field".to_string(),
        })?;
        let slots = self.active_slots();
        if votes.len() != slots.len() {
            return Err(SimError::InvalidAction {
                reason: format!(
                    "{} votes for {} active players",
                    votes.len(),
                    slots.len()
                ),
            });
        }

        // A vote below 0.5 retires the player at the end of the step.
        let mut rewards = Vec::with_capacity(slots.len());
        for (&slot, &vote) in slots.iter().zip(votes.as_slice()) {
            let stays = vote >= 0.5;
            if !stays {
                self.active[slot] = false;
            }
            rewards.push(if stays { 1.0 } else { 0.0 });
        }

        self.done = self.active_players() == 0 || ctx.elapsed_step() >= self.horizon;
        self.write_state(ctx, &slots, &rewards)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_config() {
        assert!(RelaySim::new(0, 10).is_err());
        assert!(RelaySim::new(2, 0).is_err());
        assert!(RelaySim::new(2, 10).is_ok());
    }

    #[test]
    fn roster_starts_empty_until_reset() {
        let sim = RelaySim::new(3, 10).unwrap();
        assert_eq!(sim.active_players(), 0);
        assert!(!sim.is_done());
    }

    #[test]
    fn spec_is_multi_player() {
        let spec = RelaySim::spec(0, 4);
        assert!(!spec.is_single_player());
        assert!(spec.state_spec.get("obs").unwrap().is_player_indexed());
    }
}
