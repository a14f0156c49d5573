//! Reusable simulation and batch fixtures.

use rand::RngExt;

use shoal_array::Array;
use shoal_core::ShapeSpec;
use shoal_env::{ActionBatch, ActionView, EnvConfig, EnvContext, EnvSpec, SimError, Simulation};

/// A call-recording simulation with configurable misbehavior.
///
/// The defaults model a well-behaved single-agent simulation: every
/// hook draws once from the context RNG, allocates a slot sized for
/// `players`, and fills the `obs` field with the draw. The flag fields
/// switch on specific contract violations so orchestration tests can
/// exercise each fault path.
#[derive(Debug)]
pub struct MockSim {
    /// Player count passed to `allocate`.
    pub players: usize,
    /// Value `is_done` reports.
    pub done: bool,
    /// Return without allocating (exercises the missing-allocation fault).
    pub skip_allocate: bool,
    /// Allocate a second slot (exercises the double-allocation fault).
    pub allocate_twice: bool,
    /// Fail with this reason after allocating.
    pub fail_with: Option<String>,
    /// Number of `reset` calls observed.
    pub resets: usize,
    /// Number of `step` calls observed.
    pub steps: usize,
    /// `player_num` of every action view seen by `step`, in order.
    pub seen_player_nums: Vec<usize>,
    /// One RNG draw per hook call, in order.
    pub rng_draws: Vec<f64>,
}

impl Default for MockSim {
    fn default() -> Self {
        Self {
            players: 1,
            done: false,
            skip_allocate: false,
            allocate_twice: false,
            fail_with: None,
            resets: 0,
            steps: 0,
            seen_player_nums: Vec::new(),
            rng_draws: Vec::new(),
        }
    }
}

impl MockSim {
    fn run_hook(&mut self, ctx: &mut EnvContext<'_>) -> Result<(), SimError> {
        let draw = ctx.rng().random::<f64>();
        self.rng_draws.push(draw);
        if self.skip_allocate {
            return Ok(());
        }
        let mut writer = ctx.allocate(self.players)?;
        if let Some(obs) = writer.field_mut("obs") {
            obs.fill(draw as f32);
        }
        drop(writer);
        if self.allocate_twice {
            ctx.allocate(self.players)?;
        }
        if let Some(reason) = &self.fail_with {
            return Err(SimError::ExecutionFailed {
                reason: reason.clone(),
            });
        }
        Ok(())
    }
}

impl Simulation for MockSim {
    fn reset(&mut self, ctx: &mut EnvContext<'_>) -> Result<(), SimError> {
        self.resets += 1;
        self.run_hook(ctx)
    }

    fn step(&mut self, ctx: &mut EnvContext<'_>, action: &ActionView) -> Result<(), SimError> {
        self.steps += 1;
        self.seen_player_nums.push(action.player_num());
        self.run_hook(ctx)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// A single-player spec: player-indexed `move [2]` and scalar `temp`
/// actions, fixed `obs [3]` state.
pub fn single_player_spec(seed: u64) -> EnvSpec {
    EnvSpec::new(
        EnvConfig {
            max_num_players: 1,
            seed,
        },
        [
            ("move", ShapeSpec::per_player(&[2])),
            ("temp", ShapeSpec::scalar()),
        ],
        [("obs", ShapeSpec::fixed(&[3]))],
    )
    .expect("fixture spec is valid")
}

/// A multi-player spec: player-indexed `move [2]` actions, per-player
/// `obs [2]` and `reward` state.
pub fn multi_player_spec(seed: u64, max_num_players: usize) -> EnvSpec {
    EnvSpec::new(
        EnvConfig {
            max_num_players,
            seed,
        },
        [("move", ShapeSpec::per_player(&[2]))],
        [
            ("obs", ShapeSpec::per_player(&[2])),
            ("reward", ShapeSpec::per_player(&[])),
        ],
    )
    .expect("fixture spec is valid")
}

/// A batch for [`single_player_spec`] with `num_envs` rows: env ids
/// count up, moves are `[2i, 2i+1]`, temps are `100 + i`.
pub fn single_batch(num_envs: usize) -> ActionBatch {
    let ids: Vec<f32> = (0..num_envs).map(|i| i as f32).collect();
    let moves: Vec<f32> = (0..num_envs * 2).map(|i| i as f32).collect();
    let temps: Vec<f32> = (0..num_envs).map(|i| 100.0 + i as f32).collect();
    ActionBatch::new(vec![
        Array::from_vec(&[num_envs], ids.clone()).expect("fixture shape"),
        Array::from_vec(&[num_envs], ids).expect("fixture shape"),
        Array::from_vec(&[num_envs, 2], moves).expect("fixture shape"),
        Array::from_vec(&[num_envs], temps).expect("fixture shape"),
    ])
}

/// A batch for [`multi_player_spec`]: one agent row per entry of
/// `owners` (the owner column), `num_envs` environment rows.
pub fn multi_batch(owners: &[u32], num_envs: usize) -> ActionBatch {
    let agent_rows = owners.len();
    let ids: Vec<f32> = (0..num_envs).map(|i| i as f32).collect();
    let owner_column: Vec<f32> = owners.iter().map(|&id| id as f32).collect();
    let moves: Vec<f32> = (0..agent_rows * 2).map(|i| i as f32).collect();
    ActionBatch::new(vec![
        Array::from_vec(&[num_envs], ids).expect("fixture shape"),
        Array::from_vec(&[agent_rows], owner_column).expect("fixture shape"),
        Array::from_vec(&[agent_rows, 2], moves).expect("fixture shape"),
    ])
}
