//! A single-player bounded drift process.
//!
//! The agent pushes a particle along a line; uniform noise from the
//! instance RNG perturbs every move. The episode ends when the particle
//! escapes the bound or the horizon runs out. Identical seeds produce
//! identical trajectories.

use rand::RngExt;
use rand_chacha::ChaCha8Rng;

use shoal_core::ShapeSpec;
use shoal_env::{ActionView, EnvConfig, EnvContext, EnvSpec, SimError, Simulation};

/// A 1-D drift process with one agent.
///
/// Action fields: `push [-1]` (one scalar row for the agent).
/// State fields: `obs [3]` = position, position/bound, elapsed;
/// `reward []` = `1 − |position|/bound`, clamped at 0.
///
/// Constructed via [`DriftSim::builder`].
#[derive(Debug)]
pub struct DriftSim {
    bound: f64,
    horizon: u64,
    noise: f64,
    position: f64,
    done: bool,
}

/// Builder for [`DriftSim`].
pub struct DriftSimBuilder {
    bound: f64,
    horizon: u64,
    noise: f64,
}

impl DriftSim {
    /// Create a builder with the default bound (10.0), horizon (100),
    /// and noise scale (0.1).
    pub fn builder() -> DriftSimBuilder {
        DriftSimBuilder {
            bound: 10.0,
            horizon: 100,
            noise: 0.1,
        }
    }

    /// The spec a pool of drift sims runs under.
    pub fn spec(seed: u64) -> EnvSpec {
        EnvSpec::new(
            EnvConfig {
                max_num_players: 1,
                seed,
            },
            [("push", ShapeSpec::per_player(&[]))],
            [
                ("obs", ShapeSpec::fixed(&[3])),
                ("reward", ShapeSpec::scalar()),
            ],
        )
        .expect("drift schema is valid")
    }

    /// The particle's current position.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// One uniform draw in `[-noise, noise]`.
    fn noise_draw(&self, rng: &mut ChaCha8Rng) -> f64 {
        (rng.random::<f64>() * 2.0 - 1.0) * self.noise
    }

    fn write_state(&self, ctx: &mut EnvContext<'_>) -> Result<(), SimError> {
        let elapsed = ctx.elapsed_step();
        let position = self.position as f32;
        let normalized = (self.position / self.bound) as f32;
        let reward = (1.0 - normalized.abs()).max(0.0);

        let mut writer = ctx.allocate_single()?;
        if let Some(obs) = writer.field_mut("obs") {
            obs.copy_from_slice(&[position, normalized, elapsed as f32]);
        }
        writer.write_scalar("reward", reward);
        Ok(())
    }
}

impl DriftSimBuilder {
    /// Set the escape bound (default 10.0). Must be finite and > 0.
    pub fn bound(mut self, bound: f64) -> Self {
        self.bound = bound;
        self
    }

    /// Set the episode horizon in steps (default 100). Must be >= 1.
    pub fn horizon(mut self, horizon: u64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the noise half-range (default 0.1). Must be finite and >= 0.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Build the simulation, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `bound` is not positive, `horizon` is zero, or
    /// `noise` is negative or non-finite.
    pub fn build(self) -> Result<DriftSim, String> {
        if !self.bound.is_finite() || self.bound <= 0.0 {
            return Err(format!("bound must be finite and > 0, got {}", self.bound));
        }
        if self.horizon == 0 {
            return Err("horizon must be at least 1".to_string());
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(format!("noise must be finite and >= 0, got {}", self.noise));
        }
        Ok(DriftSim {
            bound: self.bound,
            horizon: self.horizon,
            noise: self.noise,
            position: 0.0,
            done: false,
        })
    }
}

impl Simulation for DriftSim {
    fn reset(&mut self, ctx: &mut EnvContext<'_>) -> Result<(), SimError> {
        self.position = self.noise_draw(ctx.rng());
        self.done = false;
        self.write_state(ctx)
    }

    fn step(&mut self, ctx: &mut EnvContext<'_>, action: &ActionView) -> Result<(), SimError> {
        let push = action.get("push").ok_or_else(|| SimError::InvalidAction {
            reason: "missing 'push' field".to_string(),
        })?;
        if push.len() != 1 {
            return Err(SimError::InvalidAction {
                reason: format!("'push' has {} rows, expected 1", push.len()),
            });
        }

        self.position += f64::from(push.as_slice()[0]) + self.noise_draw(ctx.rng());
        self.done = self.position.abs() >= self.bound || ctx.elapsed_step() >= self.horizon;
        self.write_state(ctx)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_build() {
        let sim = DriftSim::builder().build().unwrap();
        assert_eq!(sim.position(), 0.0);
        assert!(!sim.is_done());
    }

    #[test]
    fn builder_rejects_bad_config() {
        assert!(DriftSim::builder().bound(0.0).build().is_err());
        assert!(DriftSim::builder().bound(f64::NAN).build().is_err());
        assert!(DriftSim::builder().horizon(0).build().is_err());
        assert!(DriftSim::builder().noise(-1.0).build().is_err());
    }

    #[test]
    fn spec_is_single_player() {
        let spec = DriftSim::spec(0);
        assert!(spec.is_single_player());
        assert!(spec.action_spec.get("push").unwrap().is_player_indexed());
        assert!(!spec.state_spec.get("obs").unwrap().is_player_indexed());
    }
}
