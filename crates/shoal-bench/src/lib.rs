//! Benchmark profiles and batch builders for the Shoal workspace.
//!
//! Provides batch layouts that pin the demultiplexer to a specific
//! path:
//!
//! - [`contiguous_owner_batch`]: each environment's agent rows form one
//!   block — the zero-copy fast path.
//! - [`interleaved_owner_batch`]: agent rows round-robin across
//!   environments — the row-by-row copy path.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use shoal_array::Array;

/// Batch for a multi-player spec where every environment owns
/// `players_per_env` adjacent rows.
///
/// Field order matches [`multi_player_spec`](shoal_test_utils::multi_player_spec):
/// `env_id`, `players.env_id`, `move [-1, 2]`.
pub fn contiguous_owner_batch(num_envs: usize, players_per_env: usize) -> Vec<Array> {
    let owners: Vec<f32> = (0..num_envs)
        .flat_map(|env| std::iter::repeat(env as f32).take(players_per_env))
        .collect();
    owner_batch(num_envs, owners)
}

/// Batch where agent rows alternate between environments, so no
/// environment's rows are adjacent (for `num_envs > 1`).
pub fn interleaved_owner_batch(num_envs: usize, players_per_env: usize) -> Vec<Array> {
    let owners: Vec<f32> = (0..players_per_env)
        .flat_map(|_| (0..num_envs).map(|env| env as f32))
        .collect();
    owner_batch(num_envs, owners)
}

fn owner_batch(num_envs: usize, owners: Vec<f32>) -> Vec<Array> {
    let agent_rows = owners.len();
    let ids: Vec<f32> = (0..num_envs).map(|i| i as f32).collect();
    let moves: Vec<f32> = (0..agent_rows * 2).map(|i| i as f32).collect();
    vec![
        Array::from_vec(&[num_envs], ids).expect("bench shape"),
        Array::from_vec(&[agent_rows], owners).expect("bench shape"),
        Array::from_vec(&[agent_rows, 2], moves).expect("bench shape"),
    ]
}
