//! Reference simulations driven end-to-end through the pool.

use shoal_array::Array;
use shoal_envs::{DriftSim, RelaySim};
use shoal_pool::{EnvPool, PoolConfig, PublishedState};

fn pool_config(num_envs: usize, threads: usize) -> PoolConfig {
    PoolConfig {
        num_envs,
        num_threads: Some(threads),
        queue_capacity: None,
    }
}

/// Batch for a pool of drift sims: every env pushes by `push`.
fn drift_batch(num_envs: usize, push: f32) -> Vec<Array> {
    let ids: Vec<f32> = (0..num_envs).map(|i| i as f32).collect();
    vec![
        Array::from_vec(&[num_envs], ids.clone()).unwrap(),
        Array::from_vec(&[num_envs], ids).unwrap(),
        Array::from_vec(&[num_envs], vec![push; num_envs]).unwrap(),
    ]
}

/// Batch for a pool of relay sims: `rows` is `(owner env id, vote)` per
/// agent row; `env_ids` lists the environments being stepped.
fn relay_batch(env_ids: &[u32], rows: &[(u32, f32)]) -> Vec<Array> {
    let ids: Vec<f32> = env_ids.iter().map(|&id| id as f32).collect();
    let owners: Vec<f32> = rows.iter().map(|&(owner, _)| owner as f32).collect();
    let votes: Vec<f32> = rows.iter().map(|&(_, vote)| vote).collect();
    vec![
        Array::from_vec(&[env_ids.len()], ids).unwrap(),
        Array::from_vec(&[rows.len()], owners).unwrap(),
        Array::from_vec(&[rows.len()], votes).unwrap(),
    ]
}

fn obs_of(state: &PublishedState) -> Vec<f32> {
    state.record.get("obs").unwrap().as_slice().to_vec()
}

#[test]
fn drift_episode_reaches_the_bound() {
    let pool = EnvPool::new(DriftSim::spec(17), pool_config(1, 1), |_| {
        DriftSim::builder().bound(2.0).noise(0.05).build().unwrap()
    })
    .unwrap();

    pool.reset_all().unwrap();
    let initial = pool.recv().unwrap();
    assert_eq!(initial.record.get("elapsed_step").unwrap().scalar(), 0.0);
    assert_eq!(initial.record.get("done").unwrap().scalar(), 0.0);

    // Constant push of 0.5 against a bound of 2.0 must escape well
    // within 20 steps even with adverse noise.
    let mut finished = false;
    for round in 1..=20 {
        pool.send(drift_batch(1, 0.5)).unwrap();
        let state = pool.recv().unwrap();
        assert_eq!(
            state.record.get("elapsed_step").unwrap().scalar(),
            round as f32
        );
        if state.record.get("done").unwrap().scalar() == 1.0 {
            let position = obs_of(&state)[0];
            assert!(position.abs() >= 2.0);
            finished = true;
            break;
        }
    }
    assert!(finished, "drift episode never reached the bound");
}

#[test]
fn drift_pools_replay_identically() {
    let run = || {
        let pool = EnvPool::new(DriftSim::spec(99), pool_config(4, 2), |_| {
            DriftSim::builder().build().unwrap()
        })
        .unwrap();
        pool.reset_all().unwrap();
        let mut trace: Vec<Vec<f32>> = pool.recv_batch(4).unwrap().iter().map(obs_of).collect();
        for _ in 0..5 {
            pool.send(drift_batch(4, 0.25)).unwrap();
            trace.extend(pool.recv_batch(4).unwrap().iter().map(obs_of));
        }
        trace
    };
    assert_eq!(run(), run());
}

#[test]
fn drift_rewards_stay_in_range() {
    let pool = EnvPool::new(DriftSim::spec(3), pool_config(2, 2), |_| {
        DriftSim::builder().build().unwrap()
    })
    .unwrap();
    pool.reset_all().unwrap();
    pool.recv_batch(2).unwrap();
    for _ in 0..10 {
        pool.send(drift_batch(2, 0.1)).unwrap();
        for state in pool.recv_batch(2).unwrap() {
            let reward = state.record.get("reward").unwrap().scalar();
            assert!((0.0..=1.0).contains(&reward), "reward {reward} out of range");
        }
    }
}

#[test]
fn relay_roster_shrinks_to_zero_agents() {
    let pool = EnvPool::new(RelaySim::spec(5, 2), pool_config(2, 2), |_| {
        RelaySim::new(2, 50).unwrap()
    })
    .unwrap();

    pool.reset_all().unwrap();
    for state in pool.recv_batch(2).unwrap() {
        assert_eq!(state.player_num, 2);
    }

    // Round 1: both envs keep both players (contiguous rows).
    pool.send(relay_batch(&[0, 1], &[(0, 1.0), (0, 1.0), (1, 1.0), (1, 1.0)]))
        .unwrap();
    for state in pool.recv_batch(2).unwrap() {
        assert_eq!(state.player_num, 2);
        assert_eq!(state.record.get("reward").unwrap().as_slice(), &[1.0, 1.0]);
    }

    // Round 2: env 0's players both retire; env 1 keeps its roster.
    pool.send(relay_batch(&[0, 1], &[(0, 0.0), (0, 0.0), (1, 1.0), (1, 1.0)]))
        .unwrap();
    let states = pool.recv_batch(2).unwrap();
    assert_eq!(states[0].record.get("reward").unwrap().as_slice(), &[0.0, 0.0]);
    assert_eq!(states[0].record.get("done").unwrap().scalar(), 1.0);
    assert_eq!(states[1].record.get("done").unwrap().scalar(), 0.0);

    // Round 3: env 0 steps with zero agents and must not fault.
    pool.send(relay_batch(&[0, 1], &[(1, 1.0), (1, 1.0)])).unwrap();
    let states = pool.recv_batch(2).unwrap();
    assert_eq!(states[0].player_num, 0);
    assert!(states[0].record.get("players.env_id").unwrap().is_empty());
    assert_eq!(states[1].player_num, 2);
}

#[test]
fn relay_handles_interleaved_agent_rows() {
    // Rows alternate between the two envs, forcing the scattered
    // demultiplexing path for both.
    let pool = EnvPool::new(RelaySim::spec(5, 2), pool_config(2, 2), |_| {
        RelaySim::new(2, 50).unwrap()
    })
    .unwrap();

    pool.reset_all().unwrap();
    pool.recv_batch(2).unwrap();

    pool.send(relay_batch(
        &[0, 1],
        &[(0, 1.0), (1, 0.0), (0, 0.0), (1, 1.0)],
    ))
    .unwrap();
    let states = pool.recv_batch(2).unwrap();

    // Env 0 saw rows 0 and 2 in scan order: votes [1.0, 0.0].
    assert_eq!(states[0].record.get("reward").unwrap().as_slice(), &[1.0, 0.0]);
    // Env 1 saw rows 1 and 3: votes [0.0, 1.0].
    assert_eq!(states[1].record.get("reward").unwrap().as_slice(), &[0.0, 1.0]);
}
