//! The [`EnvPool`] dispatcher and its worker loop.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use shoal_array::Array;
use shoal_core::{EnvId, OrderToken, QueueError, RecordSpec};
use shoal_env::{ActionBatch, Env, EnvSpec, Simulation, StepError};
use shoal_queue::{PublishedState, StateBufferQueue};

use crate::config::{PoolConfig, PoolError};
use crate::metrics::{MetricsSnapshot, PoolMetrics};

/// One unit of work for a worker: step (or reset) one environment.
struct StepTask {
    /// Index into the pool's env table (equals the env's id).
    env_slot: usize,
    /// The env's row in the bound batch; unused for resets.
    env_index: usize,
    order: OrderToken,
    reset: bool,
    batch: Option<Arc<ActionBatch>>,
}

/// A pool of environments stepped concurrently by worker threads.
///
/// Dispatch is push-based: [`send`](Self::send) routes one step task
/// per environment named in the batch's `env_id` column, assigning
/// order tokens in row order; [`recv`](Self::recv) drains completed
/// states strictly in token order. The first failing step closes the
/// queue so the failure surfaces promptly on the consumer side.
///
/// Each environment is guarded by its own `Mutex`; a given environment
/// has at most one outstanding task at a time, so the locks are
/// uncontended in normal operation.
pub struct EnvPool<S: Simulation> {
    envs: Arc<Vec<Mutex<Env<S>>>>,
    queue: StateBufferQueue,
    spec: EnvSpec,
    task_tx: Option<Sender<StepTask>>,
    workers: Vec<JoinHandle<()>>,
    next_order: Mutex<u64>,
    failure: Arc<Mutex<Option<StepError>>>,
    metrics: Arc<PoolMetrics>,
}

impl<S: Simulation> EnvPool<S> {
    /// Build the pool: construct `num_envs` environments via `factory`,
    /// the shared queue, and the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Config`] / [`PoolError::Spec`] on invalid
    /// sizing or schemas.
    pub fn new<F>(spec: EnvSpec, config: PoolConfig, mut factory: F) -> Result<Self, PoolError>
    where
        F: FnMut(EnvId) -> S,
    {
        spec.validate()?;
        config.validate()?;

        let queue = StateBufferQueue::new(
            config.resolved_queue_capacity(),
            Arc::clone(&spec.state_spec),
        );

        let mut envs = Vec::with_capacity(config.num_envs);
        for i in 0..config.num_envs {
            let env_id = EnvId(i as u32);
            let env = Env::new(spec.clone(), env_id, factory(env_id))?;
            envs.push(Mutex::new(env));
        }
        let envs = Arc::new(envs);

        let failure: Arc<Mutex<Option<StepError>>> = Arc::new(Mutex::new(None));
        let metrics = Arc::new(PoolMetrics::default());

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<StepTask>();
        let mut workers = Vec::with_capacity(config.resolved_threads());
        for worker_index in 0..config.resolved_threads() {
            let task_rx = task_rx.clone();
            let envs = Arc::clone(&envs);
            let queue = queue.clone();
            let failure = Arc::clone(&failure);
            let metrics = Arc::clone(&metrics);
            let handle = std::thread::Builder::new()
                .name(format!("shoal-worker-{worker_index}"))
                .spawn(move || worker_loop(task_rx, envs, queue, failure, metrics))
                .map_err(|e| PoolError::Config {
                    reason: format!("worker thread spawn failed: {e}"),
                })?;
            workers.push(handle);
        }

        Ok(Self {
            envs,
            queue,
            spec,
            task_tx: Some(task_tx),
            workers,
            next_order: Mutex::new(0),
            failure,
            metrics,
        })
    }

    /// Number of environments in the pool.
    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// The spec every environment was built from.
    pub fn spec(&self) -> &EnvSpec {
        &self.spec
    }

    /// Copy of the cumulative activity counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Dispatch reset steps for every environment, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Step`] if a previous worker failure closed
    /// the pool.
    pub fn reset_all(&self) -> Result<(), PoolError> {
        let ids: Vec<EnvId> = (0..self.envs.len()).map(|i| EnvId(i as u32)).collect();
        self.reset(&ids)
    }

    /// Dispatch reset steps for the named environments, assigning order
    /// tokens in argument order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::UnknownEnv`] for an id outside the pool and
    /// [`PoolError::Step`] / [`PoolError::Closed`] if the pool is down.
    pub fn reset(&self, env_ids: &[EnvId]) -> Result<(), PoolError> {
        self.check_failed()?;
        for &env_id in env_ids {
            self.check_env(env_id)?;
        }
        let mut next = self.next_order.lock().unwrap();
        for &env_id in env_ids {
            let task = StepTask {
                env_slot: env_id.0 as usize,
                env_index: 0,
                order: OrderToken(*next),
                reset: true,
                batch: None,
            };
            *next += 1;
            self.dispatch(task)?;
        }
        Ok(())
    }

    /// Dispatch one step per environment named in the batch's `env_id`
    /// column (action field 0); each named environment's row position is
    /// its batch index for scalar fields.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Batch`] for a field-count mismatch or a
    /// malformed id column, [`PoolError::UnknownEnv`] for an id outside
    /// the pool, and [`PoolError::Step`] / [`PoolError::Closed`] if the
    /// pool is down.
    pub fn send(&self, arrays: Vec<Array>) -> Result<(), PoolError> {
        self.check_failed()?;
        if arrays.len() != self.spec.action_spec.len() {
            return Err(PoolError::Batch {
                reason: format!(
                    "batch has {} field arrays, schema declares {}",
                    arrays.len(),
                    self.spec.action_spec.len()
                ),
            });
        }

        let env_slots = self.routed_env_slots(&arrays[RecordSpec::ACTION_ENV_ID])?;
        let batch = Arc::new(ActionBatch::new(arrays));

        let mut next = self.next_order.lock().unwrap();
        for (row, env_slot) in env_slots.into_iter().enumerate() {
            let task = StepTask {
                env_slot,
                env_index: row,
                order: OrderToken(*next),
                reset: false,
                batch: Some(Arc::clone(&batch)),
            };
            *next += 1;
            self.dispatch(task)?;
        }
        Ok(())
    }

    /// Block for the next state record in token order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Step`] with the first recorded worker
    /// failure, or [`PoolError::Closed`] on orderly shutdown.
    pub fn recv(&self) -> Result<PublishedState, PoolError> {
        match self.queue.pop() {
            Ok(state) => Ok(state),
            Err(QueueError::Closed) => Err(self.closed_error()),
            Err(e) => Err(PoolError::Step(StepError::Sim(e.into()))),
        }
    }

    /// Block for the next `n` state records, in token order.
    ///
    /// # Errors
    ///
    /// As [`recv`](Self::recv).
    pub fn recv_batch(&self, n: usize) -> Result<Vec<PublishedState>, PoolError> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.recv()?);
        }
        Ok(out)
    }

    /// Validate the id column and map it to env table slots.
    fn routed_env_slots(&self, id_column: &Array) -> Result<Vec<usize>, PoolError> {
        let mut slots = Vec::with_capacity(id_column.len());
        for (row, &value) in id_column.as_slice().iter().enumerate() {
            if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
                return Err(PoolError::Batch {
                    reason: format!("env id column row {row} holds {value}"),
                });
            }
            let env_id = EnvId(value as u32);
            self.check_env(env_id)?;
            slots.push(env_id.0 as usize);
        }
        Ok(slots)
    }

    fn check_env(&self, env_id: EnvId) -> Result<(), PoolError> {
        if (env_id.0 as usize) < self.envs.len() {
            Ok(())
        } else {
            Err(PoolError::UnknownEnv { env_id })
        }
    }

    fn check_failed(&self) -> Result<(), PoolError> {
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(PoolError::Step(e)),
            None => Ok(()),
        }
    }

    fn closed_error(&self) -> PoolError {
        match self.failure.lock().unwrap().clone() {
            Some(e) => PoolError::Step(e),
            None => PoolError::Closed,
        }
    }

    fn dispatch(&self, task: StepTask) -> Result<(), PoolError> {
        self.task_tx
            .as_ref()
            .expect("task channel lives until drop")
            .send(task)
            .map_err(|_| PoolError::Closed)
    }
}

impl<S: Simulation> Drop for EnvPool<S> {
    fn drop(&mut self) {
        // Closing the channel drains the workers; closing the queue
        // wakes any worker blocked on allocation backpressure.
        self.task_tx.take();
        self.queue.close();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Worker loop: lock the task's environment, bind the batch, step into
/// the shared queue. The first failure is recorded and the queue closed
/// so the consumer observes it; the worker keeps draining so shutdown
/// stays orderly.
fn worker_loop<S: Simulation>(
    task_rx: Receiver<StepTask>,
    envs: Arc<Vec<Mutex<Env<S>>>>,
    queue: StateBufferQueue,
    failure: Arc<Mutex<Option<StepError>>>,
    metrics: Arc<PoolMetrics>,
) {
    while let Ok(task) = task_rx.recv() {
        // env_slot was validated at dispatch.
        let Some(env) = envs.get(task.env_slot) else {
            continue;
        };
        let mut env = env.lock().unwrap();
        if let Some(batch) = &task.batch {
            env.set_action(Arc::clone(batch), task.env_index);
        }
        match env.env_step(&queue, task.order, task.reset) {
            Ok(()) => {
                if task.reset {
                    metrics.record_reset();
                } else {
                    metrics.record_step();
                }
            }
            Err(e) => {
                metrics.record_failure();
                let mut slot = failure.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(e);
                }
                drop(slot);
                queue.close();
            }
        }
    }
    // Channel closed — worker exits cleanly.
}
