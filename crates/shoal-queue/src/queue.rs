//! The [`StateBufferQueue`] allocation/publication protocol.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Condvar, Mutex};

use shoal_array::{Array, Record};
use shoal_core::{OrderToken, QueueError, RecordSpec};

use crate::slot::StateSlot;

/// A fully written state record drained from the queue.
#[derive(Clone, Debug)]
pub struct PublishedState {
    /// The token that fixed this record's position in the output order.
    pub order: OrderToken,
    /// Number of agent rows the producing step was sized for.
    pub player_num: usize,
    /// The record itself, one frozen array per state field.
    pub record: Record,
}

/// Bounded, order-preserving buffer pool for completed step states.
///
/// Cheaply cloneable handle; all clones share one pool. At most
/// `capacity` slots may be outstanding (allocated and not yet drained);
/// further allocations block until the consumer pops — the natural
/// backpressure point regulating how far producers run ahead.
///
/// # Deadlock contract
///
/// `capacity` must be at least the number of environments that may be
/// mid-step concurrently. With fewer slots, an environment holding the
/// lowest outstanding token can be blocked in `allocate` behind slots
/// the consumer cannot drain yet.
#[derive(Clone)]
pub struct StateBufferQueue {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    capacity: usize,
    state_spec: Arc<RecordSpec>,
    state: Mutex<QueueState>,
    /// Signaled when a slot is drained or aborted (capacity freed).
    space: Condvar,
    /// Signaled when a publish or abort may unblock the consumer.
    ready: Condvar,
}

struct QueueState {
    closed: bool,
    /// Slots allocated and not yet drained (outstanding + published).
    in_flight: usize,
    /// Tokens of slots currently held by producers.
    outstanding: BTreeSet<u64>,
    /// Tokens of slots dropped without publish; the consumer skips these.
    aborted: BTreeSet<u64>,
    /// Published records waiting for the consumer cursor to reach them.
    published: BTreeMap<u64, PublishedState>,
    /// Next token the consumer will release.
    cursor: u64,
}

impl StateBufferQueue {
    /// Create a queue for `capacity` outstanding slots of `state_spec`
    /// records.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, state_spec: Arc<RecordSpec>) -> Self {
        assert!(capacity >= 1, "StateBufferQueue capacity must be >= 1");
        Self {
            inner: Arc::new(Inner {
                capacity,
                state_spec,
                state: Mutex::new(QueueState {
                    closed: false,
                    in_flight: 0,
                    outstanding: BTreeSet::new(),
                    aborted: BTreeSet::new(),
                    published: BTreeMap::new(),
                    cursor: 0,
                }),
                space: Condvar::new(),
                ready: Condvar::new(),
            }),
        }
    }

    /// Request an exclusive writable slot sized for `player_num` agent
    /// rows, positioned at `order` in the output sequence.
    ///
    /// Blocks while `capacity` slots are outstanding. Every field buffer
    /// of the returned slot is pre-sized and zero-filled; `player_num`
    /// may be 0.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Closed`] once [`close`](Self::close) has been called.
    /// - [`QueueError::StaleOrder`] if `order` is below the consumer cursor.
    /// - [`QueueError::DuplicateOrder`] if `order` is already outstanding
    ///   or published.
    pub fn allocate(
        &self,
        player_num: usize,
        order: OrderToken,
    ) -> Result<StateSlot, QueueError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            loop {
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if order.0 < state.cursor {
                    return Err(QueueError::StaleOrder {
                        order,
                        next: OrderToken(state.cursor),
                    });
                }
                if state.outstanding.contains(&order.0) || state.published.contains_key(&order.0) {
                    return Err(QueueError::DuplicateOrder { order });
                }
                if state.in_flight < self.inner.capacity {
                    state.in_flight += 1;
                    state.outstanding.insert(order.0);
                    // Re-allocating a previously aborted token retries
                    // that step; drop the skip marker.
                    state.aborted.remove(&order.0);
                    break;
                }
                state = self.inner.space.wait(state).unwrap();
            }
        }

        let fields = self
            .inner
            .state_spec
            .iter()
            .map(|(_, shape)| vec![0.0f32; shape.resolved_len(player_num)])
            .collect();
        Ok(StateSlot::new(
            Arc::clone(&self.inner),
            Arc::clone(&self.inner.state_spec),
            order,
            player_num,
            fields,
        ))
    }

    /// Block until the next-in-order record is available and return it.
    ///
    /// Records published out of order wait in the queue until the
    /// consumer cursor reaches them. Aborted slots are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once the queue is closed and every
    /// already-published in-order record has been drained.
    pub fn pop(&self) -> Result<PublishedState, QueueError> {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(entry) = Self::take_next(&mut state) {
                self.inner.space.notify_one();
                return Ok(entry);
            }
            if state.closed {
                return Err(QueueError::Closed);
            }
            state = self.inner.ready.wait(state).unwrap();
        }
    }

    /// Advance the cursor past aborted tokens, then remove and return
    /// the next-in-order published record, if any.
    fn take_next(state: &mut QueueState) -> Option<PublishedState> {
        loop {
            let cursor = state.cursor;
            if state.aborted.remove(&cursor) {
                state.cursor += 1;
            } else {
                break;
            }
        }
        let cursor = state.cursor;
        let entry = state.published.remove(&cursor)?;
        state.cursor += 1;
        state.in_flight -= 1;
        Some(entry)
    }

    /// Nonblocking [`pop`](Self::pop).
    ///
    /// Returns `Ok(None)` when the next-in-order record has not been
    /// published yet.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once the queue is closed and
    /// drained.
    pub fn try_pop(&self) -> Result<Option<PublishedState>, QueueError> {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(entry) = Self::take_next(&mut state) {
            self.inner.space.notify_one();
            return Ok(Some(entry));
        }
        if state.closed {
            return Err(QueueError::Closed);
        }
        Ok(None)
    }

    /// Close the queue: wake every blocked producer and consumer.
    ///
    /// Outstanding slots may still be dropped safely; publishing into a
    /// closed queue is discarded.
    pub fn close(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.closed = true;
        self.inner.space.notify_all();
        self.inner.ready.notify_all();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().unwrap().closed
    }

    /// Slots currently allocated and not yet drained.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().unwrap().in_flight
    }

    /// Maximum outstanding slots.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// The state schema records are sized against.
    pub fn state_spec(&self) -> &Arc<RecordSpec> {
        &self.inner.state_spec
    }
}

impl Inner {
    /// Freeze a slot's buffers into a record and hand it to the consumer
    /// side. Called by [`StateSlot::publish`].
    pub(crate) fn publish(&self, order: OrderToken, player_num: usize, fields: Vec<Vec<f32>>) {
        let values: Vec<Array> = self
            .state_spec
            .iter()
            .zip(fields)
            .map(|((_, shape), data)| {
                let resolved = shape.resolve(player_num);
                Array::from_vec(&resolved, data)
                    .expect("slot buffers are sized from the same schema")
            })
            .collect();
        let record = Record::new(Arc::clone(&self.state_spec), values)
            .expect("one buffer per schema field");

        let mut state = self.state.lock().unwrap();
        state.outstanding.remove(&order.0);
        if state.closed {
            // Consumer is gone; release the capacity and drop the record.
            state.in_flight -= 1;
            self.space.notify_one();
            return;
        }
        state.published.insert(
            order.0,
            PublishedState {
                order,
                player_num,
                record,
            },
        );
        self.ready.notify_all();
    }

    /// Release a slot that is being dropped without publish. The
    /// consumer will skip this token.
    pub(crate) fn abort(&self, order: OrderToken) {
        let mut state = self.state.lock().unwrap();
        state.outstanding.remove(&order.0);
        state.aborted.insert(order.0);
        state.in_flight -= 1;
        self.space.notify_one();
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::ShapeSpec;
    use std::thread;
    use std::time::Duration;

    fn spec_with_obs() -> Arc<RecordSpec> {
        Arc::new(RecordSpec::state([("obs", ShapeSpec::per_player(&[2]))]).unwrap())
    }

    #[test]
    fn allocate_sizes_fields_for_player_count() {
        let queue = StateBufferQueue::new(4, spec_with_obs());
        let mut slot = queue.allocate(3, OrderToken(0)).unwrap();
        // done, env_id, elapsed_step are scalars; players.env_id has 3
        // rows; obs has 3 rows of 2.
        assert_eq!(slot.field_mut_by_name("players.env_id").unwrap().len(), 3);
        assert_eq!(slot.field_mut_by_name("obs").unwrap().len(), 6);
        drop(slot);
    }

    #[test]
    fn zero_player_slot_is_valid() {
        let queue = StateBufferQueue::new(2, spec_with_obs());
        let mut slot = queue.allocate(0, OrderToken(0)).unwrap();
        assert!(slot.field_mut_by_name("obs").unwrap().is_empty());
        slot.field_mut_by_name("done").unwrap()[0] = 1.0;
        slot.publish();
        let state = queue.pop().unwrap();
        assert_eq!(state.player_num, 0);
        assert!(state.record.get("obs").unwrap().is_empty());
    }

    #[test]
    fn publish_freezes_written_values() {
        let queue = StateBufferQueue::new(2, spec_with_obs());
        let mut slot = queue.allocate(2, OrderToken(0)).unwrap();
        slot.field_mut_by_name("obs")
            .unwrap()
            .copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        slot.publish();

        let state = queue.pop().unwrap();
        assert_eq!(state.order, OrderToken(0));
        let obs = state.record.get("obs").unwrap();
        assert_eq!(obs.shape(), &[2, 2]);
        assert_eq!(obs.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn pop_respects_token_order_not_completion_order() {
        let queue = StateBufferQueue::new(4, spec_with_obs());
        let slot_a = queue.allocate(1, OrderToken(0)).unwrap();
        let slot_b = queue.allocate(1, OrderToken(1)).unwrap();

        // b completes first; the consumer must still see a first.
        slot_b.publish();
        assert!(queue.try_pop().unwrap().is_none());
        slot_a.publish();

        assert_eq!(queue.pop().unwrap().order, OrderToken(0));
        assert_eq!(queue.pop().unwrap().order, OrderToken(1));
    }

    #[test]
    fn stale_and_duplicate_orders_rejected() {
        let queue = StateBufferQueue::new(4, spec_with_obs());
        let slot = queue.allocate(1, OrderToken(0)).unwrap();
        assert!(matches!(
            queue.allocate(1, OrderToken(0)),
            Err(QueueError::DuplicateOrder { .. })
        ));
        slot.publish();
        queue.pop().unwrap();
        assert!(matches!(
            queue.allocate(1, OrderToken(0)),
            Err(QueueError::StaleOrder { .. })
        ));
    }

    #[test]
    fn aborted_slot_is_skipped_and_capacity_released() {
        let queue = StateBufferQueue::new(1, spec_with_obs());
        let slot = queue.allocate(1, OrderToken(0)).unwrap();
        drop(slot); // abort
        assert_eq!(queue.in_flight(), 0);

        // Capacity is free again and the cursor skips token 0.
        let slot = queue.allocate(1, OrderToken(1)).unwrap();
        slot.publish();
        assert_eq!(queue.pop().unwrap().order, OrderToken(1));
    }

    #[test]
    fn allocate_blocks_at_capacity_until_pop() {
        let queue = StateBufferQueue::new(1, spec_with_obs());
        let first = queue.allocate(1, OrderToken(0)).unwrap();

        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let q = queue.clone();
        let handle = thread::spawn(move || {
            started_tx.send(()).unwrap();
            let slot = q.allocate(1, OrderToken(1)).unwrap();
            done_tx.send(()).unwrap();
            slot.publish();
        });

        started_rx.recv().unwrap();
        // The producer should be blocked: capacity is 1 and token 0 is
        // outstanding.
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        first.publish();
        assert_eq!(queue.pop().unwrap().order, OrderToken(0));
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("allocate should unblock after pop");
        assert_eq!(queue.pop().unwrap().order, OrderToken(1));
        handle.join().unwrap();
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = StateBufferQueue::new(2, spec_with_obs());
        let q = queue.clone();
        let handle = thread::spawn(move || q.pop());
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(matches!(handle.join().unwrap(), Err(QueueError::Closed)));
    }

    #[test]
    fn close_drains_published_records_first() {
        let queue = StateBufferQueue::new(2, spec_with_obs());
        let slot = queue.allocate(1, OrderToken(0)).unwrap();
        slot.publish();
        queue.close();
        assert_eq!(queue.pop().unwrap().order, OrderToken(0));
        assert!(matches!(queue.pop(), Err(QueueError::Closed)));
    }

    #[test]
    fn allocate_after_close_is_rejected() {
        let queue = StateBufferQueue::new(2, spec_with_obs());
        queue.close();
        assert!(matches!(
            queue.allocate(1, OrderToken(0)),
            Err(QueueError::Closed)
        ));
    }

    #[test]
    fn many_producers_one_consumer_in_order() {
        let queue = StateBufferQueue::new(8, spec_with_obs());
        let mut handles = Vec::new();
        for token in 0u64..8 {
            let q = queue.clone();
            handles.push(thread::spawn(move || {
                // Stagger completions in reverse token order.
                thread::sleep(Duration::from_millis(2 * (8 - token)));
                let mut slot = q.allocate(1, OrderToken(token)).unwrap();
                slot.field_mut_by_name("elapsed_step").unwrap()[0] = token as f32;
                slot.publish();
            }));
        }

        for expected in 0u64..8 {
            let state = queue.pop().unwrap();
            assert_eq!(state.order, OrderToken(expected));
            assert_eq!(
                state.record.get("elapsed_step").unwrap().scalar(),
                expected as f32
            );
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
