//! Exclusive writable state slots.

use std::sync::Arc;

use shoal_core::{OrderToken, RecordSpec};

use crate::queue::Inner;

/// An exclusive writable slot leased from a
/// [`StateBufferQueue`](crate::StateBufferQueue).
///
/// The slot owns one zero-filled buffer per state field, sized for the
/// `player_num` it was allocated with. It is a move-only lease:
/// [`publish`](Self::publish) consumes it and hands the finished record
/// to the consumer side at the slot's order token. Dropping a slot
/// without publishing aborts it — capacity is released, the consumer
/// skips the token, and debug builds emit a diagnostic. The
/// orchestration layer treats a step that never allocated as a hard
/// fault, so aborts only arise from a failing step body.
pub struct StateSlot {
    inner: Arc<Inner>,
    spec: Arc<RecordSpec>,
    order: OrderToken,
    player_num: usize,
    fields: Vec<Vec<f32>>,
    published: bool,
}

impl StateSlot {
    pub(crate) fn new(
        inner: Arc<Inner>,
        spec: Arc<RecordSpec>,
        order: OrderToken,
        player_num: usize,
        fields: Vec<Vec<f32>>,
    ) -> Self {
        Self {
            inner,
            spec,
            order,
            player_num,
            fields,
            published: false,
        }
    }

    /// The slot's position in the queue's output sequence.
    pub fn order(&self) -> OrderToken {
        self.order
    }

    /// Agent rows this slot was sized for.
    pub fn player_num(&self) -> usize {
        self.player_num
    }

    /// Number of field buffers.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Mutable access to the buffer of the field at schema position
    /// `index`.
    pub fn field_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.fields.get_mut(index).map(Vec::as_mut_slice)
    }

    /// Mutable access to the named field's buffer.
    pub fn field_mut_by_name(&mut self, name: &str) -> Option<&mut [f32]> {
        let index = self.spec.index_of(name)?;
        self.field_mut(index)
    }

    /// The state schema this slot's buffers are laid out against.
    pub fn spec(&self) -> &Arc<RecordSpec> {
        &self.spec
    }

    /// Publish the slot: freeze every buffer into a shared array and
    /// hand the record to the consumer side.
    pub fn publish(mut self) {
        self.published = true;
        let fields = std::mem::take(&mut self.fields);
        self.inner.publish(self.order, self.player_num, fields);
    }
}

impl Drop for StateSlot {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        self.inner.abort(self.order);
        #[cfg(debug_assertions)]
        eprintln!(
            "shoal: state slot for order {} dropped without publish; consumer will skip it",
            self.order
        );
    }
}
