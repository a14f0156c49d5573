//! Shared action batches and per-environment action views.

use std::sync::Arc;

use shoal_array::Array;
use shoal_core::RecordSpec;

/// The batched action record for one pool-wide step.
///
/// One array per declared action field, each array's leading dimension
/// spanning every agent row (player-indexed fields) or every environment
/// row (scalar fields) active this step. The batch is shared read-only
/// across all environment instances for the duration of the step;
/// environments only ever read from it.
#[derive(Clone, Debug)]
pub struct ActionBatch {
    arrays: Vec<Array>,
}

impl ActionBatch {
    /// Wrap per-field arrays in field order.
    pub fn new(arrays: Vec<Array>) -> Self {
        Self { arrays }
    }

    /// The per-field arrays in field order.
    pub fn arrays(&self) -> &[Array] {
        &self.arrays
    }

    /// Number of field arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    /// Returns `true` if the batch carries no field arrays.
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }
}

/// One environment's demultiplexed view of the action batch.
///
/// Player-indexed fields hold `player_num` rows — zero-copy slices on
/// the contiguous fast path, fresh copies on the scattered path — and
/// scalar fields hold that environment's single element. Rebuilt every
/// step; never mutated in place.
#[derive(Clone, Debug)]
pub struct ActionView {
    spec: Arc<RecordSpec>,
    values: Vec<Array>,
    player_num: usize,
}

impl ActionView {
    pub(crate) fn new(spec: Arc<RecordSpec>, values: Vec<Array>, player_num: usize) -> Self {
        debug_assert_eq!(values.len(), spec.len());
        Self {
            spec,
            values,
            player_num,
        }
    }

    /// The action schema.
    pub fn spec(&self) -> &Arc<RecordSpec> {
        &self.spec
    }

    /// Number of this environment's active agent rows this step.
    /// May be zero.
    pub fn player_num(&self) -> usize {
        self.player_num
    }

    /// The named field's view.
    pub fn get(&self, name: &str) -> Option<&Array> {
        self.spec.index_of(name).map(|i| &self.values[i])
    }

    /// The field view at schema position `index`.
    pub fn value(&self, index: usize) -> Option<&Array> {
        self.values.get(index)
    }

    /// Iterate `(name, array)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array)> {
        self.spec
            .iter()
            .map(|(name, _)| name)
            .zip(self.values.iter())
    }
}
