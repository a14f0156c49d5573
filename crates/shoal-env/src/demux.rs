//! Action demultiplexing: one environment's view of the shared batch.
//!
//! Two algorithms, selected once at construction by the environment's
//! player mode:
//!
//! - **single-player** — every environment owns exactly one agent row,
//!   at its own batch index: player-indexed fields take a one-row
//!   zero-copy slice, scalar fields take the element at that index.
//! - **multi-player** — the owner column (action field 1) names, for
//!   every agent row in the batch, the owning environment. The rows
//!   belonging to one environment are usually adjacent; when they are,
//!   every player-indexed field is a single zero-copy range slice.
//!   Only when the scheduler has interleaved agents from different
//!   environments does the demux fall back to a row-by-row copy.
//!
//! Collected row order is scan order (ascending batch index), so agent
//! ordering in the result is stable for a fixed batch layout.

use smallvec::SmallVec;

use shoal_array::Array;
use shoal_core::{DemuxError, EnvId, RecordSpec};

/// Scratch capacity for collected agent rows; pools rarely run more
/// agents per environment than this, and overflow just spills to the heap.
type RowPositions = SmallVec<[usize; 16]>;

/// One environment's freshly demultiplexed action arrays.
#[derive(Debug)]
pub(crate) struct RawAction {
    /// One array per action field, in schema order.
    pub arrays: Vec<Array>,
    /// Agent rows owned by the environment this step.
    pub player_num: usize,
}

/// Single-player demux: one agent row per environment at `env_index`.
pub(crate) fn demux_single(
    batch: &[Array],
    env_index: usize,
    player_fields: &[bool],
) -> Result<RawAction, DemuxError> {
    check_field_count(batch, player_fields)?;
    let mut arrays = Vec::with_capacity(batch.len());
    for (array, &is_player) in batch.iter().zip(player_fields) {
        if is_player {
            arrays.push(row_slice(array, env_index, env_index + 1)?);
        } else {
            arrays.push(element_view(array, env_index)?);
        }
    }
    Ok(RawAction {
        arrays,
        player_num: 1,
    })
}

/// Multi-player demux: collect this environment's rows from the owner
/// column, then slice (contiguous) or gather (scattered) each
/// player-indexed field.
pub(crate) fn demux_multi(
    batch: &[Array],
    env_id: EnvId,
    env_index: usize,
    player_fields: &[bool],
) -> Result<RawAction, DemuxError> {
    check_field_count(batch, player_fields)?;
    let owner_column = batch
        .get(RecordSpec::ACTION_PLAYERS_ENV_ID)
        .ok_or(DemuxError::MissingOwnerColumn)?;

    let positions = collect_owned_rows(owner_column, env_id)?;
    let player_num = positions.len();

    // Contiguous run: the owned rows form an unbroken ascending range,
    // so a single range slice covers them without copying. Zero rows
    // degenerate to the empty slice.
    let contiguous_range = if player_num == 0 {
        Some((0, 0))
    } else {
        let first = positions[0];
        let last = positions[player_num - 1];
        if last - first + 1 == player_num {
            Some((first, last + 1))
        } else {
            None
        }
    };

    let mut arrays = Vec::with_capacity(batch.len());
    for (array, &is_player) in batch.iter().zip(player_fields) {
        if is_player {
            let view = match contiguous_range {
                Some((start, end)) => row_slice(array, start, end)?,
                None => gather(array, &positions)?,
            };
            arrays.push(view);
        } else {
            arrays.push(element_view(array, env_index)?);
        }
    }
    Ok(RawAction { arrays, player_num })
}

fn check_field_count(batch: &[Array], player_fields: &[bool]) -> Result<(), DemuxError> {
    if batch.len() != player_fields.len() {
        return Err(DemuxError::FieldCountMismatch {
            got: batch.len(),
            expected: player_fields.len(),
        });
    }
    Ok(())
}

/// Scan the owner column, collecting rows owned by `env_id` in
/// ascending batch order. Entries must be non-negative integers.
fn collect_owned_rows(owner_column: &Array, env_id: EnvId) -> Result<RowPositions, DemuxError> {
    let target = env_id.0 as f32;
    let mut positions = RowPositions::new();
    for (row, &value) in owner_column.as_slice().iter().enumerate() {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(DemuxError::MalformedOwnerId { row, value });
        }
        if value == target {
            positions.push(row);
        }
    }
    Ok(positions)
}

fn row_slice(array: &Array, start: usize, end: usize) -> Result<Array, DemuxError> {
    array
        .slice_rows(start, end)
        .map_err(|_| DemuxError::EnvIndexOutOfRange {
            index: end.saturating_sub(1),
            rows: array.rows(),
        })
}

fn element_view(array: &Array, index: usize) -> Result<Array, DemuxError> {
    array
        .index(index)
        .map_err(|_| DemuxError::EnvIndexOutOfRange {
            index,
            rows: array.rows(),
        })
}

fn gather(array: &Array, positions: &[usize]) -> Result<Array, DemuxError> {
    array
        .gather_rows(positions)
        .map_err(|_| DemuxError::EnvIndexOutOfRange {
            index: positions.last().copied().unwrap_or(0),
            rows: array.rows(),
        })
}
