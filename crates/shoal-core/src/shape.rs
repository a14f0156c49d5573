//! Field shape declarations and ordered record schemas.
//!
//! A [`ShapeSpec`] declares the shape of one named field. A leading
//! dimension of −1 marks the field as *player-indexed*: its row count
//! varies with the number of active agents. A [`RecordSpec`] is the
//! ordered name → shape schema for a whole record (action or state),
//! including the bookkeeping fields the queue contract mandates.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::SpecError;

/// Sentinel leading-dimension value marking a player-indexed field.
pub const PLAYER_DIM: i64 = -1;

/// Declared shape of a single field.
///
/// Dimensions are stored as `i64` so the leading slot can carry the
/// [`PLAYER_DIM`] sentinel; every other dimension must be ≥ 1. Shapes up
/// to 4 dimensions stay inline (no heap allocation).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeSpec {
    dims: SmallVec<[i64; 4]>,
}

impl ShapeSpec {
    /// A scalar field: one element per environment (or per record).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    /// A fixed-shape field with the given dimensions.
    pub fn fixed(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().map(|&d| d as i64).collect(),
        }
    }

    /// A player-indexed field: `PLAYER_DIM` leading dimension followed by
    /// the per-agent dimensions.
    pub fn per_player(dims: &[usize]) -> Self {
        let mut out: SmallVec<[i64; 4]> = SmallVec::new();
        out.push(PLAYER_DIM);
        out.extend(dims.iter().map(|&d| d as i64));
        Self { dims: out }
    }

    /// Build from raw dimensions, validating the sentinel placement.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidShape`] if −1 appears anywhere but the
    /// leading slot, or any dimension is < 1 (other than the sentinel).
    pub fn from_dims(dims: &[i64]) -> Result<Self, SpecError> {
        let spec = Self {
            dims: dims.iter().copied().collect(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check sentinel placement and dimension positivity.
    pub fn validate(&self) -> Result<(), SpecError> {
        for (i, &d) in self.dims.iter().enumerate() {
            if d == PLAYER_DIM && i == 0 {
                continue;
            }
            if d < 1 {
                return Err(SpecError::InvalidShape {
                    dims: self.dims.to_vec(),
                });
            }
        }
        Ok(())
    }

    /// The declared dimensions, sentinel included.
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Whether the leading dimension is agent-count-variable.
    pub fn is_player_indexed(&self) -> bool {
        self.dims.first() == Some(&PLAYER_DIM)
    }

    /// Elements per row: the product of all dimensions after the leading
    /// one for player-indexed fields, or of all dimensions otherwise.
    pub fn row_len(&self) -> usize {
        let tail = if self.is_player_indexed() {
            &self.dims[1..]
        } else {
            &self.dims[..]
        };
        tail.iter().map(|&d| d as usize).product()
    }

    /// Concrete shape for `player_num` agents: the sentinel is replaced
    /// by `player_num`; fixed shapes are returned unchanged.
    pub fn resolve(&self, player_num: usize) -> SmallVec<[usize; 4]> {
        self.dims
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                if i == 0 && d == PLAYER_DIM {
                    player_num
                } else {
                    d as usize
                }
            })
            .collect()
    }

    /// Total element count for `player_num` agents.
    pub fn resolved_len(&self, player_num: usize) -> usize {
        self.resolve(player_num).iter().product()
    }
}

// ── RecordSpec ─────────────────────────────────────────────────────

/// Name of the episode-termination flag in a state record.
pub const DONE: &str = "done";
/// Name of the owning-environment scalar in action and state records.
pub const ENV_ID: &str = "env_id";
/// Name of the elapsed-step counter in a state record.
pub const ELAPSED_STEP: &str = "elapsed_step";
/// Name of the per-player owning-environment column.
pub const PLAYERS_ENV_ID: &str = "players.env_id";

const RESERVED: [&str; 4] = [DONE, ENV_ID, ELAPSED_STEP, PLAYERS_ENV_ID];

/// Ordered field-name → [`ShapeSpec`] schema for one record.
///
/// Field order is declaration order and is significant: batched arrays,
/// demultiplexed action views, and state slots all index fields by
/// position. Built via [`RecordSpec::action`] or [`RecordSpec::state`],
/// which inject the reserved bookkeeping fields at fixed indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSpec {
    fields: IndexMap<String, ShapeSpec>,
}

impl RecordSpec {
    /// Index of `done` in a state record.
    pub const STATE_DONE: usize = 0;
    /// Index of `env_id` in a state record.
    pub const STATE_ENV_ID: usize = 1;
    /// Index of `elapsed_step` in a state record.
    pub const STATE_ELAPSED_STEP: usize = 2;
    /// Index of `players.env_id` in a state record.
    pub const STATE_PLAYERS_ENV_ID: usize = 3;

    /// Index of `env_id` in an action record.
    pub const ACTION_ENV_ID: usize = 0;
    /// Index of `players.env_id` in an action record — the owner column
    /// consumed by multi-player demultiplexing.
    pub const ACTION_PLAYERS_ENV_ID: usize = 1;

    /// Build an action schema: `env_id`, `players.env_id`, then the user
    /// fields in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] on empty/duplicate/reserved user field names
    /// or invalid shapes.
    pub fn action<'a, I>(user_fields: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = (&'a str, ShapeSpec)>,
    {
        let mut spec = Self {
            fields: IndexMap::new(),
        };
        spec.fields.insert(ENV_ID.to_string(), ShapeSpec::scalar());
        spec.fields
            .insert(PLAYERS_ENV_ID.to_string(), ShapeSpec::per_player(&[]));
        spec.push_user_fields(user_fields)?;
        Ok(spec)
    }

    /// Build a state schema: `done`, `env_id`, `elapsed_step`,
    /// `players.env_id`, then the user fields in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] on empty/duplicate/reserved user field names
    /// or invalid shapes.
    pub fn state<'a, I>(user_fields: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = (&'a str, ShapeSpec)>,
    {
        let mut spec = Self {
            fields: IndexMap::new(),
        };
        spec.fields.insert(DONE.to_string(), ShapeSpec::scalar());
        spec.fields.insert(ENV_ID.to_string(), ShapeSpec::scalar());
        spec.fields
            .insert(ELAPSED_STEP.to_string(), ShapeSpec::scalar());
        spec.fields
            .insert(PLAYERS_ENV_ID.to_string(), ShapeSpec::per_player(&[]));
        spec.push_user_fields(user_fields)?;
        Ok(spec)
    }

    fn push_user_fields<'a, I>(&mut self, user_fields: I) -> Result<(), SpecError>
    where
        I: IntoIterator<Item = (&'a str, ShapeSpec)>,
    {
        for (name, shape) in user_fields {
            if name.is_empty() {
                return Err(SpecError::EmptyName);
            }
            if RESERVED.contains(&name) {
                return Err(SpecError::ReservedField {
                    name: name.to_string(),
                });
            }
            shape.validate()?;
            if self.fields.insert(name.to_string(), shape).is_some() {
                return Err(SpecError::DuplicateField {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether `name` is one of the queue-mandated bookkeeping fields.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED.contains(&name)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shape of the named field.
    pub fn get(&self, name: &str) -> Option<&ShapeSpec> {
        self.fields.get(name)
    }

    /// Name and shape of the field at `index`.
    pub fn get_index(&self, index: usize) -> Option<(&str, &ShapeSpec)> {
        self.fields
            .get_index(index)
            .map(|(name, shape)| (name.as_str(), shape))
    }

    /// Positional index of the named field.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    /// Iterate `(name, shape)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShapeSpec)> {
        self.fields
            .iter()
            .map(|(name, shape)| (name.as_str(), shape))
    }
}
