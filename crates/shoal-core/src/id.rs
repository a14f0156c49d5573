//! Strongly-typed identifiers for environments and output ordering.

use std::fmt;

/// Identifies one environment instance within a pool.
///
/// Environments are created at pool construction and assigned sequential
/// IDs. `EnvId(n)` is the n-th environment; the ID is immutable and unique
/// for the lifetime of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(pub u32);

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EnvId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Logical position of one step's output in a queue's publication sequence.
///
/// Tokens are handed to an environment per step by the driver and form a
/// monotonic `u64` sequence per queue. The queue publishes slots in token
/// order, independent of which environment finishes computing first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderToken(pub u64);

impl fmt::Display for OrderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderToken {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
