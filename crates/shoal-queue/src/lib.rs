//! Bounded, order-preserving state buffer queue.
//!
//! [`StateBufferQueue`] is the single shared mutable resource between
//! concurrently stepping environments. Producers call
//! [`allocate`](StateBufferQueue::allocate) for an exclusive writable
//! [`StateSlot`] tagged with an [`OrderToken`](shoal_core::OrderToken);
//! publishing the slot hands the finished record to the consumer side,
//! which drains records strictly in token order.
//!
//! Slots carry their own owned buffers and are frozen into shared
//! [`Array`](shoal_array::Array)s at publish time. This keeps the whole
//! crate free of `unsafe` at the cost of one buffer handoff per step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod queue;
pub mod slot;

pub use queue::{PublishedState, StateBufferQueue};
pub use slot::StateSlot;
