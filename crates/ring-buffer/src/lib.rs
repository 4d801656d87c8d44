//! Bounded Ring Buffer
//!
//! Fixed-capacity storage that keeps the most recent entries and discards the
//! oldest once full. Reads are newest-first.

mod buffer;

pub use buffer::{Iter, RingBuffer};

use thiserror::Error;

/// Ring buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    #[error("Ring buffer capacity must be at least 1")]
    ZeroCapacity,
}
