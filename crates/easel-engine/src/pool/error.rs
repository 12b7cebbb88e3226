use thiserror::Error;

use super::FrameSlot;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("failed to allocate {size} bytes for {slot}: {reason}")]
    Allocation {
        size: u64,
        slot: FrameSlot,
        reason: String,
    },
    #[error("{slot} is out of range (pool has {slots} slots)")]
    InvalidSlot { slot: FrameSlot, slots: usize },
}
