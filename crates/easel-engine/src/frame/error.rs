use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer slice {offset}+{size} exceeds buffer capacity {capacity}")]
    InvalidSlice { offset: u64, size: u64, capacity: u64 },
    #[error("frame submission failed: {0}")]
    Submit(String),
}
