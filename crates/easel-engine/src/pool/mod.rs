//! GPU buffer recycling.
//!
//! Buffers are partitioned by frame slot: a buffer allocated for slot `k` is
//! only ever handed out again for slot `k`, so a frame still executing on the
//! GPU never shares storage with the frame being recorded.

mod buffer;
mod buffer_pool;
mod error;

pub use buffer::{BufferAllocator, BufferId, FrameSlot, PooledBuffer};
pub use buffer_pool::{BufferPool, PoolConfig};
pub use error::PoolError;
