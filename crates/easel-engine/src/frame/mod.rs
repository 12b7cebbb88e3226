//! Frame submission.
//!
//! Responsibilities:
//! - bound the frames in flight with a counting semaphore (backpressure at `begin_frame`)
//! - turn an optimized `DrawList` into a `FramePlan` backed by pooled buffers
//! - hand buffers back to the pool once the GPU reports completion
//!
//! The GPU itself sits behind `RenderBackend`; `device::WgpuBackend` is the real one.

mod backend;
mod config;
mod error;
mod pipeline;
mod plan;
mod semaphore;
mod uniforms;

pub use backend::{CompletionCallback, RenderBackend};
pub use config::{PipelineConfig, SortPolicy};
pub use error::FrameError;
pub use pipeline::{DropReason, FramePhase, FramePipeline, FrameReport, FrameStatus, PoolStats};
pub use plan::{BufferSlice, DrawKind, FramePlan, PlannedDraw, PlannedOp};
pub use semaphore::FrameSemaphore;
pub use uniforms::{FlatUniforms, LitUniforms};
