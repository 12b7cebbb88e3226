use crate::pool::BufferAllocator;

use super::{FrameError, FramePlan};

/// Invoked once the GPU has finished executing a submitted frame.
///
/// Dropping the callback without calling it has the same effect, so a backend
/// that fails to submit only needs to drop it.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// GPU seam of the frame pipeline.
///
/// The wgpu implementation lives in `device`; tests provide recording backends.
pub trait RenderBackend {
    type Buffer: Send + Sync + 'static;
    type Allocator: BufferAllocator<Buffer = Self::Buffer> + Send + 'static;
    /// Per-frame present target (a swapchain texture on wgpu).
    type Target;

    /// Allocator the pipeline's buffer pool creates buffers with.
    fn buffer_allocator(&self) -> Self::Allocator;

    /// Copies `data` into `buffer` at `offset`. Must be visible to the next `submit`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Encodes and submits `plan` to `target`, then presents it.
    ///
    /// `on_complete` must be called (or dropped) after the GPU stops reading
    /// the plan's buffers.
    fn submit(
        &mut self,
        target: Self::Target,
        plan: &FramePlan<Self::Buffer>,
        on_complete: CompletionCallback,
    ) -> Result<(), FrameError>;

    /// Gives the backend a chance to run pending completion callbacks. Must not block.
    fn poll(&self);
}
