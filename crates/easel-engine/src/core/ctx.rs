use std::time::Duration;

use winit::window::Window;

use crate::coords::FrameExtent;
use crate::device::WgpuBackend;
use crate::draw::{DrawList, TextureHandle};
use crate::frame::FramePipeline;
use crate::pool::FrameSlot;
use crate::state::Context;

/// Context for one-time setup: texture upload and initial state.
pub struct SetupCtx<'a> {
    pub window: &'a Window,
    pub pipeline: &'a mut FramePipeline<WgpuBackend>,
    pub context: &'a mut Context,
}

impl SetupCtx<'_> {
    /// Uploads an RGBA8 image; `None` if the pixel buffer does not match the size.
    pub fn register_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Option<TextureHandle> {
        self.pipeline.backend_mut().register_texture(width, height, pixels)
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// The context's projection has already been reset to the screen; geometry
/// recorded into `list` is submitted when the callback returns.
pub struct FrameCtx<'a> {
    pub window: &'a Window,
    pub list: &'a mut DrawList,
    pub context: &'a mut Context,
    pub extent: FrameExtent,
    pub slot: FrameSlot,
    pub frame_index: u64,
    /// Time since the previous begun frame.
    pub dt: Duration,
    pub elapsed: Duration,
}

impl FrameCtx<'_> {
    /// Window size in logical pixels.
    #[inline]
    pub fn logical_size(&self) -> (f32, f32) {
        self.extent.logical_size()
    }
}
