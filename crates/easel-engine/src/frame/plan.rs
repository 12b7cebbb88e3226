use crate::coords::{FrameExtent, Rect};
use crate::draw::{BlendMode, ClearCmd, DepthState, PrimitiveTopology, TextureHandle};
use crate::pool::PooledBuffer;

/// Byte range inside a pooled buffer.
#[derive(Debug)]
pub struct BufferSlice<B> {
    pub buffer: PooledBuffer<B>,
    pub offset: u64,
    pub size: u64,
}

impl<B> Clone for BufferSlice<B> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            offset: self.offset,
            size: self.size,
        }
    }
}

/// Shader family a draw runs with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawKind {
    /// 2D: position/uv/color with one transform.
    Flat,
    /// 3D: normals, material and lights.
    Lit,
}

/// One draw call with its data already uploaded.
#[derive(Debug)]
pub struct PlannedDraw<B> {
    pub kind: DrawKind,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub texture: Option<TextureHandle>,
    /// `None` for 2D draws, which never test or write depth.
    pub depth: Option<DepthState>,
    pub uniforms: BufferSlice<B>,
    pub vertices: BufferSlice<B>,
    pub vertex_count: u32,
    /// Index data (`u32`, relative to the first vertex of `vertices`).
    pub indices: Option<BufferSlice<B>>,
    pub index_count: u32,
}

/// Resolved frame operation, replayed by the backend in order.
#[derive(Debug)]
pub enum PlannedOp<B> {
    Viewport(Rect),
    /// `None` disables scissoring.
    Scissor(Option<Rect>),
    Clear(ClearCmd),
    Draw(PlannedDraw<B>),
}

/// Everything a backend needs to encode one frame.
#[derive(Debug)]
pub struct FramePlan<B> {
    pub extent: FrameExtent,
    /// Applied when the frame's first render pass begins.
    pub clear: ClearCmd,
    pub ops: Vec<PlannedOp<B>>,
}

impl<B> FramePlan<B> {
    pub fn draw_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, PlannedOp::Draw(_))).count()
    }
}
