use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::coords::FrameExtent;
use crate::draw::{
    BlendMode, ClearCmd, DepthState, DrawCmd, DrawList, GeometryRange, GeometryStore,
    PrimitiveTopology, TextureHandle,
};
use crate::pool::{BufferAllocator, BufferPool, FrameSlot, PoolError, PooledBuffer};

use super::uniforms::{FlatUniforms, LitUniforms};
use super::{
    BufferSlice, DrawKind, FramePlan, FrameSemaphore, PipelineConfig, PlannedDraw, PlannedOp,
    RenderBackend,
};

/// Vertex data starts at a 16-byte boundary after the uniform block.
const VERTEX_ALIGN: u64 = 16;
const INDEX_ALIGN: u64 = 4;

/// Where the current frame is in `begin_frame` → `end_frame`.
///
/// Completion is asynchronous and tracked by the slot semaphore, not by this phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    Idle,
    Begun,
    Recorded,
    Submitted,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DropReason {
    /// No present target was supplied.
    NoSurface,
    /// Zero-sized target or invalid content scale.
    ZeroSize,
    /// No frame slot freed up within the configured wait.
    GpuBusy,
    /// A frame is already being recorded.
    NotIdle,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Begun(FrameSlot),
    Dropped(DropReason),
}

impl FrameStatus {
    #[inline]
    pub fn is_begun(self) -> bool {
        matches!(self, Self::Begun(_))
    }
}

/// Outcome of one `end_frame`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub slot: FrameSlot,
    /// Commands in the draw list before merging.
    pub recorded: usize,
    /// Commands folded away by `optimize()`.
    pub merged: usize,
    pub sorted: bool,
    /// Draw calls handed to the backend.
    pub submitted: usize,
    /// Draws skipped for bad ranges or failed buffer acquisition.
    pub dropped: usize,
    pub bytes_uploaded: u64,
    /// False when the backend rejected the frame.
    pub presented: bool,
}

/// Snapshot of the buffer pool counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub size: usize,
    pub acquired: usize,
    pub available: usize,
    pub allocated_bytes: u64,
}

type SharedPool<A> = Arc<Mutex<BufferPool<A>>>;

/// Returns a frame's buffers and its semaphore permit when dropped.
///
/// Moved into the backend's completion callback, so release happens after the
/// GPU is done with the frame whether the callback is invoked or dropped.
struct SlotRelease<A: BufferAllocator> {
    pool: SharedPool<A>,
    semaphore: Arc<FrameSemaphore>,
    slot: FrameSlot,
    buffers: Vec<PooledBuffer<A::Buffer>>,
}

impl<A: BufferAllocator> Drop for SlotRelease<A> {
    fn drop(&mut self) {
        {
            let mut pool = lock(&self.pool);
            for buffer in &self.buffers {
                pool.release(buffer);
            }
        }
        self.semaphore.release(self.slot);
        log::trace!("{} completed; released {} buffer(s)", self.slot, self.buffers.len());
    }
}

/// Multi-buffered frame submission.
///
/// Up to `frames_in_flight` frames may be recorded or executing at once. Each
/// frame gets the next slot in rotation; `begin_frame` blocks (bounded by
/// `wait_timeout`) until the GPU has finished with the oldest frame.
///
/// Typical frame:
/// 1. `begin_frame(target, w, h, scale)`
/// 2. record into `draw_list_mut()` or forward lists with `draw()`
/// 3. `end_frame()`
pub struct FramePipeline<B: RenderBackend> {
    backend: B,
    config: PipelineConfig,
    pool: SharedPool<B::Allocator>,
    semaphore: Arc<FrameSemaphore>,
    lists: Vec<DrawList>,

    phase: FramePhase,
    frames_begun: u64,
    frame_index: u64,
    next_slot: FrameSlot,
    slot: FrameSlot,
    target: Option<B::Target>,
    extent: FrameExtent,
}

impl<B: RenderBackend> FramePipeline<B> {
    pub fn new(backend: B, config: PipelineConfig) -> Self {
        let frames = config.frames_in_flight.max(1);
        let pool = BufferPool::new(backend.buffer_allocator(), frames, config.pool);

        Self {
            backend,
            pool: Arc::new(Mutex::new(pool)),
            semaphore: Arc::new(FrameSemaphore::new(frames as usize)),
            lists: (0..frames).map(|_| DrawList::new()).collect(),
            config,
            phase: FramePhase::Idle,
            frames_begun: 0,
            frame_index: 0,
            next_slot: FrameSlot(0),
            slot: FrameSlot(0),
            target: None,
            extent: FrameExtent::new(0, 0, 1.0),
        }
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn frames_in_flight(&self) -> u32 {
        self.lists.len() as u32
    }

    /// Index of the most recently begun frame.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Slot of the frame being recorded, if any.
    pub fn current_slot(&self) -> Option<FrameSlot> {
        (self.phase == FramePhase::Begun).then_some(self.slot)
    }

    /// Extent of the frame being recorded (or of the last one).
    #[inline]
    pub fn extent(&self) -> FrameExtent {
        self.extent
    }

    /// Frames submitted whose GPU work has not completed yet.
    pub fn in_flight(&self) -> usize {
        let recording = usize::from(self.phase == FramePhase::Begun);
        self.semaphore.capacity() - self.semaphore.available() - recording
    }

    pub fn pool_stats(&self) -> PoolStats {
        let pool = lock(&self.pool);
        PoolStats {
            size: pool.pool_size(),
            acquired: pool.acquired_count(),
            available: pool.available_count(),
            allocated_bytes: pool.allocated_bytes(),
        }
    }

    /// Starts a frame on the next slot.
    ///
    /// Blocks until that slot's previous frame has completed, polling the
    /// backend meanwhile. Other free slots are not taken out of turn. The frame
    /// is dropped (nothing is recorded or submitted) when there is no target,
    /// the size is zero, or the slot is not released within `wait_timeout`.
    pub fn begin_frame(&mut self, target: Option<B::Target>, width: u32, height: u32, scale: f32) -> FrameStatus {
        if self.phase == FramePhase::Begun {
            log::warn!("begin_frame called while frame {} is still recording; dropped", self.frame_index);
            return FrameStatus::Dropped(DropReason::NotIdle);
        }
        let Some(target) = target else {
            log::debug!("frame dropped: no present target");
            return FrameStatus::Dropped(DropReason::NoSurface);
        };
        let extent = FrameExtent::new(width, height, scale);
        if !extent.is_drawable() {
            log::debug!("frame dropped: target is {width}x{height} @ {scale}");
            return FrameStatus::Dropped(DropReason::ZeroSize);
        }
        let slot = self.next_slot;
        if !self.wait_for_slot(slot) {
            log::debug!("frame dropped: {slot} not released within {:?}", self.config.wait_timeout);
            return FrameStatus::Dropped(DropReason::GpuBusy);
        }
        self.next_slot = slot.next(self.frames_in_flight());
        lock(&self.pool).reset_frame(slot);
        self.lists[slot.index()].reset();

        self.slot = slot;
        self.target = Some(target);
        self.extent = extent;
        self.frame_index = self.frames_begun;
        self.frames_begun += 1;
        self.phase = FramePhase::Begun;

        log::trace!("frame {} begun on {slot}", self.frame_index);
        FrameStatus::Begun(slot)
    }

    /// Draw list of the frame being recorded.
    pub fn draw_list_mut(&mut self) -> Option<&mut DrawList> {
        if self.phase != FramePhase::Begun {
            return None;
        }
        self.lists.get_mut(self.slot.index())
    }

    /// Appends `list` (geometry and commands) to the current frame.
    pub fn draw(&mut self, list: &DrawList) {
        match self.draw_list_mut() {
            Some(active) => active.append(list),
            None => log::warn!("draw called outside begin_frame/end_frame; ignored"),
        }
    }

    /// Merges, optionally sorts, uploads and submits the current frame.
    ///
    /// Draws whose geometry cannot be resolved or whose buffer cannot be
    /// acquired are skipped; the rest of the frame is still submitted.
    pub fn end_frame(&mut self) -> FrameReport {
        if self.phase != FramePhase::Begun {
            log::warn!("end_frame called without a begun frame; ignored");
            return FrameReport::default();
        }

        let slot = self.slot;
        let list = &mut self.lists[slot.index()];
        let recorded = list.command_count();
        list.optimize();
        let sorted = self.config.sort_policy.should_sort(list.texture_switches());
        if sorted {
            list.sort_commands();
        }
        self.phase = FramePhase::Recorded;

        let mut report = FrameReport {
            frame_index: self.frame_index,
            slot,
            recorded,
            merged: list.batch_count(),
            sorted,
            ..FrameReport::default()
        };

        let mut plan = FramePlan {
            extent: self.extent,
            clear: ClearCmd::color(self.config.clear_color),
            ops: Vec::with_capacity(list.command_count()),
        };
        let mut buffers = Vec::new();
        {
            let mut pool = lock(&self.pool);
            for cmd in list.commands() {
                let op = match cmd {
                    DrawCmd::SetViewport(rect) => PlannedOp::Viewport(*rect),
                    DrawCmd::SetScissor { rect, enabled } => PlannedOp::Scissor(enabled.then_some(*rect)),
                    DrawCmd::Clear(clear) => PlannedOp::Clear(*clear),
                    DrawCmd::Draw2D(_) | DrawCmd::Draw3D(_) => {
                        match stage_draw(&self.backend, &mut pool, slot, list.geometry(), cmd) {
                            Ok(Some(staged)) => {
                                report.bytes_uploaded += staged.bytes;
                                buffers.push(staged.buffer);
                                PlannedOp::Draw(staged.draw)
                            }
                            Ok(None) => {
                                report.dropped += 1;
                                continue;
                            }
                            Err(err) => {
                                log::warn!("draw dropped: {err}");
                                report.dropped += 1;
                                continue;
                            }
                        }
                    }
                };
                plan.ops.push(op);
            }
        }
        report.submitted = plan.draw_count();

        let release = SlotRelease {
            pool: Arc::clone(&self.pool),
            semaphore: Arc::clone(&self.semaphore),
            slot,
            buffers,
        };
        self.phase = FramePhase::Submitted;

        let Some(target) = self.target.take() else {
            log::warn!("frame {} lost its target before submission", self.frame_index);
            return report;
        };
        match self.backend.submit(target, &plan, Box::new(move || drop(release))) {
            Ok(()) => report.presented = true,
            Err(err) => log::error!("frame {} not presented: {err}", self.frame_index),
        }
        report
    }

    /// Waits for every in-flight frame, then drops all pooled buffers.
    ///
    /// Returns `false` (and keeps the pool) when frames are still executing
    /// after `wait_timeout`, or when called mid-frame.
    pub fn reset_resources(&mut self) -> bool {
        if self.phase == FramePhase::Begun {
            log::warn!("reset_resources called while recording; ignored");
            return false;
        }

        let deadline = Instant::now() + self.config.wait_timeout;
        while self.semaphore.available() < self.semaphore.capacity() {
            self.backend.poll();
            if Instant::now() >= deadline {
                log::warn!("reset_resources: {} frame(s) still in flight; pool kept", self.in_flight());
                return false;
            }
            std::thread::sleep(self.config.poll_interval);
        }

        lock(&self.pool).clear();
        for list in &mut self.lists {
            list.reset();
        }
        true
    }

    fn wait_for_slot(&self, slot: FrameSlot) -> bool {
        let deadline = Instant::now() + self.config.wait_timeout;
        loop {
            if self.semaphore.try_acquire(slot) {
                return true;
            }
            self.backend.poll();

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = self.config.poll_interval.min(deadline - now);
            if self.semaphore.acquire_timeout(slot, wait) {
                return true;
            }
        }
    }
}

struct DrawHeader {
    kind: DrawKind,
    range: GeometryRange,
    topology: PrimitiveTopology,
    blend: BlendMode,
    texture: Option<TextureHandle>,
    depth: Option<DepthState>,
}

struct Staged<B> {
    draw: PlannedDraw<B>,
    buffer: PooledBuffer<B>,
    bytes: u64,
}

/// Rewrites absolute store indices so 0 addresses the draw's first vertex.
///
/// `None` when any index falls outside the draw's vertex range.
fn relative_indices(absolute: &[u32], range: &GeometryRange) -> Option<Vec<u32>> {
    absolute
        .iter()
        .map(|&i| i.checked_sub(range.vertex_offset).filter(|&r| r < range.vertex_count))
        .collect()
}

/// Uploads one draw's uniforms, vertices and indices into a single pooled buffer.
///
/// Layout: uniforms at 0, vertices at the next 16-byte boundary, indices after.
/// Returns `Ok(None)` when the command's range does not fit the geometry store.
fn stage_draw<B: RenderBackend>(
    backend: &B,
    pool: &mut BufferPool<B::Allocator>,
    slot: FrameSlot,
    geometry: &GeometryStore,
    cmd: &DrawCmd,
) -> Result<Option<Staged<B::Buffer>>, PoolError> {
    let (header, uniforms, vertices) = match cmd {
        DrawCmd::Draw2D(d) => {
            let Some(v) = geometry.slice_2d(d.range.vertex_offset, d.range.vertex_count) else {
                return Ok(skip_malformed(&d.range));
            };
            let header = DrawHeader {
                kind: DrawKind::Flat,
                range: d.range,
                topology: d.topology,
                blend: d.blend,
                texture: d.texture,
                depth: None,
            };
            let u = FlatUniforms::from_draw(d);
            (header, bytemuck::bytes_of(&u).to_vec(), bytemuck::cast_slice::<_, u8>(v))
        }
        DrawCmd::Draw3D(d) => {
            let Some(v) = geometry.slice_3d(d.range.vertex_offset, d.range.vertex_count) else {
                return Ok(skip_malformed(&d.range));
            };
            let header = DrawHeader {
                kind: DrawKind::Lit,
                range: d.range,
                topology: d.topology,
                blend: d.blend,
                texture: d.texture,
                depth: Some(d.depth),
            };
            let u = LitUniforms::from_draw(d);
            (header, bytemuck::bytes_of(&u).to_vec(), bytemuck::cast_slice::<_, u8>(v))
        }
        _ => return Ok(None),
    };
    let range = header.range;
    if range.vertex_count == 0 {
        return Ok(None);
    }

    let indices = if range.is_indexed() {
        let Some(absolute) = geometry.slice_indices(range.index_offset, range.index_count) else {
            return Ok(skip_malformed(&range));
        };
        match relative_indices(absolute, &range) {
            Some(i) => i,
            None => return Ok(skip_malformed(&range)),
        }
    } else {
        Vec::new()
    };
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

    let uniform_size = uniforms.len() as u64;
    let vertex_offset = uniform_size.next_multiple_of(VERTEX_ALIGN);
    let vertex_size = vertices.len() as u64;
    let index_offset = (vertex_offset + vertex_size).next_multiple_of(INDEX_ALIGN);
    let index_size = index_bytes.len() as u64;

    let buffer = pool.acquire(index_offset + index_size, slot)?;
    backend.write_buffer(buffer.buffer(), 0, &uniforms);
    backend.write_buffer(buffer.buffer(), vertex_offset, vertices);
    if index_size > 0 {
        backend.write_buffer(buffer.buffer(), index_offset, index_bytes);
    }

    let slice = |offset, size| BufferSlice {
        buffer: buffer.clone(),
        offset,
        size,
    };
    let draw = PlannedDraw {
        kind: header.kind,
        topology: header.topology,
        blend: header.blend,
        texture: header.texture,
        depth: header.depth,
        uniforms: slice(0, uniform_size),
        vertices: slice(vertex_offset, vertex_size),
        vertex_count: range.vertex_count,
        indices: range.is_indexed().then(|| slice(index_offset, index_size)),
        index_count: range.index_count,
    };

    Ok(Some(Staged {
        draw,
        buffer,
        bytes: uniform_size + vertex_size + index_size,
    }))
}

fn skip_malformed<T>(range: &GeometryRange) -> Option<T> {
    log::warn!("draw skipped: range {range:?} is outside the frame's geometry");
    None
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
