use std::num::NonZeroU64;

use crate::coords::{PhysicalRect, Rect};
use crate::draw::{ClearCmd, TextureHandle};
use crate::frame::{
    BufferSlice, CompletionCallback, DrawKind, FrameError, FramePlan, PlannedDraw, PlannedOp,
    RenderBackend,
};
use crate::pool::{BufferAllocator, FrameSlot, PoolError};

use super::pipelines::{PipelineCache, PipelineKey, DEPTH_FORMAT};
use super::textures::TextureTable;

/// One acquired swapchain texture.
pub struct WgpuTarget {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

impl WgpuTarget {
    pub(crate) fn new(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self { surface_texture, view }
    }

    /// Physical size of the texture.
    pub fn size(&self) -> (u32, u32) {
        let t = &self.surface_texture.texture;
        (t.width(), t.height())
    }
}

/// Creates pooled buffers usable as vertex, index and uniform storage.
#[derive(Clone)]
pub struct WgpuAllocator {
    device: wgpu::Device,
    max_size: u64,
}

impl BufferAllocator for WgpuAllocator {
    type Buffer = wgpu::Buffer;

    fn allocate(&self, size: u64, slot: FrameSlot) -> Result<wgpu::Buffer, PoolError> {
        if size > self.max_size {
            return Err(PoolError::Allocation {
                size,
                slot,
                reason: format!("device buffer limit is {} bytes", self.max_size),
            });
        }
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("easel pooled buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }
}

struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

/// wgpu implementation of [`RenderBackend`].
///
/// Each frame is encoded into one command buffer. Clear commands end the
/// current render pass and start a new one that clears; viewport and scissor
/// state carry over into the new pass.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipelines: PipelineCache,
    textures: TextureTable,
    depth: Option<DepthTarget>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let textures = TextureTable::new(&device, &queue);
        let pipelines = PipelineCache::new(&device, format, textures.layout());
        Self {
            device,
            queue,
            pipelines,
            textures,
            depth: None,
        }
    }

    /// Uploads an RGBA8 image and returns its handle for draw commands.
    pub fn register_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Option<TextureHandle> {
        self.textures
            .register_rgba8(&self.device, &self.queue, width, height, pixels)
    }

    /// Draws still referencing `handle` fall back to white afterwards.
    pub fn unregister_texture(&mut self, handle: TextureHandle) -> bool {
        self.textures.unregister(handle)
    }

    pub fn texture_size(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.textures.size(handle)
    }

    fn ensure_depth(&mut self, width: u32, height: u32) {
        if self.depth.as_ref().is_some_and(|d| d.size == (width, height)) {
            return;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("easel depth texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some(DepthTarget {
            _texture: texture,
            view,
            size: (width, height),
        });
    }

    fn uniform_bind_group(&self, draw: &PlannedDraw<wgpu::Buffer>) -> wgpu::BindGroup {
        let layout = match draw.kind {
            DrawKind::Flat => &self.pipelines.flat_uniforms,
            DrawKind::Lit => &self.pipelines.lit_uniforms,
        };
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("easel draw uniforms"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: draw.uniforms.buffer.buffer(),
                    offset: draw.uniforms.offset,
                    size: NonZeroU64::new(draw.uniforms.size),
                }),
            }],
        })
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        plan: &FramePlan<wgpu::Buffer>,
        uniform_groups: &[wgpu::BindGroup],
    ) {
        let Some(depth) = self.depth.as_ref() else { return };
        let (width, height) = depth.size;
        let mut state = PassState {
            viewport: None,
            scissor: None,
            visible: true,
        };

        let mut ops = plan.ops.iter();
        let mut groups = uniform_groups.iter();
        let mut clear = Some(plan.clear);

        while let Some(pass_clear) = clear.take() {
            let mut pass = begin_pass(encoder, color_view, &depth.view, pass_clear);
            state.apply(&mut pass, plan.extent.scale, width, height);

            for op in ops.by_ref() {
                match op {
                    PlannedOp::Clear(next) => {
                        clear = Some(*next);
                        break;
                    }
                    PlannedOp::Viewport(rect) => {
                        state.viewport = Some(*rect);
                        state.apply(&mut pass, plan.extent.scale, width, height);
                    }
                    PlannedOp::Scissor(rect) => {
                        state.scissor = *rect;
                        state.apply(&mut pass, plan.extent.scale, width, height);
                    }
                    PlannedOp::Draw(draw) => {
                        let Some(group) = groups.next() else { break };
                        if state.visible {
                            self.encode_draw(&mut pass, draw, group);
                        }
                    }
                }
            }
        }
    }

    fn encode_draw(&self, pass: &mut wgpu::RenderPass<'_>, draw: &PlannedDraw<wgpu::Buffer>, uniforms: &wgpu::BindGroup) {
        let Some(pipeline) = self.pipelines.get(&pipeline_key(draw)) else {
            log::warn!("no pipeline for draw {:?}/{:?}; skipped", draw.kind, draw.topology);
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, uniforms, &[]);
        pass.set_bind_group(1, self.textures.bind_group(draw.texture), &[]);
        pass.set_vertex_buffer(0, buffer_slice(&draw.vertices));

        match &draw.indices {
            Some(indices) => {
                pass.set_index_buffer(buffer_slice(indices), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
            None => pass.draw(0..draw.vertex_count, 0..1),
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Allocator = WgpuAllocator;
    type Target = WgpuTarget;

    fn buffer_allocator(&self) -> WgpuAllocator {
        WgpuAllocator {
            device: self.device.clone(),
            max_size: self.device.limits().max_buffer_size,
        }
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn submit(
        &mut self,
        target: WgpuTarget,
        plan: &FramePlan<wgpu::Buffer>,
        on_complete: CompletionCallback,
    ) -> Result<(), FrameError> {
        validate(plan)?;

        let (width, height) = target.size();
        self.ensure_depth(width, height);

        let mut uniform_groups = Vec::with_capacity(plan.draw_count());
        for op in &plan.ops {
            if let PlannedOp::Draw(draw) = op {
                self.pipelines.ensure(&self.device, pipeline_key(draw));
                uniform_groups.push(self.uniform_bind_group(draw));
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("easel frame encoder"),
            });
        self.encode(&mut encoder, &target.view, plan, &uniform_groups);

        self.queue.submit(std::iter::once(encoder.finish()));
        self.queue.on_submitted_work_done(on_complete);
        target.surface_texture.present();
        Ok(())
    }

    fn poll(&self) {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::debug!("device poll failed: {err}");
        }
    }
}

/// Viewport and scissor state reapplied at the start of every render pass.
struct PassState {
    viewport: Option<Rect>,
    scissor: Option<Rect>,
    /// False when the viewport or scissor leaves nothing on screen.
    visible: bool,
}

impl PassState {
    fn apply(&mut self, pass: &mut wgpu::RenderPass<'_>, scale: f32, width: u32, height: u32) {
        let full = PhysicalRect {
            x: 0,
            y: 0,
            width,
            height,
        };
        let viewport = match self.viewport {
            Some(r) => r.to_physical(scale, width, height),
            None => Some(full),
        };
        let scissor = match self.scissor {
            Some(r) => r.to_physical(scale, width, height),
            None => Some(full),
        };

        self.visible = viewport.is_some() && scissor.is_some();
        if let (Some(v), Some(s)) = (viewport, scissor) {
            pass.set_viewport(v.x as f32, v.y as f32, v.width as f32, v.height as f32, 0.0, 1.0);
            pass.set_scissor_rect(s.x, s.y, s.width, s.height);
        }
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color_view: &wgpu::TextureView,
    depth_view: &wgpu::TextureView,
    clear: ClearCmd,
) -> wgpu::RenderPass<'e> {
    let [r, g, b, a] = clear.color.map(f64::from);
    let color_load = if clear.clear_color {
        wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a })
    } else {
        wgpu::LoadOp::Load
    };
    let depth_load = if clear.clear_depth {
        wgpu::LoadOp::Clear(clear.depth)
    } else {
        wgpu::LoadOp::Load
    };

    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("easel frame pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: color_load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn pipeline_key(draw: &PlannedDraw<wgpu::Buffer>) -> PipelineKey {
    PipelineKey {
        kind: draw.kind,
        topology: draw.topology,
        blend: draw.blend,
        depth: draw.depth.unwrap_or_default(),
    }
}

fn buffer_slice(slice: &BufferSlice<wgpu::Buffer>) -> wgpu::BufferSlice<'_> {
    slice.buffer.buffer().slice(slice.offset..slice.offset + slice.size)
}

fn validate(plan: &FramePlan<wgpu::Buffer>) -> Result<(), FrameError> {
    let check = |s: &BufferSlice<wgpu::Buffer>| {
        let capacity = s.buffer.capacity();
        match s.offset.checked_add(s.size) {
            Some(end) if s.size > 0 && end <= capacity => Ok(()),
            _ => Err(FrameError::InvalidSlice {
                offset: s.offset,
                size: s.size,
                capacity,
            }),
        }
    };
    for op in &plan.ops {
        if let PlannedOp::Draw(draw) = op {
            check(&draw.uniforms)?;
            check(&draw.vertices)?;
            if let Some(indices) = &draw.indices {
                check(indices)?;
            }
        }
    }
    Ok(())
}
