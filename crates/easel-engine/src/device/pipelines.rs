use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::draw::{BlendMode, DepthState, PrimitiveTopology, Vertex2D, Vertex3D};
use crate::frame::{DrawKind, FlatUniforms, LitUniforms};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) struct PipelineKey {
    pub kind: DrawKind,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub depth: DepthState,
}

/// Render pipelines built lazily per [`PipelineKey`].
pub(crate) struct PipelineCache {
    format: wgpu::TextureFormat,
    flat_shader: wgpu::ShaderModule,
    lit_shader: wgpu::ShaderModule,
    flat_layout: wgpu::PipelineLayout,
    lit_layout: wgpu::PipelineLayout,
    pub flat_uniforms: wgpu::BindGroupLayout,
    pub lit_uniforms: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, texture_layout: &wgpu::BindGroupLayout) -> Self {
        let flat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel draw2d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });
        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("easel draw3d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw3d.wgsl").into()),
        });

        let flat_uniforms = uniform_layout(device, "easel draw2d uniforms", uniform_size::<FlatUniforms>());
        let lit_uniforms = uniform_layout(device, "easel draw3d uniforms", uniform_size::<LitUniforms>());

        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel draw2d pipeline layout"),
            bind_group_layouts: &[&flat_uniforms, texture_layout],
            immediate_size: 0,
        });
        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("easel draw3d pipeline layout"),
            bind_group_layouts: &[&lit_uniforms, texture_layout],
            immediate_size: 0,
        });

        Self {
            format,
            flat_shader,
            lit_shader,
            flat_layout,
            lit_layout,
            flat_uniforms,
            lit_uniforms,
            pipelines: HashMap::new(),
        }
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("creating render pipeline for {key:?}");
        let pipeline = self.build(device, key);
        self.pipelines.insert(key, pipeline);
    }

    fn build(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        let (shader, layout, vertex_layout) = match key.kind {
            DrawKind::Flat => (&self.flat_shader, &self.flat_layout, vertex_2d_layout()),
            DrawKind::Lit => (&self.lit_shader, &self.lit_layout, vertex_3d_layout()),
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("easel draw pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: blend_state(key.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology(key.topology),
                strip_index_format: key.topology.is_strip().then_some(wgpu::IndexFormat::Uint32),
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: key.depth.cull_back_faces.then_some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Every pass carries a depth attachment, so every pipeline declares one.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth.write,
                depth_compare: if key.depth.test {
                    wgpu::CompareFunction::LessEqual
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, size: NonZeroU64) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(size),
            },
            count: None,
        }],
    })
}

/// Binding size of a uniform block. Both blocks are non-empty `Pod` structs.
fn uniform_size<T>() -> NonZeroU64 {
    NonZeroU64::new(std::mem::size_of::<T>() as u64).unwrap_or(NonZeroU64::MIN)
}

pub(crate) fn topology(t: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match t {
        PrimitiveTopology::Point => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::Line => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::Triangle => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn component(src: wgpu::BlendFactor, dst: wgpu::BlendFactor, op: wgpu::BlendOperation) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: op,
    }
}

/// Fixed-function blend state for `mode`. Colors are straight alpha except for
/// `PremultipliedAlpha`.
pub(crate) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    use wgpu::BlendFactor as F;
    use wgpu::BlendOperation as Op;

    let over_alpha = component(F::One, F::OneMinusSrcAlpha, Op::Add);
    let color = match mode {
        BlendMode::Disabled => return None,
        BlendMode::Alpha => component(F::SrcAlpha, F::OneMinusSrcAlpha, Op::Add),
        BlendMode::PremultipliedAlpha => component(F::One, F::OneMinusSrcAlpha, Op::Add),
        BlendMode::Add => component(F::SrcAlpha, F::One, Op::Add),
        BlendMode::Subtract | BlendMode::Difference => component(F::SrcAlpha, F::One, Op::ReverseSubtract),
        BlendMode::Multiply | BlendMode::Overlay | BlendMode::HardLight => {
            component(F::Dst, F::OneMinusSrcAlpha, Op::Add)
        }
        BlendMode::Screen | BlendMode::SoftLight => component(F::One, F::OneMinusSrc, Op::Add),
    };
    Some(wgpu::BlendState { color, alpha: over_alpha })
}

const VERTEX_2D_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // uv
    2 => Float32x4  // color
];

const VERTEX_3D_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x3, // normal
    2 => Float32x2, // uv
    3 => Float32x4  // color
];

pub(crate) fn vertex_2d_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2D>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_2D_ATTRS,
    }
}

pub(crate) fn vertex_3d_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3D>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_3D_ATTRS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_map_to_strip_topologies() {
        assert_eq!(topology(PrimitiveTopology::TriangleStrip), wgpu::PrimitiveTopology::TriangleStrip);
        assert_eq!(topology(PrimitiveTopology::Point), wgpu::PrimitiveTopology::PointList);
    }

    #[test]
    fn disabled_blend_has_no_state() {
        assert!(blend_state(BlendMode::Disabled).is_none());
        let premul = blend_state(BlendMode::PremultipliedAlpha).unwrap();
        assert_eq!(premul.color.src_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn vertex_layouts_match_vertex_sizes() {
        assert_eq!(vertex_2d_layout().array_stride, 32);
        assert_eq!(vertex_3d_layout().array_stride, 48);
        let last = VERTEX_3D_ATTRS[3];
        assert_eq!(last.offset, 32);
    }
}
