use easel_engine::coords::Rect;
use easel_engine::core::{App, AppControl, FrameCtx, SetupCtx};
use easel_engine::device::GpuInit;
use easel_engine::draw::{BlendMode, ClearCmd, DrawCmd, PrimitiveTopology, TextureHandle, Vertex2D, Vertex3D};
use easel_engine::frame::{PipelineConfig, SortPolicy};
use easel_engine::logging::{init_logging, LoggingConfig};
use easel_engine::state::{DrawParams, Light, Material};
use easel_engine::window::{Runtime, RuntimeConfig};
use glam::{Mat4, Vec3};

const CHECKER_SIZE: u32 = 8;

/// Sample sketch: a field of 2D quads, a clipped textured panel and a lit cube.
#[derive(Default)]
struct Sketch {
    checker: Option<TextureHandle>,
}

impl App for Sketch {
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> AppControl {
        self.checker = ctx.register_texture(CHECKER_SIZE, CHECKER_SIZE, &checker_pixels());
        if self.checker.is_none() {
            log::warn!("checker texture rejected; drawing untextured");
        }

        let mut key = Light::directional(Vec3::new(-0.4, -0.6, -1.0));
        key.ambient = [0.15, 0.15, 0.2, 1.0];
        ctx.context.register_light(key);
        ctx.context.register_light(Light::point(Vec3::new(2.0, 2.0, -2.0)));
        ctx.context.set_lighting_enabled(true);
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let t = ctx.elapsed.as_secs_f32();
        let (w, h) = ctx.logical_size();

        // Many small untextured quads; consecutive ones merge into one draw.
        for i in 0..64 {
            let x = (i % 16) as f32 * (w / 16.0);
            let y = (i / 16) as f32 * 24.0 + 8.0;
            let hue = (i as f32 / 64.0 + t * 0.1).fract();
            quad(ctx, Rect::new(x + 2.0, y, w / 16.0 - 4.0, 20.0), hue_color(hue), DrawParams::default());
        }

        // Textured panel, clipped to its left half.
        let panel = Rect::new(24.0, h - 184.0, 320.0, 160.0);
        ctx.list.add_command(DrawCmd::SetScissor {
            rect: Rect::new(panel.x, panel.y, panel.width * 0.5, panel.height),
            enabled: true,
        });
        quad(ctx, panel, [1.0; 4], DrawParams::textured(self.checker));
        ctx.list.add_command(DrawCmd::SetScissor {
            rect: panel,
            enabled: false,
        });

        // Lit cube in its own viewport with a fresh depth buffer.
        let side = (w.min(h) * 0.5).max(1.0);
        ctx.list.add_command(DrawCmd::SetViewport(Rect::new((w - side) * 0.5, (h - side) * 0.5, side, side)));
        ctx.list.add_command(ClearCmd {
            clear_color: false,
            clear_depth: true,
            ..ClearCmd::default()
        });
        cube(ctx, t);
        ctx.list.add_command(DrawCmd::SetViewport(Rect::new(0.0, 0.0, w, h)));

        if ctx.frame_index % 600 == 0 {
            log::info!(
                "frame {} on {}: {} commands, {} 2D vertices, {} 3D vertices",
                ctx.frame_index,
                ctx.slot,
                ctx.list.command_count(),
                ctx.list.vertex_count_2d(),
                ctx.list.vertex_count_3d()
            );
        }
        AppControl::Continue
    }
}

fn quad(ctx: &mut FrameCtx<'_>, r: Rect, color: [f32; 4], params: DrawParams) {
    let vertices = [
        Vertex2D::new([r.x, r.y], [0.0, 0.0], color),
        Vertex2D::new([r.x + r.width, r.y], [1.0, 0.0], color),
        Vertex2D::new([r.x + r.width, r.y + r.height], [1.0, 1.0], color),
        Vertex2D::new([r.x, r.y + r.height], [0.0, 1.0], color),
    ];
    let params = DrawParams {
        topology: PrimitiveTopology::Triangle,
        blend: BlendMode::Alpha,
        ..params
    };
    ctx.context.record_2d(ctx.list, &vertices, &[0, 1, 2, 0, 2, 3], params);
}

fn cube(ctx: &mut FrameCtx<'_>, t: f32) {
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
        (Vec3::Z, Vec3::Y, Vec3::NEG_X),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up, right) in faces {
        let base = vertices.len() as u32;
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let p = (normal + right * (u * 2.0 - 1.0) + up * (v * 2.0 - 1.0)) * 0.5;
            vertices.push(Vertex3D::new(p.into(), normal.into(), [u, v], [1.0; 4]));
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let context = &mut *ctx.context;
    context.push_transform();
    context.push_material(Material {
        diffuse: [0.9, 0.45, 0.2, 1.0],
        specular: [0.6, 0.6, 0.6, 1.0],
        shininess: 32.0,
        ..Material::DEFAULT
    });
    let transforms = context.transforms_mut();
    transforms.set_projection(Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0));
    transforms.set_model_view(Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.5), Vec3::ZERO, Vec3::Y));
    transforms.rotate(t * 0.7, Vec3::Y);
    transforms.rotate(t * 0.3, Vec3::X);

    context.record_3d(ctx.list, &vertices, &indices, DrawParams {
        blend: BlendMode::Disabled,
        ..DrawParams::default()
    });
    context.pop_material();
    context.pop_transform();
}

fn checker_pixels() -> Vec<u8> {
    (0..CHECKER_SIZE * CHECKER_SIZE)
        .flat_map(|i| {
            let (x, y) = (i % CHECKER_SIZE, i / CHECKER_SIZE);
            if (x + y) % 2 == 0 { [240, 240, 240, 255] } else { [40, 40, 48, 255] }
        })
        .collect()
}

fn hue_color(h: f32) -> [f32; 4] {
    let channel = |offset: f32| {
        let k = (h * 6.0 + offset) % 6.0;
        1.0 - (k.min(4.0 - k).clamp(0.0, 1.0))
    };
    [channel(5.0), channel(3.0), channel(1.0), 1.0]
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let pipeline = PipelineConfig {
        sort_policy: SortPolicy::TextureSwitches(8),
        clear_color: [0.08, 0.08, 0.1, 1.0],
        ..PipelineConfig::default()
    };

    Runtime::run(
        RuntimeConfig {
            title: "easel studio".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        pipeline,
        Sketch::default(),
    )
}
