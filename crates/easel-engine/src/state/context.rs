use std::sync::Arc;

use glam::Mat4;

use crate::draw::{
    BlendMode, DepthState, Draw2D, Draw3D, DrawList, GeometryRange, Lighting, PrimitiveTopology,
    TextureHandle, Vertex2D, Vertex3D,
};

use super::{screen_projection, Light, LightRegistry, Material, MaterialStack, Transform, TransformStack};

/// Per-draw parameters that are not part of the stacked state.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DrawParams {
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub texture: Option<TextureHandle>,
}

impl DrawParams {
    #[inline]
    pub fn textured(texture: Option<TextureHandle>) -> Self {
        Self { texture, ..Self::default() }
    }
}

/// Owner of the mutable drawing state: transforms, materials, lights and depth flags.
///
/// Constructed once at the application entry point and passed by reference to
/// whatever records geometry. Recording copies the current values into the
/// command; later mutation never reaches commands already in a `DrawList`.
#[derive(Debug, Clone)]
pub struct Context {
    transforms: TransformStack,
    materials: MaterialStack,
    lights: LightRegistry,
    depth: DepthState,
    /// Lighting snapshot shared by consecutive 3D draws; dropped on any material/light change.
    lighting: Option<Arc<Lighting>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            transforms: TransformStack::new(),
            materials: MaterialStack::new(),
            lights: LightRegistry::new(),
            depth: DepthState {
                test: true,
                write: true,
                cull_back_faces: false,
            },
            lighting: None,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[inline]
    pub fn transform(&self) -> &Transform {
        self.transforms.current()
    }

    /// Direct access for translate/scale/rotate and projection changes.
    #[inline]
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    pub fn push_transform(&mut self) {
        self.transforms.push();
    }

    pub fn pop_transform(&mut self) {
        self.transforms.pop();
    }

    /// Resets the transform state for a new 2D frame of `width` x `height` logical pixels.
    ///
    /// Pushes left unbalanced by the previous frame are discarded with a warning.
    pub fn setup_screen(&mut self, width: f32, height: f32) {
        let unbalanced = self.transforms.reset(screen_projection(width, height));
        if unbalanced > 0 {
            log::warn!("{unbalanced} push_transform call(s) without matching pop in previous frame");
        }
        let materials = self.materials.depth();
        if materials > 0 {
            log::warn!("{materials} push_material call(s) without matching pop in previous frame");
            self.materials.clear();
            self.lighting = None;
        }
    }

    // ── materials ─────────────────────────────────────────────────────────

    pub fn push_material(&mut self, material: Material) {
        self.materials.push(material);
        self.lighting = None;
    }

    pub fn pop_material(&mut self) {
        self.materials.pop();
        self.lighting = None;
    }

    /// Active material, or [`Material::DEFAULT`] when none is pushed.
    #[inline]
    pub fn material(&self) -> Material {
        self.materials.current()
    }

    // ── lights ────────────────────────────────────────────────────────────

    /// Returns `false` if the registry is full and the light was not added.
    pub fn register_light(&mut self, light: Light) -> bool {
        self.lighting = None;
        self.lights.register(light)
    }

    /// Removing a light that is not registered is a no-op.
    pub fn unregister_light(&mut self, light: &Light) {
        if self.lights.unregister(light) {
            self.lighting = None;
        }
    }

    pub fn set_lighting_enabled(&mut self, enabled: bool) {
        if self.lights.is_enabled() != enabled {
            self.lights.set_enabled(enabled);
            self.lighting = None;
        }
    }

    #[inline]
    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    // ── depth ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn depth(&self) -> DepthState {
        self.depth
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        self.depth.test = enabled;
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        self.depth.write = enabled;
    }

    pub fn set_cull_back_faces(&mut self, enabled: bool) {
        self.depth.cull_back_faces = enabled;
    }

    // ── recording ─────────────────────────────────────────────────────────

    /// Appends 2D geometry and a command carrying `projection * model_view`.
    ///
    /// `indices` address `vertices` (0 is its first element) and are stored
    /// shifted to absolute positions in the list. An empty `indices` slice
    /// records a non-indexed draw. Empty `vertices` record nothing.
    pub fn record_2d(&self, list: &mut DrawList, vertices: &[Vertex2D], indices: &[u32], params: DrawParams) {
        if vertices.is_empty() {
            return;
        }
        let range = append_geometry(list, indices, |l| l.add_vertices_2d(vertices), vertices.len());
        list.add_command(Draw2D {
            range,
            topology: params.topology,
            blend: params.blend,
            texture: params.texture,
            transform: self.transform().combined(),
        });
    }

    /// Appends 3D geometry and a command carrying the current transform pair,
    /// normal matrix, depth flags, material and enabled lights.
    pub fn record_3d(&mut self, list: &mut DrawList, vertices: &[Vertex3D], indices: &[u32], params: DrawParams) {
        if vertices.is_empty() {
            return;
        }
        let lighting = self.lighting_snapshot();
        let transform = *self.transform();
        let range = append_geometry(list, indices, |l| l.add_vertices_3d(vertices), vertices.len());
        list.add_command(Draw3D {
            range,
            topology: params.topology,
            blend: params.blend,
            texture: params.texture,
            model_view: transform.model_view,
            projection: transform.projection,
            normal: transform.normal_matrix(),
            depth: self.depth,
            lighting,
        });
    }

    fn lighting_snapshot(&mut self) -> Arc<Lighting> {
        let (materials, lights) = (&self.materials, &self.lights);
        self.lighting
            .get_or_insert_with(|| {
                Arc::new(Lighting {
                    enabled: lights.is_enabled(),
                    material: materials.current(),
                    lights: lights.snapshot(),
                })
            })
            .clone()
    }

    /// Returns every stack to its startup state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Projection currently in effect.
    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.transform().projection
    }
}

fn append_geometry(
    list: &mut DrawList,
    indices: &[u32],
    push_vertices: impl FnOnce(&mut DrawList) -> u32,
    vertex_count: usize,
) -> GeometryRange {
    let vertex_offset = push_vertices(list);
    if indices.is_empty() {
        GeometryRange::vertices(vertex_offset, vertex_count as u32)
    } else {
        let index_offset = list.add_local_indices(indices, vertex_offset);
        GeometryRange::indexed(vertex_offset, vertex_count as u32, index_offset, indices.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::draw::DrawCmd;

    fn tri_2d() -> [Vertex2D; 3] {
        [Vertex2D::default(); 3]
    }

    fn tri_3d() -> [Vertex3D; 3] {
        [Vertex3D::default(); 3]
    }

    fn draw_2d(cmd: &DrawCmd) -> &Draw2D {
        match cmd {
            DrawCmd::Draw2D(d) => d,
            other => panic!("expected Draw2D, got {other:?}"),
        }
    }

    fn draw_3d(cmd: &DrawCmd) -> &Draw3D {
        match cmd {
            DrawCmd::Draw3D(d) => d,
            other => panic!("expected Draw3D, got {other:?}"),
        }
    }

    // ── baking ────────────────────────────────────────────────────────────

    #[test]
    fn transform_is_baked_at_record_time() {
        let mut ctx = Context::new();
        let mut list = DrawList::new();
        ctx.transforms_mut().translate(5.0, 0.0, 0.0);
        ctx.record_2d(&mut list, &tri_2d(), &[], DrawParams::default());
        let baked = draw_2d(&list.commands()[0]).transform;

        ctx.transforms_mut().translate(100.0, 0.0, 0.0);
        ctx.record_2d(&mut list, &tri_2d(), &[], DrawParams::default());

        assert_eq!(draw_2d(&list.commands()[0]).transform, baked);
        assert_eq!(baked.w_axis.x, 5.0);
        assert_eq!(draw_2d(&list.commands()[1]).transform.w_axis.x, 105.0);
    }

    #[test]
    fn material_and_lights_are_baked_at_record_time() {
        let mut ctx = Context::new();
        let mut list = DrawList::new();
        ctx.set_lighting_enabled(true);
        ctx.register_light(Light::point(Vec3::new(0.0, 1.0, 0.0)));
        ctx.record_3d(&mut list, &tri_3d(), &[], DrawParams::default());

        ctx.push_material(Material { shininess: 32.0, ..Material::DEFAULT });
        ctx.register_light(Light::directional(Vec3::NEG_Y));

        let first = draw_3d(&list.commands()[0]);
        assert_eq!(first.lighting.material, Material::DEFAULT);
        assert_eq!(first.lighting.lights.len(), 1);
        assert!(first.lighting.is_lit());
    }

    #[test]
    fn lighting_snapshot_is_shared_until_state_changes() {
        let mut ctx = Context::new();
        let mut list = DrawList::new();
        ctx.record_3d(&mut list, &tri_3d(), &[], DrawParams::default());
        ctx.record_3d(&mut list, &tri_3d(), &[], DrawParams::default());
        ctx.push_material(Material::DEFAULT);
        ctx.record_3d(&mut list, &tri_3d(), &[], DrawParams::default());

        let cmds = list.commands();
        assert!(Arc::ptr_eq(&draw_3d(&cmds[0]).lighting, &draw_3d(&cmds[1]).lighting));
        assert!(!Arc::ptr_eq(&draw_3d(&cmds[1]).lighting, &draw_3d(&cmds[2]).lighting));

        // Same content, so the three draws still merge.
        list.optimize();
        assert_eq!(list.command_count(), 1);
    }

    #[test]
    fn depth_flags_and_normal_matrix_are_baked() {
        let mut ctx = Context::new();
        let mut list = DrawList::new();
        ctx.set_cull_back_faces(true);
        ctx.transforms_mut().scale(2.0, 2.0, 2.0);
        ctx.record_3d(&mut list, &tri_3d(), &[], DrawParams::default());
        ctx.set_depth_test(false);

        let d = draw_3d(&list.commands()[0]);
        assert!(d.depth.test && d.depth.write && d.depth.cull_back_faces);
        assert!((d.normal.x_axis.x - 0.5).abs() < 1e-6);
    }

    // ── recording ─────────────────────────────────────────────────────────

    #[test]
    fn indexed_record_produces_indexed_range() {
        let ctx = Context::new();
        let mut list = DrawList::new();
        let quad = [Vertex2D::default(); 4];
        ctx.record_2d(&mut list, &quad, &[0, 1, 2, 0, 2, 3], DrawParams::default());
        ctx.record_2d(&mut list, &quad, &[0, 1, 2, 0, 2, 3], DrawParams::default());

        let range = draw_2d(&list.commands()[1]).range;
        assert_eq!(range, GeometryRange::indexed(4, 4, 6, 6));
        assert_eq!(list.vertex_count_2d(), 8);
        assert_eq!(list.index_count(), 12);
        // Batch-local indices are stored absolute.
        assert_eq!(list.geometry().indices()[6..], [4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn empty_geometry_records_nothing() {
        let mut ctx = Context::new();
        let mut list = DrawList::new();
        ctx.record_2d(&mut list, &[], &[], DrawParams::default());
        ctx.record_3d(&mut list, &[], &[0, 1, 2], DrawParams::default());
        assert!(list.is_empty());
        assert!(list.geometry().is_empty());
    }

    // ── stacks ────────────────────────────────────────────────────────────

    #[test]
    fn underflow_and_missing_light_are_no_ops() {
        let mut ctx = Context::new();
        ctx.pop_transform();
        ctx.pop_material();
        ctx.unregister_light(&Light::point(Vec3::ONE));
        assert_eq!(*ctx.transform(), Transform::IDENTITY);
        assert_eq!(ctx.material(), Material::DEFAULT);
        assert!(ctx.lights().lights().is_empty());
    }

    #[test]
    fn setup_screen_discards_unbalanced_pushes() {
        let mut ctx = Context::new();
        ctx.push_transform();
        ctx.transforms_mut().translate(3.0, 0.0, 0.0);
        ctx.push_material(Material::DEFAULT);
        ctx.setup_screen(200.0, 100.0);

        assert_eq!(ctx.transforms_mut().depth(), 0);
        assert_eq!(ctx.transform().model_view, Mat4::IDENTITY);
        assert_eq!(ctx.projection(), screen_projection(200.0, 100.0));
        assert_eq!(ctx.material(), Material::DEFAULT);
    }

    #[test]
    fn reset_restores_startup_state() {
        let mut ctx = Context::new();
        ctx.register_light(Light::point(Vec3::ZERO));
        ctx.set_depth_test(false);
        ctx.reset();
        assert!(ctx.lights().lights().is_empty());
        assert!(ctx.depth().test);
    }
}
