use std::sync::Arc;

use glam::{Mat3, Mat4};

use crate::coords::Rect;
use crate::state::{LightBlock, Material};

use super::TextureHandle;

/// Primitive topology of a draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PrimitiveTopology {
    Point,
    Line,
    LineStrip,
    #[default]
    Triangle,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Strip topologies connect consecutive primitives; concatenating two strips
    /// would create a bridging primitive, so they never merge.
    #[inline]
    pub const fn is_strip(self) -> bool {
        matches!(self, Self::LineStrip | Self::TriangleStrip)
    }
}

/// Fixed-function blend mode.
///
/// `Overlay`, `SoftLight`, `HardLight` and `Difference` have no exact
/// fixed-function form; backends map them to the nearest blend equation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BlendMode {
    Disabled,
    #[default]
    Alpha,
    Add,
    Subtract,
    Multiply,
    Screen,
    PremultipliedAlpha,
    Overlay,
    SoftLight,
    HardLight,
    Difference,
}

/// Vertex/index range of a draw inside the frame's geometry store.
///
/// `index_count == 0` means a non-indexed draw; `index_offset` is then ignored.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct GeometryRange {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
}

impl GeometryRange {
    #[inline]
    pub const fn vertices(offset: u32, count: u32) -> Self {
        Self {
            vertex_offset: offset,
            vertex_count: count,
            index_offset: 0,
            index_count: 0,
        }
    }

    #[inline]
    pub const fn indexed(vertex_offset: u32, vertex_count: u32, index_offset: u32, index_count: u32) -> Self {
        Self {
            vertex_offset,
            vertex_count,
            index_offset,
            index_count,
        }
    }

    #[inline]
    pub const fn is_indexed(&self) -> bool {
        self.index_count > 0
    }

    /// Number of elements the draw call consumes.
    #[inline]
    pub const fn element_count(&self) -> u32 {
        if self.is_indexed() { self.index_count } else { self.vertex_count }
    }

    /// True when `next` starts exactly where `self` ends, in both arrays.
    ///
    /// Indexed and non-indexed ranges never continue each other.
    pub fn is_continued_by(&self, next: &GeometryRange) -> bool {
        if self.is_indexed() != next.is_indexed() {
            return false;
        }
        let vertices_adjacent =
            self.vertex_offset.checked_add(self.vertex_count) == Some(next.vertex_offset);
        let indices_adjacent = !self.is_indexed()
            || self.index_offset.checked_add(self.index_count) == Some(next.index_offset);
        vertices_adjacent && indices_adjacent
    }

    /// Grows `self` to cover `next`. Callers check [`is_continued_by`](Self::is_continued_by) first.
    #[inline]
    pub(crate) fn absorb(&mut self, next: &GeometryRange) {
        self.vertex_count += next.vertex_count;
        self.index_count += next.index_count;
    }
}

/// Depth and culling state baked into a 3D draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub cull_back_faces: bool,
}

/// Lighting inputs captured when a 3D draw is recorded.
///
/// Shared behind an `Arc` so consecutive draws recorded under the same state
/// reuse one snapshot; the contents are never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub enabled: bool,
    pub material: Material,
    pub lights: LightBlock,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            enabled: false,
            material: Material::DEFAULT,
            lights: LightBlock::empty(),
        }
    }
}

impl Lighting {
    /// True when lighting is switched on and at least one light is baked.
    #[inline]
    pub fn is_lit(&self) -> bool {
        self.enabled && !self.lights.is_empty()
    }

    fn bits_eq(&self, other: &Lighting) -> bool {
        self.enabled == other.enabled
            && bytemuck::bytes_of(&self.material) == bytemuck::bytes_of(&other.material)
            && bytemuck::bytes_of(&self.lights) == bytemuck::bytes_of(&other.lights)
    }
}

/// Recorded 2D draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw2D {
    pub range: GeometryRange,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub texture: Option<TextureHandle>,
    /// `projection * model_view` at record time.
    pub transform: Mat4,
}

impl Draw2D {
    /// Merge rule: equal state (transform compared bit-for-bit), a list topology,
    /// and `next` continuing this draw's geometry range.
    pub fn can_merge(&self, next: &Draw2D) -> bool {
        !self.topology.is_strip()
            && self.topology == next.topology
            && self.blend == next.blend
            && self.texture == next.texture
            && mat4_bits_eq(&self.transform, &next.transform)
            && self.range.is_continued_by(&next.range)
    }
}

/// Recorded 3D draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw3D {
    pub range: GeometryRange,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub texture: Option<TextureHandle>,
    pub model_view: Mat4,
    pub projection: Mat4,
    pub normal: Mat3,
    pub depth: DepthState,
    pub lighting: Arc<Lighting>,
}

impl Draw3D {
    /// Same rule as [`Draw2D::can_merge`], extended to every baked 3D input.
    pub fn can_merge(&self, next: &Draw3D) -> bool {
        !self.topology.is_strip()
            && self.topology == next.topology
            && self.blend == next.blend
            && self.texture == next.texture
            && self.depth == next.depth
            && mat4_bits_eq(&self.model_view, &next.model_view)
            && mat4_bits_eq(&self.projection, &next.projection)
            && bytemuck::bytes_of(&self.normal) == bytemuck::bytes_of(&next.normal)
            && (Arc::ptr_eq(&self.lighting, &next.lighting) || self.lighting.bits_eq(&next.lighting))
            && self.range.is_continued_by(&next.range)
    }
}

/// Clear request for the current render target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearCmd {
    pub color: [f32; 4],
    pub depth: f32,
    pub clear_color: bool,
    pub clear_depth: bool,
}

impl ClearCmd {
    pub const fn color(color: [f32; 4]) -> Self {
        Self {
            color,
            depth: 1.0,
            clear_color: true,
            clear_depth: true,
        }
    }
}

impl Default for ClearCmd {
    fn default() -> Self {
        Self::color([0.0, 0.0, 0.0, 1.0])
    }
}

/// Recorded command stream entry.
///
/// Only `Draw2D`/`Draw3D` carry geometry; the rest are pure state changes that
/// are replayed in order and never merged or moved by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Draw2D(Draw2D),
    Draw3D(Draw3D),
    SetViewport(Rect),
    SetScissor { rect: Rect, enabled: bool },
    Clear(ClearCmd),
}

impl DrawCmd {
    #[inline]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw2D(_) | Self::Draw3D(_))
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureHandle> {
        match self {
            Self::Draw2D(d) => d.texture,
            Self::Draw3D(d) => d.texture,
            _ => None,
        }
    }

    #[inline]
    pub fn range(&self) -> Option<&GeometryRange> {
        match self {
            Self::Draw2D(d) => Some(&d.range),
            Self::Draw3D(d) => Some(&d.range),
            _ => None,
        }
    }

    pub(crate) fn range_mut(&mut self) -> Option<&mut GeometryRange> {
        match self {
            Self::Draw2D(d) => Some(&mut d.range),
            Self::Draw3D(d) => Some(&mut d.range),
            _ => None,
        }
    }
}

impl From<Draw2D> for DrawCmd {
    fn from(d: Draw2D) -> Self {
        Self::Draw2D(d)
    }
}

impl From<Draw3D> for DrawCmd {
    fn from(d: Draw3D) -> Self {
        Self::Draw3D(d)
    }
}

impl From<ClearCmd> for DrawCmd {
    fn from(c: ClearCmd) -> Self {
        Self::Clear(c)
    }
}

#[inline]
fn mat4_bits_eq(a: &Mat4, b: &Mat4) -> bool {
    bytemuck::bytes_of(a) == bytemuck::bytes_of(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(range: GeometryRange) -> Draw2D {
        Draw2D {
            range,
            topology: PrimitiveTopology::Triangle,
            blend: BlendMode::Alpha,
            texture: None,
            transform: Mat4::IDENTITY,
        }
    }

    // ── ranges ────────────────────────────────────────────────────────────

    #[test]
    fn contiguous_vertex_ranges_continue() {
        let a = GeometryRange::vertices(0, 3);
        assert!(a.is_continued_by(&GeometryRange::vertices(3, 3)));
        assert!(!a.is_continued_by(&GeometryRange::vertices(4, 3)));
    }

    #[test]
    fn indexed_ranges_need_both_arrays_adjacent() {
        let a = GeometryRange::indexed(0, 4, 0, 6);
        assert!(a.is_continued_by(&GeometryRange::indexed(4, 4, 6, 6)));
        assert!(!a.is_continued_by(&GeometryRange::indexed(4, 4, 7, 6)));
        assert!(!a.is_continued_by(&GeometryRange::vertices(4, 4)));
    }

    // ── merge predicates ──────────────────────────────────────────────────

    #[test]
    fn transform_compared_bitwise() {
        let a = flat(GeometryRange::vertices(0, 3));
        let mut b = flat(GeometryRange::vertices(3, 3));
        assert!(a.can_merge(&b));

        // -0.0 == 0.0 numerically, but the bits differ.
        b.transform.w_axis.x = -0.0;
        assert!(!a.can_merge(&b));
    }

    #[test]
    fn strips_never_merge() {
        let mut a = flat(GeometryRange::vertices(0, 4));
        let mut b = flat(GeometryRange::vertices(4, 4));
        a.topology = PrimitiveTopology::TriangleStrip;
        b.topology = PrimitiveTopology::TriangleStrip;
        assert!(!a.can_merge(&b));
    }

    #[test]
    fn lighting_compared_by_content() {
        let base = Draw3D {
            range: GeometryRange::vertices(0, 3),
            topology: PrimitiveTopology::Triangle,
            blend: BlendMode::Disabled,
            texture: None,
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            normal: Mat3::IDENTITY,
            depth: DepthState::default(),
            lighting: Arc::new(Lighting::default()),
        };
        let mut next = Draw3D {
            range: GeometryRange::vertices(3, 3),
            lighting: Arc::new(Lighting::default()),
            ..base.clone()
        };
        assert!(base.can_merge(&next));

        next.lighting = Arc::new(Lighting {
            material: Material { shininess: 4.0, ..Material::DEFAULT },
            ..Lighting::default()
        });
        assert!(!base.can_merge(&next));
    }

    #[test]
    fn state_commands_are_not_draws() {
        assert!(!DrawCmd::SetViewport(Rect::default()).is_draw());
        assert!(DrawCmd::from(flat(GeometryRange::default())).is_draw());
        assert!(DrawCmd::Clear(ClearCmd::default()).range().is_none());
    }
}
