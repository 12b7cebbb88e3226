use bytemuck::{Pod, Zeroable};

/// 2D vertex: position, texture coordinate and straight-alpha RGBA color.
///
/// Layout is `#[repr(C)]` and tightly packed (32 bytes) so a slice of vertices
/// can be uploaded with `bytemuck::cast_slice` without repacking.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2D {
    #[inline]
    pub const fn new(position: [f32; 2], uv: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, uv, color }
    }

    /// Untextured vertex (uv at the origin).
    #[inline]
    pub const fn colored(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self::new([x, y], [0.0, 0.0], color)
    }
}

impl Default for Vertex2D {
    fn default() -> Self {
        Self::new([0.0, 0.0], [0.0, 0.0], [1.0, 1.0, 1.0, 1.0])
    }
}

/// 3D vertex: position, normal, texture coordinate and RGBA color (48 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex3D {
    #[inline]
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], color: [f32; 4]) -> Self {
        Self {
            position,
            normal,
            uv,
            color,
        }
    }
}

impl Default for Vertex3D {
    fn default() -> Self {
        Self::new([0.0; 3], [0.0, 0.0, 1.0], [0.0; 2], [1.0; 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_sizes_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex2D>(), 8 * 4);
        assert_eq!(std::mem::size_of::<Vertex3D>(), 12 * 4);
    }

    #[test]
    fn default_vertex_is_opaque_white() {
        assert_eq!(Vertex2D::default().color, [1.0; 4]);
        assert_eq!(Vertex3D::default().normal, [0.0, 0.0, 1.0]);
    }
}
