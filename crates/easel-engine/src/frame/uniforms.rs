use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::draw::{Draw2D, Draw3D};
use crate::state::{LightBlock, Material};

/// Uniform block of a 2D draw (matches `Uniforms` in `draw2d.wgsl`).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct FlatUniforms {
    pub transform: [[f32; 4]; 4],
}

impl FlatUniforms {
    pub fn from_draw(draw: &Draw2D) -> Self {
        Self {
            transform: draw.transform.to_cols_array_2d(),
        }
    }
}

/// Uniform block of a 3D draw (matches `Uniforms` in `draw3d.wgsl`).
///
/// `normal` is the 3x3 normal matrix widened to 4x4 so every column is 16-byte aligned.
/// `flags.x` is non-zero when lighting is applied.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LitUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub flags: [u32; 4],
    pub material: Material,
    pub lights: LightBlock,
}

impl LitUniforms {
    pub fn from_draw(draw: &Draw3D) -> Self {
        Self {
            model_view: draw.model_view.to_cols_array_2d(),
            projection: draw.projection.to_cols_array_2d(),
            normal: Mat4::from_mat3(draw.normal).to_cols_array_2d(),
            flags: [u32::from(draw.lighting.is_lit()), 0, 0, 0],
            material: draw.lighting.material,
            lights: draw.lighting.lights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<FlatUniforms>(), 64);
        assert_eq!(std::mem::size_of::<LitUniforms>(), 3 * 64 + 16 + 64 + 784);
        assert_eq!(std::mem::size_of::<LitUniforms>() % 16, 0);
    }
}
