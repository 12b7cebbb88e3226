use bytemuck::{Pod, Zeroable};

/// Surface material block (16 floats, uploaded as-is).
///
/// Colors are linear RGBA. The layout matches the `Material` struct in
/// `draw3d.wgsl` (`emissive` + `shininess` share one 16-byte row).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 3],
    pub shininess: f32,
}

impl Material {
    /// Gray diffuse, dark gray ambient, no specular, no emission.
    pub const DEFAULT: Self = Self {
        diffuse: [0.8, 0.8, 0.8, 1.0],
        ambient: [0.2, 0.2, 0.2, 1.0],
        specular: [0.0, 0.0, 0.0, 1.0],
        emissive: [0.0, 0.0, 0.0],
        shininess: 0.2,
    };
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Stack of active materials; the top is the current one.
#[derive(Debug, Clone, Default)]
pub struct MaterialStack {
    stack: Vec<Material>,
}

impl MaterialStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, material: Material) {
        self.stack.push(material);
    }

    /// Popping with no active material is a logged no-op.
    pub fn pop(&mut self) {
        if self.stack.pop().is_none() {
            log::warn!("pop_material called with no active material; ignored");
        }
    }

    /// Returns the active material, or [`Material::DEFAULT`] when none is active.
    #[inline]
    pub fn current(&self) -> Material {
        self.stack.last().copied().unwrap_or_default()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_block_is_sixteen_floats() {
        assert_eq!(std::mem::size_of::<Material>(), 16 * 4);
    }

    #[test]
    fn empty_stack_yields_default() {
        let s = MaterialStack::new();
        assert_eq!(s.current(), Material::DEFAULT);
        assert_eq!(s.current().diffuse, [0.8, 0.8, 0.8, 1.0]);
        assert_eq!(s.current().shininess, 0.2);
    }

    #[test]
    fn push_pop_and_underflow() {
        let mut s = MaterialStack::new();
        let red = Material { diffuse: [1.0, 0.0, 0.0, 1.0], ..Material::DEFAULT };
        s.push(red);
        assert_eq!(s.current(), red);
        s.pop();
        s.pop();
        assert_eq!(s.depth(), 0);
        assert_eq!(s.current(), Material::DEFAULT);
    }
}
