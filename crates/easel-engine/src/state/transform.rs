use glam::{Mat3, Mat4, Quat, Vec3};

/// Model-view + projection pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub model_view: Mat4,
    pub projection: Mat4,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        model_view: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
    };

    /// `projection * model_view`, the matrix baked into 2D draws.
    #[inline]
    pub fn combined(&self) -> Mat4 {
        self.projection * self.model_view
    }

    /// Inverse-transpose of the model-view upper 3x3, for transforming normals.
    ///
    /// A singular model-view (e.g. a zero scale) falls back to the plain upper 3x3.
    pub fn normal_matrix(&self) -> Mat3 {
        let upper = Mat3::from_mat4(self.model_view);
        if upper.determinant().abs() <= f32::EPSILON {
            return upper;
        }
        upper.inverse().transpose()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Orthographic projection mapping logical pixels (top-left origin, +Y down) to clip space.
pub fn screen_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
}

/// Save/restore stack of [`Transform`] values.
///
/// The current transform lives outside the stack; `push` copies it, `pop`
/// restores the last copy. Popping an empty stack is a logged no-op.
#[derive(Debug, Clone, Default)]
pub struct TransformStack {
    current: Transform,
    saved: Vec<Transform>,
}

impl TransformStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> &Transform {
        &self.current
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    pub fn pop(&mut self) {
        match self.saved.pop() {
            Some(t) => self.current = t,
            None => log::warn!("pop_transform called with an empty transform stack; ignored"),
        }
    }

    pub fn set_model_view(&mut self, m: Mat4) {
        self.current.model_view = m;
    }

    pub fn set_projection(&mut self, m: Mat4) {
        self.current.projection = m;
    }

    pub fn load_identity(&mut self) {
        self.current.model_view = Mat4::IDENTITY;
    }

    /// Right-multiplies `m` into the model-view (applies `m` first to incoming vertices).
    pub fn multiply(&mut self, m: Mat4) {
        self.current.model_view *= m;
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(Mat4::from_translation(Vec3::new(x, y, z)));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.multiply(Mat4::from_scale(Vec3::new(x, y, z)));
    }

    /// Rotation in radians around `axis` (normalized here; a zero axis is ignored).
    pub fn rotate(&mut self, radians: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else { return };
        self.multiply(Mat4::from_quat(Quat::from_axis_angle(axis, radians)));
    }

    /// Rotation in radians around +Z, the 2D rotation.
    pub fn rotate_z(&mut self, radians: f32) {
        self.multiply(Mat4::from_rotation_z(radians));
    }

    /// Drops saved entries and resets to identity model-view with `projection`.
    ///
    /// Returns the number of unbalanced pushes that were discarded.
    pub fn reset(&mut self, projection: Mat4) -> usize {
        let unbalanced = self.saved.len();
        self.saved.clear();
        self.current = Transform {
            model_view: Mat4::IDENTITY,
            projection,
        };
        unbalanced
    }
}
