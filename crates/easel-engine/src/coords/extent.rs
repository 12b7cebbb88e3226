/// Drawable size of one frame.
///
/// `width`/`height` are physical pixels as reported by the surface; `scale` is the
/// content scale (physical pixels per logical pixel).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameExtent {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl FrameExtent {
    #[inline]
    pub const fn new(width: u32, height: u32, scale: f32) -> Self {
        Self { width, height, scale }
    }

    /// A frame can only be rendered with a non-zero size and a positive, finite scale.
    #[inline]
    pub fn is_drawable(self) -> bool {
        self.width > 0 && self.height > 0 && self.scale.is_finite() && self.scale > 0.0
    }

    /// Size in logical pixels.
    #[inline]
    pub fn logical_size(self) -> (f32, f32) {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        (self.width as f32 / scale, self.height as f32 / scale)
    }
}

impl Default for FrameExtent {
    fn default() -> Self {
        Self::new(0, 0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_frames_are_not_drawable() {
        assert!(!FrameExtent::new(0, 600, 1.0).is_drawable());
        assert!(!FrameExtent::new(800, 0, 1.0).is_drawable());
        assert!(!FrameExtent::new(800, 600, 0.0).is_drawable());
        assert!(!FrameExtent::new(800, 600, f32::NAN).is_drawable());
        assert!(FrameExtent::new(800, 600, 2.0).is_drawable());
    }

    #[test]
    fn logical_size_divides_by_scale() {
        assert_eq!(FrameExtent::new(1600, 1200, 2.0).logical_size(), (800.0, 600.0));
    }
}
