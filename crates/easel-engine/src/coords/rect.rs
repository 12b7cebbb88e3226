/// Axis-aligned rectangle in logical pixels (top-left origin).
///
/// Used by viewport and scissor commands.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Rectangle in physical pixels, already clamped to a render target.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PhysicalRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Rect::new(x, y, width, height)
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let a = self.normalized();
        let b = other.normalized();

        let x0 = a.x.max(b.x);
        let y0 = a.y.max(b.y);
        let x1 = (a.x + a.width).min(b.x + b.width);
        let y1 = (a.y + a.height).min(b.y + b.height);

        if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
            None
        } else {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Converts to physical pixels and clamps to a `bounds_w` x `bounds_h` target.
    ///
    /// Returns `None` when nothing of the rectangle remains on the target.
    pub fn to_physical(self, scale: f32, bounds_w: u32, bounds_h: u32) -> Option<PhysicalRect> {
        let r = self.normalized();
        let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);

        let x0 = clamp(r.x * scale, bounds_w);
        let y0 = clamp(r.y * scale, bounds_h);
        let x1 = clamp((r.x + r.width) * scale, bounds_w);
        let y1 = clamp((r.y + r.height) * scale, bounds_h);

        let width = x1.saturating_sub(x0);
        let height = y1.saturating_sub(y0);
        if width == 0 || height == 0 {
            None
        } else {
            Some(PhysicalRect { x: x0, y: y0, width, height })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_negative_extent() {
        let n = r(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 4.0, 3.0));
    }

    // ── intersect ─────────────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        let i = r(0.0, 0.0, 10.0, 10.0).intersect(r(5.0, 5.0, 10.0, 10.0));
        assert_eq!(i, Some(r(5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0.0, 0.0, 10.0, 10.0).intersect(r(10.0, 0.0, 10.0, 10.0)).is_none());
    }

    // ── to_physical ───────────────────────────────────────────────────────

    #[test]
    fn to_physical_scales_and_clamps() {
        let p = r(10.0, 10.0, 100.0, 100.0).to_physical(2.0, 150, 400);
        assert_eq!(
            p,
            Some(PhysicalRect { x: 20, y: 20, width: 130, height: 200 })
        );
    }

    #[test]
    fn to_physical_offscreen_is_none() {
        assert!(r(-50.0, 0.0, 20.0, 20.0).to_physical(1.0, 100, 100).is_none());
        assert!(r(0.0, 0.0, 0.0, 20.0).to_physical(1.0, 100, 100).is_none());
    }
}
