//! Rectangles and frame sizes shared by the draw stream and the backends.
//!
//! Canonical CPU space:
//! - logical pixels (DPI-aware)
//! - origin top-left, +X right, +Y down
//!
//! Backends convert to physical pixels with the frame's content scale.

mod extent;
mod rect;

pub use extent::FrameExtent;
pub use rect::{PhysicalRect, Rect};
