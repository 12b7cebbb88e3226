//! Draw stream types.
//!
//! Responsibilities:
//! - hold frame-scoped vertex/index storage (`GeometryStore`)
//! - record draw and state commands with their state already baked
//! - merge adjacent compatible draws and group them by texture (`DrawList`)

mod cmd;
mod geometry;
mod handle;
mod key;
mod list;
mod vertex;

pub use cmd::{
    BlendMode, ClearCmd, DepthState, Draw2D, Draw3D, DrawCmd, GeometryRange, Lighting,
    PrimitiveTopology,
};
pub use geometry::GeometryStore;
pub use handle::TextureHandle;
pub use key::SortKey;
pub use list::DrawList;
pub use vertex::{Vertex2D, Vertex3D};
