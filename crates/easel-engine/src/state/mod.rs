//! Mutable drawing state and the `Context` that bakes it into recorded commands.

mod context;
mod light;
mod material;
mod transform;

pub use context::{Context, DrawParams};
pub use light::{Light, LightBlock, LightKind, LightRegistry, LightUniform, MAX_LIGHTS};
pub use material::{Material, MaterialStack};
pub use transform::{screen_projection, Transform, TransformStack};
