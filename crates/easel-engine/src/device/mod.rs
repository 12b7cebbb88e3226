//! wgpu device, surface and render backend.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - configuring the window surface and recovering from surface errors
//! - executing frame plans through cached render pipelines

mod backend;
mod error;
mod gpu;
mod pipelines;
mod surface;
mod textures;

pub use backend::{WgpuAllocator, WgpuBackend, WgpuTarget};
pub use error::SurfaceErrorAction;
pub use gpu::{Gpu, GpuInit};
