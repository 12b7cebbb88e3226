//! Easel engine crate.
//!
//! Records immediate-mode 2D/3D geometry into draw lists, batches it, and
//! submits it through a multi-buffered frame pipeline on wgpu.

pub mod coords;
pub mod draw;
pub mod state;
pub mod pool;
pub mod frame;

pub mod logging;
pub mod device;
pub mod core;
pub mod window;
