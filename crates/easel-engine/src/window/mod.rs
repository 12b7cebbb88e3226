//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and drives the frame pipeline once
//! per redraw.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
