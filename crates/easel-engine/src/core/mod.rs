//! Application contract.
//!
//! The runtime owns the window, GPU and frame pipeline; applications only see
//! the per-frame [`FrameCtx`] and record into its draw list.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, SetupCtx};
