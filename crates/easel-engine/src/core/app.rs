use winit::event::WindowEvent;

use super::ctx::{FrameCtx, SetupCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by sketches.
pub trait App {
    /// Called once after the window and GPU are ready.
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per begun frame. Frames dropped by the pipeline never reach the app.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;
}
