use std::time::Instant;

use anyhow::{Context as _, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, SetupCtx};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction, WgpuBackend};
use crate::frame::{FramePipeline, FrameStatus, PipelineConfig};
use crate::state::Context;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "easel".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, pipeline: PipelineConfig, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, pipeline, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.error.map_or(Ok(()), Err)
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

/// Window, GPU and the per-window rendering state.
struct Surface {
    entry: WindowEntry,
    pipeline: FramePipeline<WgpuBackend>,
    context: Context,
    started: Instant,
    last_frame: Instant,
}

impl Surface {
    fn create(event_loop: &ActiveEventLoop, config: &RuntimeConfig, gpu_init: GpuInit, pipeline: PipelineConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let backend = entry.with_gpu(|gpu| gpu.create_backend());
        let now = Instant::now();
        Ok(Self {
            entry,
            pipeline: FramePipeline::new(backend, pipeline),
            context: Context::new(),
            started: now,
            last_frame: now,
        })
    }

    fn id(&self) -> WindowId {
        self.entry.with_window(|w| w.id())
    }

    fn request_redraw(&self) {
        self.entry.with_window(|w| w.request_redraw());
    }

    /// Begins, records and submits one frame.
    fn redraw<A: App>(&mut self, app: &mut A) -> AppControl {
        let (target, action) = self.entry.with_gpu_mut(|gpu| gpu.try_acquire_target());
        if action == Some(SurfaceErrorAction::Fatal) {
            return AppControl::Exit;
        }

        let (size, scale) = self.entry.with(|f| (f.gpu.size(), f.window.scale_factor() as f32));
        let slot = match self.pipeline.begin_frame(target, size.width, size.height, scale) {
            FrameStatus::Begun(slot) => slot,
            FrameStatus::Dropped(_) => return AppControl::Continue,
        };

        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        let extent = self.pipeline.extent();
        let frame_index = self.pipeline.frame_index();
        let (width, height) = extent.logical_size();
        self.context.setup_screen(width, height);

        let Some(list) = self.pipeline.draw_list_mut() else {
            log::warn!("frame {frame_index} begun without a draw list; ending it empty");
            self.pipeline.end_frame();
            return AppControl::Continue;
        };
        let control = self.entry.with_window(|window| {
            let mut ctx = FrameCtx {
                window,
                list,
                context: &mut self.context,
                extent,
                slot,
                frame_index,
                dt,
                elapsed: now - self.started,
            };
            let control = app.on_frame(&mut ctx);
            window.pre_present_notify();
            control
        });

        let report = self.pipeline.end_frame();
        log::trace!("{report:?}");
        control
    }
}

struct AppState<A> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    pipeline: PipelineConfig,
    app: A,

    surface: Option<Surface>,
    error: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A: App> AppState<A> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, pipeline: PipelineConfig, app: A) -> Self {
        Self {
            config,
            gpu_init,
            pipeline,
            app,
            surface: None,
            error: None,
            exit_requested: false,
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        if let Some(surface) = self.surface.as_mut() {
            // Let in-flight frames finish before the device goes away.
            surface.pipeline.reset_resources();
        }
        event_loop.exit();
    }
}

impl<A: App> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        let mut surface = match Surface::create(event_loop, &self.config, self.gpu_init.clone(), self.pipeline.clone()) {
            Ok(surface) => surface,
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.error = Some(e);
                self.exit(event_loop);
                return;
            }
        };

        let control = surface.entry.with_window(|window| {
            self.app.setup(&mut SetupCtx {
                window,
                pipeline: &mut surface.pipeline,
                context: &mut surface.context,
            })
        });
        surface.request_redraw();
        self.surface = Some(surface);

        if control == AppControl::Exit {
            self.exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; the pipeline's slot wait paces the loop.
        if let Some(surface) = &self.surface {
            surface.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if surface.id() != window_id {
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        let control = match &event {
            WindowEvent::CloseRequested => AppControl::Exit,

            WindowEvent::Resized(new_size) => {
                surface.entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                surface.request_redraw();
                AppControl::Continue
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = surface.entry.with_window(|w| w.inner_size());
                surface.entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                surface.request_redraw();
                AppControl::Continue
            }

            WindowEvent::RedrawRequested => surface.redraw(&mut self.app),

            _ => AppControl::Continue,
        };

        if control == AppControl::Exit {
            self.exit(event_loop);
        }
    }
}
