// SPDX-License-Identifier: GPL-3.0-only

//! Windowed preview host
//!
//! Owns the window, the wgpu surface and the [`Renderer`], and maps window
//! system events onto the renderer and pipeline lifecycle:
//!
//! | Event                     | Action                                         |
//! |---------------------------|------------------------------------------------|
//! | resumed (surface ready)   | `on_surface_created`, first time `start()`     |
//! | `Resized`                 | reconfigure, `on_surface_changed`              |
//! | `RedrawRequested`         | `draw_frame`, present, fps title               |
//! | `Occluded(true/false)`    | `pause()` / `resume()`                         |
//! | suspended                 | `pause()`, `on_surface_destroyed`              |
//! | `CloseRequested` / exit   | `stop()`                                       |

use super::fps::{FpsCounter, window_title};
use crate::config::Config;
use crate::errors::{AppError, AppResult, RenderError};
use crate::gpu;
use crate::mailbox::FrameMailbox;
use crate::pipelines::PipelineController;
use crate::render::wgpu_context::WgpuContext;
use crate::render::{DrawOutcome, RenderHandle, Renderer};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const DEVICE_LABEL: &str = "edge-camera-preview";

/// Surface plus the renderer drawing into it
struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    renderer: Renderer<WgpuContext>,
}

impl SurfaceState {
    fn reconfigure(&mut self) {
        self.surface
            .configure(self.renderer.gpu().device(), &self.config);
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            debug!("Ignoring zero-sized surface");
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.reconfigure();
        self.renderer.on_surface_changed(size.width, size.height);
    }
}

struct Viewer {
    instance: wgpu::Instance,
    window: Option<Arc<Window>>,
    surface: Option<SurfaceState>,
    handle: RenderHandle,
    controller: PipelineController,
    started: bool,
    fps: FpsCounter,
    last_outcome: Option<DrawOutcome>,
    error: Option<AppError>,
}

impl Viewer {
    fn new(config: &Config) -> Self {
        let handle = RenderHandle::new(FrameMailbox::new());
        let controller = PipelineController::from_config(config, handle.clone());
        Self {
            instance: wgpu::Instance::default(),
            window: None,
            surface: None,
            handle,
            controller,
            started: false,
            fps: FpsCounter::default(),
            last_outcome: None,
            error: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>, RenderError> {
        if let Some(window) = &self.window {
            return Ok(window.clone());
        }

        let attributes = Window::default_attributes().with_title(window_title(None, None));
        let window = event_loop
            .create_window(attributes)
            .map(Arc::new)
            .map_err(|e| RenderError::Window(e.to_string()))?;
        info!(size = ?window.inner_size(), "Preview window created");
        self.window = Some(window.clone());
        Ok(window)
    }

    fn create_surface(&self, window: Arc<Window>) -> Result<SurfaceState, RenderError> {
        let size = window.inner_size();
        let surface = self
            .instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let (adapter, device, queue, info) = pollster::block_on(gpu::create_surface_device(
            &self.instance,
            &surface,
            DEVICE_LABEL,
        ))?;
        let config = gpu::surface_config(&surface, &adapter, size.width, size.height)?;
        surface.configure(&device, &config);
        info!(
            adapter = %info.adapter_name,
            backend = ?info.backend,
            format = ?config.format,
            "Preview surface configured"
        );

        let gpu = WgpuContext::new(device, queue, config.format);
        let mut renderer = Renderer::with_handle(gpu, self.handle.clone());
        renderer.on_surface_created();
        renderer.on_surface_changed(config.width, config.height);

        Ok(SurfaceState {
            surface,
            config,
            renderer,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!(error = %err, "Preview host failed");
        self.controller.stop();
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.surface.as_mut() else {
            return;
        };

        let frame = match state.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                state.reconfigure();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Surface frame timed out");
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                let err = RenderError::Surface("out of memory acquiring frame".into());
                self.fail(event_loop, err.into());
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to acquire surface frame");
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let outcome = state.renderer.draw_frame(&view);
        if self.last_outcome != Some(outcome) {
            debug!(?outcome, "Draw outcome changed");
            self.last_outcome = Some(outcome);
        }

        if let Some(window) = &self.window {
            window.pre_present_notify();
        }
        frame.present();

        if let Some(fps) = self.fps.tick() {
            let size = self.handle.mailbox().last_dimensions();
            debug!(fps, ?size, "Preview rate");
            if let Some(window) = &self.window {
                window.set_title(&window_title(Some(fps), size));
            }
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = match self.ensure_window(event_loop) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, e.into()),
        };

        if self.surface.is_none() {
            match self.create_surface(window.clone()) {
                Ok(state) => self.surface = Some(state),
                Err(e) => return self.fail(event_loop, e.into()),
            }
        }

        if self.started {
            self.controller.resume();
        } else {
            if let Err(e) = self.controller.start() {
                error!(error = %e, "Failed to start preview pipeline");
            }
            self.started = true;
        }
        window.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.controller.pause();
        if let Some(mut state) = self.surface.take() {
            state.renderer.on_surface_destroyed();
        }
        info!("Preview surface released");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Preview window closed");
                self.controller.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.surface.as_mut() {
                    state.resize(size);
                }
            }
            WindowEvent::Occluded(true) => self.controller.pause(),
            WindowEvent::Occluded(false) => {
                self.controller.resume();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.handle.is_continuous()
            && let Some(window) = &self.window
        {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.controller.stop();
        if let Some(mut state) = self.surface.take() {
            state.renderer.on_surface_destroyed();
        }
    }
}

/// Open the preview window and run until it is closed
pub fn run(config: &Config) -> AppResult<()> {
    let event_loop = EventLoop::new().map_err(|e| RenderError::Window(e.to_string()))?;
    let mut viewer = Viewer::new(config);

    event_loop
        .run_app(&mut viewer)
        .map_err(|e| RenderError::Window(e.to_string()))?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
