// SPDX-License-Identifier: GPL-3.0-only

//! Luminance renderer
//!
//! The renderer owns one shader program and one single-channel texture. Both
//! are created when the drawing surface is created and recreated from scratch
//! whenever the surface is recreated. Each draw tick clears the surface, then
//! uploads the mailbox frame if it changed since the last upload and draws a
//! full-screen quad sampling the texture.
//!
//! The mailbox lock covers the read-and-upload only. The draw call itself runs
//! after the lock is released, so the capture thread never waits on the GPU.
//!
//! GPU access goes through [`GpuContext`] so the tick logic can be exercised
//! without a device; [`wgpu_context::WgpuContext`] is the real implementation.

pub mod quad;
pub mod wgpu_context;

use crate::errors::RenderError;
use crate::lifecycle::{LifecycleState, StateCell};
use crate::mailbox::FrameMailbox;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// WGSL source of the luminance quad program
pub const LUMA_QUAD_WGSL: &str = include_str!("luma_quad.wgsl");

/// GPU operations the renderer needs
pub trait GpuContext {
    /// Compiled and linked shader program
    type Program;
    /// Single-channel 2D texture
    type Texture;
    /// What a frame is drawn into
    type Target;

    /// Compile the program; the error carries the compiler diagnostic
    fn create_program(&mut self, source: &str) -> Result<Self::Program, RenderError>;

    /// Allocate a `width x height` single-channel texture
    fn create_luma_texture(&mut self, width: u32, height: u32) -> Self::Texture;

    /// Upload tightly packed rows (1-byte row alignment) into the texture
    fn upload_luma(&mut self, texture: &Self::Texture, width: u32, height: u32, pixels: &[u8]);

    /// Surface size changed to `width x height`
    ///
    /// Backends whose passes already cover the whole target (wgpu render
    /// passes do) can ignore it.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn clear(&mut self, target: &Self::Target);

    /// Draw the full-screen quad sampling `texture` with `program`
    fn draw_quad(&mut self, target: &Self::Target, program: &Self::Program, texture: &Self::Texture);

    /// Submit everything recorded for this tick
    fn submit(&mut self) {}
}

/// What a draw tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// No surface resources yet; cleared only
    NoSurface,
    /// No frame was ever deposited; cleared only
    Idle,
    /// A new frame was uploaded and drawn
    Uploaded,
    /// The mailbox had not changed; the last uploaded frame was drawn again
    Redrawn,
    /// The program failed to build; cleared only
    NoProgram,
}

/// Handle shared with the host and the pipeline controller
#[derive(Debug, Clone)]
pub struct RenderHandle {
    mailbox: FrameMailbox,
    continuous: Arc<AtomicBool>,
}

impl RenderHandle {
    /// Handle drawing from `mailbox`, continuous drawing enabled
    pub fn new(mailbox: FrameMailbox) -> Self {
        Self {
            mailbox,
            continuous: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Replace the frame shown on the next draw tick
    pub fn update_frame(&self, pixels: &[u8], width: u32, height: u32) {
        self.mailbox.deposit(pixels, width, height);
    }

    pub fn mailbox(&self) -> &FrameMailbox {
        &self.mailbox
    }

    /// Stop requesting continuous redraws
    pub fn pause(&self) {
        if self.continuous.swap(false, Ordering::SeqCst) {
            debug!("Render loop paused");
        }
    }

    /// Resume continuous redraws
    pub fn resume(&self) {
        if !self.continuous.swap(true, Ordering::SeqCst) {
            debug!("Render loop resumed");
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous.load(Ordering::SeqCst)
    }
}

struct GpuResources<G: GpuContext> {
    /// `None` when the program failed to build
    program: Option<G::Program>,
    texture: G::Texture,
    texture_size: (u32, u32),
    /// Mailbox generation currently in the texture; 0 = nothing uploaded
    uploaded_generation: u64,
}

enum Upload {
    NoFrame,
    Unchanged,
    Uploaded,
}

pub struct Renderer<G: GpuContext> {
    gpu: G,
    handle: RenderHandle,
    state: StateCell,
    resources: Option<GpuResources<G>>,
    surface_size: (u32, u32),
}

impl<G: GpuContext> Renderer<G> {
    pub fn new(gpu: G, mailbox: FrameMailbox) -> Self {
        Self::with_handle(gpu, RenderHandle::new(mailbox))
    }

    /// Renderer sharing mailbox and draw state with an existing handle
    ///
    /// Used when the GPU device is recreated but the pipeline keeps running.
    pub fn with_handle(gpu: G, handle: RenderHandle) -> Self {
        Self {
            gpu,
            handle,
            state: StateCell::new(LifecycleState::Stopped),
            resources: None,
            surface_size: (0, 0),
        }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Dimensions of the texture currently on the GPU
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.resources.as_ref().map(|r| r.texture_size)
    }

    /// Whether a usable program exists
    pub fn has_program(&self) -> bool {
        self.resources
            .as_ref()
            .is_some_and(|r| r.program.is_some())
    }

    /// Replace the frame shown on the next draw tick
    pub fn update_frame(&self, pixels: &[u8], width: u32, height: u32) {
        self.handle.update_frame(pixels, width, height);
    }

    /// Build program and texture for a new surface
    ///
    /// Anything from a previous surface is discarded first. The mailbox frame
    /// is uploaded again on the next tick.
    pub fn on_surface_created(&mut self) {
        self.state.set(LifecycleState::Starting);
        self.resources = None;

        let program = match self.gpu.create_program(LUMA_QUAD_WGSL) {
            Ok(program) => Some(program),
            Err(e) => {
                error!(error = %e, "Luminance program unusable, frames will not be drawn");
                None
            }
        };
        let texture = self.gpu.create_luma_texture(1, 1);

        self.resources = Some(GpuResources {
            program,
            texture,
            texture_size: (1, 1),
            uploaded_generation: 0,
        });
        self.state.set(LifecycleState::Running);
        info!("Render surface created");
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "Render surface changed");
        self.surface_size = (width, height);
        self.gpu.set_viewport(width, height);
    }

    /// Drop everything tied to the surface
    pub fn on_surface_destroyed(&mut self) {
        self.state.set(LifecycleState::Stopping);
        self.resources = None;
        self.state.set(LifecycleState::Stopped);
        debug!("Render surface destroyed");
    }

    /// One draw tick; never blocks on the camera
    pub fn draw_frame(&mut self, target: &G::Target) -> DrawOutcome {
        let Self {
            gpu,
            handle,
            resources,
            ..
        } = self;

        gpu.clear(target);

        let Some(resources) = resources.as_mut() else {
            gpu.submit();
            return DrawOutcome::NoSurface;
        };

        let upload = handle.mailbox.read_latest(|slot| {
            if !slot.has_frame() || slot.width == 0 || slot.height == 0 {
                return Upload::NoFrame;
            }
            if slot.generation == resources.uploaded_generation {
                return Upload::Unchanged;
            }

            let size = (slot.width, slot.height);
            if size != resources.texture_size {
                debug!(
                    width = slot.width,
                    height = slot.height,
                    "Frame size changed, reallocating texture"
                );
                resources.texture = gpu.create_luma_texture(slot.width, slot.height);
                resources.texture_size = size;
            }

            gpu.upload_luma(&resources.texture, slot.width, slot.height, &slot.data);
            resources.uploaded_generation = slot.generation;
            Upload::Uploaded
        });

        let outcome = match upload {
            Upload::NoFrame => DrawOutcome::Idle,
            _ if resources.program.is_none() => DrawOutcome::NoProgram,
            Upload::Unchanged => DrawOutcome::Redrawn,
            Upload::Uploaded => DrawOutcome::Uploaded,
        };

        if matches!(outcome, DrawOutcome::Uploaded | DrawOutcome::Redrawn)
            && let Some(program) = resources.program.as_ref()
        {
            gpu.draw_quad(target, program, &resources.texture);
        }

        gpu.submit();
        outcome
    }
}
