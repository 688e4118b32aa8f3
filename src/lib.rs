// SPDX-License-Identifier: MPL-2.0

//! Edge Camera - live camera preview with on-the-fly frame processing
//!
//! Frames flow from a camera device through a background capture thread,
//! which converts each planar YUV 4:2:0 image to NV21, hands it to a frame
//! processor and drops the single-channel result into a latest-wins mailbox.
//! The renderer uploads whatever is newest into a luminance texture and draws
//! it on a full-screen quad.
//!
//! # Architecture
//!
//! - [`backends`]: camera device access (V4L2, synthetic test pattern)
//! - [`media`]: pixel-format conversion
//! - [`processing`]: frame processors (edge detection, grayscale)
//! - [`mailbox`]: single-slot frame handoff between threads
//! - [`render`]: luminance texture upload and quad drawing
//! - [`gpu`]: wgpu device creation for the preview surface
//! - [`pipelines`]: start/stop composition of capture and render
//! - [`app`]: the windowed preview host
//! - [`config`]: user configuration handling

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod lifecycle;
pub mod mailbox;
pub mod media;
pub mod pipelines;
pub mod processing;
pub mod render;

// Re-export commonly used types
pub use backends::camera::{CameraBackendType, CaptureSource};
pub use config::Config;
pub use errors::{AppError, AppResult, FrameError, RenderError};
pub use lifecycle::LifecycleState;
pub use mailbox::FrameMailbox;
pub use pipelines::PipelineController;
pub use processing::{FrameProcessor, InputFormat, ProcessorKind};
pub use render::{DrawOutcome, GpuContext, RenderHandle, Renderer};
