// SPDX-License-Identifier: MPL-2.0
// Camera backend with trait-based abstraction

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    CaptureSource    │  ← Lifecycle, background thread, per-frame work
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Enumeration, size negotiation, open
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌───────────┐
//!   │ V4L2 │  │TestPattern│
//!   └──────┘  └───────────┘
//! ```
//!
//! A backend opens a [`CaptureSession`] which pushes raw planar frames into an
//! [`ImageReader`]; the capture thread only ever takes the newest one.

pub mod capture;
pub mod frame_loop;
pub mod image_reader;
pub mod test_pattern;
pub mod types;
pub mod v4l2;

pub use capture::CaptureSource;
pub use image_reader::{AcquiredImage, ImageReader, SubmitOutcome};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

/// Camera backend trait
///
/// Backends are shared with the capture thread, so they must be `Send + Sync`.
/// Sessions are created and dropped on that thread and need not be.
pub trait CameraBackend: Send + Sync {
    /// Enumerate available cameras, in the order the system reports them
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Output sizes the device supports for the working pixel format (YU12)
    ///
    /// An empty list is valid; the caller falls back to a fixed size.
    fn supported_sizes(&self, device: &CameraDevice) -> Vec<FrameSize>;

    /// Open the device and begin a repeating capture at `size`
    ///
    /// May block briefly on the camera subsystem.
    fn open(&self, device: &CameraDevice, size: FrameSize) -> BackendResult<Box<dyn CaptureSession>>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// An open device with an active repeating capture request
pub trait CaptureSession {
    /// Negotiated frame size (may differ from the requested one)
    fn frame_size(&self) -> FrameSize;

    /// Wait at most `timeout` for the hardware and submit any delivered frames
    /// to `reader`. Returns how many frames were submitted; zero on timeout.
    fn pump(&mut self, reader: &ImageReader, timeout: Duration) -> BackendResult<usize>;

    /// Stop the repeating request and close the session and device
    ///
    /// Must be safe to call more than once.
    fn close(&mut self) -> BackendResult<()>;
}

/// Get a concrete backend instance
pub fn get_backend(backend_type: CameraBackendType) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new()),
        CameraBackendType::TestPattern => Arc::new(test_pattern::TestPatternBackend::default()),
    }
}

/// Size used for a device: the first supported one, else the fixed fallback
pub fn select_frame_size(sizes: &[FrameSize]) -> FrameSize {
    sizes.first().copied().unwrap_or(FrameSize::new(
        crate::constants::FALLBACK_WIDTH,
        crate::constants::FALLBACK_HEIGHT,
    ))
}
