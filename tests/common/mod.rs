// SPDX-License-Identifier: MPL-2.0

//! Shared fixtures for integration tests

#![allow(dead_code)]

use edge_camera::RenderError;
use edge_camera::backends::camera::test_pattern::TestPatternBackend;
use edge_camera::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraDevice, CaptureSession,
    FrameSize, ImageReader,
};
use edge_camera::render::GpuContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// GPU stand-in that records every call
#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub fail_program: bool,
    pub programs: usize,
    /// Every texture allocation, in order
    pub textures: Vec<(u32, u32)>,
    /// (width, height, byte count) of every upload
    pub uploads: Vec<(u32, u32, usize)>,
    pub last_upload: Vec<u8>,
    pub viewport: Option<(u32, u32)>,
    pub clears: usize,
    pub draws: usize,
    pub submits: usize,
}

impl RecordingGpu {
    pub fn failing_program() -> Self {
        Self {
            fail_program: true,
            ..Self::default()
        }
    }
}

impl GpuContext for RecordingGpu {
    type Program = usize;
    type Texture = (u32, u32);
    type Target = ();

    fn create_program(&mut self, _source: &str) -> Result<usize, RenderError> {
        if self.fail_program {
            return Err(RenderError::ShaderCompile(
                "error: expected ';' at line 3".to_string(),
            ));
        }
        self.programs += 1;
        Ok(self.programs)
    }

    fn create_luma_texture(&mut self, width: u32, height: u32) -> (u32, u32) {
        self.textures.push((width, height));
        (width, height)
    }

    fn upload_luma(&mut self, texture: &(u32, u32), width: u32, height: u32, pixels: &[u8]) {
        assert_eq!(*texture, (width, height), "upload into a texture of another size");
        self.uploads.push((width, height, pixels.len()));
        self.last_upload = pixels.to_vec();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn clear(&mut self, _target: &()) {
        self.clears += 1;
    }

    fn draw_quad(&mut self, _target: &(), _program: &usize, _texture: &(u32, u32)) {
        self.draws += 1;
    }

    fn submit(&mut self) {
        self.submits += 1;
    }
}

/// Backend that fails to open a fixed number of times, then behaves like the test pattern
pub struct FlakyBackend {
    inner: TestPatternBackend,
    failures_left: AtomicUsize,
    pub opens: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(failures: usize, inner: TestPatternBackend) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
            opens: AtomicUsize::new(0),
        }
    }
}

impl CameraBackend for FlakyBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.inner.enumerate_cameras()
    }

    fn supported_sizes(&self, device: &CameraDevice) -> Vec<FrameSize> {
        self.inner.supported_sizes(device)
    }

    fn open(&self, device: &CameraDevice, size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::OpenFailed("device busy".to_string()));
        }
        self.inner.open(device, size)
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

/// Backend that sees no cameras at all
pub struct EmptyBackend;

impl CameraBackend for EmptyBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        Vec::new()
    }

    fn supported_sizes(&self, _device: &CameraDevice) -> Vec<FrameSize> {
        Vec::new()
    }

    fn open(&self, device: &CameraDevice, _size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        Err(BackendError::DeviceNotFound(device.path.clone()))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

/// Backend whose session blocks in the driver far longer than any stop timeout
pub struct StuckBackend {
    pub block_for: Duration,
}

struct StuckSession {
    block_for: Duration,
}

impl CameraBackend for StuckBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Stuck".to_string(),
            path: "stuck://0".to_string(),
            index: 0,
            driver: None,
        }]
    }

    fn supported_sizes(&self, _device: &CameraDevice) -> Vec<FrameSize> {
        vec![FrameSize::new(8, 8)]
    }

    fn open(&self, _device: &CameraDevice, _size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        Ok(Box::new(StuckSession {
            block_for: self.block_for,
        }))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

impl CaptureSession for StuckSession {
    fn frame_size(&self) -> FrameSize {
        FrameSize::new(8, 8)
    }

    fn pump(&mut self, _reader: &ImageReader, _timeout: Duration) -> BackendResult<usize> {
        std::thread::sleep(self.block_for);
        Ok(0)
    }

    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// Backend whose first session hangs in the driver and then reports a
/// disconnect; later opens behave like the test pattern
pub struct HangThenDisconnectBackend {
    inner: TestPatternBackend,
    block_for: Duration,
    pub opens: AtomicUsize,
}

impl HangThenDisconnectBackend {
    pub fn new(block_for: Duration, inner: TestPatternBackend) -> Self {
        Self {
            inner,
            block_for,
            opens: AtomicUsize::new(0),
        }
    }
}

struct HangThenDisconnectSession {
    size: FrameSize,
    block_for: Duration,
}

impl CameraBackend for HangThenDisconnectBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.inner.enumerate_cameras()
    }

    fn supported_sizes(&self, device: &CameraDevice) -> Vec<FrameSize> {
        self.inner.supported_sizes(device)
    }

    fn open(&self, device: &CameraDevice, size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(Box::new(HangThenDisconnectSession {
                size,
                block_for: self.block_for,
            }));
        }
        self.inner.open(device, size)
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

impl CaptureSession for HangThenDisconnectSession {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn pump(&mut self, _reader: &ImageReader, _timeout: Duration) -> BackendResult<usize> {
        std::thread::sleep(self.block_for);
        Err(BackendError::Disconnected("usb reset".to_string()))
    }

    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
