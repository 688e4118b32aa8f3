// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera producing a moving pattern
//!
//! Frames are planar YUV 4:2:0 with padded rows, like real drivers deliver
//! them, so the whole pipeline can run without hardware.

use super::image_reader::ImageReader;
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, FrameSize, Plane, SensorImage,
};
use super::{CameraBackend, CaptureSession};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const TEST_PATTERN_PATH: &str = "test-pattern://0";

/// Test pattern backend
#[derive(Debug, Clone)]
pub struct TestPatternBackend {
    sizes: Vec<FrameSize>,
    frame_interval: Duration,
    row_padding: u32,
}

impl Default for TestPatternBackend {
    fn default() -> Self {
        Self {
            sizes: vec![FrameSize::new(640, 480), FrameSize::new(320, 240)],
            frame_interval: Duration::from_millis(33),
            row_padding: 16,
        }
    }
}

impl TestPatternBackend {
    /// Report exactly these sizes (may be empty)
    pub fn with_sizes(mut self, sizes: Vec<FrameSize>) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Extra bytes at the end of every luma row
    pub fn with_row_padding(mut self, padding: u32) -> Self {
        self.row_padding = padding;
        self
    }
}

impl CameraBackend for TestPatternBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Test Pattern".to_string(),
            path: TEST_PATTERN_PATH.to_string(),
            index: 0,
            driver: None,
        }]
    }

    fn supported_sizes(&self, _device: &CameraDevice) -> Vec<FrameSize> {
        self.sizes.clone()
    }

    fn open(&self, device: &CameraDevice, size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        if device.path != TEST_PATTERN_PATH {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }
        if size.width == 0 || size.height == 0 {
            return Err(BackendError::ConfigurationFailed(format!(
                "invalid size {}",
                size
            )));
        }

        info!(size = %size, "Opening test pattern");
        Ok(Box::new(TestPatternSession {
            size,
            frame_interval: self.frame_interval,
            row_padding: self.row_padding,
            next_frame: Instant::now(),
            sequence: 0,
            closed: false,
        }))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

struct TestPatternSession {
    size: FrameSize,
    frame_interval: Duration,
    row_padding: u32,
    next_frame: Instant,
    sequence: u64,
    closed: bool,
}

impl CaptureSession for TestPatternSession {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn pump(&mut self, reader: &ImageReader, timeout: Duration) -> BackendResult<usize> {
        if self.closed {
            return Err(BackendError::Closed);
        }

        let now = Instant::now();
        if self.next_frame > now {
            let wait = self.next_frame - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(0);
            }
            std::thread::sleep(wait);
        }

        let image = render_pattern(self.size, self.row_padding, self.sequence);
        self.sequence += 1;
        self.next_frame += self.frame_interval;
        // Never try to catch up on missed frames
        self.next_frame = self.next_frame.max(Instant::now());

        reader.submit(image)?;
        Ok(1)
    }

    fn close(&mut self) -> BackendResult<()> {
        if !self.closed {
            debug!(frames = self.sequence, "Closing test pattern");
            self.closed = true;
        }
        Ok(())
    }
}

/// Diagonal bars scrolling one pixel per frame, neutral chroma
pub fn render_pattern(size: FrameSize, row_padding: u32, sequence: u64) -> SensorImage {
    let width = size.width as usize;
    let height = size.height as usize;
    let stride = width + row_padding as usize;
    let offset = sequence as usize;

    let mut luma = vec![0xAAu8; stride * height];
    for (y, row) in luma.chunks_exact_mut(stride).enumerate() {
        for (x, px) in row[..width].iter_mut().enumerate() {
            *px = if ((x + y + offset) / 32) % 2 == 0 { 40 } else { 210 };
        }
    }

    let chroma_stride = stride.div_ceil(2);
    let chroma_len = chroma_stride * height.div_ceil(2);

    SensorImage {
        width: size.width,
        height: size.height,
        planes: [
            Plane::new(luma, stride as u32),
            Plane::new(vec![128; chroma_len], chroma_stride as u32),
            Plane::new(vec![128; chroma_len], chroma_stride as u32),
        ],
        sequence,
        captured_at: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_has_padded_rows() {
        let image = render_pattern(FrameSize::new(8, 4), 4, 0);
        assert_eq!(image.luma().row_stride, 12);
        assert_eq!(image.luma().len(), 48);
        // Padding bytes stay untouched
        assert_eq!(image.luma().data[8..12], [0xAA; 4]);
        assert_eq!(image.chroma_u().row_stride, 6);
    }

    #[test]
    fn test_session_pumps_into_reader() {
        let backend = TestPatternBackend::default().with_frame_interval(Duration::ZERO);
        let device = backend.enumerate_cameras().remove(0);
        let mut session = backend.open(&device, FrameSize::new(16, 8)).unwrap();
        let reader = ImageReader::new(2);

        assert_eq!(session.pump(&reader, Duration::from_millis(10)).unwrap(), 1);
        assert_eq!(session.pump(&reader, Duration::from_millis(10)).unwrap(), 1);
        let image = reader.acquire_latest().unwrap();
        assert_eq!(image.sequence, 1);

        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(
            session.pump(&reader, Duration::from_millis(10)),
            Err(BackendError::Closed)
        );
    }

    #[test]
    fn test_slow_pattern_times_out() {
        let backend = TestPatternBackend::default().with_frame_interval(Duration::from_secs(10));
        let device = backend.enumerate_cameras().remove(0);
        let mut session = backend.open(&device, FrameSize::new(4, 4)).unwrap();
        let reader = ImageReader::new(2);

        // First frame is immediate, the next one is far away
        assert_eq!(session.pump(&reader, Duration::from_millis(5)).unwrap(), 1);
        assert_eq!(session.pump(&reader, Duration::from_millis(5)).unwrap(), 0);
    }
}
