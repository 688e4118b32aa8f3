// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 capture backend
//!
//! Enumerates `/dev/video*` capture nodes and streams planar YU12 through a
//! memory-mapped buffer queue.

use super::image_reader::ImageReader;
use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, FrameSize, SensorImage,
};
use super::{CameraBackend, CaptureSession};
use crate::constants::{IMAGE_READER_CAPACITY, WORKING_FOURCC};
use std::io;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::{CaptureStream, Stream};
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// V4L2 backend
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

fn working_fourcc() -> FourCC {
    FourCC::new(&WORKING_FOURCC)
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let mut cameras = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();

            let Ok(dev) = Device::with_path(node.path()) else {
                debug!(path = %path, "Skipping device that cannot be opened");
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };

            // Metadata nodes share the driver but cannot capture video
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                debug!(path = %path, "Skipping non-capture node");
                continue;
            }

            let name = node.name().unwrap_or_else(|| caps.card.clone());
            debug!(path = %path, name = %name, driver = %caps.driver, "Found V4L2 camera");

            cameras.push(CameraDevice {
                name,
                path,
                index: node.index(),
                driver: Some(caps.driver),
            });
        }

        info!(count = cameras.len(), "Enumerated V4L2 cameras");
        cameras
    }

    fn supported_sizes(&self, device: &CameraDevice) -> Vec<FrameSize> {
        let dev = match Device::with_path(&device.path) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %device.path, error = %e, "Failed to open device for size query");
                return Vec::new();
            }
        };

        let frame_sizes = match dev.enum_framesizes(working_fourcc()) {
            Ok(sizes) => sizes,
            Err(e) => {
                debug!(path = %device.path, error = %e, "No frame sizes for YU12");
                return Vec::new();
            }
        };

        let mut sizes = Vec::new();
        for size in frame_sizes {
            let size = match size.size {
                FrameSizeEnum::Discrete(discrete) => FrameSize::new(discrete.width, discrete.height),
                // Continuous ranges report their largest size
                FrameSizeEnum::Stepwise(step) => FrameSize::new(step.max_width, step.max_height),
            };
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }
        sizes
    }

    fn open(&self, device: &CameraDevice, size: FrameSize) -> BackendResult<Box<dyn CaptureSession>> {
        info!(path = %device.path, size = %size, "Opening V4L2 device");

        let dev = Device::with_path(&device.path)
            .map_err(|e| BackendError::OpenFailed(format!("{}: {}", device.path, e)))?;

        let requested = Format::new(size.width, size.height, working_fourcc());
        let actual = dev
            .set_format(&requested)
            .map_err(|e| BackendError::ConfigurationFailed(format!("set_format: {}", e)))?;

        if actual.fourcc != working_fourcc() {
            return Err(BackendError::ConfigurationFailed(format!(
                "device selected {} instead of YU12",
                actual.fourcc
            )));
        }

        info!(
            width = actual.width,
            height = actual.height,
            stride = actual.stride,
            "V4L2 format configured"
        );

        let mut stream = MmapStream::with_buffers(&dev, Type::VideoCapture, IMAGE_READER_CAPACITY as u32)
            .map_err(|e| BackendError::ConfigurationFailed(format!("stream setup: {}", e)))?;
        stream
            .start()
            .map_err(|e| BackendError::ConfigurationFailed(format!("stream on: {}", e)))?;

        Ok(Box::new(V4l2Session {
            path: device.path.clone(),
            format: actual,
            stream: Some(stream),
            _device: dev,
        }))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

/// Active V4L2 stream
struct V4l2Session {
    path: String,
    format: Format,
    stream: Option<MmapStream<'static>>,
    _device: Device,
}

impl CaptureSession for V4l2Session {
    fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.format.width, self.format.height)
    }

    fn pump(&mut self, reader: &ImageReader, timeout: Duration) -> BackendResult<usize> {
        let stream = self.stream.as_mut().ok_or(BackendError::Closed)?;
        stream.set_timeout(timeout);

        let (buf, meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) if e.raw_os_error() == Some(19) => {
                // ENODEV: unplugged
                return Err(BackendError::Disconnected(self.path.clone()));
            }
            Err(e) => return Err(BackendError::IoError(e.to_string())),
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };

        let image = SensorImage::from_yu12(
            &buf[..used],
            self.format.width,
            self.format.height,
            self.format.stride,
            meta.sequence as u64,
        )?;

        reader.submit(image)?;
        Ok(1)
    }

    fn close(&mut self) -> BackendResult<()> {
        // Dropping the stream turns streaming off and unmaps the buffers
        if let Some(stream) = self.stream.take() {
            debug!(path = %self.path, "Stopping V4L2 stream");
            drop(stream);
        }
        Ok(())
    }
}
