// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Camera backend type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices (/dev/video*)
    #[default]
    V4l2,
    /// Synthetic sensor producing a moving test pattern
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human readable name (V4L2 card name)
    pub name: String,
    /// Identifier used to open the device (e.g. /dev/video0)
    pub path: String,
    /// Enumeration index, lowest first
    pub index: usize,
    /// Driver name, when the backend can report it
    pub driver: Option<String>,
}

/// Output size offered by a device for the working pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One plane of a planar sensor image
///
/// `data` may be longer than the logical plane: rows are `row_stride` bytes
/// apart and the driver is free to pad them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Bytes between the starts of consecutive rows
    pub row_stride: u32,
    /// Bytes between consecutive samples in a row (1 for fully planar data)
    pub pixel_stride: u32,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: u32) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Raw planar 4:2:0 frame as delivered by the sensor
///
/// Plane 0 is full-resolution luma, planes 1 and 2 are the subsampled U and V
/// chroma planes.
#[derive(Debug, Clone)]
pub struct SensorImage {
    pub width: u32,
    pub height: u32,
    pub planes: [Plane; 3],
    /// Driver sequence number (monotonic per stream)
    pub sequence: u64,
    /// When the frame was dequeued from the hardware
    pub captured_at: Instant,
}

impl SensorImage {
    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn chroma_u(&self) -> &Plane {
        &self.planes[1]
    }

    pub fn chroma_v(&self) -> &Plane {
        &self.planes[2]
    }

    /// Split one contiguous YU12 buffer into its three planes
    ///
    /// `stride` is the luma `bytesperline`; the chroma planes use half of it
    /// and half the height (rounded up). A truncated buffer keeps whatever
    /// chroma bytes it does contain, but must hold the whole luma plane.
    pub fn from_yu12(
        buffer: &[u8],
        width: u32,
        height: u32,
        stride: u32,
        sequence: u64,
    ) -> BackendResult<Self> {
        let stride = stride.max(width);
        let y_size = stride as usize * height as usize;
        if buffer.len() < y_size {
            return Err(BackendError::InvalidBuffer(format!(
                "{} bytes cannot hold a {}x{} luma plane with stride {}",
                buffer.len(),
                width,
                height,
                stride
            )));
        }

        let chroma_stride = stride.div_ceil(2);
        let chroma_size = chroma_stride as usize * height.div_ceil(2) as usize;

        let (y, rest) = buffer.split_at(y_size);
        let (u, rest) = rest.split_at(chroma_size.min(rest.len()));
        let v = &rest[..chroma_size.min(rest.len())];

        Ok(Self {
            width,
            height,
            planes: [
                Plane::new(y.to_vec(), stride),
                Plane::new(u.to_vec(), chroma_stride),
                Plane::new(v.to_vec(), chroma_stride),
            ],
            sequence,
            captured_at: Instant::now(),
        })
    }
}

/// A frame after conversion, with the dimensions it was captured at
///
/// Dimensions travel with the pixels because they can change between frames
/// (device reconfiguration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ConvertedFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Camera device not found
    DeviceNotFound(String),
    /// Opening the device failed
    OpenFailed(String),
    /// Stream/session configuration was rejected by the device
    ConfigurationFailed(String),
    /// Device went away while streaming
    Disconnected(String),
    /// A dequeued buffer did not have the expected layout
    InvalidBuffer(String),
    /// Operation on a session or reader that is already closed
    Closed,
    /// General I/O error
    IoError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::OpenFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            BackendError::ConfigurationFailed(msg) => {
                write!(f, "Capture session configuration failed: {}", msg)
            }
            BackendError::Disconnected(msg) => write!(f, "Camera disconnected: {}", msg),
            BackendError::InvalidBuffer(msg) => write!(f, "Invalid sensor buffer: {}", msg),
            BackendError::Closed => write!(f, "Capture session already closed"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yu12_splits_planes_with_padding() {
        // 4x2 image, stride 6: luma 12 bytes, chroma stride 3 x 1 row each
        let mut buffer: Vec<u8> = (0..12).collect();
        buffer.extend_from_slice(&[100, 101, 102]);
        buffer.extend_from_slice(&[200, 201, 202]);

        let image = SensorImage::from_yu12(&buffer, 4, 2, 6, 7).unwrap();
        assert_eq!(image.luma().len(), 12);
        assert_eq!(image.luma().row_stride, 6);
        assert_eq!(image.chroma_u().data, vec![100, 101, 102]);
        assert_eq!(image.chroma_v().data, vec![200, 201, 202]);
        assert_eq!(image.sequence, 7);
    }

    #[test]
    fn test_from_yu12_truncated_chroma() {
        let buffer = vec![0u8; 8 + 2];
        let image = SensorImage::from_yu12(&buffer, 4, 2, 4, 0).unwrap();
        assert_eq!(image.chroma_u().len(), 2);
        assert!(image.chroma_v().is_empty());
    }

    #[test]
    fn test_from_yu12_rejects_short_luma() {
        let err = SensorImage::from_yu12(&[0u8; 7], 4, 2, 4, 0).unwrap_err();
        assert!(matches!(err, BackendError::InvalidBuffer(_)));
    }

    #[test]
    fn test_backend_type_serde_names() {
        let json = serde_json::to_string(&CameraBackendType::TestPattern).unwrap();
        assert_eq!(json, "\"test-pattern\"");
    }
}
