// SPDX-License-Identifier: MPL-2.0

//! Frame processing stage
//!
//! The capture thread hands every converted NV21 frame to a [`FrameProcessor`]
//! and forwards its single-channel output to the renderer. Returning `None`
//! (or an empty buffer) skips the frame; the previous one stays on screen.

pub mod edges;

pub use edges::{EdgeDetector, Grayscale};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel layout of the buffer passed to a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    /// Luma plane followed by V/U interleaved chroma
    Nv21,
}

impl InputFormat {
    /// Integer tag for processors that dispatch on a numeric format id
    pub const fn tag(self) -> i32 {
        match self {
            InputFormat::Nv21 => 0x11,
        }
    }

    /// Total buffer length for a `width x height` frame in this format
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        match self {
            InputFormat::Nv21 => {
                let luma = width as usize * height as usize;
                let chroma = width.div_ceil(2) as usize * height.div_ceil(2) as usize;
                luma + 2 * chroma
            }
        }
    }
}

/// Synchronous, CPU-bound frame transform
///
/// Called on the capture thread. Output is a `width * height` luminance
/// buffer; shorter output is zero-padded when it is handed to the renderer.
pub trait FrameProcessor: Send + Sync {
    fn process_frame(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: InputFormat,
    ) -> Option<Vec<u8>>;
}

impl<F> FrameProcessor for F
where
    F: Fn(&[u8], u32, u32, InputFormat) -> Option<Vec<u8>> + Send + Sync,
{
    fn process_frame(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: InputFormat,
    ) -> Option<Vec<u8>> {
        self(pixels, width, height, format)
    }
}

/// Built-in processors selectable from config and the command line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessorKind {
    /// Canny-style edge map
    #[default]
    Edges,
    /// Luma plane only
    Grayscale,
}

impl std::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorKind::Edges => write!(f, "edges"),
            ProcessorKind::Grayscale => write!(f, "grayscale"),
        }
    }
}

impl ProcessorKind {
    /// Build the processor, using the thresholds for the edge detector
    pub fn build(self, low_threshold: u16, high_threshold: u16) -> Arc<dyn FrameProcessor> {
        match self {
            ProcessorKind::Edges => Arc::new(EdgeDetector::new(low_threshold, high_threshold)),
            ProcessorKind::Grayscale => Arc::new(Grayscale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv21_frame_len() {
        assert_eq!(InputFormat::Nv21.frame_len(4, 2), 8 + 4);
        assert_eq!(InputFormat::Nv21.frame_len(3, 3), 9 + 8);
    }

    #[test]
    fn test_closure_processor() {
        let invert = |pixels: &[u8], w: u32, h: u32, _: InputFormat| {
            Some(pixels[..(w * h) as usize].iter().map(|p| 255 - p).collect::<Vec<u8>>())
        };
        let out = invert.process_frame(&[0, 255, 9, 9], 2, 1, InputFormat::Nv21);
        assert_eq!(out, Some(vec![255, 0]));
    }
}
