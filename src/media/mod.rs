// SPDX-License-Identifier: MPL-2.0

//! Pixel format conversion
//!
//! Camera frames arrive as planar YUV 4:2:0 (three planes). The processing
//! stage expects NV21: the luma plane followed by V/U interleaved chroma.
//! [`nv21_converter`] performs that repacking on the CPU.

pub mod nv21_converter;

pub use nv21_converter::{interleave_chroma, sensor_image_to_nv21, yuv420_to_nv21};
