// SPDX-License-Identifier: GPL-3.0-only

//! Windowed preview application
//!
//! - [`viewer`]: winit event loop hosting the wgpu surface and renderer
//! - [`fps`]: presented-frame statistics for the window title

pub mod fps;
pub mod viewer;

pub use viewer::run;
