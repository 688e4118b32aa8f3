// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Pipeline / CLI / Preview host        │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Camera backends                │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    V4L2     │    │   Test pattern   │    │
//! │  │ (/dev/video)│    │   (synthetic)    │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
