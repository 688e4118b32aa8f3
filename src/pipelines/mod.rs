// SPDX-License-Identifier: MPL-2.0

//! Pipeline composition
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Camera (YU12)│ ──▶ │  Capture thread   │ ──▶ │ FrameMailbox │ ──▶ │   Renderer   │
//! │              │     │  - YUV420→NV21    │     │ (latest wins)│     │ - R8 upload  │
//! │              │     │  - processor      │     │              │     │ - quad draw  │
//! └──────────────┘     └───────────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The capture side and the render side never wait on each other: the
//! capture thread overwrites the mailbox, the render loop draws whatever is
//! newest at its own cadence.
//!
//! # Modules
//!
//! - [`preview`]: start/stop/pause/resume for the whole preview

pub mod preview;

pub use preview::PipelineController;
