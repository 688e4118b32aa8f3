// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

use std::time::Duration;

/// Output size used when the device reports no sizes for the working format
pub const FALLBACK_WIDTH: u32 = 640;
/// Output size used when the device reports no sizes for the working format
pub const FALLBACK_HEIGHT: u32 = 480;

/// Buffers in the sensor image reader: one frame in flight while the
/// previous one is still being processed
pub const IMAGE_READER_CAPACITY: usize = 2;

/// Working sensor format: planar YUV 4:2:0 (Y plane, then U, then V)
pub const WORKING_FOURCC: [u8; 4] = *b"YU12";

/// Name of the dedicated capture thread
pub const CAPTURE_THREAD_NAME: &str = "cam2-bg";

/// Default upper bound on waiting for the capture thread in `stop()`
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default upper bound on one blocking wait for the camera hardware
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Default hysteresis thresholds for the edge detector
pub const DEFAULT_EDGE_LOW_THRESHOLD: u16 = 80;
/// Default hysteresis thresholds for the edge detector
pub const DEFAULT_EDGE_HIGH_THRESHOLD: u16 = 160;

/// Per-frame warnings are logged once every this many failures
pub const FRAME_WARN_INTERVAL: u64 = 30;

/// Interval over which the viewer averages presented frames
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Background colour the render surface is cleared to (opaque black)
pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];
