// SPDX-License-Identifier: GPL-3.0-only

//! Presented-frame rate over fixed windows

use crate::constants::FPS_WINDOW;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
    fps: Option<f64>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(FPS_WINDOW)
    }
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    pub fn starting_at(window: Duration, start: Instant) -> Self {
        Self {
            window,
            window_start: start,
            frames: 0,
            fps: None,
        }
    }

    /// Count one frame; returns the new rate when a window closes
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= self.window {
            return None;
        }

        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.fps = Some(fps);
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }

    /// Rate measured over the last closed window
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }
}

/// Window title with rate and displayed frame size
pub fn window_title(fps: Option<f64>, frame_size: Option<(u32, u32)>) -> String {
    let fps = fps.map_or_else(|| "--".to_string(), |f| format!("{:.1}", f));
    match frame_size {
        Some((w, h)) => format!("Edge Camera · {} fps · {}x{}", fps, w, h),
        None => format!("Edge Camera · {} fps · no frame", fps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_reported_after_window() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(Duration::from_secs(1), start);

        for i in 1..30 {
            assert_eq!(counter.tick_at(start + Duration::from_millis(i * 30)), None);
        }
        let fps = counter
            .tick_at(start + Duration::from_millis(1250))
            .unwrap();
        assert!((fps - 24.0).abs() < 1e-9);
        assert_eq!(counter.fps(), Some(fps));
    }

    #[test]
    fn test_window_resets() {
        let start = Instant::now();
        let mut counter = FpsCounter::starting_at(Duration::from_secs(1), start);
        counter.tick_at(start + Duration::from_millis(1500));
        assert_eq!(counter.tick_at(start + Duration::from_millis(1600)), None);
    }

    #[test]
    fn test_title() {
        assert_eq!(
            window_title(Some(29.97), Some((640, 480))),
            "Edge Camera · 30.0 fps · 640x480"
        );
        assert_eq!(window_title(None, None), "Edge Camera · -- fps · no frame");
    }
}
