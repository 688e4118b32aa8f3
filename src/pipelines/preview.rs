// SPDX-License-Identifier: GPL-3.0-only

//! Preview pipeline controller
//!
//! Wires the capture source's output into the renderer's mailbox and owns the
//! start/stop lifecycle of both halves.

use crate::backends::camera::{CaptureSource, get_backend};
use crate::config::Config;
use crate::errors::AppResult;
use crate::lifecycle::LifecycleState;
use crate::render::RenderHandle;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub struct PipelineController {
    capture: CaptureSource,
    render: RenderHandle,
    running: AtomicBool,
}

impl PipelineController {
    pub fn new(capture: CaptureSource, render: RenderHandle) -> Self {
        Self {
            capture,
            render,
            running: AtomicBool::new(false),
        }
    }

    /// Build the capture side from configuration
    pub fn from_config(config: &Config, render: RenderHandle) -> Self {
        let backend = get_backend(config.backend);
        let processor = config
            .processor
            .build(config.edge_low_threshold, config.edge_high_threshold);
        let capture = CaptureSource::new(backend, processor)
            .with_poll_timeout(config.poll_timeout())
            .with_stop_timeout(config.stop_timeout());

        info!(
            backend = %config.backend,
            processor = %config.processor,
            "Preview pipeline configured"
        );
        Self::new(capture, render)
    }

    /// Start capture and continuous rendering; no-op if already running
    ///
    /// If the camera failed to open on an earlier start, capture is idle and
    /// this retries it.
    pub fn start(&self) -> AppResult<()> {
        let was_running = self.running.swap(true, Ordering::SeqCst);
        if was_running && self.capture.state() != LifecycleState::Stopped {
            debug!("Pipeline already running");
            return Ok(());
        }

        if let Err(e) = self.capture.start(self.render.mailbox().clone()) {
            self.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        self.render.resume();
        info!("Pipeline started");
        Ok(())
    }

    /// Tear down capture and pause rendering
    ///
    /// Both halves are always attempted, even if one of them panics, and the
    /// call is safe to repeat.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);

        if catch_unwind(AssertUnwindSafe(|| self.capture.stop())).is_err() {
            warn!("Capture teardown panicked");
        }
        if catch_unwind(AssertUnwindSafe(|| self.render.pause())).is_err() {
            warn!("Render pause panicked");
        }

        if was_running {
            info!("Pipeline stopped");
        }
    }

    /// Stop requesting redraws; capture keeps running
    pub fn pause(&self) {
        self.render.pause();
    }

    pub fn resume(&self) {
        self.render.resume();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn capture(&self) -> &CaptureSource {
        &self.capture
    }

    pub fn capture_state(&self) -> LifecycleState {
        self.capture.state()
    }

    pub fn render_handle(&self) -> &RenderHandle {
        &self.render
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
    }
}
