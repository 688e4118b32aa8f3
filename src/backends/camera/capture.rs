// SPDX-License-Identifier: GPL-3.0-only

//! Capture source: camera session lifecycle and per-frame work
//!
//! Everything that touches the device runs on the dedicated capture thread:
//! opening the first camera, negotiating the size, pumping frames, converting
//! them to NV21, running the processor and depositing the result into the
//! [`FrameMailbox`]. The calling thread only flips state and joins.

use super::frame_loop::{CaptureLoopController, LoopAction, StopOutcome};
use super::image_reader::ImageReader;
use super::types::{
    BackendError, BackendResult, CameraDevice, ConvertedFrame, FrameSize, SensorImage,
};
use super::{CameraBackend, CaptureSession, select_frame_size};
use crate::constants::{
    CAPTURE_THREAD_NAME, DEFAULT_POLL_TIMEOUT, DEFAULT_STOP_TIMEOUT, FRAME_WARN_INTERVAL,
    IMAGE_READER_CAPACITY,
};
use crate::errors::FrameError;
use crate::lifecycle::{LifecycleState, StateCell};
use crate::mailbox::FrameMailbox;
use crate::media::sensor_image_to_nv21;
use crate::processing::{FrameProcessor, InputFormat};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Counters shared with the capture thread
#[derive(Debug, Default)]
struct CaptureStats {
    acquired: AtomicU64,
    delivered: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
    frame_size: Mutex<Option<FrameSize>>,
}

/// Point-in-time copy of the capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    /// Raw images taken from the reader
    pub acquired: u64,
    /// Processed frames deposited into the mailbox
    pub delivered: u64,
    /// Frames the processor asked to skip
    pub skipped: u64,
    /// Frames dropped because conversion or processing failed
    pub errors: u64,
    /// Size negotiated for the current (or last) session
    pub frame_size: Option<FrameSize>,
}

/// Owns the camera session and the capture thread
///
/// Every `start` gets a fresh [`StateCell`]. A capture thread left behind by a
/// timed-out `stop` only ever sees its own, already stopped, cell, so it can
/// neither change the state of a later session nor deposit into the sink.
pub struct CaptureSource {
    backend: Arc<dyn CameraBackend>,
    processor: Arc<dyn FrameProcessor>,
    state: Mutex<Arc<StateCell>>,
    controller: Mutex<Option<CaptureLoopController>>,
    stats: Arc<CaptureStats>,
    poll_timeout: Duration,
    stop_timeout: Duration,
}

impl CaptureSource {
    pub fn new(backend: Arc<dyn CameraBackend>, processor: Arc<dyn FrameProcessor>) -> Self {
        Self {
            backend,
            processor,
            state: Mutex::new(Arc::new(StateCell::new(LifecycleState::Stopped))),
            controller: Mutex::new(None),
            stats: Arc::new(CaptureStats::default()),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    /// Upper bound on one blocking wait for the hardware
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Upper bound on joining the capture thread in [`stop`](Self::stop)
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn state(&self) -> LifecycleState {
        lock(&self.state).get()
    }

    pub fn stats(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            acquired: self.stats.acquired.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
            frame_size: *lock(&self.stats.frame_size),
        }
    }

    /// Start capturing into `sink`
    ///
    /// Does nothing unless the source is stopped. Device errors are logged on
    /// the capture thread and leave the source stopped, so calling `start`
    /// again retries. Only a failure to spawn the thread is returned.
    pub fn start(&self, sink: FrameMailbox) -> BackendResult<()> {
        let session_state = {
            let mut current = lock(&self.state);
            if current.get() != LifecycleState::Stopped {
                debug!(state = %current.get(), "Capture already started");
                return Ok(());
            }
            let session_state = Arc::new(StateCell::new(LifecycleState::Starting));
            *current = Arc::clone(&session_state);
            session_state
        };

        let backend = Arc::clone(&self.backend);
        let init_state = Arc::clone(&session_state);
        let loop_state = Arc::clone(&session_state);
        let init_stats = Arc::clone(&self.stats);
        let worker = FrameWorker {
            processor: Arc::clone(&self.processor),
            sink,
            state: Arc::clone(&session_state),
            stats: Arc::clone(&self.stats),
            poll_timeout: self.poll_timeout,
        };

        let spawned = CaptureLoopController::start_with_init(
            CAPTURE_THREAD_NAME,
            move |stop: &AtomicBool| {
                let opened = open_first_camera(backend.as_ref());
                let resources = match opened {
                    Ok(resources) => resources,
                    Err(e) => {
                        error!(error = %e, "Camera could not be started");
                        init_state.transition(LifecycleState::Starting, LifecycleState::Stopped);
                        return Err(e);
                    }
                };

                // stop() may have run while the device was opening
                if stop.load(Ordering::SeqCst)
                    || !init_state.transition(LifecycleState::Starting, LifecycleState::Running)
                {
                    debug!("Stop requested during start, closing camera");
                    return Err(BackendError::Closed);
                }

                *lock(&init_stats.frame_size) = Some(resources.size);

                info!(
                    camera = %resources.device.name,
                    size = %resources.size,
                    "Capture running"
                );
                Ok(resources)
            },
            move |resources: &mut CaptureResources| {
                let action = worker.run_once(resources);
                if action == LoopAction::Stop {
                    loop_state.transition(LifecycleState::Running, LifecycleState::Stopped);
                }
                action
            },
        );

        match spawned {
            Ok(controller) => {
                // A finished controller from an earlier failed start is joined here
                let previous = lock(&self.controller).replace(controller);
                if let Some(mut previous) = previous {
                    previous.stop_with_timeout(self.stop_timeout);
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn capture thread");
                session_state.set(LifecycleState::Stopped);
                Err(BackendError::from(e))
            }
        }
    }

    /// Stop capturing and release the device
    ///
    /// Safe to call repeatedly and before `start` completed. Waits at most the
    /// stop timeout for the capture thread; a thread stuck in the driver is
    /// left to finish on its own and closes its resources when it does.
    pub fn stop(&self) {
        let session_state = Arc::clone(&lock(&self.state));
        let previous = session_state.get();
        let controller = lock(&self.controller).take();

        if previous == LifecycleState::Stopped && controller.is_none() {
            debug!("Capture already stopped");
            return;
        }

        session_state.set(LifecycleState::Stopping);

        if let Some(mut controller) = controller {
            match controller.stop_with_timeout(self.stop_timeout) {
                StopOutcome::Joined | StopOutcome::NotRunning => {
                    debug!("Capture thread joined")
                }
                StopOutcome::Detached => warn!(
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "Capture thread did not stop in time"
                ),
            }
        }

        session_state.set(LifecycleState::Stopped);
        info!(from = %previous, "Capture stopped");
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Device, session and reader owned by the capture thread
struct CaptureResources {
    device: CameraDevice,
    size: FrameSize,
    session: Option<Box<dyn CaptureSession>>,
    reader: ImageReader,
}

impl Drop for CaptureResources {
    fn drop(&mut self) {
        // Each step is attempted even if the previous one failed
        if let Some(mut session) = self.session.take() {
            match catch_unwind(AssertUnwindSafe(|| session.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Error closing capture session"),
                Err(_) => warn!("Capture session panicked while closing"),
            }
            if catch_unwind(AssertUnwindSafe(move || drop(session))).is_err() {
                warn!("Capture session panicked while being released");
            }
        }
        self.reader.close();
        debug!(camera = %self.device.name, "Capture resources released");
    }
}

fn open_first_camera(backend: &dyn CameraBackend) -> BackendResult<CaptureResources> {
    let device = backend
        .enumerate_cameras()
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::DeviceNotFound(format!("no {} cameras", backend.backend_type())))?;

    let sizes = backend.supported_sizes(&device);
    let size = select_frame_size(&sizes);
    if sizes.is_empty() {
        info!(camera = %device.name, size = %size, "No sizes reported, using fallback");
    }

    let reader = ImageReader::new(IMAGE_READER_CAPACITY);
    let session = backend.open(&device, size)?;
    let size = session.frame_size();

    Ok(CaptureResources {
        device,
        size,
        session: Some(session),
        reader,
    })
}

/// Per-frame half of the capture thread
struct FrameWorker {
    processor: Arc<dyn FrameProcessor>,
    sink: FrameMailbox,
    /// State of the session this worker belongs to
    state: Arc<StateCell>,
    stats: Arc<CaptureStats>,
    poll_timeout: Duration,
}

impl FrameWorker {
    fn run_once(&self, resources: &mut CaptureResources) -> LoopAction {
        if !self.is_live() {
            return LoopAction::Stop;
        }
        let Some(session) = resources.session.as_mut() else {
            return LoopAction::Stop;
        };

        match session.pump(&resources.reader, self.poll_timeout) {
            Ok(0) => return LoopAction::Continue,
            Ok(_) => {}
            Err(e @ (BackendError::Disconnected(_) | BackendError::Closed)) => {
                error!(error = %e, "Camera stream ended");
                return LoopAction::Stop;
            }
            Err(e) => {
                self.record_error(&e);
                return LoopAction::Continue;
            }
        }

        // Released when `image` goes out of scope, whatever happens below
        if let Some(image) = resources.reader.acquire_latest() {
            self.stats.acquired.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.handle_image(&image) {
                self.record_error(&e);
            }
        }

        LoopAction::Continue
    }

    fn handle_image(&self, image: &SensorImage) -> Result<(), FrameError> {
        let frame = ConvertedFrame::new(sensor_image_to_nv21(image)?, image.width, image.height);
        let (width, height) = (frame.width, frame.height);

        let processed = catch_unwind(AssertUnwindSafe(|| {
            self.processor
                .process_frame(&frame.data, width, height, InputFormat::Nv21)
        }))
        .map_err(|panic| FrameError::Processing(panic_message(&*panic)))?;

        // stop() may have given up on this thread while it was in the driver
        if !self.is_live() {
            debug!("Discarding frame from a stopped session");
            return Ok(());
        }

        match processed {
            Some(pixels) if !pixels.is_empty() => {
                self.sink.deposit(&pixels, width, height);
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.state.get() == LifecycleState::Running
    }

    fn record_error(&self, error: &dyn std::fmt::Display) {
        let count = self.stats.errors.fetch_add(1, Ordering::Relaxed) + 1;
        if count % FRAME_WARN_INTERVAL == 1 {
            warn!(error = %error, total = count, "Dropping frame");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "processor panicked".to_string()
    }
}
