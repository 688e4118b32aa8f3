// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for the capture loop
//!
//! The capture loop runs on its own named thread. Stopping is a
//! graceful-quit-then-join: the stop signal is raised, then the caller waits a
//! bounded time for the thread to finish. A thread that does not finish in
//! time (stuck in a driver call) is detached rather than waited on forever.

use crate::constants::DEFAULT_STOP_TIMEOUT;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// How a bounded stop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Thread finished and was joined
    Joined,
    /// Thread did not finish within the timeout and was detached
    Detached,
    /// There was no thread left to stop
    NotRunning,
}

/// Signals the controller when the loop thread exits, including by panic
struct FinishGuard(mpsc::Sender<()>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start_with_init(
///     "cam2-bg",
///     || open_camera(),
///     |session| {
///         session.pump_one_frame();
///         LoopAction::Continue
///     },
/// )?;
///
/// // Later, stop the loop
/// controller.stop_with_timeout(Duration::from_secs(2));
/// ```
pub struct CaptureLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Receives once when the thread exits
    finished: Option<mpsc::Receiver<()>>,
    /// Thread name, also used for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop with initialization
    ///
    /// `init_fn` runs once on the new thread to acquire resources. If it fails
    /// the error is logged and the thread exits without running `loop_fn`.
    /// Otherwise `loop_fn` is called until it returns [`LoopAction::Stop`] or
    /// the stop signal is raised. The state is dropped on the loop thread.
    pub fn start_with_init<S, E, I, F>(
        name: &str,
        init_fn: I,
        mut loop_fn: F,
    ) -> std::io::Result<Self>
    where
        S: 'static,
        E: Display,
        I: FnOnce(&AtomicBool) -> Result<S, E> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();
        let (done_tx, done_rx) = mpsc::channel();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _finished = FinishGuard(done_tx);
                debug!(name = %name_clone, "Capture loop thread started, initializing...");

                let mut state = match init_fn(&stop_signal_clone) {
                    Ok(s) => {
                        debug!(name = %name_clone, "Initialization successful");
                        s
                    }
                    Err(e) => {
                        debug!(name = %name_clone, error = %e, "Initialization failed");
                        return;
                    }
                };

                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    match loop_fn(&mut state) {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Loop requested stop");
                            break;
                        }
                    }
                }

                drop(state);
                info!(name = %name_clone, "Capture loop thread exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            finished: Some(done_rx),
            name: name.to_string(),
        })
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop, waiting at most `timeout` for the thread to finish
    pub fn stop_with_timeout(&mut self, timeout: Duration) -> StopOutcome {
        self.request_stop();

        let Some(handle) = self.thread_handle.take() else {
            return StopOutcome::NotRunning;
        };

        let finished = match self.finished.take() {
            Some(rx) => match rx.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            },
            None => handle.is_finished(),
        };

        if !finished {
            warn!(
                name = %self.name,
                timeout_ms = timeout.as_millis() as u64,
                "Capture loop thread did not finish in time, detaching"
            );
            return StopOutcome::Detached;
        }

        if let Err(e) = handle.join() {
            warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
        } else {
            debug!(name = %self.name, "Capture loop thread finished");
        }
        StopOutcome::Joined
    }

    /// Wait for the thread to finish without sending stop signal
    ///
    /// Useful if the loop stops itself via `LoopAction::Stop`.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            self.finished = None;
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop_with_timeout(DEFAULT_STOP_TIMEOUT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Instant;

    #[test]
    fn test_with_init() {
        let result = Arc::new(AtomicU32::new(0));
        let result_clone = Arc::clone(&result);

        let mut controller = CaptureLoopController::start_with_init(
            "test-init-loop",
            |_: &AtomicBool| Ok::<_, String>(42u32),
            move |state| {
                result_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .unwrap();

        controller.join();
        assert_eq!(result.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_init_failure() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let mut controller = CaptureLoopController::start_with_init(
            "test-fail-init",
            |_: &AtomicBool| Err::<(), _>("Init failed".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .unwrap();

        controller.join();
        // Loop function should never run if init fails
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_joins_running_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start_with_init(
            "test-loop",
            |_: &AtomicBool| Ok::<_, String>(()),
            move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                LoopAction::Continue
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert_eq!(
            controller.stop_with_timeout(Duration::from_secs(2)),
            StopOutcome::Joined
        );
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert_eq!(
            controller.stop_with_timeout(Duration::from_secs(2)),
            StopOutcome::NotRunning
        );
    }

    #[test]
    fn test_stuck_thread_is_detached() {
        let release = Arc::new(AtomicBool::new(false));
        let release_clone = Arc::clone(&release);

        let mut controller = CaptureLoopController::start_with_init(
            "test-stuck",
            |_: &AtomicBool| Ok::<_, String>(()),
            move |_| {
                // Ignores the stop signal until released
                while !release_clone.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
                LoopAction::Stop
            },
        )
        .unwrap();

        let started = Instant::now();
        assert_eq!(
            controller.stop_with_timeout(Duration::from_millis(50)),
            StopOutcome::Detached
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        release.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_thread_is_named() {
        let name = Arc::new(std::sync::Mutex::new(None));
        let name_clone = Arc::clone(&name);

        let mut controller = CaptureLoopController::start_with_init(
            "cam2-bg",
            move |_: &AtomicBool| {
                *name_clone.lock().unwrap() = thread::current().name().map(str::to_string);
                Ok::<_, String>(())
            },
            |_| LoopAction::Stop,
        )
        .unwrap();

        controller.join();
        assert_eq!(name.lock().unwrap().as_deref(), Some("cam2-bg"));
    }
}
