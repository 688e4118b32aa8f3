// SPDX-License-Identifier: MPL-2.0

//! Integration tests for capture and pipeline lifecycle

mod common;

use common::{EmptyBackend, FlakyBackend, HangThenDisconnectBackend, StuckBackend, wait_until};
use edge_camera::backends::camera::test_pattern::TestPatternBackend;
use edge_camera::backends::camera::{CameraBackend, FrameSize};
use edge_camera::processing::{EdgeDetector, Grayscale};
use edge_camera::{
    CaptureSource, FrameMailbox, FrameProcessor, InputFormat, LifecycleState, PipelineController,
    RenderHandle,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(3);

fn fast_pattern(size: FrameSize) -> TestPatternBackend {
    TestPatternBackend::default()
        .with_sizes(vec![size])
        .with_frame_interval(Duration::from_millis(2))
}

fn pipeline(
    backend: impl CameraBackend + 'static,
    processor: Arc<dyn FrameProcessor>,
) -> (PipelineController, FrameMailbox) {
    let mailbox = FrameMailbox::new();
    let capture = CaptureSource::new(Arc::new(backend), processor)
        .with_poll_timeout(Duration::from_millis(10))
        .with_stop_timeout(Duration::from_millis(500));
    let controller = PipelineController::new(capture, RenderHandle::new(mailbox.clone()));
    (controller, mailbox)
}

#[test]
fn test_start_delivers_processed_frames() {
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(48, 32)), Arc::new(Grayscale));
    controller.start().unwrap();

    assert!(wait_until(WAIT, || mailbox.has_frame()));
    assert_eq!(mailbox.last_dimensions(), Some((48, 32)));
    assert!(controller.is_running());
    assert_eq!(controller.capture_state(), LifecycleState::Running);

    controller.stop();
    assert!(!controller.is_running());
    assert_eq!(controller.capture_state(), LifecycleState::Stopped);
    assert!(!controller.render_handle().is_continuous());
}

#[test]
fn test_processor_sees_nv21_frames() {
    let calls = Arc::new(AtomicUsize::new(0));
    let processor = {
        let calls = calls.clone();
        move |pixels: &[u8], w: u32, h: u32, format: InputFormat| {
            assert_eq!(format, InputFormat::Nv21);
            assert_eq!(format.tag(), 0x11);
            assert_eq!(pixels.len(), format.frame_len(w, h));
            calls.fetch_add(1, Ordering::SeqCst);
            Some(pixels[..(w * h) as usize].to_vec())
        }
    };
    // Odd sizes exercise the rounded-up chroma planes
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(15, 9)), Arc::new(processor));
    controller.start().unwrap();

    assert!(wait_until(WAIT, || calls.load(Ordering::SeqCst) >= 3));
    assert_eq!(mailbox.last_dimensions(), Some((15, 9)));
    controller.stop();
    assert_eq!(controller.capture().stats().errors, 0);
}

#[test]
fn test_edge_pipeline_outputs_binary_map() {
    let (controller, mailbox) = pipeline(
        fast_pattern(FrameSize::new(64, 48)),
        Arc::new(EdgeDetector::default()),
    );
    controller.start().unwrap();
    assert!(wait_until(WAIT, || mailbox.has_frame()));
    controller.stop();

    let (pixels, edges) = mailbox.read_latest(|slot| {
        let edges = slot.data.iter().filter(|&&p| p == 255).count();
        (slot.data.clone(), edges)
    });
    assert_eq!(pixels.len(), 64 * 48);
    assert!(pixels.iter().all(|&p| p == 0 || p == 255));
    assert!(edges > 0, "test pattern bars should produce edges");
}

#[test]
fn test_stop_is_idempotent() {
    let (controller, _mailbox) = pipeline(fast_pattern(FrameSize::new(16, 16)), Arc::new(Grayscale));
    controller.stop();
    controller.start().unwrap();
    controller.stop();
    controller.stop();
    assert_eq!(controller.capture_state(), LifecycleState::Stopped);
}

#[test]
fn test_stop_right_after_start() {
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(16, 16)), Arc::new(Grayscale));
    for _ in 0..10 {
        controller.start().unwrap();
        controller.stop();
        assert_eq!(controller.capture_state(), LifecycleState::Stopped);
    }

    // Still usable afterwards
    controller.start().unwrap();
    assert!(wait_until(WAIT, || mailbox.has_frame()));
    controller.stop();
}

#[test]
fn test_start_twice_is_noop() {
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(16, 16)), Arc::new(Grayscale));
    controller.start().unwrap();
    controller.start().unwrap();
    assert!(wait_until(WAIT, || mailbox.has_frame()));
    controller.stop();
}

#[test]
fn test_empty_size_list_falls_back_to_640x480() {
    let backend = TestPatternBackend::default()
        .with_sizes(Vec::new())
        .with_frame_interval(Duration::from_millis(5));
    let (controller, mailbox) = pipeline(backend, Arc::new(Grayscale));
    controller.start().unwrap();

    assert!(wait_until(WAIT, || mailbox.has_frame()));
    assert_eq!(mailbox.last_dimensions(), Some((640, 480)));
    assert_eq!(
        controller.capture().stats().frame_size,
        Some(FrameSize::new(640, 480))
    );
    controller.stop();
}

#[test]
fn test_open_failure_leaves_capture_idle_then_retries() {
    let backend = FlakyBackend::new(1, fast_pattern(FrameSize::new(16, 8)));
    let (controller, mailbox) = pipeline(backend, Arc::new(Grayscale));

    controller.start().unwrap();
    assert!(wait_until(WAIT, || {
        controller.capture_state() == LifecycleState::Stopped
    }));
    assert!(!mailbox.has_frame());

    controller.start().unwrap();
    assert!(wait_until(WAIT, || mailbox.has_frame()));
    assert_eq!(controller.capture_state(), LifecycleState::Running);
    controller.stop();
}

#[test]
fn test_no_camera_is_not_fatal() {
    let (controller, mailbox) = pipeline(EmptyBackend, Arc::new(Grayscale));
    controller.start().unwrap();
    assert!(wait_until(WAIT, || {
        controller.capture_state() == LifecycleState::Stopped
    }));
    assert!(!mailbox.has_frame());
    controller.stop();
}

#[test]
fn test_stuck_driver_does_not_block_stop() {
    let backend = StuckBackend {
        block_for: Duration::from_secs(3),
    };
    let mailbox = FrameMailbox::new();
    let capture = CaptureSource::new(Arc::new(backend), Arc::new(Grayscale))
        .with_stop_timeout(Duration::from_millis(50));
    let controller = PipelineController::new(capture, RenderHandle::new(mailbox));

    controller.start().unwrap();
    assert!(wait_until(WAIT, || {
        controller.capture_state() == LifecycleState::Running
    }));

    let started = Instant::now();
    controller.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(controller.capture_state(), LifecycleState::Stopped);
}

#[test]
fn test_detached_session_cannot_stop_its_successor() {
    let backend = HangThenDisconnectBackend::new(
        Duration::from_millis(400),
        fast_pattern(FrameSize::new(16, 16)),
    );
    let mailbox = FrameMailbox::new();
    let capture = CaptureSource::new(Arc::new(backend), Arc::new(Grayscale))
        .with_poll_timeout(Duration::from_millis(10))
        .with_stop_timeout(Duration::from_millis(50));
    let controller = PipelineController::new(capture, RenderHandle::new(mailbox.clone()));

    controller.start().unwrap();
    assert!(wait_until(WAIT, || {
        controller.capture_state() == LifecycleState::Running
    }));
    // First session is still blocked in pump, so this detaches it
    controller.stop();
    assert_eq!(controller.capture_state(), LifecycleState::Stopped);

    controller.start().unwrap();
    assert!(wait_until(WAIT, || mailbox.has_frame()));

    // Outlive the first session's disconnect
    std::thread::sleep(Duration::from_millis(600));
    assert_eq!(controller.capture_state(), LifecycleState::Running);
    let generation = mailbox.generation();
    assert!(wait_until(WAIT, || mailbox.generation() > generation));
    assert_eq!(mailbox.last_dimensions(), Some((16, 16)));

    controller.stop();
    assert_eq!(controller.capture_state(), LifecycleState::Stopped);
}

#[test]
fn test_padded_rows_never_reach_the_mailbox() {
    let backend = fast_pattern(FrameSize::new(20, 10)).with_row_padding(24);
    let (controller, mailbox) = pipeline(backend, Arc::new(Grayscale));
    controller.start().unwrap();

    assert!(wait_until(WAIT, || mailbox.has_frame()));
    controller.stop();

    mailbox.read_latest(|slot| {
        assert_eq!((slot.width, slot.height), (20, 10));
        assert_eq!(slot.data.len(), 200);
        assert!(slot.data.iter().all(|&p| p == 40 || p == 210));
    });
}

#[test]
fn test_pause_keeps_capture_running() {
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(16, 16)), Arc::new(Grayscale));
    controller.start().unwrap();
    assert!(controller.render_handle().is_continuous());

    controller.pause();
    assert!(!controller.render_handle().is_continuous());
    let generation = mailbox.generation();
    assert!(wait_until(WAIT, || mailbox.generation() > generation));
    assert_eq!(controller.capture_state(), LifecycleState::Running);

    controller.resume();
    assert!(controller.render_handle().is_continuous());
    controller.stop();
}

#[test]
fn test_skipped_frames_leave_mailbox_untouched() {
    let skip_all = |_: &[u8], _: u32, _: u32, _: InputFormat| -> Option<Vec<u8>> { None };
    let (controller, mailbox) = pipeline(fast_pattern(FrameSize::new(16, 16)), Arc::new(skip_all));
    controller.start().unwrap();

    assert!(wait_until(WAIT, || controller.capture().stats().skipped >= 3));
    assert!(!mailbox.has_frame());
    controller.stop();
}
