// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands that run without the preview window
//!
//! - Listing available cameras
//! - Headless capture with frame-rate reporting

use edge_camera::backends::camera::{CameraBackendType, get_backend};
use edge_camera::constants::FPS_WINDOW;
use edge_camera::{Config, FrameMailbox, LifecycleState, PipelineController, RenderHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// How often the headless loop checks for Ctrl-C and the deadline
const HEADLESS_POLL: Duration = Duration::from_millis(100);

/// List all cameras the backend can see
pub fn list_cameras(backend_type: CameraBackendType) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend(backend_type);
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found ({} backend).", backend_type);
        return Ok(());
    }

    println!("Available cameras ({}):", backend_type);
    println!();
    for camera in &cameras {
        println!("  [{}] {}", camera.index, camera.name);
        println!("      Device: {}", camera.path);
        if let Some(driver) = &camera.driver {
            println!("      Driver: {}", driver);
        }

        let sizes = backend.supported_sizes(camera);
        if sizes.is_empty() {
            println!("      Sizes: none advertised (falls back to 640x480)");
        } else {
            // Show the first sizes in device order; the first one is what capture uses
            let size_strs: Vec<String> = sizes.iter().take(4).map(|s| s.to_string()).collect();
            println!("      Sizes: {}", size_strs.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Run capture and processing for `seconds` without a window
///
/// Prints the delivered frame rate and resolution once per second. Ctrl-C
/// stops early.
pub fn headless(config: &Config, seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mailbox = FrameMailbox::new();
    let controller = PipelineController::from_config(config, RenderHandle::new(mailbox.clone()));

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;
    }

    println!(
        "Capturing for {}s ({} backend, {} processor). Press Ctrl+C to stop.",
        seconds, config.backend, config.processor
    );
    controller.start()?;

    let started = Instant::now();
    let deadline = started + Duration::from_secs(seconds);
    let mut window_start = started;
    let mut window_delivered = 0u64;

    while !interrupted.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(HEADLESS_POLL);

        let elapsed = window_start.elapsed();
        if elapsed <= FPS_WINDOW {
            continue;
        }

        let stats = controller.capture().stats();
        let fps = (stats.delivered - window_delivered) as f64 / elapsed.as_secs_f64();
        window_delivered = stats.delivered;
        window_start = Instant::now();

        match mailbox.last_dimensions() {
            Some((width, height)) => {
                println!("  {:5.1} fps  {}x{}", fps, width, height);
                info!(fps, width, height, skipped = stats.skipped, errors = stats.errors, "Headless rate");
            }
            None => println!("  {:5.1} fps  no frame yet", fps),
        }

        if controller.capture_state() == LifecycleState::Stopped {
            eprintln!("Capture stopped: camera unavailable");
            break;
        }
    }

    if interrupted.load(Ordering::SeqCst) {
        println!("Interrupted");
    }
    controller.stop();

    let stats = controller.capture().stats();
    println!();
    println!("Frames acquired:  {}", stats.acquired);
    println!("Frames delivered: {}", stats.delivered);
    println!("Frames skipped:   {}", stats.skipped);
    println!("Frame errors:     {}", stats.errors);
    if let Some(size) = stats.frame_size {
        println!("Camera size:      {}", size);
    }

    Ok(())
}
