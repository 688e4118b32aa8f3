// SPDX-License-Identifier: MPL-2.0

//! Error types for the edge camera pipeline
//!
//! Each layer has its own error enum. None of them terminate the process from
//! inside the pipeline: device errors leave capture idle, per-frame errors drop
//! the frame, render errors skip the draw. Only `main` turns an [`AppError`]
//! into a non-zero exit.

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level application error
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera backend errors (device open, stream configuration)
    Camera(BackendError),
    /// GPU / surface errors
    Render(RenderError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Errors for a single captured frame
///
/// These never leave the capture thread: the frame is dropped, the error is
/// logged and capture continues with the next buffer.
#[derive(Debug, Clone)]
pub enum FrameError {
    /// Sensor buffer could not be converted to the interleaved layout
    Conversion(String),
    /// The processing collaborator panicked
    Processing(String),
}

/// GPU rendering errors
#[derive(Debug, Clone)]
pub enum RenderError {
    /// Shader compile or program link failure, with the compiler diagnostic
    ShaderCompile(String),
    /// No GPU adapter compatible with the window surface
    NoAdapter(String),
    /// Device creation failed
    Device(String),
    /// Surface creation or configuration failed
    Surface(String),
    /// Window system could not be initialised
    Window(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Conversion(msg) => write!(f, "Frame conversion failed: {}", msg),
            FrameError::Processing(msg) => write!(f, "Frame processing failed: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ShaderCompile(msg) => write!(f, "Shader program failed: {}", msg),
            RenderError::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            RenderError::Device(msg) => write!(f, "GPU device error: {}", msg),
            RenderError::Surface(msg) => write!(f, "Surface error: {}", msg),
            RenderError::Window(msg) => write!(f, "Window error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for FrameError {}
impl std::error::Error for RenderError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}
