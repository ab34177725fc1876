//! Error types for the Aurora engine
//!
//! This module defines the error types used throughout the engine,
//! including rendering, asset import, and resource management.
//!
//! Asset failures (a missing mesh file, an undecodable image) are
//! recoverable: the current load is abandoned and the caller decides what
//! to do. Capacity overflows and invariant breaks are not recoverable and
//! panic with a message naming the exceeded limit.

use std::fmt;

/// Result type for Aurora engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Aurora engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),

    /// Asset import or decode failed (mesh file, image file, shader source)
    AssetError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetError(msg) => write!(f, "Asset error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Build a logged `Error::BackendError` with a source tag.
///
/// The message is logged at ERROR severity before the error value is
/// produced, so every constructed error shows up in the log exactly once.
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::error::Error::BackendError(message)
    }};
}

/// Return early with a logged `Error::BackendError`.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Build a logged `Error::AssetError` with a source tag.
#[macro_export]
macro_rules! engine_asset_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::error::Error::AssetError(message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
