//! Error handling for the RasterPath engine
//!
//! One taxonomy enum covers the controller surface: construction,
//! lifecycle order, per-call input, backend handshake and dispatch
//! failures, and cancellation. All error types use `thiserror`.

use rasterpath_core::StlError;
use thiserror::Error;

/// Engine error type
///
/// Represents failures across the RasterPath controller lifecycle.
#[derive(Error, Debug)]
pub enum RasterPathError {
    /// Configuration rejected at construction
    #[error("Configuration error: {reason}")]
    Config {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Operation called out of lifecycle order
    #[error("{reason}")]
    InvalidState {
        /// Which prerequisite is missing and how to satisfy it.
        reason: String,
    },

    /// Per-call input rejected
    #[error("Invalid argument: {reason}")]
    Argument {
        /// The reason the argument was rejected.
        reason: String,
    },

    /// Backend handshake failed
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// The reason initialization failed.
        reason: String,
    },

    /// A dispatched backend request reported failure
    #[error("Backend error: {message}")]
    Backend {
        /// The failure message reported by the backend.
        message: String,
    },

    /// A pending request was dropped by `terminate()`
    #[error("Operation cancelled")]
    Cancelled,

    /// STL decoding error
    #[error(transparent)]
    Stl(#[from] StlError),
}

impl RasterPathError {
    /// Configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Argument error with the given reason.
    pub fn argument(reason: impl Into<String>) -> Self {
        Self::Argument {
            reason: reason.into(),
        }
    }

    /// Lifecycle error: `init()` has not completed.
    pub fn not_initialized() -> Self {
        Self::InvalidState {
            reason: "RasterPath not initialized. Call init() first.".to_string(),
        }
    }

    /// Lifecycle error: no tool geometry loaded.
    pub fn tool_not_loaded() -> Self {
        Self::InvalidState {
            reason: "Tool not loaded. Call load_tool() first.".to_string(),
        }
    }

    /// Lifecycle error: no terrain geometry loaded.
    pub fn terrain_not_loaded() -> Self {
        Self::InvalidState {
            reason: "Terrain not loaded. Call load_terrain() first.".to_string(),
        }
    }
}

/// Result type using RasterPathError
pub type Result<T> = std::result::Result<T, RasterPathError>;
