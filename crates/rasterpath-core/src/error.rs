//! Error handling for RasterPath core types
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// STL decoding error type
///
/// Represents failures while decoding binary STL data. ASCII decoding is
/// permissive and never fails; malformed content is dropped with a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StlError {
    /// Buffer is too short to hold the binary STL header
    #[error("STL data too short for binary header: {actual} bytes, need at least 84")]
    HeaderTooShort {
        /// The actual buffer length in bytes.
        actual: usize,
    },

    /// Buffer ends before the declared triangle count
    #[error("Binary STL truncated: {triangles} triangles need {expected} bytes, got {actual}")]
    Truncated {
        /// The triangle count declared in the header.
        triangles: u32,
        /// The buffer length the declared count requires.
        expected: usize,
        /// The actual buffer length in bytes.
        actual: usize,
    },
}
