//! Shared callback and progress types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Progress report streamed during rasterization and path generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Completion fraction in percent, 0.0 to 100.0.
    pub percent: f32,
    /// Units of work finished so far.
    pub current: u64,
    /// Total units of work for this operation.
    pub total: u64,
    /// Scanline or angle index currently being processed, when known.
    pub layer: Option<u32>,
}

/// Progress callback invoked from the backend dispatch task.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
