//! Controller configuration.
//!
//! `RasterConfig` is validated once at construction and immutable
//! afterwards; `RasterPath::get_config()` returns a copy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RasterPathError, Result};

/// Rasterization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterMode {
    /// Height-field over the XY plane.
    #[default]
    Planar,
    /// Angular sweep around the X axis.
    Radial,
}

impl fmt::Display for RasterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterMode::Planar => write!(f, "planar"),
            RasterMode::Radial => write!(f, "radial"),
        }
    }
}

/// Configuration for a RasterPath controller instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RasterConfig {
    /// Rasterization mode.
    pub mode: RasterMode,
    /// Grid cell size in millimeters. Required, must be positive.
    pub resolution: f32,
    /// Degrees between radial rays. Required in radial mode.
    pub rotation_step: Option<f32>,
    /// GPU memory ceiling in megabytes.
    pub max_gpu_memory_mb: u32,
    /// Fraction of the memory ceiling the backend may actually use.
    pub gpu_memory_safety_margin: f32,
    /// Let the backend split oversized grids into tiles.
    pub auto_tiling: bool,
    /// Divide dispatch batches, for measuring batching overhead.
    pub batch_divisor: u32,
    /// Emit verbose backend diagnostics.
    pub debug: bool,
    /// Suppress the controller's own informational logging.
    pub quiet: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            mode: RasterMode::Planar,
            resolution: 0.0,
            rotation_step: None,
            max_gpu_memory_mb: 256,
            gpu_memory_safety_margin: 0.8,
            auto_tiling: true,
            batch_divisor: 1,
            debug: false,
            quiet: false,
        }
    }
}

impl RasterConfig {
    /// Validate the required parameters for the selected mode.
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution > 0.0) {
            return Err(RasterPathError::config(
                "resolution parameter is required and must be positive",
            ));
        }

        if self.mode == RasterMode::Radial {
            match self.rotation_step {
                Some(step) if step > 0.0 => {}
                _ => {
                    return Err(RasterPathError::config(
                        "radial mode requires a positive rotation_step (degrees between rays)",
                    ));
                }
            }
        }

        Ok(())
    }
}
