//! # RasterPath Engine
//!
//! Toolpath-rasterization controller for RasterPath. Owns the lifecycle
//! state machine, the configuration surface, and the compute backend
//! proxy that hands rasterization and path generation to a kernel behind
//! an async protocol boundary. Ships a CPU reference kernel; GPU kernels
//! plug in behind the same [`compute::ComputeKernel`] trait.

pub mod compute;
pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use compute::{
    ComputeKernel, CpuKernel, DeviceCapabilities, FilterMode, KernelError, EMPTY_CELL,
};
pub use config::{RasterConfig, RasterMode};
pub use error::{RasterPathError, Result};
pub use path::{GenerateParams, GenerationResult, RasterPath, TerrainParams, ToolSource};
pub use types::{ProgressCallback, ProgressUpdate};
