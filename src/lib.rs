//! # RasterPath
//!
//! A terrain and tool rasterization engine for CNC and 3D-printing
//! toolpath generation with support for:
//! - Planar height-field toolpaths over XY terrain grids
//! - Radial toolpaths swept around the X axis for rotary machining
//! - ASCII and binary STL decoding
//! - Streaming progress reporting from the compute backend
//!
//! ## Architecture
//!
//! RasterPath is organized as a workspace with multiple crates:
//!
//! 1. **rasterpath-core** - Geometry, bounds, coordinate transforms, X-axis
//!    bucketing, STL decoding
//! 2. **rasterpath-engine** - Controller lifecycle, compute protocol, CPU
//!    reference kernel, mode pipelines
//! 3. **rasterpath** - Main binary that integrates all crates

pub use rasterpath_core::{
    bucket_triangles_by_x, compute_bounds, max_radius, parse_stl, triangle_count, Bounds,
    BucketIndex, BucketRecord, SparseGeometry, StlError, TRIANGLE_STRIDE,
};

pub use rasterpath_engine::{
    ComputeKernel, CpuKernel, DeviceCapabilities, FilterMode, GenerateParams, GenerationResult,
    ProgressCallback, ProgressUpdate, RasterConfig, RasterMode, RasterPath, RasterPathError,
    Result, TerrainParams, ToolSource, EMPTY_CELL,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
