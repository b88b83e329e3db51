//! Request/response protocol spoken across the compute boundary.
//!
//! Payloads are serde-typed so a remote or out-of-process backend can
//! speak the same protocol as the in-process worker. Every request
//! carries a monotonically assigned [`RequestId`]; completions settle the
//! matching pending registration, progress messages stream without
//! consuming it.

use serde::{Deserialize, Serialize};

use rasterpath_core::{Bounds, BucketIndex, SparseGeometry};

use crate::config::RasterConfig;
use crate::types::ProgressUpdate;

/// Correlation id assigned per request by the proxy.
pub type RequestId = u64;

/// Sentinel written into planar path cells the tool can never reach.
pub const EMPTY_CELL: f32 = -1.0e10;

/// Backend capability metadata returned by the init handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// Name of the backing compute device or implementation.
    pub backend: String,
    /// Largest single buffer the backend can allocate, in bytes.
    pub max_buffer_bytes: u64,
    /// Largest grid the backend will rasterize in one dispatch, in cells.
    pub max_dispatch_cells: u64,
}

/// Per-cell Z filter applied during rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Keep the highest Z per cell (terrain surface).
    MaxZ,
    /// Keep the lowest Z per cell (tool underside).
    MinZ,
}

/// Init handshake payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitRequest {
    /// Controller configuration forwarded to the backend.
    pub config: RasterConfig,
}

/// Planar rasterization job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterizeRequest {
    /// Unindexed triangle buffer, nine components per triangle.
    pub triangles: Vec<f32>,
    /// Grid cell size in millimeters.
    pub step_size: f32,
    /// Z filter selecting terrain or tool semantics.
    pub filter_mode: FilterMode,
    /// Externally supplied bounds, otherwise computed from the triangles.
    pub bounds_override: Option<Bounds>,
}

/// Planar toolpath job over previously rasterized geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolpathRequest {
    /// Rasterized terrain point cloud.
    pub terrain: SparseGeometry,
    /// Rasterized, Z-inverted tool point cloud.
    pub tool: SparseGeometry,
    /// Sample every Nth grid cell along X.
    pub x_step: u32,
    /// Sample every Nth grid cell along Y.
    pub y_step: u32,
    /// Height assumed outside the terrain grid.
    pub z_floor: f32,
    /// Cell size the terrain was rasterized at.
    pub grid_step: f32,
    /// Generate only the first scanline.
    pub single_scanline: bool,
}

/// Combined radial pipeline job: per-angle rasterization plus tool offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadialToolpathsRequest {
    /// YZ-centered terrain triangle buffer.
    pub triangles: Vec<f32>,
    /// X-axis bucket index over `triangles`.
    pub bucket_index: BucketIndex,
    /// Rasterized, Z-inverted tool point cloud.
    pub tool: SparseGeometry,
    /// Grid cell size in millimeters.
    pub resolution: f32,
    /// Degrees between successive rays.
    pub angle_step: f32,
    /// Number of angular strips to produce.
    pub num_angles: u32,
    /// Ray start radius, inflated past the outermost vertex.
    pub max_radius: f32,
    /// Tool extent perpendicular to the rotation axis.
    pub tool_width: f32,
    /// Radius assumed where a ray misses the terrain.
    pub z_floor: f32,
    /// Bounds of the centered terrain.
    pub bounds: Bounds,
    /// Sample every Nth cell along the rotation axis.
    pub x_step: u32,
    /// Sample every Nth cell along rays.
    pub y_step: u32,
}

/// A request envelope: correlation id plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Correlation id echoed back on every related response.
    pub id: RequestId,
    /// The job itself.
    pub payload: RequestPayload,
}

/// Request payload kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RequestPayload {
    /// Backend handshake carrying the controller configuration.
    Init(InitRequest),
    /// Planar rasterization of a triangle buffer.
    Rasterize(RasterizeRequest),
    /// Planar toolpath over rasterized terrain and tool.
    GenerateToolpath(ToolpathRequest),
    /// Full radial pipeline in one dispatch.
    RadialGenerateToolpaths(RadialToolpathsRequest),
}

/// Init handshake result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// Whether the backend came up.
    pub success: bool,
    /// Capability metadata when `success` is true.
    pub capabilities: Option<DeviceCapabilities>,
}

/// Completed planar toolpath: a sampled height map in scanline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanarToolpath {
    /// Row-major spindle heights; unreachable cells hold [`EMPTY_CELL`].
    pub path_data: Vec<f32>,
    /// Sampled grid width.
    pub width: u32,
    /// Sampled grid height.
    pub height: u32,
}

/// Completed radial toolpaths: one strip of (x, radius) pairs per angle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadialToolpaths {
    /// Flat (x, radius) pair buffers, one per angle in sweep order.
    pub strips: Vec<Vec<f32>>,
    /// Number of strips, equal to the requested angle count.
    pub num_strips: usize,
    /// Total (x, radius) pairs across all strips.
    pub total_points: usize,
}

/// A response envelope: correlation id plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Correlation id of the request this answers.
    pub id: RequestId,
    /// The result or progress report.
    pub payload: ResponsePayload,
}

/// Response payload kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponsePayload {
    /// Init handshake result.
    #[serde(rename = "webgpu-ready")]
    Ready(ReadyResponse),
    /// Rasterization finished.
    RasterizeComplete(SparseGeometry),
    /// Rasterization progress stream.
    RasterizeProgress(ProgressUpdate),
    /// Planar toolpath finished.
    ToolpathComplete(PlanarToolpath),
    /// Toolpath progress stream, shared by planar and radial jobs.
    ToolpathProgress(ProgressUpdate),
    /// Radial pipeline finished.
    RadialToolpathsComplete(RadialToolpaths),
    /// The request failed inside the kernel.
    Failed {
        /// Failure description reported by the backend.
        message: String,
    },
}

impl ResponsePayload {
    /// Progress payloads stream repeatedly and never settle a request.
    pub fn progress_update(&self) -> Option<ProgressUpdate> {
        match self {
            ResponsePayload::RasterizeProgress(update)
            | ResponsePayload::ToolpathProgress(update) => Some(*update),
            _ => None,
        }
    }
}
