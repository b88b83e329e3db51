//! Per-mode generation strategies.
//!
//! The controller delegates terrain handling and toolpath generation to
//! a mode strategy chosen at construction. Planar mode rasterizes the
//! terrain up front and samples a height map; radial mode keeps the
//! centered triangle buffer and runs the combined per-angle pipeline in
//! a single dispatch.

use async_trait::async_trait;
use tracing::{debug, info};

use rasterpath_core::{
    bucket_triangles_by_x, center_yz, compute_bounds, max_radius, triangle_count, Bounds,
    SparseGeometry,
};

use crate::compute::{
    ComputeProxy, FilterMode, RadialToolpathsRequest, RasterizeRequest, RequestPayload,
    ResponsePayload, ToolpathRequest,
};
use crate::config::RasterConfig;
use crate::error::{RasterPathError, Result};

use super::{GenerateParams, GenerationResult, TerrainParams};

/// Width of one X-axis bucket in millimeters.
const BUCKET_WIDTH: f32 = 1.0;

/// Inflation applied to the outermost vertex radius so rays start
/// strictly outside the terrain.
const MAX_RADIUS_MARGIN: f32 = 1.01;

/// Mode-specific terrain and generation behavior.
#[async_trait]
pub(crate) trait ModeStrategy: Send {
    /// Ingest terrain geometry, returning rasterized output when the
    /// mode produces it eagerly.
    async fn load_terrain(
        &mut self,
        proxy: &ComputeProxy,
        config: &RasterConfig,
        params: TerrainParams,
    ) -> Result<Option<SparseGeometry>>;

    /// Generate toolpaths against the loaded terrain.
    async fn generate(
        &mut self,
        proxy: &ComputeProxy,
        config: &RasterConfig,
        tool: &SparseGeometry,
        params: GenerateParams,
    ) -> Result<GenerationResult>;

    /// Drop loaded terrain state.
    fn clear(&mut self);
}

/// Height-field strategy: terrain is rasterized at load time.
#[derive(Default)]
pub(crate) struct PlanarMode {
    terrain: Option<SparseGeometry>,
}

#[async_trait]
impl ModeStrategy for PlanarMode {
    async fn load_terrain(
        &mut self,
        proxy: &ComputeProxy,
        config: &RasterConfig,
        params: TerrainParams,
    ) -> Result<Option<SparseGeometry>> {
        if params.triangles.is_empty() {
            return Err(RasterPathError::argument("terrain triangle data is empty"));
        }

        if !config.quiet {
            info!(
                "Rasterizing terrain: {} triangles at {} mm",
                triangle_count(&params.triangles),
                config.resolution
            );
        }

        let response = proxy
            .dispatch(
                RequestPayload::Rasterize(RasterizeRequest {
                    triangles: params.triangles,
                    step_size: config.resolution,
                    filter_mode: FilterMode::MaxZ,
                    bounds_override: params.bounds_override,
                }),
                params.on_progress,
            )
            .await?;

        match response {
            ResponsePayload::RasterizeComplete(geometry) => {
                self.terrain = Some(geometry.clone());
                Ok(Some(geometry))
            }
            other => Err(unexpected_response("rasterize", &other)),
        }
    }

    async fn generate(
        &mut self,
        proxy: &ComputeProxy,
        config: &RasterConfig,
        tool: &SparseGeometry,
        params: GenerateParams,
    ) -> Result<GenerationResult> {
        let terrain = self
            .terrain
            .as_ref()
            .ok_or_else(RasterPathError::terrain_not_loaded)?;

        let response = proxy
            .dispatch(
                RequestPayload::GenerateToolpath(ToolpathRequest {
                    terrain: terrain.clone(),
                    tool: tool.clone(),
                    x_step: params.x_step,
                    y_step: params.y_step,
                    z_floor: params.z_floor.unwrap_or(0.0),
                    grid_step: config.resolution,
                    single_scanline: params.single_scanline,
                }),
                params.on_progress,
            )
            .await?;

        match response {
            ResponsePayload::ToolpathComplete(toolpath) => Ok(GenerationResult::Planar {
                path_data: toolpath.path_data,
                width: toolpath.width,
                height: toolpath.height,
            }),
            other => Err(unexpected_response("toolpath", &other)),
        }
    }

    fn clear(&mut self) {
        self.terrain = None;
    }
}

struct RadialTerrain {
    triangles: Vec<f32>,
    bounds: Bounds,
    z_floor: f32,
}

/// Angular-sweep strategy: terrain stays a triangle buffer, centered in
/// YZ, and the whole per-angle pipeline runs in one dispatch.
#[derive(Default)]
pub(crate) struct RadialMode {
    terrain: Option<RadialTerrain>,
}

#[async_trait]
impl ModeStrategy for RadialMode {
    async fn load_terrain(
        &mut self,
        _proxy: &ComputeProxy,
        config: &RasterConfig,
        params: TerrainParams,
    ) -> Result<Option<SparseGeometry>> {
        if params.triangles.is_empty() {
            return Err(RasterPathError::argument("terrain triangle data is empty"));
        }

        let mut triangles = params.triangles;
        let bounds = params
            .bounds_override
            .unwrap_or_else(|| compute_bounds(&triangles));
        let bounds = center_yz(&mut triangles, bounds);

        if !config.quiet {
            info!(
                "Radial terrain staged: {} triangles, X span {:.3} mm",
                triangle_count(&triangles),
                bounds.size().x
            );
        }

        self.terrain = Some(RadialTerrain {
            triangles,
            bounds,
            z_floor: params.z_floor.unwrap_or(0.0),
        });
        Ok(None)
    }

    async fn generate(
        &mut self,
        proxy: &ComputeProxy,
        config: &RasterConfig,
        tool: &SparseGeometry,
        params: GenerateParams,
    ) -> Result<GenerationResult> {
        let terrain = self
            .terrain
            .as_ref()
            .ok_or_else(RasterPathError::terrain_not_loaded)?;
        let angle_step = config.rotation_step.ok_or_else(|| {
            RasterPathError::config("radial mode requires a positive rotation_step")
        })?;

        let ray_radius = max_radius(&terrain.triangles) * MAX_RADIUS_MARGIN;
        let tool_size = tool.bounds.size();
        let tool_width = tool_size.x.max(tool_size.y);
        let num_angles = (360.0 / angle_step).ceil() as u32;
        let bucket_index = bucket_triangles_by_x(&terrain.triangles, &terrain.bounds, BUCKET_WIDTH);

        debug!(
            "Radial pipeline: {} angles at {} degrees, ray radius {:.3}",
            num_angles, angle_step, ray_radius
        );

        let response = proxy
            .dispatch(
                RequestPayload::RadialGenerateToolpaths(RadialToolpathsRequest {
                    triangles: terrain.triangles.clone(),
                    bucket_index,
                    tool: tool.clone(),
                    resolution: config.resolution,
                    angle_step,
                    num_angles,
                    max_radius: ray_radius,
                    tool_width,
                    z_floor: params.z_floor.unwrap_or(terrain.z_floor),
                    bounds: terrain.bounds,
                    x_step: params.x_step,
                    y_step: params.y_step,
                }),
                params.on_progress,
            )
            .await?;

        match response {
            ResponsePayload::RadialToolpathsComplete(toolpaths) => Ok(GenerationResult::Radial {
                strips: toolpaths.strips,
                num_strips: toolpaths.num_strips,
                total_points: toolpaths.total_points,
            }),
            other => Err(unexpected_response("radial toolpaths", &other)),
        }
    }

    fn clear(&mut self) {
        self.terrain = None;
    }
}

fn unexpected_response(operation: &str, payload: &ResponsePayload) -> RasterPathError {
    RasterPathError::Backend {
        message: format!("unexpected {} response: {:?}", operation, payload),
    }
}
