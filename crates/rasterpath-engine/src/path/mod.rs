//! RasterPath controller.
//!
//! [`RasterPath`] owns the lifecycle of one compute backend: `init`
//! brings the worker up and records device capabilities, `load_tool`
//! and `load_terrain` stage geometry, `generate_toolpaths` runs the
//! mode pipeline, and `terminate` tears the backend down, rejecting any
//! in-flight requests. All operations between `init` and `terminate`
//! guard their preconditions and fail with a descriptive error instead
//! of panicking.

mod modes;

use tracing::{debug, info};

use rasterpath_core::{invert_tool_z, parse_stl, triangle_count, Bounds, SparseGeometry};

use crate::compute::{
    ComputeKernel, ComputeProxy, CpuKernel, DeviceCapabilities, FilterMode, InitRequest,
    RasterizeRequest, RequestPayload, ResponsePayload,
};
use crate::config::{RasterConfig, RasterMode};
use crate::error::{RasterPathError, Result};
use crate::types::ProgressCallback;

use modes::{ModeStrategy, PlanarMode, RadialMode};

/// Tool geometry accepted by [`RasterPath::load_tool`].
pub enum ToolSource {
    /// Raw triangle buffer, rasterized and Z-inverted on load.
    Triangles(Vec<f32>),
    /// Pre-rasterized, already Z-inverted point cloud.
    SparseData(SparseGeometry),
}

/// Parameters for [`RasterPath::load_terrain`].
#[derive(Default)]
pub struct TerrainParams {
    /// Terrain triangle buffer, nine components per triangle.
    pub triangles: Vec<f32>,
    /// Height assumed outside the terrain, stored for generation.
    pub z_floor: Option<f32>,
    /// Externally supplied bounds, otherwise computed from the triangles.
    pub bounds_override: Option<Bounds>,
    /// Progress callback for terrain rasterization.
    pub on_progress: Option<ProgressCallback>,
}

/// Parameters for [`RasterPath::generate_toolpaths`].
pub struct GenerateParams {
    /// Sample every Nth grid cell along X.
    pub x_step: u32,
    /// Sample every Nth grid cell along Y.
    pub y_step: u32,
    /// Height assumed outside the terrain; falls back to the value given
    /// at terrain load, then to zero.
    pub z_floor: Option<f32>,
    /// Generate only the first scanline (planar mode).
    pub single_scanline: bool,
    /// Progress callback for path generation.
    pub on_progress: Option<ProgressCallback>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            x_step: 1,
            y_step: 1,
            z_floor: None,
            single_scanline: false,
            on_progress: None,
        }
    }
}

/// Output of [`RasterPath::generate_toolpaths`], shaped by the mode.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    /// Sampled height map in scanline order.
    Planar {
        /// Row-major spindle heights.
        path_data: Vec<f32>,
        /// Sampled grid width.
        width: u32,
        /// Sampled grid height.
        height: u32,
    },
    /// One strip of (x, radius) pairs per angle.
    Radial {
        /// Flat pair buffers in sweep order.
        strips: Vec<Vec<f32>>,
        /// Number of strips.
        num_strips: usize,
        /// Total pairs across all strips.
        total_points: usize,
    },
}

/// Toolpath rasterization controller.
pub struct RasterPath {
    config: RasterConfig,
    proxy: Option<ComputeProxy>,
    capabilities: Option<DeviceCapabilities>,
    tool: Option<SparseGeometry>,
    mode: Box<dyn ModeStrategy>,
}

impl RasterPath {
    /// Create a controller with a validated configuration.
    pub fn new(config: RasterConfig) -> Result<Self> {
        config.validate()?;
        let mode: Box<dyn ModeStrategy> = match config.mode {
            RasterMode::Planar => Box::new(PlanarMode::default()),
            RasterMode::Radial => Box::new(RadialMode::default()),
        };
        Ok(Self {
            config,
            proxy: None,
            capabilities: None,
            tool: None,
            mode,
        })
    }

    /// Bring the compute backend up with the CPU reference kernel.
    ///
    /// Idempotent: a second call returns the recorded capabilities
    /// without restarting the backend.
    pub async fn init(&mut self) -> Result<DeviceCapabilities> {
        self.init_with_kernel(Box::new(CpuKernel::new())).await
    }

    /// Bring the compute backend up with a caller-supplied kernel.
    pub async fn init_with_kernel(
        &mut self,
        kernel: Box<dyn ComputeKernel>,
    ) -> Result<DeviceCapabilities> {
        if self.proxy.is_some() {
            if let Some(capabilities) = &self.capabilities {
                debug!("init called twice, backend already running");
                return Ok(capabilities.clone());
            }
        }

        let proxy = ComputeProxy::start(kernel);
        let response = proxy
            .dispatch(
                RequestPayload::Init(InitRequest {
                    config: self.config.clone(),
                }),
                None,
            )
            .await;

        let capabilities = match response {
            Ok(ResponsePayload::Ready(ready)) if ready.success => match ready.capabilities {
                Some(capabilities) => capabilities,
                None => {
                    proxy.shutdown();
                    return Err(RasterPathError::Initialization {
                        reason: "backend reported ready without capabilities".to_string(),
                    });
                }
            },
            Ok(ResponsePayload::Ready(_)) => {
                proxy.shutdown();
                return Err(RasterPathError::Initialization {
                    reason: "compute backend failed to come up".to_string(),
                });
            }
            Ok(other) => {
                proxy.shutdown();
                return Err(RasterPathError::Initialization {
                    reason: format!("unexpected init response: {:?}", other),
                });
            }
            Err(err) => {
                proxy.shutdown();
                return Err(err);
            }
        };

        if !self.config.quiet {
            info!(
                "Compute backend ready: {} ({} mode)",
                capabilities.backend, self.config.mode
            );
        }
        self.proxy = Some(proxy);
        self.capabilities = Some(capabilities.clone());
        Ok(capabilities)
    }

    /// Load the tool, rasterizing and Z-inverting triangle input.
    pub async fn load_tool(&mut self, source: ToolSource) -> Result<&SparseGeometry> {
        let proxy = self
            .proxy
            .as_ref()
            .ok_or_else(RasterPathError::not_initialized)?;

        let tool = match source {
            ToolSource::SparseData(geometry) => geometry,
            ToolSource::Triangles(triangles) => {
                if triangles.is_empty() {
                    return Err(RasterPathError::argument("tool triangle data is empty"));
                }
                if !self.config.quiet {
                    info!(
                        "Rasterizing tool: {} triangles at {} mm",
                        triangle_count(&triangles),
                        self.config.resolution
                    );
                }

                let response = proxy
                    .dispatch(
                        RequestPayload::Rasterize(RasterizeRequest {
                            triangles,
                            step_size: self.config.resolution,
                            filter_mode: FilterMode::MinZ,
                            bounds_override: None,
                        }),
                        None,
                    )
                    .await?;
                match response {
                    ResponsePayload::RasterizeComplete(mut geometry) => {
                        invert_tool_z(&mut geometry);
                        geometry
                    }
                    other => {
                        return Err(RasterPathError::Backend {
                            message: format!("unexpected rasterize response: {:?}", other),
                        });
                    }
                }
            }
        };

        Ok(self.tool.insert(tool))
    }

    /// Load terrain geometry for the configured mode.
    ///
    /// Planar mode rasterizes eagerly and returns the point cloud;
    /// radial mode stages the centered triangle buffer and returns
    /// `None`.
    pub async fn load_terrain(
        &mut self,
        params: TerrainParams,
    ) -> Result<Option<SparseGeometry>> {
        let proxy = self
            .proxy
            .as_ref()
            .ok_or_else(RasterPathError::not_initialized)?;
        self.mode.load_terrain(proxy, &self.config, params).await
    }

    /// Generate toolpaths over the loaded tool and terrain.
    pub async fn generate_toolpaths(
        &mut self,
        params: GenerateParams,
    ) -> Result<GenerationResult> {
        let proxy = self
            .proxy
            .as_ref()
            .ok_or_else(RasterPathError::not_initialized)?;
        let tool = self
            .tool
            .as_ref()
            .ok_or_else(RasterPathError::tool_not_loaded)?;
        if params.x_step == 0 || params.y_step == 0 {
            return Err(RasterPathError::argument(
                "x_step and y_step must be at least 1",
            ));
        }
        self.mode.generate(proxy, &self.config, tool, params).await
    }

    /// Tear the backend down and drop staged geometry.
    ///
    /// Pending requests settle with [`RasterPathError::Cancelled`].
    /// Idempotent: calling without a running backend is a no-op, and the
    /// controller can be re-initialized afterwards.
    pub fn terminate(&mut self) {
        if let Some(proxy) = self.proxy.take() {
            proxy.shutdown();
            if !self.config.quiet {
                info!("RasterPath terminated");
            }
        }
        self.capabilities = None;
        self.tool = None;
        self.mode.clear();
    }

    /// Capabilities reported by the backend, if initialized.
    pub fn get_device_capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    /// A copy of the controller configuration.
    pub fn get_config(&self) -> RasterConfig {
        self.config.clone()
    }

    /// Decode STL bytes into a flat triangle buffer.
    ///
    /// Accepts both ASCII and binary encodings.
    pub fn parse_stl(data: &[u8]) -> Result<Vec<f32>> {
        Ok(parse_stl(data)?)
    }
}

impl Drop for RasterPath {
    fn drop(&mut self) {
        self.terminate();
    }
}
