//! Kernel seam and the CPU reference implementation.
//!
//! A [`ComputeKernel`] owns the numerics behind the protocol boundary:
//! rasterization, planar toolpath generation, and the radial pipeline.
//! The shipped [`CpuKernel`] implements them directly on the host so the
//! orchestration layer is fully exercisable without a GPU device; a GPU
//! kernel plugs in behind the same trait.

use thiserror::Error;

use rasterpath_core::{compute_bounds, SparseGeometry, TRIANGLE_STRIDE};

use crate::compute::protocol::{
    DeviceCapabilities, FilterMode, PlanarToolpath, RadialToolpaths, RadialToolpathsRequest,
    RasterizeRequest, ToolpathRequest, EMPTY_CELL,
};
use crate::config::RasterConfig;
use crate::types::ProgressUpdate;

/// Kernel error type
///
/// Failures reported by a compute kernel; the worker maps these to
/// `ResponsePayload::Failed` messages.
#[derive(Error, Debug, Clone)]
pub enum KernelError {
    /// Input geometry holds no usable vertices
    #[error("Empty geometry: {reason}")]
    EmptyGeometry {
        /// Which input was empty.
        reason: String,
    },

    /// Requested grid exceeds the dispatch limit
    #[error("Grid too large: {cells} cells exceed the dispatch limit of {limit}")]
    GridTooLarge {
        /// The requested grid size in cells.
        cells: u64,
        /// The kernel's dispatch limit in cells.
        limit: u64,
    },

    /// Generic kernel error
    #[error("Kernel error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Numeric backend behind the compute protocol.
///
/// Progress closures are invoked synchronously from inside the kernel;
/// the hosting worker forwards them as protocol progress messages.
pub trait ComputeKernel: Send {
    /// Bring the device up and report its capabilities.
    fn init(&mut self, config: &RasterConfig) -> Result<DeviceCapabilities, KernelError>;

    /// Rasterize a triangle buffer into a sparse per-cell point cloud.
    fn rasterize(
        &self,
        request: &RasterizeRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<SparseGeometry, KernelError>;

    /// Generate a planar toolpath from rasterized terrain and tool.
    fn generate_toolpath(
        &self,
        request: &ToolpathRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<PlanarToolpath, KernelError>;

    /// Run the combined radial pipeline: per-angle ray casting plus tool offset.
    fn generate_radial_toolpaths(
        &self,
        request: &RadialToolpathsRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<RadialToolpaths, KernelError>;
}

/// Report rasterization progress every this many triangles.
const RASTERIZE_PROGRESS_INTERVAL: usize = 1024;

/// Inclusion tolerance for barycentric containment, so cell centers on
/// shared triangle edges are claimed by at least one triangle.
const BARY_EPS: f32 = 1e-5;

/// CPU reference kernel.
#[derive(Debug, Default)]
pub struct CpuKernel {
    max_dispatch_cells: u64,
}

impl CpuKernel {
    /// Create an uninitialized kernel; `init` sizes its dispatch limit.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeKernel for CpuKernel {
    fn init(&mut self, config: &RasterConfig) -> Result<DeviceCapabilities, KernelError> {
        let budget_bytes = u64::from(config.max_gpu_memory_mb) * 1024 * 1024;
        let usable_bytes = (budget_bytes as f64 * f64::from(config.gpu_memory_safety_margin)) as u64;
        self.max_dispatch_cells = usable_bytes / std::mem::size_of::<f32>() as u64;

        Ok(DeviceCapabilities {
            backend: "cpu-reference".to_string(),
            max_buffer_bytes: budget_bytes,
            max_dispatch_cells: self.max_dispatch_cells,
        })
    }

    fn rasterize(
        &self,
        request: &RasterizeRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<SparseGeometry, KernelError> {
        let triangles = &request.triangles;
        if triangles.len() < TRIANGLE_STRIDE {
            return Err(KernelError::EmptyGeometry {
                reason: "triangle buffer holds no triangles".to_string(),
            });
        }

        let bounds = request
            .bounds_override
            .unwrap_or_else(|| compute_bounds(triangles));
        let step = request.step_size;
        let width = (bounds.size().x / step).floor() as usize + 1;
        let height = (bounds.size().y / step).floor() as usize + 1;

        let cells = width as u64 * height as u64;
        if self.max_dispatch_cells > 0 && cells > self.max_dispatch_cells {
            return Err(KernelError::GridTooLarge {
                cells,
                limit: self.max_dispatch_cells,
            });
        }

        let mut grid: Vec<Option<f32>> = vec![None; width * height];
        let num_triangles = triangles.len() / TRIANGLE_STRIDE;

        for (tri_idx, tri) in triangles.chunks_exact(TRIANGLE_STRIDE).enumerate() {
            let tri_min_x = tri[0].min(tri[3]).min(tri[6]);
            let tri_max_x = tri[0].max(tri[3]).max(tri[6]);
            let tri_min_y = tri[1].min(tri[4]).min(tri[7]);
            let tri_max_y = tri[1].max(tri[4]).max(tri[7]);

            let i0 = (((tri_min_x - bounds.min.x) / step).floor() as i64).max(0);
            let i1 = (((tri_max_x - bounds.min.x) / step).ceil() as i64).min(width as i64 - 1);
            let j0 = (((tri_min_y - bounds.min.y) / step).floor() as i64).max(0);
            let j1 = (((tri_max_y - bounds.min.y) / step).ceil() as i64).min(height as i64 - 1);
            if i0 > i1 || j0 > j1 {
                continue;
            }

            for j in j0..=j1 {
                let py = bounds.min.y + j as f32 * step;
                for i in i0..=i1 {
                    let px = bounds.min.x + i as f32 * step;
                    if let Some(z) = triangle_height_at(tri, px, py) {
                        let cell = &mut grid[j as usize * width + i as usize];
                        *cell = Some(match (*cell, request.filter_mode) {
                            (None, _) => z,
                            (Some(existing), FilterMode::MaxZ) => existing.max(z),
                            (Some(existing), FilterMode::MinZ) => existing.min(z),
                        });
                    }
                }
            }

            if tri_idx % RASTERIZE_PROGRESS_INTERVAL == 0 {
                progress(progress_update(tri_idx as u64, num_triangles as u64, None));
            }
        }
        progress(progress_update(
            num_triangles as u64,
            num_triangles as u64,
            None,
        ));

        let mut positions = Vec::new();
        for j in 0..height {
            for i in 0..width {
                if let Some(z) = grid[j * width + i] {
                    positions.push(bounds.min.x + i as f32 * step);
                    positions.push(bounds.min.y + j as f32 * step);
                    positions.push(z);
                }
            }
        }

        Ok(SparseGeometry::new(positions, bounds))
    }

    fn generate_toolpath(
        &self,
        request: &ToolpathRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<PlanarToolpath, KernelError> {
        let terrain = &request.terrain;
        let tool = &request.tool;
        if terrain.is_empty() {
            return Err(KernelError::EmptyGeometry {
                reason: "terrain has no points".to_string(),
            });
        }
        if tool.is_empty() {
            return Err(KernelError::EmptyGeometry {
                reason: "tool has no points".to_string(),
            });
        }

        let step = request.grid_step;
        let width = (terrain.bounds.size().x / step).floor() as usize + 1;
        let height = (terrain.bounds.size().y / step).floor() as usize + 1;

        // Rebuild the dense terrain grid from the sparse point cloud
        let mut grid: Vec<Option<f32>> = vec![None; width * height];
        for p in terrain.positions.chunks_exact(3) {
            let i = ((p[0] - terrain.bounds.min.x) / step).round() as i64;
            let j = ((p[1] - terrain.bounds.min.y) / step).round() as i64;
            if (0..width as i64).contains(&i) && (0..height as i64).contains(&j) {
                let cell = &mut grid[j as usize * width + i as usize];
                *cell = Some(cell.map_or(p[2], |existing: f32| existing.max(p[2])));
            }
        }

        // Tool points as cell offsets around the tool's XY center
        let tool_center_x = (tool.bounds.min.x + tool.bounds.max.x) / 2.0;
        let tool_center_y = (tool.bounds.min.y + tool.bounds.max.y) / 2.0;
        let offsets: Vec<(i64, i64, f32)> = tool
            .positions
            .chunks_exact(3)
            .map(|p| {
                (
                    ((p[0] - tool_center_x) / step).round() as i64,
                    ((p[1] - tool_center_y) / step).round() as i64,
                    p[2],
                )
            })
            .collect();

        let x_step = request.x_step.max(1) as usize;
        let y_step = request.y_step.max(1) as usize;
        let out_width = width.div_ceil(x_step);
        let out_height = if request.single_scanline {
            1
        } else {
            height.div_ceil(y_step)
        };

        let mut path_data = Vec::with_capacity(out_width * out_height);
        for (row, j) in (0..height).step_by(y_step).take(out_height).enumerate() {
            for i in (0..width).step_by(x_step) {
                let value = match grid[j * width + i] {
                    None => EMPTY_CELL,
                    Some(_) => {
                        let mut best = f32::NEG_INFINITY;
                        for &(di, dj, tool_z) in &offsets {
                            let ni = i as i64 + di;
                            let nj = j as i64 + dj;
                            let terrain_z = if (0..width as i64).contains(&ni)
                                && (0..height as i64).contains(&nj)
                            {
                                grid[nj as usize * width + ni as usize].unwrap_or(request.z_floor)
                            } else {
                                request.z_floor
                            };
                            best = best.max(terrain_z - tool_z);
                        }
                        best
                    }
                };
                path_data.push(value);
            }
            progress(progress_update(
                row as u64 + 1,
                out_height as u64,
                Some(row as u32),
            ));
        }

        Ok(PlanarToolpath {
            path_data,
            width: out_width as u32,
            height: out_height as u32,
        })
    }

    fn generate_radial_toolpaths(
        &self,
        request: &RadialToolpathsRequest,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<RadialToolpaths, KernelError> {
        let triangles = &request.triangles;
        if triangles.len() < TRIANGLE_STRIDE {
            return Err(KernelError::EmptyGeometry {
                reason: "terrain triangle buffer holds no triangles".to_string(),
            });
        }
        if request.tool.is_empty() {
            return Err(KernelError::EmptyGeometry {
                reason: "tool has no points".to_string(),
            });
        }
        let Some(first_bucket) = request.bucket_index.buckets.first() else {
            return Err(KernelError::Other {
                message: "bucket index holds no buckets".to_string(),
            });
        };
        let bucket_width = first_bucket.max_x - first_bucket.min_x;
        let num_buckets = request.bucket_index.num_buckets;

        let step_x = request.resolution * request.x_step.max(1) as f32;
        let num_samples = (request.bounds.size().x / step_x).floor() as usize + 1;

        // Tool profile projected onto the strip direction
        let tool = &request.tool;
        let tool_center_x = (tool.bounds.min.x + tool.bounds.max.x) / 2.0;
        let offsets: Vec<(i64, f32)> = tool
            .positions
            .chunks_exact(3)
            .map(|p| (((p[0] - tool_center_x) / step_x).round() as i64, p[2]))
            .collect();

        let mut strips = Vec::with_capacity(request.num_angles as usize);
        let mut total_points = 0usize;

        for angle in 0..request.num_angles {
            let theta = (angle as f32 * request.angle_step).to_radians();
            let (sin_t, cos_t) = theta.sin_cos();

            // Surface radius per sample: rotate candidates by -theta, then
            // cast a vertical ray at (x, y=0) from above
            let mut surface = vec![request.z_floor; num_samples];
            for (s, value) in surface.iter_mut().enumerate() {
                let x = request.bounds.min.x + s as f32 * step_x;
                let bucket = (((x - request.bounds.min.x) / bucket_width).floor() as i64)
                    .clamp(0, num_buckets as i64 - 1) as usize;

                let mut best = f32::NEG_INFINITY;
                for &tri_idx in request.bucket_index.triangles_in(bucket) {
                    let base = tri_idx as usize * TRIANGLE_STRIDE;
                    let mut rotated = [0.0f32; TRIANGLE_STRIDE];
                    for v in 0..3 {
                        let vx = triangles[base + v * 3];
                        let vy = triangles[base + v * 3 + 1];
                        let vz = triangles[base + v * 3 + 2];
                        rotated[v * 3] = vx;
                        rotated[v * 3 + 1] = vy * cos_t + vz * sin_t;
                        rotated[v * 3 + 2] = -vy * sin_t + vz * cos_t;
                    }
                    if let Some(z) = triangle_height_at(&rotated, x, 0.0) {
                        best = best.max(z);
                    }
                }
                if best.is_finite() {
                    *value = best.min(request.max_radius);
                }
            }

            // Offset the surface by the tool profile
            let mut strip = Vec::with_capacity(num_samples * 2);
            for s in 0..num_samples {
                let x = request.bounds.min.x + s as f32 * step_x;
                let mut best = f32::NEG_INFINITY;
                for &(di, tool_z) in &offsets {
                    let ns = s as i64 + di;
                    let neighbor = if (0..num_samples as i64).contains(&ns) {
                        surface[ns as usize]
                    } else {
                        request.z_floor
                    };
                    best = best.max(neighbor - tool_z);
                }
                strip.push(x);
                strip.push(best);
            }

            total_points += strip.len() / 2;
            strips.push(strip);
            progress(progress_update(
                u64::from(angle) + 1,
                u64::from(request.num_angles),
                Some(angle),
            ));
        }

        let num_strips = strips.len();
        Ok(RadialToolpaths {
            strips,
            num_strips,
            total_points,
        })
    }
}

fn progress_update(current: u64, total: u64, layer: Option<u32>) -> ProgressUpdate {
    let percent = if total == 0 {
        100.0
    } else {
        current as f32 / total as f32 * 100.0
    };
    ProgressUpdate {
        percent,
        current,
        total,
        layer,
    }
}

/// Height of the triangle surface above (px, py), or None when the point
/// lies outside the triangle's XY projection.
fn triangle_height_at(tri: &[f32], px: f32, py: f32) -> Option<f32> {
    let (ax, ay, az) = (tri[0], tri[1], tri[2]);
    let (bx, by, bz) = (tri[3], tri[4], tri[5]);
    let (cx, cy, cz) = (tri[6], tri[7], tri[8]);

    let det = (by - cy) * (ax - cx) + (cx - bx) * (ay - cy);
    if det.abs() < f32::EPSILON {
        // Degenerate in XY projection
        return None;
    }

    let u = ((by - cy) * (px - cx) + (cx - bx) * (py - cy)) / det;
    let v = ((cy - ay) * (px - cx) + (ax - cx) * (py - cy)) / det;
    let w = 1.0 - u - v;

    if u >= -BARY_EPS && v >= -BARY_EPS && w >= -BARY_EPS {
        Some(u * az + v * bz + w * cz)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterpath_core::{bucket_triangles_by_x, Bounds};

    fn flat_plane(size: f32, z: f32) -> Vec<f32> {
        vec![
            0.0, 0.0, z, size, 0.0, z, size, size, z, // lower-right half
            0.0, 0.0, z, size, size, z, 0.0, size, z, // upper-left half
        ]
    }

    fn initialized_kernel() -> CpuKernel {
        let mut kernel = CpuKernel::new();
        let config = RasterConfig {
            resolution: 1.0,
            ..Default::default()
        };
        kernel.init(&config).unwrap();
        kernel
    }

    fn no_progress() -> impl FnMut(ProgressUpdate) {
        |_| {}
    }

    #[test]
    fn test_init_reports_memory_budget() {
        let mut kernel = CpuKernel::new();
        let caps = kernel.init(&RasterConfig::default()).unwrap();
        assert_eq!(caps.backend, "cpu-reference");
        assert_eq!(caps.max_buffer_bytes, 256 * 1024 * 1024);
        assert!(caps.max_dispatch_cells > 0);
    }

    #[test]
    fn test_rasterize_flat_plane_covers_every_cell() {
        let kernel = initialized_kernel();
        let request = RasterizeRequest {
            triangles: flat_plane(10.0, 0.0),
            step_size: 1.0,
            filter_mode: FilterMode::MaxZ,
            bounds_override: None,
        };

        let sparse = kernel.rasterize(&request, &mut no_progress()).unwrap();

        assert_eq!(sparse.point_count, 11 * 11);
        for p in sparse.positions.chunks_exact(3) {
            assert_eq!(p[2], 0.0);
        }
    }

    #[test]
    fn test_rasterize_filter_modes_pick_opposite_surfaces() {
        // Two stacked planes at z=0 and z=5
        let mut triangles = flat_plane(2.0, 0.0);
        triangles.extend(flat_plane(2.0, 5.0));

        let kernel = initialized_kernel();
        let max = kernel
            .rasterize(
                &RasterizeRequest {
                    triangles: triangles.clone(),
                    step_size: 1.0,
                    filter_mode: FilterMode::MaxZ,
                    bounds_override: None,
                },
                &mut no_progress(),
            )
            .unwrap();
        let min = kernel
            .rasterize(
                &RasterizeRequest {
                    triangles,
                    step_size: 1.0,
                    filter_mode: FilterMode::MinZ,
                    bounds_override: None,
                },
                &mut no_progress(),
            )
            .unwrap();

        assert!(max.positions.chunks_exact(3).all(|p| p[2] == 5.0));
        assert!(min.positions.chunks_exact(3).all(|p| p[2] == 0.0));
    }

    #[test]
    fn test_rasterize_empty_buffer_is_rejected() {
        let kernel = initialized_kernel();
        let request = RasterizeRequest {
            triangles: vec![],
            step_size: 1.0,
            filter_mode: FilterMode::MaxZ,
            bounds_override: None,
        };
        assert!(matches!(
            kernel.rasterize(&request, &mut no_progress()),
            Err(KernelError::EmptyGeometry { .. })
        ));
    }

    #[test]
    fn test_rasterize_respects_dispatch_limit() {
        let mut kernel = CpuKernel::new();
        kernel
            .init(&RasterConfig {
                resolution: 0.001,
                max_gpu_memory_mb: 1,
                ..Default::default()
            })
            .unwrap();

        let request = RasterizeRequest {
            triangles: flat_plane(10.0, 0.0),
            step_size: 0.001,
            filter_mode: FilterMode::MaxZ,
            bounds_override: None,
        };
        assert!(matches!(
            kernel.rasterize(&request, &mut no_progress()),
            Err(KernelError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_flat_terrain_with_point_tool_yields_flat_path() {
        let kernel = initialized_kernel();
        let terrain = kernel
            .rasterize(
                &RasterizeRequest {
                    triangles: flat_plane(10.0, 0.0),
                    step_size: 1.0,
                    filter_mode: FilterMode::MaxZ,
                    bounds_override: None,
                },
                &mut no_progress(),
            )
            .unwrap();
        let tool = SparseGeometry::new(
            vec![0.0, 0.0, 0.0],
            Bounds::new([0.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into()),
        );

        let path = kernel
            .generate_toolpath(
                &ToolpathRequest {
                    terrain,
                    tool,
                    x_step: 1,
                    y_step: 1,
                    z_floor: -5.0,
                    grid_step: 1.0,
                    single_scanline: false,
                },
                &mut no_progress(),
            )
            .unwrap();

        assert_eq!(path.width, 11);
        assert_eq!(path.height, 11);
        assert_eq!(path.path_data.len() as u32, path.width * path.height);
        assert!(path.path_data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_scanline_produces_one_row() {
        let kernel = initialized_kernel();
        let terrain = kernel
            .rasterize(
                &RasterizeRequest {
                    triangles: flat_plane(4.0, 1.0),
                    step_size: 1.0,
                    filter_mode: FilterMode::MaxZ,
                    bounds_override: None,
                },
                &mut no_progress(),
            )
            .unwrap();
        let tool = SparseGeometry::new(
            vec![0.0, 0.0, 0.0],
            Bounds::new([0.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into()),
        );

        let path = kernel
            .generate_toolpath(
                &ToolpathRequest {
                    terrain,
                    tool,
                    x_step: 1,
                    y_step: 1,
                    z_floor: -5.0,
                    grid_step: 1.0,
                    single_scanline: true,
                },
                &mut no_progress(),
            )
            .unwrap();

        assert_eq!(path.height, 1);
        assert_eq!(path.path_data.len(), 5);
    }

    #[test]
    fn test_radial_produces_one_strip_per_angle() {
        // Slab around the X axis, already YZ-centered
        let triangles = vec![
            0.0, -1.0, 1.0, 10.0, -1.0, 1.0, 10.0, 1.0, 1.0, //
            0.0, -1.0, 1.0, 10.0, 1.0, 1.0, 0.0, 1.0, 1.0,
        ];
        let bounds = compute_bounds(&triangles);
        let bucket_index = bucket_triangles_by_x(&triangles, &bounds, 1.0);
        let tool = SparseGeometry::new(
            vec![0.0, 0.0, 0.0],
            Bounds::new([0.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into()),
        );

        let kernel = initialized_kernel();
        let result = kernel
            .generate_radial_toolpaths(
                &RadialToolpathsRequest {
                    triangles,
                    bucket_index,
                    tool,
                    resolution: 1.0,
                    angle_step: 90.0,
                    num_angles: 4,
                    max_radius: 2.0,
                    tool_width: 0.0,
                    z_floor: 0.0,
                    bounds,
                    x_step: 1,
                    y_step: 1,
                },
                &mut no_progress(),
            )
            .unwrap();

        assert_eq!(result.num_strips, 4);
        assert_eq!(result.strips.len(), 4);
        for strip in &result.strips {
            // 11 (x, radius) pairs per strip
            assert_eq!(strip.len(), 22);
            // X coordinates ascend along the rotation axis
            assert!(strip
                .chunks_exact(2)
                .zip(strip.chunks_exact(2).skip(1))
                .all(|(a, b)| a[0] < b[0]));
        }
        assert_eq!(result.total_points, 4 * 11);

        // At angle 0 the slab top sits at z=1 above the axis
        let first = &result.strips[0];
        assert!((first[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_radial_progress_reports_every_angle() {
        let triangles = vec![0.0, -1.0, 1.0, 4.0, -1.0, 1.0, 4.0, 1.0, 1.0];
        let bounds = compute_bounds(&triangles);
        let bucket_index = bucket_triangles_by_x(&triangles, &bounds, 1.0);
        let tool = SparseGeometry::new(
            vec![0.0, 0.0, 0.0],
            Bounds::new([0.0, 0.0, 0.0].into(), [0.0, 0.0, 0.0].into()),
        );

        let kernel = initialized_kernel();
        let mut layers = Vec::new();
        kernel
            .generate_radial_toolpaths(
                &RadialToolpathsRequest {
                    triangles,
                    bucket_index,
                    tool,
                    resolution: 1.0,
                    angle_step: 120.0,
                    num_angles: 3,
                    max_radius: 2.0,
                    tool_width: 0.0,
                    z_floor: 0.0,
                    bounds,
                    x_step: 1,
                    y_step: 1,
                },
                &mut |update| layers.push(update.layer),
            )
            .unwrap();

        assert_eq!(layers, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_degenerate_triangle_is_skipped() {
        let kernel = initialized_kernel();
        // All three vertices collinear in XY
        let mut triangles = vec![0.0, 0.0, 3.0, 1.0, 0.0, 3.0, 2.0, 0.0, 3.0];
        triangles.extend(flat_plane(2.0, 0.0));

        let sparse = kernel
            .rasterize(
                &RasterizeRequest {
                    triangles,
                    step_size: 1.0,
                    filter_mode: FilterMode::MaxZ,
                    bounds_override: None,
                },
                &mut no_progress(),
            )
            .unwrap();

        // Heights come from the plane only
        assert!(sparse.positions.chunks_exact(3).all(|p| p[2] == 0.0));
    }
}
