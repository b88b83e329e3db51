//! Triangle-buffer geometry primitives.
//!
//! Meshes are carried as unindexed triangle soup: a flat `Vec<f32>` with
//! nine components per triangle (three vertices, xyz each). Rasterization
//! output is a sparse point cloud in the same flat layout with three
//! components per point.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub mod bucketing;
pub mod transform;

/// Number of `f32` components per triangle (three xyz vertices).
pub const TRIANGLE_STRIDE: usize = 9;

/// Axis-aligned bounding box over a triangle or point buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Bounds {
    /// Create bounds from explicit corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// The empty bounds: min at +infinity, max at -infinity, so that
    /// expanding by any point produces a valid box.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// True if no point has been folded in.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Expand the box to contain the given point.
    pub fn expand(&mut self, x: f32, y: f32, z: f32) {
        self.min.x = self.min.x.min(x);
        self.min.y = self.min.y.min(y);
        self.min.z = self.min.z.min(z);
        self.max.x = self.max.x.max(x);
        self.max.y = self.max.y.max(y);
        self.max.z = self.max.z.max(z);
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compute the bounding box of a flat xyz buffer (triangles or points).
pub fn compute_bounds(positions: &[f32]) -> Bounds {
    let mut bounds = Bounds::empty();
    for v in positions.chunks_exact(3) {
        bounds.expand(v[0], v[1], v[2]);
    }
    bounds
}

/// Maximum distance of any vertex from the X axis in the YZ plane.
///
/// Used by the radial mode to size the ray-cast start radius.
pub fn max_radius(positions: &[f32]) -> f32 {
    let mut max_radius = 0.0f32;
    for v in positions.chunks_exact(3) {
        let hypot = (v[1] * v[1] + v[2] * v[2]).sqrt();
        max_radius = max_radius.max(hypot);
    }
    max_radius
}

/// Number of whole triangles held in a flat triangle buffer.
pub fn triangle_count(triangles: &[f32]) -> usize {
    triangles.len() / TRIANGLE_STRIDE
}

/// Sparse point-cloud geometry produced by rasterization.
///
/// Holds one xyz triple per occupied grid cell; empty cells are simply
/// absent from the buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseGeometry {
    /// Bounding box of the source geometry.
    pub bounds: Bounds,
    /// Flat xyz point buffer, three components per point.
    pub positions: Vec<f32>,
    /// Number of points in `positions`.
    pub point_count: usize,
}

impl SparseGeometry {
    /// Build sparse geometry from a flat point buffer and its bounds.
    pub fn new(positions: Vec<f32>, bounds: Bounds) -> Self {
        let point_count = positions.len() / 3;
        Self {
            bounds,
            positions,
            point_count,
        }
    }

    /// True if the point buffer holds no points.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
