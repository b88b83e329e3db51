//! # RasterPath Core
//!
//! Core geometry types and triangle-buffer utilities for RasterPath.
//! Provides the flat triangle-buffer representation, bounding-box and
//! radius math, coordinate transforms, X-axis spatial bucketing, and
//! STL decoding shared by the engine crates.

pub mod error;
pub mod geometry;
pub mod stl;

pub use error::StlError;

pub use geometry::{
    compute_bounds, max_radius, triangle_count, Bounds, SparseGeometry, TRIANGLE_STRIDE,
};

// Re-export the bucketing and transform helpers for convenience
pub use geometry::bucketing::{bucket_triangles_by_x, BucketIndex, BucketRecord};
pub use geometry::transform::{center_yz, invert_tool_z, CENTER_EPSILON};

pub use stl::parse_stl;
