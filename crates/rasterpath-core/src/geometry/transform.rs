//! Coordinate transforms applied while loading tool and terrain geometry.

use tracing::debug;

use super::{compute_bounds, Bounds, SparseGeometry};

/// Offsets below this are left uncentered.
pub const CENTER_EPSILON: f32 = 0.001;

/// Flip a sparse tool point cloud on the Z axis.
///
/// Tool geometry is inverted so that tool-terrain collision reduces to a
/// subtraction (`terrain_z - tool_z`) instead of a mesh intersection test.
/// Each point becomes `z' = -z - min_z`; the bounds swap to `[-max_z, -min_z]`.
pub fn invert_tool_z(tool: &mut SparseGeometry) {
    let min_z = tool.bounds.min.z;
    for v in tool.positions.chunks_exact_mut(3) {
        v[2] = -v[2] - min_z;
    }
    let swap_z = tool.bounds.min.z;
    tool.bounds.min.z = -tool.bounds.max.z;
    tool.bounds.max.z = -swap_z;
}

/// Center a triangle buffer on the X axis in the YZ plane.
///
/// Radial rasterization casts rays inward toward the X axis, so the
/// geometry must be symmetric around it. X coordinates are untouched.
/// Returns the bounds of the (possibly shifted) buffer.
pub fn center_yz(triangles: &mut [f32], bounds: Bounds) -> Bounds {
    let center_y = (bounds.min.y + bounds.max.y) / 2.0;
    let center_z = (bounds.min.z + bounds.max.z) / 2.0;

    if center_y.abs() <= CENTER_EPSILON && center_z.abs() <= CENTER_EPSILON {
        return bounds;
    }

    debug!(
        "Centering model in YZ: offset Y={:.3}, Z={:.3}",
        center_y, center_z
    );

    for v in triangles.chunks_exact_mut(3) {
        v[1] -= center_y;
        v[2] -= center_z;
    }

    compute_bounds(triangles)
}
