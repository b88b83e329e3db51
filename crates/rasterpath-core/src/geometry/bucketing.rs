//! X-axis spatial bucketing for radial ray casting.
//!
//! Partitions a triangle buffer into fixed-width buckets along the X axis
//! so that a ray cast at a given X only tests triangles whose X-range
//! overlaps that bucket. A triangle spanning several buckets is listed in
//! each of them.

use serde::{Deserialize, Serialize};

use super::{Bounds, TRIANGLE_STRIDE};

/// One bucket's X-range and its slice of the flattened index list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    /// Lower X edge of the bucket.
    pub min_x: f32,
    /// Upper X edge of the bucket.
    pub max_x: f32,
    /// Offset of this bucket's first entry in `triangle_indices`.
    pub start_index: u32,
    /// Number of entries belonging to this bucket.
    pub count: u32,
}

/// Flattened bucket index over a triangle buffer.
///
/// The per-bucket index lists are concatenated into one contiguous
/// `triangle_indices` array so the whole structure can be shipped to a
/// compute backend as two flat buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketIndex {
    /// Per-bucket range records, in ascending X order.
    pub buckets: Vec<BucketRecord>,
    /// Triangle indices grouped by bucket.
    pub triangle_indices: Vec<u32>,
    /// Total number of buckets.
    pub num_buckets: usize,
}

impl BucketIndex {
    /// Triangle indices assigned to the given bucket.
    pub fn triangles_in(&self, bucket: usize) -> &[u32] {
        let record = &self.buckets[bucket];
        let start = record.start_index as usize;
        &self.triangle_indices[start..start + record.count as usize]
    }
}

/// Partition triangles into X-axis buckets of the given width.
///
/// Bucket edges start at `bounds.min.x`. Degenerate X spans still produce
/// a single bucket so every triangle has a home.
pub fn bucket_triangles_by_x(triangles: &[f32], bounds: &Bounds, bucket_width: f32) -> BucketIndex {
    let num_triangles = triangles.len() / TRIANGLE_STRIDE;
    let span = bounds.max.x - bounds.min.x;
    let num_buckets = ((span / bucket_width).ceil() as usize).max(1);

    let mut per_bucket: Vec<Vec<u32>> = vec![Vec::new(); num_buckets];

    for tri_idx in 0..num_triangles {
        let base = tri_idx * TRIANGLE_STRIDE;
        let x0 = triangles[base];
        let x1 = triangles[base + 3];
        let x2 = triangles[base + 6];

        let tri_min_x = x0.min(x1).min(x2);
        let tri_max_x = x0.max(x1).max(x2);

        let start = (((tri_min_x - bounds.min.x) / bucket_width).floor() as i64).max(0);
        let end =
            (((tri_max_x - bounds.min.x) / bucket_width).floor() as i64).min(num_buckets as i64 - 1);

        for b in start..=end {
            per_bucket[b as usize].push(tri_idx as u32);
        }
    }

    let mut buckets = Vec::with_capacity(num_buckets);
    let mut triangle_indices = Vec::new();

    for (i, indices) in per_bucket.iter().enumerate() {
        buckets.push(BucketRecord {
            min_x: bounds.min.x + i as f32 * bucket_width,
            max_x: bounds.min.x + (i + 1) as f32 * bucket_width,
            start_index: triangle_indices.len() as u32,
            count: indices.len() as u32,
        });
        triangle_indices.extend_from_slice(indices);
    }

    BucketIndex {
        buckets,
        triangle_indices,
        num_buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::compute_bounds;
    use proptest::prelude::*;

    fn flat_triangle(x_min: f32, x_max: f32) -> Vec<f32> {
        vec![x_min, 0.0, 0.0, x_max, 1.0, 0.0, x_min, 1.0, 0.0]
    }

    #[test]
    fn test_spanning_triangle_lands_in_every_overlapping_bucket() {
        // One narrow triangle and one spanning the full range
        let mut triangles = flat_triangle(0.0, 0.5);
        triangles.extend(flat_triangle(0.0, 4.0));
        let bounds = compute_bounds(&triangles);

        let index = bucket_triangles_by_x(&triangles, &bounds, 1.0);

        assert_eq!(index.num_buckets, 4);
        assert_eq!(index.triangles_in(0), &[0, 1]);
        for b in 1..4 {
            assert_eq!(index.triangles_in(b), &[1]);
        }
    }

    #[test]
    fn test_records_partition_flat_index_list() {
        let mut triangles = flat_triangle(0.0, 3.0);
        triangles.extend(flat_triangle(1.2, 1.8));
        triangles.extend(flat_triangle(2.5, 2.9));
        let bounds = compute_bounds(&triangles);

        let index = bucket_triangles_by_x(&triangles, &bounds, 1.0);

        let mut offset = 0u32;
        for record in &index.buckets {
            assert_eq!(record.start_index, offset);
            offset += record.count;
        }
        assert_eq!(offset as usize, index.triangle_indices.len());
    }

    #[test]
    fn test_zero_span_geometry_gets_one_bucket() {
        let triangles = vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let bounds = compute_bounds(&triangles);

        let index = bucket_triangles_by_x(&triangles, &bounds, 1.0);

        assert_eq!(index.num_buckets, 1);
        assert_eq!(index.triangles_in(0), &[0]);
    }

    #[test]
    fn test_bucket_edges_tile_the_x_range() {
        let triangles = flat_triangle(-2.0, 2.5);
        let bounds = compute_bounds(&triangles);

        let index = bucket_triangles_by_x(&triangles, &bounds, 1.0);

        assert_eq!(index.buckets[0].min_x, -2.0);
        for pair in index.buckets.windows(2) {
            assert_eq!(pair[0].max_x, pair[1].min_x);
        }
        assert!(index.buckets[index.num_buckets - 1].max_x >= bounds.max.x);
    }

    proptest! {
        #[test]
        fn prop_every_triangle_is_indexed_where_it_overlaps(
            spans in prop::collection::vec((-50.0f32..50.0, 0.0f32..10.0), 1..20)
        ) {
            let mut triangles = Vec::new();
            for (start, width) in &spans {
                triangles.extend(flat_triangle(*start, *start + *width));
            }
            let bounds = compute_bounds(&triangles);
            let index = bucket_triangles_by_x(&triangles, &bounds, 1.0);

            for (tri_idx, (start, width)) in spans.iter().enumerate() {
                let tri_min = *start;
                let tri_max = *start + *width;
                for (b, record) in index.buckets.iter().enumerate() {
                    // Overlap by the assignment rule: the bucket whose floor
                    // index covers the triangle's min..max X range
                    if tri_max >= record.min_x && tri_min < record.max_x {
                        prop_assert!(
                            index.triangles_in(b).contains(&(tri_idx as u32)),
                            "triangle {} missing from bucket {}",
                            tri_idx,
                            b
                        );
                    }
                }
            }
        }
    }
}
