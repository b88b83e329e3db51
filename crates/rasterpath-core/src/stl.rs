//! STL decoding to flat triangle buffers.
//!
//! Both binary and ASCII STL are supported. Binary decoding validates the
//! declared triangle count against the buffer length; ASCII decoding is
//! permissive and keeps whatever complete facets it can recover, matching
//! how slicers treat files written by loose exporters.

use tracing::warn;

use crate::error::StlError;
use crate::geometry::TRIANGLE_STRIDE;

/// 80-byte comment header plus the 4-byte triangle count.
const BINARY_HEADER_LEN: usize = 84;
/// Normal (12) + three vertices (36) + attribute byte count (2).
const BINARY_TRIANGLE_LEN: usize = 50;

/// Decode an STL buffer into a flat triangle buffer.
///
/// Detects ASCII by the `solid` keyword in the first 80 bytes, otherwise
/// decodes as little-endian binary. Facet normals are dropped; only vertex
/// positions are kept.
pub fn parse_stl(data: &[u8]) -> Result<Vec<f32>, StlError> {
    if is_ascii_stl(data) {
        Ok(parse_ascii(data))
    } else {
        parse_binary(data)
    }
}

fn is_ascii_stl(data: &[u8]) -> bool {
    let head = &data[..data.len().min(80)];
    String::from_utf8_lossy(head).to_lowercase().starts_with("solid")
}

fn parse_ascii(data: &[u8]) -> Vec<f32> {
    let text = String::from_utf8_lossy(data);
    let mut triangles = Vec::new();
    let mut vertices: Vec<f32> = Vec::with_capacity(TRIANGLE_STRIDE);

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("vertex") {
            continue;
        }

        let mut coords = [0.0f32; 3];
        let mut valid = true;
        for c in coords.iter_mut() {
            match parts.next().and_then(|token| token.parse::<f32>().ok()) {
                Some(value) => *c = value,
                None => {
                    valid = false;
                    break;
                }
            }
        }
        if !valid {
            warn!("malformed vertex line in ASCII STL, stopping decode");
            break;
        }

        vertices.extend_from_slice(&coords);
        if vertices.len() == TRIANGLE_STRIDE {
            triangles.extend_from_slice(&vertices);
            vertices.clear();
        }
    }

    if !vertices.is_empty() {
        warn!(
            "ASCII STL ended mid-facet, dropping {} trailing vertices",
            vertices.len() / 3
        );
    }

    triangles
}

fn parse_binary(data: &[u8]) -> Result<Vec<f32>, StlError> {
    if data.len() < BINARY_HEADER_LEN {
        return Err(StlError::HeaderTooShort { actual: data.len() });
    }

    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]);
    let expected = BINARY_HEADER_LEN + count as usize * BINARY_TRIANGLE_LEN;
    if data.len() < expected {
        return Err(StlError::Truncated {
            triangles: count,
            expected,
            actual: data.len(),
        });
    }

    let mut triangles = Vec::with_capacity(count as usize * TRIANGLE_STRIDE);
    let mut offset = BINARY_HEADER_LEN;
    for _ in 0..count {
        // Skip the facet normal
        offset += 12;
        for _ in 0..TRIANGLE_STRIDE {
            let bytes = [
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ];
            triangles.push(f32::from_le_bytes(bytes));
            offset += 4;
        }
        // Skip the attribute byte count
        offset += 2;
    }

    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(triangles: &[[f32; 9]]) -> Vec<u8> {
        let mut data = vec![0u8; 80];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            data.extend_from_slice(&[0u8; 12]); // normal
            for value in tri {
                data.extend_from_slice(&value.to_le_bytes());
            }
            data.extend_from_slice(&[0u8; 2]); // attribute byte count
        }
        data
    }

    #[test]
    fn test_binary_stl_decodes_vertices() {
        let tris = [
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            [1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0, 1.0],
        ];
        let data = binary_stl(&tris);

        let decoded = parse_stl(&data).unwrap();

        assert_eq!(decoded.len(), 18);
        assert_eq!(&decoded[..9], &tris[0]);
        assert_eq!(&decoded[9..], &tris[1]);
    }

    #[test]
    fn test_binary_stl_header_too_short() {
        let data = vec![0u8; 40];
        assert_eq!(
            parse_stl(&data),
            Err(StlError::HeaderTooShort { actual: 40 })
        );
    }

    #[test]
    fn test_binary_stl_truncated() {
        let mut data = binary_stl(&[[0.0; 9], [1.0; 9]]);
        data.truncate(data.len() - 10);

        assert_eq!(
            parse_stl(&data),
            Err(StlError::Truncated {
                triangles: 2,
                expected: 184,
                actual: 174,
            })
        );
    }

    #[test]
    fn test_ascii_stl_decodes_facets() {
        let text = "\
solid cube
  facet normal 0 0 1
    outer loop
      vertex 0.0 0.0 0.0
      vertex 1.0 0.0 0.0
      vertex 0.0 1.0 0.0
    endloop
  endfacet
endsolid cube
";
        let decoded = parse_stl(text.as_bytes()).unwrap();

        assert_eq!(decoded.len(), 9);
        assert_eq!(decoded[3], 1.0);
        assert_eq!(decoded[7], 1.0);
    }

    #[test]
    fn test_ascii_stl_drops_trailing_incomplete_facet() {
        let text = "\
solid part
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
      vertex 5 5 5
endsolid part
";
        let decoded = parse_stl(text.as_bytes()).unwrap();

        // The dangling fourth vertex never completes a facet
        assert_eq!(decoded.len(), 9);
    }

    #[test]
    fn test_ascii_stl_stops_at_malformed_vertex() {
        let text = "\
solid part
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
      vertex not a number
      vertex 2 2 2
endsolid part
";
        let decoded = parse_stl(text.as_bytes()).unwrap();

        assert_eq!(decoded.len(), 9);
    }

    #[test]
    fn test_ascii_detection_is_case_insensitive() {
        let text = "SOLID shape\nendsolid shape\n";
        let decoded = parse_stl(text.as_bytes()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_binary_with_zero_triangles() {
        let data = binary_stl(&[]);
        let decoded = parse_stl(&data).unwrap();
        assert!(decoded.is_empty());
    }
}
