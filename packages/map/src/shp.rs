//! Minimal ESRI shapefile (`.shp`) reader for polygon uploads.
//!
//! Only the geometry file is read. Polygon records (plain, Z and M) are
//! converted into `GeoJSON` polygons; every other shape type is reported as
//! such so the caller can reject it.

use geo::{Contains, Coord, LineString, MultiPolygon, Polygon};

use crate::upload::ShapefileError;

const FILE_CODE: i32 = 9994;
const HEADER_LEN: usize = 100;
const RECORD_HEADER_LEN: usize = 8;

const NULL_SHAPE: i32 = 0;
const POLYGON: i32 = 5;
const POLYGON_Z: i32 = 15;
const POLYGON_M: i32 = 25;

/// Geometry of the first non-null record in a shapefile.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polygon(geo::Geometry<f64>),
    /// Any non-polygon shape type, by its numeric code.
    Other(i32),
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], ShapefileError> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| ShapefileError::Format {
                message: format!("unexpected end of file at byte {offset}"),
            })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], ShapefileError> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    fn i32_be(&self, offset: usize) -> Result<i32, ShapefileError> {
        Ok(i32::from_be_bytes(self.array(offset)?))
    }

    fn i32_le(&self, offset: usize) -> Result<i32, ShapefileError> {
        Ok(i32::from_le_bytes(self.array(offset)?))
    }

    fn f64_le(&self, offset: usize) -> Result<f64, ShapefileError> {
        Ok(f64::from_le_bytes(self.array(offset)?))
    }

    fn count(&self, offset: usize) -> Result<usize, ShapefileError> {
        let value = self.i32_le(offset)?;
        usize::try_from(value).map_err(|_| ShapefileError::Format {
            message: format!("negative count {value} at byte {offset}"),
        })
    }
}

/// Reads the first non-null shape of a `.shp` file.
///
/// # Errors
///
/// Returns [`ShapefileError::Format`] if the header is not a shapefile
/// header, the file holds no shapes, or a polygon record is truncated.
pub fn first_shape(bytes: &[u8]) -> Result<Shape, ShapefileError> {
    let reader = Reader { bytes };
    let code = reader.i32_be(0)?;
    if code != FILE_CODE {
        return Err(ShapefileError::Format {
            message: format!("not a shapefile (file code {code})"),
        });
    }

    let mut offset = HEADER_LEN;
    while offset + RECORD_HEADER_LEN <= bytes.len() {
        // Content length is in 16-bit words.
        let words = reader.i32_be(offset + 4)?;
        let content_len = usize::try_from(words)
            .map(|w| w * 2)
            .map_err(|_| ShapefileError::Format {
                message: format!("negative record length at byte {offset}"),
            })?;
        let content = offset + RECORD_HEADER_LEN;
        match reader.i32_le(content)? {
            NULL_SHAPE => {
                log::debug!("Skipping null shapefile record at byte {offset}");
            }
            POLYGON | POLYGON_Z | POLYGON_M => {
                return read_polygon(&reader, content, content_len).map(Shape::Polygon);
            }
            other => return Ok(Shape::Other(other)),
        }
        offset = content + content_len;
    }

    Err(ShapefileError::Format {
        message: "shapefile contains no shapes".to_string(),
    })
}

/// Reads a polygon record whose `len` content bytes start at `start`.
///
/// Layout after the shape type: bounding box (4 doubles), part count,
/// point count, part start indices, then x/y pairs. Z and M values follow
/// the points and are ignored.
fn read_polygon(
    reader: &Reader<'_>,
    start: usize,
    len: usize,
) -> Result<geo::Geometry<f64>, ShapefileError> {
    reader.slice(start, len)?;
    let num_parts = reader.count(start + 36)?;
    let num_points = reader.count(start + 40)?;

    // Counts come from the file; they must fit the record before anything
    // is sized from them.
    let needed = num_parts
        .checked_mul(4)
        .zip(num_points.checked_mul(16))
        .and_then(|(parts, points)| parts.checked_add(points))
        .and_then(|body| body.checked_add(44));
    if needed.is_none_or(|needed| needed > len) {
        return Err(ShapefileError::Format {
            message: format!(
                "polygon record at byte {start} claims {num_parts} parts and \
                 {num_points} points but holds {len} bytes"
            ),
        });
    }

    let parts_at = start + 44;
    let points_at = parts_at + num_parts * 4;

    let mut starts = Vec::new();
    for i in 0..num_parts {
        starts.push(reader.count(parts_at + i * 4)?);
    }

    let mut rings = Vec::new();
    for (i, &first) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(num_points);
        if first > end || end > num_points {
            return Err(ShapefileError::Format {
                message: format!("polygon part {i} has invalid point range {first}..{end}"),
            });
        }
        let coords = (first..end)
            .map(|p| {
                let at = points_at + p * 16;
                Ok(Coord {
                    x: reader.f64_le(at)?,
                    y: reader.f64_le(at + 8)?,
                })
            })
            .collect::<Result<Vec<_>, ShapefileError>>()?;
        rings.push(LineString::new(coords));
    }

    Ok(assemble(rings))
}

/// Twice the signed area of a ring. Negative for clockwise rings.
fn signed_area(ring: &LineString<f64>) -> f64 {
    ring.lines()
        .map(|line| line.start.x * line.end.y - line.end.x * line.start.y)
        .sum()
}

/// Groups rings into polygons: clockwise rings are exteriors, the rest are
/// holes of the exterior containing them (or of the latest exterior).
fn assemble(rings: Vec<LineString<f64>>) -> geo::Geometry<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut holes = Vec::new();
    for ring in rings {
        if signed_area(&ring) <= 0.0 {
            polygons.push(Polygon::new(ring, Vec::new()));
        } else {
            holes.push(ring);
        }
    }

    for hole in holes {
        let owner = hole.0.first().and_then(|coord| {
            polygons
                .iter()
                .position(|polygon| polygon.contains(coord))
        });
        match owner.or_else(|| polygons.len().checked_sub(1)) {
            Some(index) => polygons[index].interiors_push(hole),
            // Counter-clockwise only: treat the ring as an exterior.
            None => polygons.push(Polygon::new(hole, Vec::new())),
        }
    }

    if polygons.len() == 1 {
        geo::Geometry::Polygon(polygons.remove(0))
    } else {
        geo::Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a single-record polygon shapefile from `(x, y)` rings.
    pub(crate) fn polygon_shp(rings: &[&[(f64, f64)]]) -> Vec<u8> {
        record_shp(POLYGON, rings)
    }

    pub(crate) fn record_shp(shape_type: i32, rings: &[&[(f64, f64)]]) -> Vec<u8> {
        let part_count = rings.len();
        let point_count: usize = rings.iter().map(|r| r.len()).sum();

        let mut content = Vec::new();
        content.extend_from_slice(&shape_type.to_le_bytes());
        content.extend_from_slice(&[0_u8; 32]);
        content.extend_from_slice(&i32::try_from(part_count).unwrap().to_le_bytes());
        content.extend_from_slice(&i32::try_from(point_count).unwrap().to_le_bytes());
        let mut index = 0;
        for ring in rings {
            content.extend_from_slice(&i32::try_from(index).unwrap().to_le_bytes());
            index += ring.len();
        }
        for ring in rings {
            for (x, y) in *ring {
                content.extend_from_slice(&x.to_le_bytes());
                content.extend_from_slice(&y.to_le_bytes());
            }
        }

        let mut bytes = vec![0_u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&FILE_CODE.to_be_bytes());
        bytes[28..32].copy_from_slice(&1000_i32.to_le_bytes());
        bytes[32..36].copy_from_slice(&shape_type.to_le_bytes());
        bytes.extend_from_slice(&1_i32.to_be_bytes());
        bytes.extend_from_slice(&i32::try_from(content.len() / 2).unwrap().to_be_bytes());
        bytes.extend_from_slice(&content);
        let words = i32::try_from(bytes.len() / 2).unwrap();
        bytes[24..28].copy_from_slice(&words.to_be_bytes());
        bytes
    }

    /// Clockwise unit square.
    pub(crate) const SQUARE: &[(f64, f64)] = &[
        (-105.0, 40.0),
        (-105.0, 41.0),
        (-104.0, 41.0),
        (-104.0, 40.0),
        (-105.0, 40.0),
    ];

    const HOLE: &[(f64, f64)] = &[
        (-104.8, 40.2),
        (-104.2, 40.2),
        (-104.2, 40.8),
        (-104.8, 40.8),
        (-104.8, 40.2),
    ];

    const EAST_SQUARE: &[(f64, f64)] = &[
        (-100.0, 40.0),
        (-100.0, 41.0),
        (-99.0, 41.0),
        (-99.0, 40.0),
        (-100.0, 40.0),
    ];

    #[test]
    fn reads_polygon_with_hole() {
        let shape = first_shape(&polygon_shp(&[SQUARE, HOLE])).unwrap();
        let Shape::Polygon(geo::Geometry::Polygon(polygon)) = shape else {
            panic!("expected a single polygon, got {shape:?}");
        };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.interiors().len(), 1);
    }

    #[test]
    fn separate_exteriors_become_multipolygon() {
        let shape = first_shape(&polygon_shp(&[SQUARE, EAST_SQUARE])).unwrap();
        assert!(matches!(
            shape,
            Shape::Polygon(geo::Geometry::MultiPolygon(ref m)) if m.0.len() == 2
        ));
    }

    #[test]
    fn reports_non_polygon_shape_types() {
        let shape = first_shape(&record_shp(1, &[&[(-105.0, 40.0)]])).unwrap();
        assert_eq!(shape, Shape::Other(1));
    }

    #[test]
    fn rejects_bad_header_and_truncation() {
        assert!(first_shape(b"definitely not a shapefile").is_err());

        let mut bytes = polygon_shp(&[SQUARE]);
        bytes.truncate(bytes.len() - 10);
        assert!(first_shape(&bytes).is_err());
    }

    /// Overwrites the little-endian count at `field` bytes into the first
    /// record's content.
    pub(crate) fn patch_count(bytes: &mut [u8], field: usize, value: i32) {
        let at = HEADER_LEN + RECORD_HEADER_LEN + field;
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn rejects_counts_larger_than_the_record() {
        let mut parts = polygon_shp(&[SQUARE]);
        patch_count(&mut parts, 36, i32::MAX);
        let err = first_shape(&parts).unwrap_err();
        assert!(err.to_string().contains("parts"), "{err}");

        let mut points = polygon_shp(&[SQUARE]);
        patch_count(&mut points, 40, i32::MAX);
        assert!(first_shape(&points).is_err());

        let mut both = polygon_shp(&[SQUARE]);
        patch_count(&mut both, 36, 6);
        patch_count(&mut both, 40, 6);
        assert!(first_shape(&both).is_err());
    }
}
