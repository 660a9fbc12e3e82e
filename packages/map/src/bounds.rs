//! Extent calculations for fitting the map to a feature.

use biogeography_map_models::{Bounds, Point};
use geo::BoundingRect;
use geojson::Geometry;

/// Degrees added on every side of a feature's extent before fitting.
pub const BUFFER: f64 = 0.5;

/// A buffered north-east longitude past this wraps the antimeridian.
const ANTIMERIDIAN_LNG: f64 = 179.0;

/// North-east longitude used instead when a feature spans the antimeridian
/// (Alaska's Aleutians), so the fit stays over North America.
const WRAPPED_NE_LNG: f64 = -50.0;

/// Returns the unbuffered extent of a geometry.
///
/// `None` for empty geometries or ones `geo` cannot represent.
#[must_use]
pub fn geometry_bounds(geometry: &Geometry) -> Option<Bounds> {
    let geom: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    let rect = geom.bounding_rect()?;
    Some(Bounds::new(
        Point::new(rect.min().y, rect.min().x),
        Point::new(rect.max().y, rect.max().x),
    ))
}

/// Grows an extent by [`BUFFER`] degrees and applies the antimeridian rule.
#[must_use]
pub fn buffered(bounds: Bounds) -> Bounds {
    let south_west = Point::new(
        bounds.south_west.lat - BUFFER,
        bounds.south_west.lng - BUFFER,
    );
    let mut north_east = Point::new(
        bounds.north_east.lat + BUFFER,
        bounds.north_east.lng + BUFFER,
    );
    if north_east.lng > ANTIMERIDIAN_LNG {
        log::debug!("Feature extent wraps the antimeridian, clamping east edge");
        north_east.lng = WRAPPED_NE_LNG;
    }
    Bounds::new(south_west, north_east)
}

/// The extent the map fits to when a feature is selected.
#[must_use]
pub fn feature_bounds(geometry: &Geometry) -> Option<Bounds> {
    geometry_bounds(geometry).map(buffered)
}
