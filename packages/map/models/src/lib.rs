#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic and map-overlay types shared across the biogeography viewer.
//!
//! The selected [`Feature`], clicked [`Point`]s, map [`Bounds`], the
//! overlay handles analysis packages hand to the map ([`MapLayer`]) and the
//! application-wide basemap selection ([`BasemapState`]) all live here so
//! that panels, the search bar and the map view agree on one vocabulary.

pub mod basemap;
pub mod crs;

pub use basemap::{Basemap, BasemapKind, BasemapState};

use geojson::Geometry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix used for identifiers of user-drawn or uploaded polygons.
pub const USER_DRAWN_PREFIX: &str = "user-drawn:";

/// A latitude/longitude pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Point {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// State reference carried by search results and features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRef {
    /// State name (e.g. "Colorado").
    pub name: String,
}

/// Descriptive properties of a selected feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Identifier used to key every metric request.
    pub feature_id: String,
    /// Human-readable name (e.g. "Rocky Mountain National Park").
    #[serde(default)]
    pub feature_name: String,
    /// Feature class (e.g. "National Park", "County").
    #[serde(default)]
    pub feature_class: String,
    /// Containing state, when the feature has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateRef>,
}

/// A geographic entity selected by the user.
///
/// Immutable once created; a new selection replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature geometry, absent for purely descriptive lookups.
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Descriptive properties.
    pub properties: FeatureProperties,
}

impl Feature {
    /// Returns the identifier used to key metric requests.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.properties.feature_id
    }

    /// Returns the human-readable feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.properties.feature_name
    }

    /// Builds a feature from a user-drawn or uploaded polygon.
    ///
    /// The identifier is derived from the geometry so that drawing the same
    /// polygon twice does not trigger a second round of metric requests.
    #[must_use]
    pub fn from_drawn(geometry: Geometry) -> Self {
        let serialized = serde_json::to_string(&geometry).unwrap_or_default();
        let digest = Sha256::digest(serialized.as_bytes());
        let short = hex::encode(&digest[..8]);
        Self {
            geometry: Some(geometry),
            properties: FeatureProperties {
                feature_id: format!("{USER_DRAWN_PREFIX}{short}"),
                feature_name: "User Defined Area".to_string(),
                feature_class: "User Defined".to_string(),
                state: None,
            },
        }
    }

    /// Whether this feature came from a drawn or uploaded polygon.
    #[must_use]
    pub fn is_user_drawn(&self) -> bool {
        self.properties.feature_id.starts_with(USER_DRAWN_PREFIX)
    }

    /// Converts into a standard `GeoJSON` feature.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::Feature {
        let properties = match serde_json::to_value(&self.properties) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        };
        geojson::Feature {
            bbox: None,
            geometry: self.geometry.clone(),
            id: None,
            properties,
            foreign_members: None,
        }
    }
}

/// A rectangular extent expressed as south-west / north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub south_west: Point,
    pub north_east: Point,
}

impl Bounds {
    /// The extent shown before any feature is selected (contiguous US).
    pub const CONTIGUOUS_US: Self = Self {
        south_west: Point::new(21.0, -134.0),
        north_east: Point::new(51.0, -63.0),
    };

    #[must_use]
    pub const fn new(south_west: Point, north_east: Point) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Midpoint of the extent.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            f64::midpoint(self.south_west.lat, self.north_east.lat),
            f64::midpoint(self.south_west.lng, self.north_east.lng),
        )
    }

    /// Returns the corners as `[[lat, lng], [lat, lng]]`, the shape map
    /// libraries accept for `fitBounds`.
    #[must_use]
    pub const fn corners(&self) -> [[f64; 2]; 2] {
        [
            [self.south_west.lat, self.south_west.lng],
            [self.north_east.lat, self.north_east.lng],
        ]
    }
}

/// The remote service behind a map overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayService {
    /// `ArcGIS` `MapServer` rendered through the dynamic export endpoint.
    DynamicMapLayer {
        /// `MapServer` base URL.
        url: String,
    },
    /// OGC WMS tile layer.
    WmsTileLayer {
        /// WMS endpoint URL.
        url: String,
        /// Comma-separated WMS layer names.
        layers: String,
        /// Image format requested from the server.
        #[serde(default = "default_wms_format")]
        format: String,
        /// Whether tiles are requested with a transparent background.
        #[serde(default = "default_true")]
        transparent: bool,
    },
}

fn default_wms_format() -> String {
    "image/png".to_string()
}

const fn default_true() -> bool {
    true
}

impl OverlayService {
    /// Returns the service URL regardless of variant.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::DynamicMapLayer { url } | Self::WmsTileLayer { url, .. } => url,
        }
    }
}

/// Identifies one layer of one analysis package on the map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerKey {
    /// Owning analysis package identifier (e.g. `"bap4"`).
    pub bap_id: String,
    /// Layer title, unique within its package.
    pub title: String,
}

/// An overlay as handed to the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayer {
    pub key: LayerKey,
    pub service: OverlayService,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Whether the layer accepts a `time` dimension parameter.
    #[serde(default)]
    pub time_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Geometry {
        Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![-105.0, 40.0],
            vec![-104.0, 40.0],
            vec![-104.0, 41.0],
            vec![-105.0, 41.0],
            vec![-105.0, 40.0],
        ]]))
    }

    #[test]
    fn drawn_feature_ids_are_stable() {
        let a = Feature::from_drawn(square());
        let b = Feature::from_drawn(square());
        assert_eq!(a.id(), b.id());
        assert!(a.is_user_drawn());
        assert!(a.id().starts_with(USER_DRAWN_PREFIX));
    }

    #[test]
    fn bounds_center_is_midpoint() {
        let center = Bounds::CONTIGUOUS_US.center();
        assert!((center.lat - 36.0).abs() < f64::EPSILON);
        assert!((center.lng - -98.5).abs() < f64::EPSILON);
    }

    #[test]
    fn deserializes_feature_from_search_payload() {
        let feature: Feature = serde_json::from_value(serde_json::json!({
            "type": "Feature",
            "geometry": null,
            "properties": {
                "feature_id": "USNationalParks_ROMO",
                "feature_name": "Rocky Mountain National Park",
                "feature_class": "National Park",
                "state": { "name": "Colorado" }
            }
        }))
        .unwrap();
        assert_eq!(feature.id(), "USNationalParks_ROMO");
        assert_eq!(feature.properties.state.unwrap().name, "Colorado");
        assert!(feature.geometry.is_none());
    }

    #[test]
    fn overlay_service_reads_tagged_toml_shape() {
        let service: OverlayService = serde_json::from_value(serde_json::json!({
            "type": "wms_tile_layer",
            "url": "https://example.test/wms",
            "layers": "landuse"
        }))
        .unwrap();
        assert_eq!(
            service,
            OverlayService::WmsTileLayer {
                url: "https://example.test/wms".to_string(),
                layers: "landuse".to_string(),
                format: "image/png".to_string(),
                transparent: true,
            }
        );
    }
}
