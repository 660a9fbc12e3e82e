//! Coordinate reference system tagging for drawn and uploaded geometry.
//!
//! Geometry forwarded to the analysis services carries a legacy `GeoJSON`
//! `crs` member naming `EPSG:4326`. It is stored as a foreign member so the
//! rest of the geometry stays standard.

use geojson::{Geometry, JsonObject, JsonValue};

/// The only coordinate reference system geometry is forwarded in.
pub const EPSG_4326: &str = "EPSG:4326";

/// Builds the `{"type": "name", "properties": {"name": "EPSG:4326"}}` member.
#[must_use]
pub fn epsg_4326_member() -> JsonValue {
    serde_json::json!({
        "type": "name",
        "properties": { "name": EPSG_4326 }
    })
}

/// Tags a geometry with the `EPSG:4326` `crs` member, replacing any
/// existing one.
pub fn tag_epsg_4326(geometry: &mut Geometry) {
    geometry
        .foreign_members
        .get_or_insert_with(JsonObject::new)
        .insert("crs".to_string(), epsg_4326_member());
}

/// Returns the named CRS of a geometry, if it carries one.
#[must_use]
pub fn crs_name(geometry: &Geometry) -> Option<&str> {
    geometry
        .foreign_members
        .as_ref()?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
}
