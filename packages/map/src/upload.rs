//! Validation and parsing of uploaded polygon files.
//!
//! Accepted inputs are a zipped shapefile bundle (`.zip`) or a `GeoJSON`
//! document (`.geojson`, `.json`). The result is a single polygon or
//! multipolygon tagged as `EPSG:4326`.

use std::io::{Cursor, Read};

use biogeography_map_models::crs::tag_epsg_4326;
use geojson::{GeoJson, Geometry};

use crate::shp::{self, Shape};

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5_000_000;

/// Largest decompressed size of a single archive entry, in bytes.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Errors reading a shapefile bundle.
#[derive(Debug, thiserror::Error)]
pub enum ShapefileError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Format { message: String },
}

/// Why an upload was rejected. The display text is what the upload dialog
/// shows.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("File size is greater than 5MB")]
    TooLarge,
    #[error("Uploads of files with the extension {extension} are not supported.")]
    UnsupportedExtension { extension: String },
    #[error("File read failure: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Shapefile parse issue: {0}")]
    Shapefile(#[from] ShapefileError),
    #[error("Only Polygons are accepted for upload.")]
    NotPolygon,
}

impl From<zip::result::ZipError> for UploadError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Shapefile(e.into())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        Self::Shapefile(e.into())
    }
}

enum UploadKind {
    Shapefile,
    GeoJson,
}

fn extension(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

fn upload_kind(file_name: &str) -> Result<UploadKind, UploadError> {
    let ext = extension(file_name);
    match ext.to_ascii_lowercase().as_str() {
        "zip" => Ok(UploadKind::Shapefile),
        "geojson" | "json" => Ok(UploadKind::GeoJson),
        _ => Err(UploadError::UnsupportedExtension {
            extension: ext.to_string(),
        }),
    }
}

/// Parses an uploaded file into a tagged polygon geometry.
///
/// # Errors
///
/// Returns [`UploadError`] when the file is too large, has an unsupported
/// extension, cannot be parsed, or does not hold a polygon.
pub fn parse_upload(file_name: &str, bytes: &[u8]) -> Result<Geometry, UploadError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    let geometry = match upload_kind(file_name)? {
        UploadKind::Shapefile => shapefile_geometry(bytes)?,
        UploadKind::GeoJson => geojson_geometry(bytes)?,
    };
    log::info!("Accepted upload {file_name}");
    Ok(geometry)
}

fn accept_polygon(geometry: Option<Geometry>) -> Result<Geometry, UploadError> {
    let mut geometry = geometry.ok_or(UploadError::NotPolygon)?;
    match geometry.value {
        geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_) => {
            geometry.bbox = None;
            tag_epsg_4326(&mut geometry);
            Ok(geometry)
        }
        _ => Err(UploadError::NotPolygon),
    }
}

/// First feature of a collection, the geometry of a feature, or a bare
/// geometry.
fn geojson_geometry(bytes: &[u8]) -> Result<Geometry, UploadError> {
    let document: GeoJson = String::from_utf8_lossy(bytes).parse()?;
    let geometry = match document {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .next()
            .and_then(|feature| feature.geometry),
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::Geometry(geometry) => Some(geometry),
    };
    accept_polygon(geometry)
}

/// Reads the first `.shp` entry of a zip bundle.
///
/// A `.prj` declaring a projected coordinate system is rejected since the
/// coordinates would not be longitude/latitude.
fn shapefile_geometry(bytes: &[u8]) -> Result<Geometry, UploadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut shp_bytes = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_ascii_lowercase();
        if name.starts_with("__macosx/") {
            continue;
        }
        if name.ends_with(".prj") {
            let wkt = read_entry(&mut entry, &name)?;
            if String::from_utf8_lossy(&wkt).trim_start().starts_with("PROJCS") {
                return Err(ShapefileError::Format {
                    message: "projected coordinate systems are not supported, \
                              reproject to WGS 84"
                        .to_string(),
                }
                .into());
            }
        } else if name.ends_with(".shp") && shp_bytes.is_none() {
            shp_bytes = Some(read_entry(&mut entry, &name)?);
        }
    }

    let shp_bytes = shp_bytes.ok_or_else(|| ShapefileError::Format {
        message: "no .shp file found in archive".to_string(),
    })?;

    match shp::first_shape(&shp_bytes)? {
        Shape::Polygon(geom) => {
            let value = geojson::Value::from(&geom);
            accept_polygon(Some(Geometry::new(value)))
        }
        Shape::Other(shape_type) => {
            log::debug!("Rejecting shapefile with shape type {shape_type}");
            Err(UploadError::NotPolygon)
        }
    }
}

/// Reads an archive entry, refusing to inflate past [`MAX_ENTRY_BYTES`].
fn read_entry(entry: &mut impl Read, name: &str) -> Result<Vec<u8>, ShapefileError> {
    let mut buf = Vec::new();
    entry.take(MAX_ENTRY_BYTES + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_ENTRY_BYTES {
        return Err(ShapefileError::Format {
            message: format!("{name} is larger than {MAX_ENTRY_BYTES} bytes once unzipped"),
        });
    }
    Ok(buf)
}
