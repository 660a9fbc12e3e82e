#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map view state for the biogeography viewer.
//!
//! The real map library sits behind [`MapSurface`]. [`MapView`] decides
//! what the surface shows: the fitted bounds of the selected feature, the
//! priority package's analysis layers, the extra overlay, the clicked
//! marker and any drawn or uploaded polygon.

pub mod bounds;
mod shp;
pub mod surface;
pub mod upload;
pub mod version;
pub mod view;

pub use surface::{HeadlessSurface, MapSurface, SurfaceCall};
pub use upload::{MAX_UPLOAD_BYTES, UploadError, parse_upload};
pub use view::{DrawState, MapEvent, MapView, UploadDialog};
