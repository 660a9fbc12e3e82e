#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Biogeography bioscape.
//!
//! [`Biogeography`] owns every mounted analysis package, decides which one
//! is the priority package (the only one whose layers reach the map),
//! keeps the persisted deep-link state current and assembles the printed
//! report.

pub mod config;
mod container;

pub use config::AppConfig;
pub use container::Biogeography;

use biogeography_bap_models::BapId;
use thiserror::Error;

/// Errors from the bioscape container.
#[derive(Debug, Error)]
pub enum BiogeographyError {
    /// HTTP client could not be built or a request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Persisted state could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An operation named a package that is not mounted.
    #[error("Unknown analysis package: {id}")]
    UnknownBap {
        /// The requested package identifier.
        id: BapId,
    },
}
