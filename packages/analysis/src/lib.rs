#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The concrete analysis packages.
//!
//! Every package is declared in a TOML file under `baps/` and served by a
//! single [`MetricPanel`] implementation. The `kind` of the package's
//! `[panel]` table selects the chart transform: the NFHP fish habitat
//! breakdown, phenology time series, or a generic category breakdown.

pub mod category;
pub mod config;
pub mod metrics;
pub mod nfhp;
pub mod panel;
pub mod phenology;
pub mod registry;
pub mod svg;

pub use config::{FetchKey, MetricConfig, PanelConfig, PanelKind};
pub use panel::MetricPanel;
pub use registry::{REPORT_ORDER, all_configs, build_panels};

use thiserror::Error;

/// Errors raised while transforming metric responses or rendering charts.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A required field was missing or not numeric.
    #[error("Missing or non-numeric field: {field}")]
    MissingField {
        /// Name of the field.
        field: String,
    },

    /// The metric response did not have the expected shape.
    #[error("Unexpected metric response: {message}")]
    Response {
        /// Description of what was wrong with the response.
        message: String,
    },

    /// Chart rendering failed.
    #[error("Chart rendering failed: {message}")]
    Draw {
        /// Error reported by the drawing backend.
        message: String,
    },
}
