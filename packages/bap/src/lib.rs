#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared analysis package behavior.
//!
//! Every analysis package is a concrete [`AnalysisPanel`] wrapped in a
//! [`Bap`]. The wrapper owns everything the packages have in common: the
//! open/closed state, the layer checklist with opacity, priority
//! arbitration, `ScienceBase` metadata popups, the raw JSON window, the
//! shared state snapshot used for deep-linking and print delegation.
//!
//! A [`Bap`] never calls back into its container. Every operation returns
//! the [`BapEvent`]s it produced and the container routes them.

pub mod bap;
pub mod html;
pub mod json_view;
pub mod panel;
pub mod popup;
pub mod sciencebase;

pub use bap::{
    Bap, BapEvent, FetchOutcome, FetchTicket, Layer, MetadataOutcome, MetadataRequest,
    MetadataTarget,
};
pub use panel::{AnalysisPanel, ApiEndpoints, BapDefinition, PrintContext};

use thiserror::Error;

/// Notice shown in place of a package's contents after a failed fetch.
pub const ERROR_NOTICE: &str = "There was an error producing this analysis. Please try again.";

/// Errors raised while loading package data.
#[derive(Debug, Error)]
pub enum BapError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response did not have the expected shape.
    #[error("Unexpected response: {message}")]
    Response {
        /// Description of what was wrong with the response.
        message: String,
    },
}
