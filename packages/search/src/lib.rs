#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place search for the biogeography viewer.
//!
//! [`SearchBar`] holds the input, result list, basemap settings and help
//! popup state. The application is reached back through [`SearchHandler`]
//! and the browser location through [`Location`]. [`FeatureSearchClient`]
//! queries the BIS places API.

pub mod bar;
pub mod client;

pub use bar::{BasemapOption, SearchBar, result_label};
pub use client::FeatureSearchClient;

use biogeography_map_models::FeatureProperties;
use thiserror::Error;

/// Receives what the user does in the search bar.
pub trait SearchHandler {
    /// Called on every key release with the current input text.
    fn text_search(&mut self, text: &str);

    /// Called when a result is chosen.
    fn submit(&mut self, result: &FeatureProperties);
}

/// The page location, used to reset the application.
pub trait Location {
    fn set_hash(&mut self, hash: &str);

    fn reload(&mut self);
}

/// Errors from place search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}
