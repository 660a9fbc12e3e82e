#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis package ("Bap") data types.
//!
//! Covers the package definition schema loaded from TOML, the shared state
//! snapshot each package produces for deep-linking, `ScienceBase` item
//! metadata, declarative chart specs and the pdfmake-shaped print document
//! nodes a report is assembled from.

pub mod chart;
pub mod print;
pub mod sciencebase;

use std::collections::BTreeMap;
use std::fmt;

use biogeography_map_models::OverlayService;
use serde::{Deserialize, Serialize};

/// Identifier of one analysis package (e.g. `"bap4"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BapId(String);

impl BapId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BapId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for BapId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BapId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Static definition of one layer in a package's checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Title shown next to the checkbox; unique within the package.
    pub title: String,
    /// Text prepended to the title in the checklist and info popup.
    #[serde(default)]
    pub title_prefix: Option<String>,
    /// Remote map service behind the layer.
    pub service: OverlayService,
    /// `ScienceBase` item documenting the layer.
    #[serde(default)]
    pub sb_item: Option<String>,
    /// Whether the layer takes a `time` dimension parameter.
    #[serde(default)]
    pub time_enabled: bool,
    /// Hide the checkbox (layer toggled only programmatically).
    #[serde(default)]
    pub hide_checkbox: bool,
    /// Disabled layers cannot be toggled on.
    #[serde(default)]
    pub disabled: bool,
    /// Initial opacity.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

const fn default_opacity() -> f64 {
    1.0
}

impl LayerSpec {
    /// Title as displayed, including the optional prefix.
    #[must_use]
    pub fn display_title(&self) -> String {
        format!(
            "{}{}",
            self.title_prefix.as_deref().unwrap_or_default(),
            self.title
        )
    }
}

/// Inclusive year span of a time-enabled package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Clamps `year` into the span.
    #[must_use]
    pub fn clamp(self, year: i32) -> i32 {
        year.max(self.start).min(self.end)
    }
}

/// One enabled layer in a persisted snapshot.
///
/// Field names follow the compact deep-link shape (`t`, `o`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledLayer {
    #[serde(rename = "t", alias = "title")]
    pub title: String,
    #[serde(rename = "o", alias = "opacity")]
    pub opacity: f64,
}

/// Serializable snapshot of one package's UI state.
///
/// `enabled_layers` is only present for the priority package. Panel
/// specific fields are carried in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedBapState {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_layers: Option<Vec<EnabledLayer>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Whole-container UI state used to restore a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_bap: Option<BapId>,
    #[serde(default)]
    pub baps: BTreeMap<BapId, SharedBapState>,
}

impl PersistedState {
    /// Whether no package state has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.baps.is_empty()
    }
}
