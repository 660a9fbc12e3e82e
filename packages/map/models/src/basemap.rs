//! Basemap definitions and the app-scoped basemap selection.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// How a basemap is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BasemapKind {
    /// XYZ tile service.
    TileLayer,
    /// WMS service rendered as tiles.
    #[serde(rename = "WMSTileLayer")]
    WmsTileLayer {
        /// Image format (e.g. `"image/png"`).
        format: String,
        /// WMS layer names.
        layers: String,
    },
}

/// A background tile or WMS source offered by a bioscape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basemap {
    /// Label shown in the basemap picker.
    pub title: String,
    /// Tile template or WMS endpoint.
    pub service_url: String,
    /// Attribution HTML shown on the map.
    #[serde(default)]
    pub attribution: String,
    #[serde(flatten)]
    pub kind: BasemapKind,
    /// Whether this option is the current selection in the picker.
    #[serde(default)]
    pub selected: bool,
}

/// Application-wide basemap selection.
///
/// One writer (the basemap picker), many readers (the map view and the
/// picker itself). Cloning shares the same underlying selection.
#[derive(Debug, Clone, Default)]
pub struct BasemapState {
    inner: Arc<RwLock<Option<Basemap>>>,
}

impl BasemapState {
    #[must_use]
    pub fn new(initial: Option<Basemap>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Returns a copy of the current selection.
    #[must_use]
    pub fn get(&self) -> Option<Basemap> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current selection. `None` deselects the basemap.
    pub fn set(&self, basemap: Option<Basemap>) {
        log::debug!(
            "Basemap selection changed to {:?}",
            basemap.as_ref().map(|b| b.title.as_str())
        );
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = basemap;
    }

    /// Whether the given option is the current selection (matched by
    /// service URL).
    #[must_use]
    pub fn is_selected(&self, basemap: &Basemap) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|current| current.service_url == basemap.service_url)
    }
}
