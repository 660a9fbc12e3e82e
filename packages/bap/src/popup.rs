//! Info popups for packages and layers.

use biogeography_bap_models::sciencebase::SbItem;

use crate::Layer;

/// Shown for layers without a `ScienceBase` item.
pub const UNDOCUMENTED_MESSAGE: &str = "This item is not currently documented in ScienceBase. \
     You may contact the Biogeographic Characterization Branch to request this information: \
     bcb@usgs.gov";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    Documented {
        /// HTML description, rendered as-is.
        body_html: String,
        /// `"name - email - type"` lines.
        contacts: Vec<String>,
        citations: Vec<Citation>,
        url: Option<String>,
    },
    Undocumented {
        message: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPopup {
    pub title: String,
    pub content: PopupContent,
}

impl InfoPopup {
    #[must_use]
    pub fn for_package(item: &SbItem) -> Self {
        Self {
            title: item.title.clone(),
            content: documented(item),
        }
    }

    /// Popup for a layer; undocumented until its metadata has loaded.
    #[must_use]
    pub fn for_layer(layer: &Layer) -> Self {
        Self {
            title: layer.spec.display_title(),
            content: layer.sb_item.as_ref().map_or(
                PopupContent::Undocumented {
                    message: UNDOCUMENTED_MESSAGE,
                },
                documented,
            ),
        }
    }
}

fn documented(item: &SbItem) -> PopupContent {
    PopupContent::Documented {
        body_html: item.body.clone(),
        contacts: item
            .contacts
            .iter()
            .map(biogeography_bap_models::sciencebase::SbContact::line)
            .collect(),
        citations: item
            .citations()
            .map(|c| Citation {
                title: c.title.clone(),
                uri: c.uri.clone(),
            })
            .collect(),
        url: item.url().map(str::to_string),
    }
}
