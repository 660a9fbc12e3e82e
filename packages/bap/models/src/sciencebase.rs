//! `ScienceBase` catalog item metadata.
//!
//! Only the fields the viewer renders are modelled; everything else in the
//! catalog response is ignored.

use serde::{Deserialize, Serialize};

/// A `ScienceBase` catalog item (`/catalog/item/{id}?format=json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SbItem {
    #[serde(default)]
    pub title: String,
    /// HTML description.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub contacts: Vec<SbContact>,
    #[serde(default)]
    pub web_links: Vec<SbWebLink>,
    #[serde(default)]
    pub link: Option<SbLink>,
}

impl SbItem {
    /// Placeholder metadata used until the catalog item loads.
    #[must_use]
    pub fn placeholder(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Web links of type `citation`, the only kind shown in popups.
    pub fn citations(&self) -> impl Iterator<Item = &SbWebLink> {
        self.web_links
            .iter()
            .filter(|link| link.kind.as_deref() == Some("citation"))
    }

    /// URL of the catalog page for this item.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.url.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SbContact {
    /// Formats as `"name - email - type"`, skipping missing parts.
    #[must_use]
    pub fn line(&self) -> String {
        [&self.name, &self.email, &self.kind]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbWebLink {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbLink {
    pub url: String,
}
