//! The capability interface concrete analysis packages implement.

use async_trait::async_trait;
use biogeography_bap_models::chart::ChartData;
use biogeography_bap_models::print::PrintNode;
use biogeography_bap_models::sciencebase::SbItem;
use biogeography_bap_models::{BapId, LayerSpec, YearRange};
use biogeography_map_models::{Feature, Point};
use serde::Deserialize;

use crate::BapError;

/// Base URLs of the remote services packages read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Biogeographic Information System API (metrics, places, version).
    pub bis_api: String,
    /// `ScienceBase` catalog root (e.g. `https://www.sciencebase.gov`).
    pub sciencebase: String,
}

/// Definition fields every package shares, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct BapDefinition {
    /// Package identifier (e.g. `"bap4"`).
    pub id: BapId,
    /// Title shown until the `ScienceBase` item loads.
    pub title: String,
    /// `ScienceBase` item describing the package.
    #[serde(default)]
    pub sb_item: Option<String>,
    /// Initial layer checklist, in display order.
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
    /// When set, checking one layer unchecks all others.
    #[serde(default)]
    pub disable_multiple_layers: bool,
    /// Only mounted when the application runs in dev mode.
    #[serde(default)]
    pub dev_only: bool,
    /// Years selectable for time-enabled layers.
    #[serde(default)]
    pub years: Option<YearRange>,
}

/// What a panel sees when it generates its print content.
#[derive(Debug, Clone, Copy)]
pub struct PrintContext<'a> {
    pub bap_id: &'a BapId,
    pub sb_item: &'a SbItem,
    pub charts: &'a ChartData,
    pub feature: Option<&'a Feature>,
}

impl PrintContext<'_> {
    /// The package's `ScienceBase` description converted to print nodes.
    #[must_use]
    pub fn sb_item_nodes(&self) -> Vec<PrintNode> {
        crate::html::sb_item_for_print(self.sb_item)
    }
}

/// A concrete analysis package.
///
/// Implementations supply the panel-specific parts: which request to make
/// for a feature, how the raw response turns into charts, and what goes
/// into the printed report. Everything else is handled by [`crate::Bap`].
#[async_trait]
pub trait AnalysisPanel: Send + Sync {
    /// Static definition (identity, layers, metadata item).
    fn definition(&self) -> &BapDefinition;

    /// Key identifying the data the panel shows for the current selection.
    ///
    /// A new fetch is started only when this key changes. Returns `None`
    /// when the panel has nothing to fetch for the selection.
    fn fetch_key(&self, feature: Option<&Feature>, _point: Option<Point>) -> Option<String> {
        feature.map(|f| f.id().to_string())
    }

    /// Whether the panel is shown at all for this feature.
    fn applies_to(&self, _feature: &Feature) -> bool {
        true
    }

    /// Fetches the raw metric response for the selection.
    ///
    /// Returns `Ok(None)` when the service has no data for the feature.
    ///
    /// # Errors
    ///
    /// Returns [`BapError`] if the request or response parsing fails.
    async fn fetch_data(
        &self,
        client: &reqwest::Client,
        endpoints: &ApiEndpoints,
        feature: Option<&Feature>,
        point: Option<Point>,
    ) -> Result<Option<serde_json::Value>, BapError>;

    /// Transforms a raw metric response into chart specs.
    fn render_charts(&self, feature: Option<&Feature>, raw: &serde_json::Value) -> ChartData;

    /// Generates the print content for the package.
    ///
    /// The default prints nothing without chart data and only the
    /// `ScienceBase` description otherwise.
    fn export_print(&self, ctx: &PrintContext<'_>) -> Vec<PrintNode> {
        if !ctx.charts.has_data() {
            return Vec::new();
        }
        ctx.sb_item_nodes()
    }
}
