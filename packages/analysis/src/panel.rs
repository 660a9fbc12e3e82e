//! The [`AnalysisPanel`] implementation shared by every configured package.

use async_trait::async_trait;
use biogeography_bap::{AnalysisPanel, ApiEndpoints, BapDefinition, BapError, PrintContext};
use biogeography_bap_models::chart::ChartData;
use biogeography_bap_models::print::PrintNode;
use biogeography_map_models::{Feature, Point};

use crate::config::{MetricConfig, PanelConfig, PanelKind};
use crate::{category, nfhp, phenology, svg};

/// A package backed by a BIS metric endpoint.
#[derive(Debug, Clone)]
pub struct MetricPanel {
    definition: BapDefinition,
    metric: MetricConfig,
    kind: PanelKind,
}

impl MetricPanel {
    #[must_use]
    pub fn new(config: PanelConfig) -> Self {
        Self {
            definition: config.bap,
            metric: config.metric,
            kind: config.panel,
        }
    }

    #[must_use]
    pub const fn metric(&self) -> &MetricConfig {
        &self.metric
    }

    #[must_use]
    pub const fn kind(&self) -> &PanelKind {
        &self.kind
    }
}

#[async_trait]
impl AnalysisPanel for MetricPanel {
    fn definition(&self) -> &BapDefinition {
        &self.definition
    }

    fn fetch_key(&self, feature: Option<&Feature>, point: Option<Point>) -> Option<String> {
        self.metric.key(feature, point)
    }

    fn applies_to(&self, feature: &Feature) -> bool {
        self.metric
            .feature_id_contains
            .as_deref()
            .is_none_or(|needle| feature.id().contains(needle))
    }

    async fn fetch_data(
        &self,
        client: &reqwest::Client,
        endpoints: &ApiEndpoints,
        feature: Option<&Feature>,
        point: Option<Point>,
    ) -> Result<Option<serde_json::Value>, BapError> {
        self.metric
            .fetch(client, &endpoints.bis_api, feature, point)
            .await
    }

    fn render_charts(&self, feature: Option<&Feature>, raw: &serde_json::Value) -> ChartData {
        let charts = match &self.kind {
            PanelKind::Nfhp => nfhp::charts(feature, raw),
            PanelKind::Phenology(config) => phenology::charts(config, feature, raw),
            PanelKind::Category(config) => category::charts(config, feature, raw),
        };
        match charts {
            Ok(charts) if !charts.is_empty() => ChartData::Ready(charts),
            Ok(_) => ChartData::NoData,
            Err(e) => {
                log::warn!("{}: could not build charts: {e}", self.definition.id);
                ChartData::NoData
            }
        }
    }

    fn export_print(&self, ctx: &PrintContext<'_>) -> Vec<PrintNode> {
        if !ctx.charts.has_data() {
            return Vec::new();
        }
        let mut nodes = ctx.sb_item_nodes();
        nodes.extend(svg::chart_nodes(ctx.charts));
        nodes
    }
}
