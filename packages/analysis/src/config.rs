//! TOML schema of an analysis package file.

use biogeography_bap::BapDefinition;
use biogeography_bap_models::chart::{ChartKind, Margins, TickFormat};
use serde::Deserialize;

/// One `baps/*.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    /// Identity, layers and metadata item.
    pub bap: BapDefinition,
    /// Where the package's metrics come from.
    pub metric: MetricConfig,
    /// Chart transform.
    pub panel: PanelKind,
}

/// Metric endpoint of a package.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricConfig {
    /// Path appended to the BIS API base URL.
    pub path: String,
    /// Which part of the selection keys the request.
    #[serde(default)]
    pub keyed_on: FetchKey,
    /// When set, the package only applies to features whose identifier
    /// contains this text.
    #[serde(default)]
    pub feature_id_contains: Option<String>,
}

/// What a package's metric request is keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKey {
    /// The selected feature (`?feature_id=`).
    #[default]
    Feature,
    /// The clicked point (`?lat=&lng=`).
    Point,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelKind {
    /// National Fish Habitat Partnership condition breakdown.
    Nfhp,
    /// Day-of-year series by year.
    Phenology(PhenologyConfig),
    /// Numeric properties charted side by side.
    Category(CategoryConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhenologyConfig {
    /// Chart identifier prefix; each series appends its field name.
    pub chart_id: String,
    /// Title template; `{feature_name}` and `{series}` are substituted.
    pub title: String,
    pub series: Vec<SeriesSpec>,
    /// Adds a chart of the day difference between the first two series.
    #[serde(default)]
    pub compare: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesSpec {
    /// Property holding a `{ "year": day_of_year }` object.
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub chart_id: String,
    #[serde(default = "default_chart_kind")]
    pub chart_kind: ChartKind,
    /// Title template; `{feature_name}` is substituted.
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Label of the value axis.
    pub value_label: String,
    /// Label of the category axis.
    pub category_label: String,
    #[serde(default = "default_tick_format")]
    pub tick_format: TickFormat,
    /// Tooltip template with `{label}` and `{value}`.
    pub tooltip: String,
    #[serde(default)]
    pub values: ValueMode,
    #[serde(default = "default_margins")]
    pub margins: Margins,
    pub categories: Vec<CategorySpec>,
}

/// How category values are charted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    /// As reported.
    #[default]
    Raw,
    /// Percent of the sum of all categories, one decimal.
    PercentOfTotal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySpec {
    /// Property name in the metric response.
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

const fn default_chart_kind() -> ChartKind {
    ChartKind::HorizontalBar
}

const fn default_tick_format() -> TickFormat {
    TickFormat::Identity
}

const fn default_margins() -> Margins {
    Margins {
        left: 100.0,
        right: 20.0,
        top: 20.0,
        bottom: 70.0,
    }
}
