//! Declarative chart specs produced by analysis packages.
//!
//! A chart is fully described by data: axis labels, tick formatting and
//! colour-coded categories. Rendering is left to whatever consumes the spec
//! (a charting widget, or the SVG renderer used for printing).

use serde::{Deserialize, Serialize};

/// Chart results of one package for the current feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "charts", rename_all = "snake_case")]
pub enum ChartData {
    /// No data for the feature, or the fetch failed.
    #[default]
    NoData,
    /// Charts ready to render.
    Ready(Vec<ChartSpec>),
}

impl ChartData {
    #[must_use]
    pub fn has_data(&self) -> bool {
        matches!(self, Self::Ready(charts) if !charts.is_empty())
    }

    #[must_use]
    pub fn charts(&self) -> &[ChartSpec] {
        match self {
            Self::NoData => &[],
            Self::Ready(charts) => charts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// DOM/print identifier (e.g. `"NFHP_HorizontalBarChart"`).
    pub id: String,
    pub kind: ChartKind,
    pub config: ChartConfig,
    pub data: Vec<ChartDatum>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
    VerticalBar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub margins: Margins,
    pub chart: ChartTitle,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTitle {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    /// Datum field the axis reads (`"label"` or `"value"` semantics are
    /// decided by the chart kind; the key is kept for display).
    pub key: String,
    pub label: String,
    pub ticks: u32,
    pub tick_format: TickFormat,
}

/// How tick values are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickFormat {
    /// Value as-is.
    Identity,
    /// Truncated integer followed by `%`.
    Percent,
    /// Truncated integer.
    Integer,
    /// Rounded integer with thousands separators.
    Thousands,
}

impl TickFormat {
    /// Formats a numeric tick value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Identity => format_number(value),
            Self::Percent => format!("{}%", value.trunc() as i64),
            Self::Integer => format!("{}", value.trunc() as i64),
            Self::Thousands => with_commas(value.round() as i64),
        }
    }
}

/// Tooltip template with `{label}` and `{value}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub template: String,
}

impl Tooltip {
    #[must_use]
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    #[must_use]
    pub fn render(&self, datum: &ChartDatum) -> String {
        self.template
            .replace("{label}", &datum.label)
            .replace("{value}", &format_number(datum.value))
    }
}

/// One bar/point of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDatum {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Formats a float without a trailing `.0` for whole numbers.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Inserts thousands separators (`1234567` → `"1,234,567"`).
#[must_use]
pub fn with_commas(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
