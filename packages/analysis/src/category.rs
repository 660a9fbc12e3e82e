//! Generic category breakdown driven by the package TOML.

use biogeography_bap_models::chart::{
    Axis, ChartConfig, ChartDatum, ChartKind, ChartSpec, ChartTitle, TickFormat, Tooltip,
};
use biogeography_map_models::Feature;

use crate::AnalysisError;
use crate::config::{CategoryConfig, CategorySpec, ValueMode};
use crate::metrics::{number, require_properties, round1};

/// Builds the breakdown chart.
///
/// Categories missing from the response are left out. A response with no
/// category values (or only zeros in percent mode) yields no charts.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the response has no hits.
pub fn charts(
    config: &CategoryConfig,
    feature: Option<&Feature>,
    raw: &serde_json::Value,
) -> Result<Vec<ChartSpec>, AnalysisError> {
    let properties = require_properties(raw)?;

    let values: Vec<(&CategorySpec, f64)> = config
        .categories
        .iter()
        .filter_map(|category| {
            let value = properties.get(&category.field).and_then(number);
            if value.is_none() {
                log::debug!("{}: no value for {}", config.chart_id, category.field);
            }
            value.map(|v| (category, v))
        })
        .collect();

    if values.is_empty() {
        return Ok(Vec::new());
    }

    let total: f64 = values.iter().map(|(_, v)| v).sum();
    let data: Vec<ChartDatum> = match config.values {
        ValueMode::Raw => values
            .iter()
            .map(|(category, value)| datum(category, *value))
            .collect(),
        ValueMode::PercentOfTotal => {
            if total <= 0.0 {
                return Ok(Vec::new());
            }
            values
                .iter()
                .map(|(category, value)| datum(category, round1(value / total * 100.0)))
                .collect()
        }
    };

    let feature_name = feature.map(Feature::name).unwrap_or_default();
    let value_axis = Axis {
        key: "value".to_string(),
        label: config.value_label.clone(),
        ticks: 5,
        tick_format: config.tick_format,
    };
    let category_axis = Axis {
        key: "label".to_string(),
        label: config.category_label.clone(),
        ticks: 5,
        tick_format: TickFormat::Identity,
    };
    let (x_axis, y_axis) = match config.chart_kind {
        ChartKind::HorizontalBar => (value_axis, category_axis),
        ChartKind::VerticalBar | ChartKind::Line => (category_axis, value_axis),
    };

    Ok(vec![ChartSpec {
        id: config.chart_id.clone(),
        kind: config.chart_kind,
        config: ChartConfig {
            margins: config.margins,
            chart: ChartTitle {
                title: config.title.replace("{feature_name}", feature_name),
                subtitle: config.subtitle.replace("{feature_name}", feature_name),
            },
            x_axis,
            y_axis,
            tooltip: Tooltip::new(&config.tooltip),
        },
        data,
    }])
}

fn datum(category: &CategorySpec, value: f64) -> ChartDatum {
    ChartDatum {
        label: category.label.clone(),
        value,
        color: category.color.clone(),
    }
}
