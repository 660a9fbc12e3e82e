//! Spring index phenology: first leaf and first bloom day of year.

use std::collections::BTreeMap;

use biogeography_bap_models::chart::{
    Axis, ChartConfig, ChartDatum, ChartKind, ChartSpec, ChartTitle, Margins, TickFormat, Tooltip,
};
use biogeography_map_models::Feature;

use crate::AnalysisError;
use crate::config::{PhenologyConfig, SeriesSpec};
use crate::metrics::{number, require_properties, round1};

const MARGINS: Margins = Margins {
    left: 60.0,
    right: 20.0,
    top: 20.0,
    bottom: 50.0,
};

/// Day-of-year values by year for one series.
fn series_values(
    properties: &serde_json::Map<String, serde_json::Value>,
    series: &SeriesSpec,
) -> BTreeMap<String, f64> {
    properties
        .get(&series.field)
        .and_then(serde_json::Value::as_object)
        .map(|years| {
            years
                .iter()
                .filter_map(|(year, value)| number(value).map(|v| (year.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Builds one line chart per series and, for comparisons, a bar chart of
/// the days between the first two series.
///
/// Series without any values are skipped.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the response has no hits.
pub fn charts(
    config: &PhenologyConfig,
    feature: Option<&Feature>,
    raw: &serde_json::Value,
) -> Result<Vec<ChartSpec>, AnalysisError> {
    let properties = require_properties(raw)?;
    let feature_name = feature.map(Feature::name).unwrap_or_default();

    let values: Vec<(&SeriesSpec, BTreeMap<String, f64>)> = config
        .series
        .iter()
        .map(|series| (series, series_values(properties, series)))
        .collect();

    let mut charts: Vec<ChartSpec> = values
        .iter()
        .filter(|(_, by_year)| !by_year.is_empty())
        .map(|(series, by_year)| ChartSpec {
            id: format!("{}_{}", config.chart_id, series.field),
            kind: ChartKind::Line,
            config: chart_config(
                config
                    .title
                    .replace("{series}", &series.label)
                    .replace("{feature_name}", feature_name),
                "Day of Year",
                "{label}: day {value}",
            ),
            data: by_year
                .iter()
                .map(|(year, day)| ChartDatum {
                    label: year.clone(),
                    value: *day,
                    color: series.color.clone(),
                })
                .collect(),
        })
        .collect();

    if config.compare
        && let [(first, leaf), (second, bloom), ..] = values.as_slice()
    {
        let data: Vec<ChartDatum> = leaf
            .iter()
            .filter_map(|(year, start)| {
                bloom.get(year).map(|end| ChartDatum {
                    label: year.clone(),
                    value: round1(end - start),
                    color: None,
                })
            })
            .collect();
        if !data.is_empty() {
            charts.push(ChartSpec {
                id: format!("{}_difference", config.chart_id),
                kind: ChartKind::VerticalBar,
                config: chart_config(
                    format!(
                        "Days Between {} and {} {feature_name}",
                        first.label, second.label
                    ),
                    "Days",
                    "{label}: {value} days",
                ),
                data,
            });
        }
    }

    Ok(charts)
}

fn chart_config(title: String, value_label: &str, tooltip: &str) -> ChartConfig {
    ChartConfig {
        margins: MARGINS,
        chart: ChartTitle {
            title,
            subtitle: String::new(),
        },
        x_axis: Axis {
            key: "Year".to_string(),
            label: "Year".to_string(),
            ticks: 10,
            tick_format: TickFormat::Identity,
        },
        y_axis: Axis {
            key: "Value".to_string(),
            label: value_label.to_string(),
            ticks: 5,
            tick_format: TickFormat::Integer,
        },
        tooltip: Tooltip::new(tooltip),
    }
}
