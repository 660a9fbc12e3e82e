//! National Fish Habitat Partnership habitat condition breakdown.

use biogeography_bap_models::chart::{
    Axis, ChartConfig, ChartDatum, ChartKind, ChartSpec, ChartTitle, Margins, TickFormat, Tooltip,
    with_commas,
};
use biogeography_map_models::Feature;

use crate::AnalysisError;
use crate::metrics::{field, require_properties, round1};

pub const CHART_ID: &str = "NFHP_HorizontalBarChart";

/// Risk classes in severity order with their property names and colors.
const RISK_CLASSES: &[(&str, &str, &str)] = &[
    ("Very high", "veryhigh_km", "#FF0000"),
    ("High", "high_km", "#FFAA00"),
    ("Moderate", "moderate_km", "#A3FF73"),
    ("Low", "low_km", "#00C5FF"),
    ("Very low", "verylow_km", "#C500FF"),
];

/// Builds the risk chart from a condition response.
///
/// Each class is charted as the percent of scored stream kilometers,
/// rounded to one decimal, listed from very low to very high.
///
/// # Errors
///
/// Returns [`AnalysisError`] if the response has no hits or a kilometer
/// field is missing.
#[allow(clippy::cast_possible_truncation)]
pub fn charts(
    feature: Option<&Feature>,
    raw: &serde_json::Value,
) -> Result<Vec<ChartSpec>, AnalysisError> {
    let properties = require_properties(raw)?;
    let scored_km = field(properties, "scored_km")?;
    let not_scored_km = field(properties, "not_scored_km")?;
    let place_name = properties
        .get("place_name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    let mut data = RISK_CLASSES
        .iter()
        .map(|(label, name, color)| {
            Ok(ChartDatum {
                label: (*label).to_string(),
                value: percent(field(properties, name)?, scored_km),
                color: Some((*color).to_string()),
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;
    data.reverse();

    let feature_name = feature.map(Feature::name).unwrap_or_default();
    let subtitle = format!(
        "Fish habitat condition was scored on {} of {} NHDPlusV1 stream kilometers within {place_name}",
        with_commas(scored_km.round() as i64),
        with_commas((scored_km + not_scored_km).round() as i64),
    );

    Ok(vec![ChartSpec {
        id: CHART_ID.to_string(),
        kind: ChartKind::HorizontalBar,
        config: ChartConfig {
            margins: Margins {
                left: 100.0,
                right: 20.0,
                top: 20.0,
                bottom: 70.0,
            },
            chart: ChartTitle {
                title: format!("Risk to Fish Habitat Degradation {feature_name}"),
                subtitle,
            },
            x_axis: Axis {
                key: "Percent".to_string(),
                label: "NFHP Scored Stream Kilometers [%]".to_string(),
                ticks: 5,
                tick_format: TickFormat::Percent,
            },
            y_axis: Axis {
                key: "Risk".to_string(),
                label: "Risk To Fish Habitat Degradation".to_string(),
                ticks: 5,
                tick_format: TickFormat::Identity,
            },
            tooltip: Tooltip::new("<p>{label}: {value}%</p>"),
        },
        data,
    }])
}

fn percent(value: f64, scored_km: f64) -> f64 {
    if scored_km == 0.0 {
        return 0.0;
    }
    round1(value / scored_km * 100.0)
}

#[cfg(test)]
mod tests {
    use biogeography_map_models::FeatureProperties;

    use super::*;

    fn response() -> serde_json::Value {
        serde_json::json!({
            "hits": { "hits": [{ "_source": { "properties": {
                "place_name": "Larimer County, Colorado",
                "scored_km": "3000",
                "not_scored_km": 1234.4,
                "veryhigh_km": 300,
                "high_km": 600,
                "moderate_km": 900,
                "low_km": 1000,
                "verylow_km": 200
            } } }] }
        })
    }

    fn feature() -> Feature {
        Feature {
            geometry: None,
            properties: FeatureProperties {
                feature_id: "US_County:08069".to_string(),
                feature_name: "Larimer County".to_string(),
                ..FeatureProperties::default()
            },
        }
    }

    #[test]
    fn percentages_are_reversed_with_fixed_colors() {
        let charts = charts(Some(&feature()), &response()).unwrap();
        let chart = &charts[0];
        assert_eq!(chart.id, CHART_ID);

        let rows: Vec<(&str, f64, &str)> = chart
            .data
            .iter()
            .map(|d| (d.label.as_str(), d.value, d.color.as_deref().unwrap()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Very low", 6.7, "#C500FF"),
                ("Low", 33.3, "#00C5FF"),
                ("Moderate", 30.0, "#A3FF73"),
                ("High", 20.0, "#FFAA00"),
                ("Very high", 10.0, "#FF0000"),
            ]
        );
    }

    #[test]
    fn titles_use_feature_and_thousands_separators() {
        let chart = &charts(Some(&feature()), &response()).unwrap()[0];
        assert_eq!(
            chart.config.chart.title,
            "Risk to Fish Habitat Degradation Larimer County"
        );
        assert_eq!(
            chart.config.chart.subtitle,
            "Fish habitat condition was scored on 3,000 of 4,234 NHDPlusV1 stream kilometers \
             within Larimer County, Colorado"
        );
        assert_eq!(chart.config.x_axis.tick_format.format(42.9), "42%");
    }

    #[test]
    fn empty_hits_fail() {
        let empty = serde_json::json!({ "hits": { "hits": [] } });
        assert!(charts(Some(&feature()), &empty).is_err());
    }
}
