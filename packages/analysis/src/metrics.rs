//! BIS metric endpoint client and response helpers.
//!
//! Metric endpoints answer with an Elasticsearch-style envelope; the
//! package data is the `properties` object of the first hit's `_source`.

use biogeography_bap::BapError;
use biogeography_map_models::{Feature, Point};

use crate::AnalysisError;
use crate::config::{FetchKey, MetricConfig};

impl MetricConfig {
    /// Query parameters for the selection, or `None` when the selection
    /// does not provide what the package is keyed on.
    #[must_use]
    pub fn query(
        &self,
        feature: Option<&Feature>,
        point: Option<Point>,
    ) -> Option<Vec<(&'static str, String)>> {
        match self.keyed_on {
            FetchKey::Feature => feature.map(|f| vec![("feature_id", f.id().to_string())]),
            FetchKey::Point => point.map(|p| {
                vec![("lat", p.lat.to_string()), ("lng", p.lng.to_string())]
            }),
        }
    }

    /// Key identifying the selection the package shows data for.
    #[must_use]
    pub fn key(&self, feature: Option<&Feature>, point: Option<Point>) -> Option<String> {
        match self.keyed_on {
            FetchKey::Feature => feature.map(|f| f.id().to_string()),
            FetchKey::Point => point.map(|p| format!("{},{}", p.lat, p.lng)),
        }
    }

    /// Fetches the metric response for the selection.
    ///
    /// Returns `Ok(None)` when nothing selected matches the key or the
    /// response has no hits.
    ///
    /// # Errors
    ///
    /// Returns [`BapError`] if the HTTP request fails, the service answers
    /// with a non-success status or the body is not JSON.
    pub async fn fetch(
        &self,
        client: &reqwest::Client,
        bis_api: &str,
        feature: Option<&Feature>,
        point: Option<Point>,
    ) -> Result<Option<serde_json::Value>, BapError> {
        let Some(query) = self.query(feature, point) else {
            return Ok(None);
        };
        let url = format!("{}{}", bis_api.trim_end_matches('/'), self.path);

        let resp = client.get(&url).query(&query).send().await?;
        if !resp.status().is_success() {
            return Err(BapError::Response {
                message: format!("{url} returned {}", resp.status()),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        if first_properties(&body).is_none() {
            log::debug!("No hits from {url}");
            return Ok(None);
        }
        Ok(Some(body))
    }
}

/// `hits.hits[0]._source.properties` of a metric response.
#[must_use]
pub fn first_properties(
    body: &serde_json::Value,
) -> Option<&serde_json::Map<String, serde_json::Value>> {
    body.pointer("/hits/hits/0/_source/properties")?.as_object()
}

/// Like [`first_properties`], failing when absent.
///
/// # Errors
///
/// Returns [`AnalysisError::Response`] if the response has no hits.
pub fn require_properties(
    body: &serde_json::Value,
) -> Result<&serde_json::Map<String, serde_json::Value>, AnalysisError> {
    first_properties(body).ok_or_else(|| AnalysisError::Response {
        message: "no hits in metric response".to_string(),
    })
}

/// Reads a number that may be encoded as a JSON number or a numeric string.
#[must_use]
pub fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a numeric field from a properties object.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingField`] if the field is absent or not
/// numeric.
pub fn field(
    properties: &serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Result<f64, AnalysisError> {
    properties
        .get(name)
        .and_then(number)
        .ok_or_else(|| AnalysisError::MissingField {
            field: name.to_string(),
        })
}

/// Rounds to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
