//! BIS places text search.

use biogeography_map_models::FeatureProperties;

use crate::SearchError;

/// Searches places by name against the BIS API.
#[derive(Debug, Clone)]
pub struct FeatureSearchClient {
    client: reqwest::Client,
    bis_api: String,
}

impl FeatureSearchClient {
    #[must_use]
    pub fn new(client: reqwest::Client, bis_api: &str) -> Self {
        Self {
            client,
            bis_api: bis_api.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}/api/v1/places/search/text", self.bis_api)
    }

    /// Returns places whose name matches `text`. Blank input returns no
    /// results without a request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails or the response is not
    /// a search envelope.
    pub async fn search(&self, text: &str) -> Result<Vec<FeatureProperties>, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!("Searching places for {text:?}");
        let resp = self
            .client
            .get(self.search_url())
            .query(&[("q", text)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SearchError::Parse {
                message: format!("places search returned {}", resp.status()),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Reads `hits.hits[]._source.properties` from a search response.
/// Hits without usable properties are skipped.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the response has no hit list.
pub fn parse_response(body: &serde_json::Value) -> Result<Vec<FeatureProperties>, SearchError> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| SearchError::Parse {
            message: "places response has no hits".to_string(),
        })?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let properties = hit.pointer("/_source/properties")?;
            match serde_json::from_value::<FeatureProperties>(properties.clone()) {
                Ok(p) => Some(p),
                Err(e) => {
                    log::warn!("Skipping malformed search hit: {e}");
                    None
                }
            }
        })
        .collect())
}
