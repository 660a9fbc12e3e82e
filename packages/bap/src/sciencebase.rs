//! `ScienceBase` catalog client.
//!
//! See <https://www.sciencebase.gov/catalog/>

use biogeography_bap_models::sciencebase::SbItem;
use reqwest::header::{CACHE_CONTROL, HeaderValue};

use crate::BapError;

/// Catalog JSON URL for an item.
#[must_use]
pub fn item_url(base_url: &str, item_id: &str) -> String {
    format!(
        "{}/catalog/item/{item_id}?format=json",
        base_url.trim_end_matches('/')
    )
}

/// Fetches a catalog item.
///
/// Layer metadata is requested with `no_store` so stale descriptions are
/// never served from an intermediate cache.
///
/// # Errors
///
/// Returns [`BapError`] if the HTTP request fails, the catalog answers
/// with a non-success status or the body is not a catalog item.
pub async fn fetch_item(
    client: &reqwest::Client,
    base_url: &str,
    item_id: &str,
    no_store: bool,
) -> Result<SbItem, BapError> {
    let url = item_url(base_url, item_id);
    log::debug!("Fetching ScienceBase item {url}");

    let mut request = client.get(&url);
    if no_store {
        request = request.header(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
    let resp = request.send().await?;

    if !resp.status().is_success() {
        return Err(BapError::Response {
            message: format!("ScienceBase returned {} for {item_id}", resp.status()),
        });
    }

    let body: serde_json::Value = resp.json().await?;
    parse_item(body)
}

/// Parses a catalog response body.
///
/// # Errors
///
/// Returns [`BapError`] if the body is not a JSON object.
pub fn parse_item(body: serde_json::Value) -> Result<SbItem, BapError> {
    if !body.is_object() {
        return Err(BapError::Response {
            message: "ScienceBase item is not an object".to_string(),
        });
    }
    Ok(serde_json::from_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_item_url() {
        assert_eq!(
            item_url("https://www.sciencebase.gov/", "5aa2b21ae4b0b1c392e9d968"),
            "https://www.sciencebase.gov/catalog/item/5aa2b21ae4b0b1c392e9d968?format=json"
        );
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(parse_item(serde_json::json!([])).is_err());
        let item = parse_item(serde_json::json!({ "title": "NFHP" })).unwrap();
        assert_eq!(item.title, "NFHP");
    }
}
