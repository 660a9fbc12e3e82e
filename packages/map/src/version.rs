//! BIS API version lookup shown in the map's info panel.

/// Shown when the version cannot be determined.
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

#[must_use]
pub fn version_url(bis_api: &str) -> String {
    format!("{}/api", bis_api.trim_end_matches('/'))
}

/// Reads the `Version` member of the API root response.
#[must_use]
pub fn parse_version(body: &serde_json::Value) -> Option<String> {
    match body.get("Version")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

async fn request_version(
    client: &reqwest::Client,
    bis_api: &str,
) -> Result<Option<String>, reqwest::Error> {
    let body: serde_json::Value = client
        .get(version_url(bis_api))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(parse_version(&body))
}

/// Fetches the API version, falling back to [`UNKNOWN_VERSION`] on any
/// failure.
pub async fn fetch_api_version(client: &reqwest::Client, bis_api: &str) -> String {
    match request_version(client, bis_api).await {
        Ok(Some(version)) => version,
        Ok(None) => {
            log::warn!("API root response has no Version");
            UNKNOWN_VERSION.to_string()
        }
        Err(e) => {
            log::warn!("Failed to fetch API version: {e}");
            UNKNOWN_VERSION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_and_numeric_versions() {
        let body = serde_json::json!({ "Version": "1.4.2", "Name": "BIS" });
        assert_eq!(parse_version(&body).as_deref(), Some("1.4.2"));
        assert_eq!(
            parse_version(&serde_json::json!({ "Version": 2 })).as_deref(),
            Some("2")
        );
        assert_eq!(parse_version(&serde_json::json!({})), None);
    }

    #[test]
    fn builds_url_without_double_slash() {
        assert_eq!(
            version_url("https://api.example.test/"),
            "https://api.example.test/api"
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_unknown() {
        let client = reqwest::Client::new();
        let version = fetch_api_version(&client, "http://127.0.0.1:9").await;
        assert_eq!(version, UNKNOWN_VERSION);
    }
}
