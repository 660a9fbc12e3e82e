//! Application configuration read from the environment.

use biogeography_bap::ApiEndpoints;

const DEFAULT_BIS_API: &str = "https://api.sciencebase.gov/bis-api";
const DEFAULT_SCIENCEBASE: &str = "https://www.sciencebase.gov";

/// Service locations and feature switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// BIS API root (`BIS_API_URL`).
    pub bis_api: String,
    /// `ScienceBase` catalog root (`SCIENCEBASE_URL`).
    pub sciencebase: String,
    /// Dev mode (`BIOGEOGRAPHY_DEV`) mounts dev-only packages and enables
    /// polygon upload.
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bis_api: DEFAULT_BIS_API.to_string(),
            sciencebase: DEFAULT_SCIENCEBASE.to_string(),
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from environment variables, falling back to
    /// the public service locations.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let url = |key: &str, default: String| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map_or(default, |v| v.trim().trim_end_matches('/').to_string())
        };
        Self {
            bis_api: url("BIS_API_URL", defaults.bis_api),
            sciencebase: url("SCIENCEBASE_URL", defaults.sciencebase),
            dev_mode: lookup("BIOGEOGRAPHY_DEV").is_some_and(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes"
                )
            }),
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            bis_api: self.bis_api.clone(),
            sciencebase: self.sciencebase.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(from(&[]), AppConfig::default());
    }

    #[test]
    fn reads_overrides_and_trims_slashes() {
        let config = from(&[
            ("BIS_API_URL", "http://localhost:8080/"),
            ("SCIENCEBASE_URL", "  "),
            ("BIOGEOGRAPHY_DEV", "TRUE"),
        ]);
        assert_eq!(config.bis_api, "http://localhost:8080");
        assert_eq!(config.sciencebase, DEFAULT_SCIENCEBASE);
        assert!(config.dev_mode);
        assert!(!from(&[("BIOGEOGRAPHY_DEV", "0")]).dev_mode);
    }
}
