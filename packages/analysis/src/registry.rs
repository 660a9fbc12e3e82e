//! Compile-time registry of analysis packages.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new package requires creating a TOML file in `baps/` and adding
//! a corresponding entry here. Entries are listed in report order.

use std::sync::Arc;

use biogeography_bap::AnalysisPanel;

use crate::config::PanelConfig;
use crate::panel::MetricPanel;

/// Number of registered packages. Enforced by a test.
#[cfg(test)]
const EXPECTED_PACKAGE_COUNT: usize = 10;

/// Embedded TOML package definitions.
const PACKAGE_TOMLS: &[(&str, &str)] = &[
    ("bap5", include_str!("../baps/bap5.toml")),
    ("bap6", include_str!("../baps/bap6.toml")),
    ("bap11", include_str!("../baps/bap11.toml")),
    ("bap12", include_str!("../baps/bap12.toml")),
    ("bap1", include_str!("../baps/bap1.toml")),
    ("bap2", include_str!("../baps/bap2.toml")),
    ("bap3", include_str!("../baps/bap3.toml")),
    ("bap4", include_str!("../baps/bap4.toml")),
    ("bap8", include_str!("../baps/bap8.toml")),
    ("bap10", include_str!("../baps/bap10.toml")),
];

/// Order packages appear in the printed report.
pub const REPORT_ORDER: &[&str] = &[
    "bap5", "bap6", "bap11", "bap12", "bap1", "bap2", "bap3", "bap4", "bap8", "bap10",
];

/// Returns all registered package definitions.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn all_configs() -> Vec<PanelConfig> {
    PACKAGE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse analysis package '{name}': {e}"))
        })
        .collect()
}

/// Builds the panels to mount. Dev-only packages are included only in dev
/// mode.
#[must_use]
pub fn build_panels(dev_mode: bool) -> Vec<Arc<dyn AnalysisPanel>> {
    all_configs()
        .into_iter()
        .filter(|config| dev_mode || !config.bap.dev_only)
        .map(|config| {
            log::debug!("Registering analysis package {}", config.bap.id);
            Arc::new(MetricPanel::new(config)) as Arc<dyn AnalysisPanel>
        })
        .collect()
}
