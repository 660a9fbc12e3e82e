//! The bioscape container.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use biogeography_analysis::REPORT_ORDER;
use biogeography_bap::{
    AnalysisPanel, ApiEndpoints, Bap, BapEvent, FetchOutcome, FetchTicket, MetadataOutcome,
    MetadataRequest,
};
use biogeography_bap_models::print::PrintNode;
use biogeography_bap_models::{BapId, PersistedState};
use biogeography_map_models::{Feature, MapLayer, Point};
use futures::future::join_all;

use crate::{AppConfig, BiogeographyError};

/// Every mounted analysis package plus the state they share.
#[derive(Debug)]
pub struct Biogeography {
    config: AppConfig,
    endpoints: ApiEndpoints,
    baps: BTreeMap<BapId, Bap>,
    priority: Option<BapId>,
    feature: Option<Feature>,
    point: Option<Point>,
    analysis_layers: Vec<MapLayer>,
    opacity_updates: Vec<MapLayer>,
    persisted: PersistedState,
}

impl Biogeography {
    /// Mounts the registered packages for the configured mode.
    #[must_use]
    pub fn with_registry(config: AppConfig, persisted: PersistedState) -> Self {
        let panels = biogeography_analysis::build_panels(config.dev_mode);
        Self::mount(config, panels, persisted)
    }

    /// Mounts the given panels and restores the persisted state.
    ///
    /// A persisted priority naming a package that is not mounted is
    /// dropped.
    #[must_use]
    pub fn mount(
        config: AppConfig,
        panels: Vec<Arc<dyn AnalysisPanel>>,
        persisted: PersistedState,
    ) -> Self {
        let baps: BTreeMap<BapId, Bap> = panels
            .into_iter()
            .map(|panel| {
                let bap = Bap::new(panel);
                (bap.id().clone(), bap)
            })
            .collect();

        let priority = persisted
            .priority_bap
            .clone()
            .filter(|id| baps.contains_key(id));
        if priority.is_none() && persisted.priority_bap.is_some() {
            log::warn!(
                "Ignoring persisted priority {:?}: not mounted",
                persisted.priority_bap
            );
        }

        let mut container = Self {
            endpoints: config.endpoints(),
            config,
            baps,
            priority,
            feature: None,
            point: None,
            analysis_layers: Vec::new(),
            opacity_updates: Vec::new(),
            persisted: PersistedState {
                priority_bap: None,
                baps: persisted.baps.clone(),
            },
        };
        container.persisted.priority_bap.clone_from(&container.priority);

        let mut events = Vec::new();
        for (id, bap) in &mut container.baps {
            events.extend(bap.mount(container.priority.as_ref(), persisted.baps.get(id)));
        }
        container.route(events);
        log::info!(
            "Mounted {} analysis packages (priority: {:?})",
            container.baps.len(),
            container.priority
        );
        container
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub const fn priority(&self) -> Option<&BapId> {
        self.priority.as_ref()
    }

    #[must_use]
    pub const fn feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    #[must_use]
    pub fn bap(&self, id: &BapId) -> Option<&Bap> {
        self.baps.get(id)
    }

    /// Mutable access for UI-only toggles (popups, windows, JSON view).
    pub fn bap_mut(&mut self, id: &BapId) -> Option<&mut Bap> {
        self.baps.get_mut(id)
    }

    pub fn baps(&self) -> impl Iterator<Item = &Bap> {
        self.baps.values()
    }

    /// Layers the map should show: those of the priority package.
    #[must_use]
    pub fn analysis_layers(&self) -> &[MapLayer] {
        &self.analysis_layers
    }

    /// Year the map shows time-enabled layers for.
    #[must_use]
    pub fn map_year(&self) -> Option<i32> {
        self.priority
            .as_ref()
            .and_then(|id| self.baps.get(id))
            .and_then(Bap::year)
    }

    /// Returns and clears opacity changes for layers on the map.
    pub fn take_opacity_updates(&mut self) -> Vec<MapLayer> {
        std::mem::take(&mut self.opacity_updates)
    }

    /// The package that opens by default for a feature. No package is
    /// opened by default.
    #[must_use]
    pub const fn default_priority_bap(&self, _feature: Option<&Feature>) -> Option<BapId> {
        None
    }

    /// The state to persist for deep-linking.
    #[must_use]
    pub const fn share(&self) -> &PersistedState {
        &self.persisted
    }

    // ── Startup ────────────────────────────────────────────────────────

    /// `ScienceBase` requests for every mounted package.
    #[must_use]
    pub fn metadata_requests(&self) -> Vec<MetadataRequest> {
        self.baps.values().flat_map(Bap::metadata_requests).collect()
    }

    pub fn apply_metadata(&mut self, outcome: MetadataOutcome) {
        if let Some(bap) = self.baps.get_mut(&outcome.bap_id) {
            bap.apply_metadata(outcome);
        }
    }

    /// Marks startup as settled for every package.
    pub fn complete_initialization(&mut self) {
        for bap in self.baps.values_mut() {
            bap.complete_initialization();
        }
    }

    /// Loads all package and layer metadata concurrently, then completes
    /// initialization. Individual failures stay with their package.
    pub async fn load_metadata(&mut self, client: &reqwest::Client) {
        let requests = self.metadata_requests();
        log::info!("Loading {} ScienceBase items", requests.len());
        let endpoints = self.endpoints.clone();
        let outcomes = join_all(
            requests
                .into_iter()
                .map(|request| request.execute(client, &endpoints)),
        )
        .await;
        for outcome in outcomes {
            self.apply_metadata(outcome);
        }
        self.complete_initialization();
    }

    // ── Selection ──────────────────────────────────────────────────────

    pub fn set_feature(&mut self, feature: Option<Feature>) {
        log::debug!(
            "Feature changed to {:?}",
            feature.as_ref().map(Feature::id)
        );
        for bap in self.baps.values_mut() {
            bap.on_feature_changed(feature.clone());
        }
        self.feature = feature;
    }

    pub fn set_point(&mut self, point: Option<Point>) {
        for bap in self.baps.values_mut() {
            bap.on_point_changed(point);
        }
        self.point = point;
    }

    // ── Fetching ───────────────────────────────────────────────────────

    /// Tickets for every package whose selection key changed.
    pub fn begin_fetches(&mut self) -> Vec<FetchTicket> {
        self.baps.values_mut().filter_map(Bap::begin_fetch).collect()
    }

    /// Applies a finished metric fetch.
    ///
    /// # Errors
    ///
    /// Returns [`BiogeographyError::UnknownBap`] if the outcome names a
    /// package that is not mounted.
    pub fn complete_fetch(&mut self, outcome: FetchOutcome) -> Result<(), BiogeographyError> {
        let bap = self
            .baps
            .get_mut(&outcome.bap_id)
            .ok_or_else(|| BiogeographyError::UnknownBap {
                id: outcome.bap_id.clone(),
            })?;
        let events = bap.complete_fetch(outcome, self.priority.as_ref());
        self.route(events);
        Ok(())
    }

    /// Runs every pending metric fetch concurrently and applies the
    /// results.
    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let tickets = self.begin_fetches();
        if tickets.is_empty() {
            return;
        }
        log::info!("Fetching metrics for {} packages", tickets.len());
        let endpoints = self.endpoints.clone();
        let outcomes = join_all(
            tickets
                .into_iter()
                .map(|ticket| ticket.execute(client, &endpoints)),
        )
        .await;
        for outcome in outcomes {
            if let Err(e) = self.complete_fetch(outcome) {
                log::warn!("Dropping fetch result: {e}");
            }
        }
    }

    // ── User actions ───────────────────────────────────────────────────

    fn with_bap(
        &mut self,
        id: &BapId,
        action: impl FnOnce(&mut Bap, Option<&BapId>) -> Vec<BapEvent>,
    ) -> Result<(), BiogeographyError> {
        let bap = self
            .baps
            .get_mut(id)
            .ok_or_else(|| BiogeographyError::UnknownBap { id: id.clone() })?;
        let events = action(bap, self.priority.as_ref());
        self.route(events);
        Ok(())
    }

    /// Toggles a package layer. `None` clears the package's layers.
    ///
    /// # Errors
    ///
    /// Returns [`BiogeographyError::UnknownBap`] if `id` is not mounted.
    pub fn toggle_layer(
        &mut self,
        id: &BapId,
        title: Option<&str>,
        opacity: Option<f64>,
    ) -> Result<(), BiogeographyError> {
        self.with_bap(id, |bap, priority| bap.toggle_layer(title, opacity, priority))
    }

    /// Opens or closes a package panel.
    ///
    /// # Errors
    ///
    /// Returns [`BiogeographyError::UnknownBap`] if `id` is not mounted.
    pub fn toggle_dropdown(&mut self, id: &BapId) -> Result<(), BiogeographyError> {
        self.with_bap(id, Bap::toggle_dropdown)
    }

    /// # Errors
    ///
    /// Returns [`BiogeographyError::UnknownBap`] if `id` is not mounted.
    pub fn set_opacity(
        &mut self,
        id: &BapId,
        title: &str,
        opacity: f64,
    ) -> Result<(), BiogeographyError> {
        self.with_bap(id, |bap, priority| bap.set_opacity(title, opacity, priority))
    }

    /// # Errors
    ///
    /// Returns [`BiogeographyError::UnknownBap`] if `id` is not mounted.
    pub fn set_year(&mut self, id: &BapId, year: i32) -> Result<(), BiogeographyError> {
        self.with_bap(id, |bap, priority| bap.set_year(year, priority))
    }

    /// Makes a package the priority package, or clears priority.
    ///
    /// The map's layer list is reset and then refilled by the new priority
    /// package; every other package drops its layers and closes.
    pub fn set_priority_bap(&mut self, id: Option<BapId>) {
        let id = id.filter(|id| {
            let mounted = self.baps.contains_key(id);
            if !mounted {
                log::warn!("Ignoring priority request for unmounted package {id}");
            }
            mounted
        });
        if id == self.priority {
            return;
        }
        log::debug!("Priority package changed to {id:?}");
        self.priority = id;
        self.persisted.priority_bap.clone_from(&self.priority);
        self.analysis_layers.clear();

        let mut events = Vec::new();
        for bap in self.baps.values_mut() {
            events.extend(bap.on_priority_changed(self.priority.as_ref()));
        }
        self.refresh_share_states();
        self.route(events);
    }

    fn refresh_share_states(&mut self) {
        for (id, bap) in &self.baps {
            if self.persisted.baps.contains_key(id) || self.priority.as_ref() == Some(id) {
                self.persisted
                    .baps
                    .insert(id.clone(), bap.share_state(self.priority.as_ref()));
            }
        }
    }

    /// Delivers package events in order. Priority requests are resolved
    /// before the events queued after them.
    fn route(&mut self, events: Vec<BapEvent>) {
        let mut queue: VecDeque<BapEvent> = events.into();
        while let Some(event) = queue.pop_front() {
            match event {
                BapEvent::PriorityRequested(id) => {
                    if self.priority.as_ref() == Some(&id) {
                        continue;
                    }
                    self.set_priority_bap(Some(id));
                }
                BapEvent::AnalysisLayers { bap, layers } => {
                    if self.priority.as_ref() == Some(&bap) {
                        self.analysis_layers = layers;
                    } else {
                        log::debug!("Ignoring layers from non-priority package {bap}");
                    }
                }
                BapEvent::LayerOpacity(layer) => {
                    if self
                        .priority
                        .as_ref()
                        .is_some_and(|p| p.as_str() == layer.key.bap_id)
                    {
                        self.opacity_updates.push(layer);
                    }
                }
                BapEvent::ShareState { bap, state } => {
                    // The snapshot may predate a priority change routed
                    // just before it.
                    let state = self
                        .baps
                        .get(&bap)
                        .map_or(state, |b| b.share_state(self.priority.as_ref()));
                    self.persisted.baps.insert(bap, state);
                }
            }
        }
    }

    // ── Report ─────────────────────────────────────────────────────────

    /// Print content of every package with something to print, in report
    /// order. Open, closed and toggled state do not matter.
    #[must_use]
    pub fn report(&self) -> Vec<Vec<PrintNode>> {
        REPORT_ORDER
            .iter()
            .filter_map(|id| self.baps.get(&BapId::new(*id)))
            .map(Bap::print)
            .filter(|nodes| !nodes.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use biogeography_bap_models::SharedBapState;
    use biogeography_bap_models::sciencebase::SbItem;
    use biogeography_map_models::FeatureProperties;

    use super::*;

    fn id(s: &str) -> BapId {
        BapId::new(s)
    }

    fn county() -> Feature {
        Feature {
            geometry: None,
            properties: FeatureProperties {
                feature_id: "US_County:08069".to_string(),
                feature_name: "Larimer County".to_string(),
                feature_class: "County".to_string(),
                state: None,
            },
        }
    }

    fn nfhp_response() -> serde_json::Value {
        serde_json::json!({
            "hits": { "hits": [{ "_source": { "properties": {
                "place_name": "Larimer County",
                "scored_km": 100, "not_scored_km": 0,
                "veryhigh_km": 10, "high_km": 20, "moderate_km": 30,
                "low_km": 30, "verylow_km": 10
            } } }] }
        })
    }

    fn protection_response() -> serde_json::Value {
        serde_json::json!({
            "hits": { "hits": [{ "_source": { "properties": {
                "status_1": 10, "status_2": 20, "status_3": 30, "status_4": 40
            } } }] }
        })
    }

    fn mounted(persisted: PersistedState) -> Biogeography {
        let mut container = Biogeography::with_registry(AppConfig::default(), persisted);
        container.complete_initialization();
        container
    }

    /// Selects the county and answers every package's fetch from `respond`.
    fn select_county(
        container: &mut Biogeography,
        respond: impl Fn(&BapId) -> Option<serde_json::Value>,
    ) {
        container.set_feature(Some(county()));
        for ticket in container.begin_fetches() {
            let result = Ok(respond(&ticket.bap_id));
            container
                .complete_fetch(FetchOutcome {
                    bap_id: ticket.bap_id.clone(),
                    key: ticket.key.clone(),
                    result,
                })
                .unwrap();
        }
    }

    fn answers(bap: &BapId) -> Option<serde_json::Value> {
        match bap.as_str() {
            "bap4" => Some(nfhp_response()),
            "bap5" => Some(protection_response()),
            _ => None,
        }
    }

    #[test]
    fn mounts_registry_without_dev_packages() {
        let container = mounted(PersistedState::default());
        assert_eq!(container.baps().count(), 9);
        assert!(container.bap(&id("bap10")).is_none());
        assert!(container.priority().is_none());
        assert!(container.default_priority_bap(Some(&county())).is_none());

        let dev = Biogeography::with_registry(
            AppConfig {
                dev_mode: true,
                ..AppConfig::default()
            },
            PersistedState::default(),
        );
        assert!(dev.bap(&id("bap10")).is_some());
    }

    #[test]
    fn toggling_a_layer_takes_priority_and_feeds_the_map() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);

        container
            .toggle_layer(&id("bap4"), Some("Risk to Fish Habitat Degradation"), None)
            .unwrap();
        assert_eq!(container.priority(), Some(&id("bap4")));
        assert_eq!(container.analysis_layers().len(), 1);
        assert_eq!(container.analysis_layers()[0].key.bap_id, "bap4");
        assert!(container.bap(&id("bap4")).unwrap().is_open());

        let share = container.share();
        assert_eq!(share.priority_bap, Some(id("bap4")));
        assert_eq!(
            share.baps[&id("bap4")].enabled_layers.as_ref().unwrap()[0].title,
            "Risk to Fish Habitat Degradation"
        );
    }

    #[test]
    fn new_priority_clears_the_previous_packages_layers() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);

        container
            .toggle_layer(&id("bap4"), Some("Risk to Fish Habitat Degradation"), None)
            .unwrap();
        container
            .toggle_layer(&id("bap5"), Some("PAD-US 2 Protection Status"), None)
            .unwrap();

        assert_eq!(container.priority(), Some(&id("bap5")));
        let owners: Vec<&str> = container
            .analysis_layers()
            .iter()
            .map(|l| l.key.bap_id.as_str())
            .collect();
        assert_eq!(owners, vec!["bap5"]);

        let nfhp = container.bap(&id("bap4")).unwrap();
        assert!(!nfhp.is_open());
        assert_eq!(nfhp.on_layers().count(), 0);
        assert!(container.share().baps[&id("bap4")].enabled_layers.is_none());
    }

    #[test]
    fn opening_a_package_enables_its_first_layer() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);

        container.toggle_dropdown(&id("bap5")).unwrap();
        assert_eq!(container.priority(), Some(&id("bap5")));
        assert_eq!(
            container.analysis_layers()[0].key.title,
            "PAD-US 2 Protection Status"
        );
    }

    #[test]
    fn packages_without_data_cannot_open() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);

        container.toggle_dropdown(&id("bap1")).unwrap();
        assert!(container.priority().is_none());
        assert!(!container.bap(&id("bap1")).unwrap().is_open());
    }

    #[test]
    fn clearing_priority_empties_the_map() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);
        container.toggle_dropdown(&id("bap4")).unwrap();
        assert!(!container.analysis_layers().is_empty());

        container.set_priority_bap(None);
        assert!(container.analysis_layers().is_empty());
        assert!(container.share().priority_bap.is_none());
        assert!(!container.bap(&id("bap4")).unwrap().is_open());
    }

    #[test]
    fn opacity_updates_only_for_priority_layers() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);
        container.toggle_dropdown(&id("bap4")).unwrap();

        container
            .set_opacity(&id("bap4"), "Risk to Fish Habitat Degradation", 1.7)
            .unwrap();
        let updates = container.take_opacity_updates();
        assert_eq!(updates.len(), 1);
        assert!((updates[0].opacity - 1.0).abs() < f64::EPSILON);
        assert!(container.take_opacity_updates().is_empty());

        container
            .set_opacity(&id("bap5"), "PAD-US 2 Protection Status", 0.3)
            .unwrap();
        assert!(container.take_opacity_updates().is_empty());
    }

    #[test]
    fn restores_persisted_priority_and_layers() {
        let mut baps = BTreeMap::new();
        let state: SharedBapState = serde_json::from_value(serde_json::json!({
            "isOpen": true,
            "enabledLayers": [{ "t": "GAP Land Cover Ecological Systems", "o": 0.4 }]
        }))
        .unwrap();
        baps.insert(id("bap5"), state);
        let container = mounted(PersistedState {
            priority_bap: Some(id("bap5")),
            baps,
        });

        assert_eq!(container.priority(), Some(&id("bap5")));
        assert_eq!(container.analysis_layers().len(), 1);
        let layer = &container.analysis_layers()[0];
        assert_eq!(layer.key.title, "GAP Land Cover Ecological Systems");
        assert!((layer.opacity - 0.4).abs() < f64::EPSILON);
        assert!(container.bap(&id("bap5")).unwrap().is_open());
    }

    #[test]
    fn unmounted_persisted_priority_is_dropped() {
        let container = mounted(PersistedState {
            priority_bap: Some(id("bap10")),
            baps: BTreeMap::new(),
        });
        assert!(container.priority().is_none());
        assert!(container.share().priority_bap.is_none());
    }

    #[test]
    fn unknown_package_is_an_error() {
        let mut container = mounted(PersistedState::default());
        let err = container.toggle_dropdown(&id("bap99")).unwrap_err();
        assert!(matches!(err, BiogeographyError::UnknownBap { .. }));
    }

    #[test]
    fn report_lists_packages_with_data_in_order() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);

        let report = container.report();
        assert_eq!(report.len(), 2);
        let titles: Vec<String> = report
            .iter()
            .map(|nodes| match &nodes[0] {
                PrintNode::Text(t) => t.plain_text(),
                other => panic!("expected a title, got {other:?}"),
            })
            .collect();
        assert!(titles[0].starts_with("Ecosystem Protection"), "{titles:?}");
        assert!(titles[1].starts_with("Fish Habitat"), "{titles:?}");
    }

    #[test]
    fn feature_change_refetches_only_on_new_identifier() {
        let mut container = mounted(PersistedState::default());
        select_county(&mut container, answers);
        assert!(container.begin_fetches().is_empty());

        container.set_feature(Some(county()));
        assert!(container.begin_fetches().is_empty());

        let mut park = county();
        park.properties.feature_id = "USNationalParks_ROMO".to_string();
        container.set_feature(Some(park));
        assert!(!container.begin_fetches().is_empty());
    }

    #[test]
    fn metadata_applies_to_the_named_package() {
        let mut container = mounted(PersistedState::default());
        let request = container
            .metadata_requests()
            .into_iter()
            .find(|r| r.bap_id == id("bap4"))
            .unwrap();
        container.apply_metadata(MetadataOutcome {
            bap_id: request.bap_id,
            target: request.target,
            result: Ok(SbItem::placeholder("NFHP Habitat Condition")),
        });
        assert_eq!(
            container.bap(&id("bap4")).unwrap().title(),
            "NFHP Habitat Condition"
        );
    }
}
