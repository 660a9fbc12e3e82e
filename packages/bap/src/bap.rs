//! The shared wrapper around a concrete analysis panel.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use biogeography_bap_models::chart::ChartData;
use biogeography_bap_models::print::PrintNode;
use biogeography_bap_models::sciencebase::SbItem;
use biogeography_bap_models::{BapId, EnabledLayer, LayerSpec, SharedBapState};
use biogeography_map_models::{Feature, LayerKey, MapLayer, Point};

use crate::json_view;
use crate::panel::{AnalysisPanel, ApiEndpoints, PrintContext};
use crate::popup::InfoPopup;
use crate::{BapError, ERROR_NOTICE};

/// One entry of a package's layer checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub spec: LayerSpec,
    pub checked: bool,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// `ScienceBase` metadata for the layer's info popup, once loaded.
    pub sb_item: Option<SbItem>,
}

impl Layer {
    #[must_use]
    pub fn new(spec: LayerSpec) -> Self {
        let opacity = spec.opacity.clamp(0.0, 1.0);
        Self {
            spec,
            checked: false,
            opacity,
            sb_item: None,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.spec.title
    }

    /// The overlay handle handed to the map view.
    #[must_use]
    pub fn to_map_layer(&self, bap_id: &BapId) -> MapLayer {
        MapLayer {
            key: LayerKey {
                bap_id: bap_id.to_string(),
                title: self.spec.title.clone(),
            },
            service: self.spec.service.clone(),
            opacity: self.opacity,
            time_enabled: self.spec.time_enabled,
        }
    }
}

/// Notifications a [`Bap`] produces for its container.
#[derive(Debug, Clone, PartialEq)]
pub enum BapEvent {
    /// The package wants to become the priority package.
    PriorityRequested(BapId),
    /// The package's currently checked layers.
    AnalysisLayers { bap: BapId, layers: Vec<MapLayer> },
    /// Opacity changed on a checked layer.
    LayerOpacity(MapLayer),
    /// Fresh shared state snapshot for persistence.
    ShareState { bap: BapId, state: SharedBapState },
}

/// Which metadata a `ScienceBase` request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataTarget {
    /// The package's own description.
    Package,
    /// The layer with this title.
    Layer(String),
}

/// A pending `ScienceBase` metadata request.
#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub bap_id: BapId,
    pub target: MetadataTarget,
    pub item_id: String,
    /// Layer metadata is requested with `Cache-Control: no-store`.
    pub no_store: bool,
}

impl MetadataRequest {
    /// Performs the request.
    pub async fn execute(
        self,
        client: &reqwest::Client,
        endpoints: &ApiEndpoints,
    ) -> MetadataOutcome {
        let result = crate::sciencebase::fetch_item(
            client,
            &endpoints.sciencebase,
            &self.item_id,
            self.no_store,
        )
        .await;
        MetadataOutcome {
            bap_id: self.bap_id,
            target: self.target,
            result,
        }
    }
}

/// Result of a [`MetadataRequest`].
#[derive(Debug)]
pub struct MetadataOutcome {
    pub bap_id: BapId,
    pub target: MetadataTarget,
    pub result: Result<SbItem, BapError>,
}

/// A metric fetch tagged with the selection it was started for.
pub struct FetchTicket {
    pub bap_id: BapId,
    pub key: String,
    feature: Option<Feature>,
    point: Option<Point>,
    panel: Arc<dyn AnalysisPanel>,
}

impl fmt::Debug for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTicket")
            .field("bap_id", &self.bap_id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl FetchTicket {
    /// Runs the panel's metric fetch.
    pub async fn execute(
        self,
        client: &reqwest::Client,
        endpoints: &ApiEndpoints,
    ) -> FetchOutcome {
        log::debug!("Fetching metrics for {} ({})", self.bap_id, self.key);
        let result = self
            .panel
            .fetch_data(client, endpoints, self.feature.as_ref(), self.point)
            .await;
        FetchOutcome {
            bap_id: self.bap_id,
            key: self.key,
            result,
        }
    }
}

/// Result of a [`FetchTicket`].
#[derive(Debug)]
pub struct FetchOutcome {
    pub bap_id: BapId,
    pub key: String,
    pub result: Result<Option<serde_json::Value>, BapError>,
}

/// A concrete panel wrapped with the shared package behavior.
pub struct Bap {
    id: BapId,
    panel: Arc<dyn AnalysisPanel>,
    sb_item: SbItem,
    error: Option<String>,
    layers: Vec<Layer>,
    disable_multiple_layers: bool,
    is_open: bool,
    can_open: bool,
    is_enabled: bool,
    mounted: bool,
    initialized: bool,
    loading: bool,
    layers_open: bool,
    bap_window_open: bool,
    json_window_open: bool,
    pretty_json: bool,
    info_popup_open: bool,
    layer_info_popups: BTreeSet<String>,
    json_data: Option<serde_json::Value>,
    charts: ChartData,
    share_extra: serde_json::Map<String, serde_json::Value>,
    feature: Option<Feature>,
    point: Option<Point>,
    fetch_key: Option<String>,
    year: Option<i32>,
}

impl fmt::Debug for Bap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bap")
            .field("id", &self.id)
            .field("is_open", &self.is_open)
            .field("can_open", &self.can_open)
            .field("initialized", &self.initialized)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

impl Bap {
    #[must_use]
    pub fn new(panel: Arc<dyn AnalysisPanel>) -> Self {
        let definition = panel.definition();
        Self {
            id: definition.id.clone(),
            sb_item: SbItem::placeholder(&definition.title),
            layers: definition.layers.iter().cloned().map(Layer::new).collect(),
            disable_multiple_layers: definition.disable_multiple_layers,
            year: definition.years.map(|range| range.start),
            panel,
            error: None,
            is_open: false,
            can_open: false,
            is_enabled: true,
            mounted: false,
            initialized: false,
            loading: false,
            layers_open: true,
            bap_window_open: false,
            json_window_open: false,
            pretty_json: false,
            info_popup_open: false,
            layer_info_popups: BTreeSet::new(),
            json_data: None,
            charts: ChartData::NoData,
            share_extra: serde_json::Map::new(),
            feature: None,
            point: None,
            fetch_key: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &BapId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.sb_item.title
    }

    #[must_use]
    pub const fn sb_item(&self) -> &SbItem {
        &self.sb_item
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub const fn charts(&self) -> &ChartData {
        &self.charts
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub const fn can_open(&self) -> bool {
        self.can_open
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn layers_open(&self) -> bool {
        self.layers_open
    }

    #[must_use]
    pub const fn bap_window_open(&self) -> bool {
        self.bap_window_open
    }

    #[must_use]
    pub const fn json_window_open(&self) -> bool {
        self.json_window_open
    }

    #[must_use]
    pub const fn json_data(&self) -> Option<&serde_json::Value> {
        self.json_data.as_ref()
    }

    /// The feature the next fetch will be made for.
    #[must_use]
    pub const fn selected_feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    /// Selected year of a time-enabled package.
    #[must_use]
    pub const fn year(&self) -> Option<i32> {
        self.year
    }

    /// Raw error message of the last failed fetch.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// User-facing notice to render when the last fetch failed.
    #[must_use]
    pub const fn error_notice(&self) -> Option<&'static str> {
        if self.error.is_some() {
            Some(ERROR_NOTICE)
        } else {
            None
        }
    }

    /// Layers currently checked.
    pub fn on_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.checked)
    }

    fn on_map_layers(&self) -> Vec<MapLayer> {
        self.on_layers().map(|l| l.to_map_layer(&self.id)).collect()
    }

    fn is_priority(&self, priority: Option<&BapId>) -> bool {
        priority == Some(&self.id)
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Mounts the package, optionally restoring a persisted snapshot.
    pub fn mount(
        &mut self,
        priority: Option<&BapId>,
        init: Option<&SharedBapState>,
    ) -> Vec<BapEvent> {
        self.mounted = true;
        self.is_open = self.is_priority(priority);
        init.map_or_else(Vec::new, |init| self.restore(init, priority))
    }

    /// Unmounts the package; printing returns nothing afterwards.
    pub const fn unmount(&mut self) {
        self.mounted = false;
    }

    /// Signals that the startup load has settled.
    ///
    /// Feature and priority changes are ignored until this is called so a
    /// package does not react to its own startup layer restore.
    pub fn complete_initialization(&mut self) {
        log::debug!("{} initialized", self.id);
        self.initialized = true;
    }

    /// Applies a persisted snapshot.
    ///
    /// Enabled layers are only restored when this package is priority.
    pub fn restore(&mut self, init: &SharedBapState, priority: Option<&BapId>) -> Vec<BapEvent> {
        self.is_open = init.is_open;
        self.share_extra.clone_from(&init.extra);
        if let (Some(range), Some(year)) = (
            self.panel.definition().years,
            init.extra.get("year").and_then(serde_json::Value::as_i64),
        ) {
            self.year = i32::try_from(year).ok().map(|year| range.clamp(year));
        }

        let mut events = Vec::new();
        if !self.is_priority(priority) {
            return events;
        }
        let Some(enabled) = &init.enabled_layers else {
            return events;
        };

        let titles: Vec<(String, f64)> = self
            .layers
            .iter()
            .filter_map(|layer| {
                enabled
                    .iter()
                    .find(|e| e.title == layer.spec.title)
                    .map(|e| (layer.spec.title.clone(), e.opacity))
            })
            .collect();
        for (title, opacity) in titles {
            events.extend(self.toggle_layer(Some(&title), Some(opacity), priority));
        }
        events
    }

    // ── Open / close ───────────────────────────────────────────────────

    /// Toggles the panel open or closed.
    ///
    /// Only allowed once the panel has data. Opening a non-priority
    /// package requests priority.
    pub fn toggle_dropdown(&mut self, priority: Option<&BapId>) -> Vec<BapEvent> {
        if !self.can_open {
            return Vec::new();
        }
        let mut events = Vec::new();
        if !self.is_open && !self.is_priority(priority) {
            events.push(BapEvent::PriorityRequested(self.id.clone()));
        }
        self.is_open = !self.is_open;
        events.push(self.share_event(priority));
        events
    }

    /// Records whether the panel has data to show; losing it closes the
    /// panel.
    pub fn set_can_open(&mut self, can_open: bool) {
        if !can_open && self.is_open {
            log::debug!("{} closed: no longer has data", self.id);
            self.is_open = false;
        }
        self.can_open = can_open;
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }

    pub const fn toggle_layers_open(&mut self) {
        self.layers_open = !self.layers_open;
    }

    pub const fn toggle_bap_window(&mut self) {
        self.bap_window_open = !self.bap_window_open;
    }

    /// Toggles the raw JSON window. Only opens while JSON is cached.
    pub const fn toggle_json_window(&mut self) {
        if self.json_window_open || self.json_data.is_some() {
            self.json_window_open = !self.json_window_open;
        }
    }

    pub const fn toggle_pretty_json(&mut self) {
        self.pretty_json = !self.pretty_json;
    }

    // ── Layers ─────────────────────────────────────────────────────────

    /// Toggles a layer on or off.
    ///
    /// `None`, an unknown title or a disabled layer clears every layer; the
    /// cleared set is only reported when this package is priority. Toggling
    /// a real layer requests priority when needed and always reports the
    /// checked set.
    pub fn toggle_layer(
        &mut self,
        title: Option<&str>,
        opacity: Option<f64>,
        priority: Option<&BapId>,
    ) -> Vec<BapEvent> {
        let target = title.and_then(|title| {
            self.layers
                .iter()
                .position(|l| l.spec.title == title && !l.spec.disabled)
        });

        let mut events = Vec::new();
        let Some(index) = target else {
            for layer in &mut self.layers {
                layer.checked = false;
            }
            if self.is_priority(priority) {
                events.push(BapEvent::AnalysisLayers {
                    bap: self.id.clone(),
                    layers: Vec::new(),
                });
            }
            return events;
        };

        for (i, layer) in self.layers.iter_mut().enumerate() {
            if i == index {
                layer.checked = !layer.checked;
                if let Some(opacity) = opacity {
                    layer.opacity = opacity.clamp(0.0, 1.0);
                }
            } else if self.disable_multiple_layers {
                layer.checked = false;
            }
        }

        if !self.is_priority(priority) {
            events.push(BapEvent::PriorityRequested(self.id.clone()));
        }
        events.push(BapEvent::AnalysisLayers {
            bap: self.id.clone(),
            layers: self.on_map_layers(),
        });
        events.push(self.share_event(priority));
        events
    }

    /// Sets a layer's opacity; clamped to `0.0..=1.0`.
    pub fn set_opacity(
        &mut self,
        title: &str,
        opacity: f64,
        priority: Option<&BapId>,
    ) -> Vec<BapEvent> {
        let Some(layer) = self.layers.iter_mut().find(|l| l.spec.title == title) else {
            return Vec::new();
        };
        layer.opacity = opacity.clamp(0.0, 1.0);

        let mut events = Vec::new();
        if layer.checked {
            events.push(BapEvent::LayerOpacity(layer.to_map_layer(&self.id)));
        }
        events.push(self.share_event(priority));
        events
    }

    /// Selects the year shown by time-enabled layers, clamped to the
    /// package's range. Checked layers are re-reported so the map reloads
    /// them for the new year.
    pub fn set_year(&mut self, year: i32, priority: Option<&BapId>) -> Vec<BapEvent> {
        let Some(range) = self.panel.definition().years else {
            return Vec::new();
        };
        let year = range.clamp(year);
        if self.year == Some(year) {
            return Vec::new();
        }
        log::debug!("{} year set to {year}", self.id);
        self.year = Some(year);
        self.share_extra
            .insert("year".to_string(), serde_json::Value::from(year));

        let mut events = Vec::new();
        if self.is_priority(priority) && self.on_layers().next().is_some() {
            events.push(BapEvent::AnalysisLayers {
                bap: self.id.clone(),
                layers: self.on_map_layers(),
            });
        }
        events.push(self.share_event(priority));
        events
    }

    // ── External changes ───────────────────────────────────────────────

    /// Reacts to the container's priority package changing.
    ///
    /// Losing priority force-clears the layers and closes the panel without
    /// requesting priority back. Gaining it turns on the first layer when
    /// none is on and opens the panel.
    pub fn on_priority_changed(&mut self, priority: Option<&BapId>) -> Vec<BapEvent> {
        if !self.initialized {
            return Vec::new();
        }
        if !self.is_priority(priority) {
            let events = self.toggle_layer(None, None, priority);
            self.is_open = false;
            return events;
        }

        let mut events = Vec::new();
        if self.on_layers().next().is_none()
            && let Some(first) = self.layers.first().map(|l| l.spec.title.clone())
        {
            events.extend(self.toggle_layer(Some(&first), None, priority));
        }
        self.is_open = true;
        events
    }

    /// Reacts to a new selected feature.
    ///
    /// After initialization the cached JSON is dropped and an open panel is
    /// force-closed. The feature is always recorded for the next fetch.
    pub fn on_feature_changed(&mut self, feature: Option<Feature>) {
        if let Some(feature) = &feature {
            self.is_enabled = self.panel.applies_to(feature);
        }
        self.feature = feature;

        if !self.initialized {
            return;
        }
        self.json_data = None;
        self.json_window_open = false;
        if self.is_open {
            log::debug!("{} closed: feature changed", self.id);
            self.is_open = false;
        }
    }

    /// Records the clicked point for panels keyed on it.
    pub const fn on_point_changed(&mut self, point: Option<Point>) {
        self.point = point;
    }

    // ── Fetching ───────────────────────────────────────────────────────

    /// Starts a metric fetch when the selection key changed since the last
    /// request.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let key = self.panel.fetch_key(self.feature.as_ref(), self.point)?;
        if self.fetch_key.as_deref() == Some(key.as_str()) {
            return None;
        }
        self.fetch_key = Some(key.clone());
        self.loading = true;
        Some(FetchTicket {
            bap_id: self.id.clone(),
            key,
            feature: self.feature.clone(),
            point: self.point,
            panel: Arc::clone(&self.panel),
        })
    }

    /// Applies a finished metric fetch.
    ///
    /// Results for a selection other than the latest requested one, or
    /// other than the one selected now, are dropped. Empty or failed results
    /// reset the charts to no data, make the panel unable to open and clear
    /// its layers.
    pub fn complete_fetch(
        &mut self,
        outcome: FetchOutcome,
        priority: Option<&BapId>,
    ) -> Vec<BapEvent> {
        let current = self.panel.fetch_key(self.feature.as_ref(), self.point);
        let requested = self.fetch_key.as_deref() == Some(outcome.key.as_str());
        let selected = current.as_deref() == Some(outcome.key.as_str());
        if outcome.bap_id != self.id || !requested || !selected {
            log::warn!(
                "{} discarding stale response for {} (current: {current:?})",
                self.id,
                outcome.key,
            );
            return Vec::new();
        }
        self.loading = false;

        match outcome.result {
            Ok(Some(raw)) => {
                self.error = None;
                self.charts = self.panel.render_charts(self.feature.as_ref(), &raw);
                self.json_data = Some(raw);
                if self.charts.has_data() {
                    self.set_can_open(true);
                    return Vec::new();
                }
                self.clear_for_no_data(priority)
            }
            Ok(None) => {
                log::info!("{} has no data for {}", self.id, outcome.key);
                self.error = None;
                self.json_data = None;
                self.clear_for_no_data(priority)
            }
            Err(e) => {
                log::error!("{} fetch failed for {}: {e}", self.id, outcome.key);
                self.error = Some(e.to_string());
                self.json_data = None;
                self.clear_for_no_data(priority)
            }
        }
    }

    fn clear_for_no_data(&mut self, priority: Option<&BapId>) -> Vec<BapEvent> {
        self.charts = ChartData::NoData;
        self.set_can_open(false);
        self.toggle_layer(None, None, priority)
    }

    /// `ScienceBase` requests for the package and each documented layer.
    #[must_use]
    pub fn metadata_requests(&self) -> Vec<MetadataRequest> {
        let package = self
            .panel
            .definition()
            .sb_item
            .iter()
            .map(|item_id| MetadataRequest {
                bap_id: self.id.clone(),
                target: MetadataTarget::Package,
                item_id: item_id.clone(),
                no_store: false,
            });
        let layers = self.layers.iter().filter_map(|layer| {
            layer.spec.sb_item.as_ref().map(|item_id| MetadataRequest {
                bap_id: self.id.clone(),
                target: MetadataTarget::Layer(layer.spec.title.clone()),
                item_id: item_id.clone(),
                no_store: true,
            })
        });
        package.chain(layers).collect()
    }

    /// Applies a finished metadata request. Failures are recorded and
    /// logged; the placeholder metadata stays in place.
    pub fn apply_metadata(&mut self, outcome: MetadataOutcome) {
        if outcome.bap_id != self.id {
            return;
        }
        let item = match outcome.result {
            Ok(item) => item,
            Err(e) => {
                log::error!("{} metadata load failed: {e}", self.id);
                self.error = Some(e.to_string());
                return;
            }
        };
        match outcome.target {
            MetadataTarget::Package => self.sb_item = item,
            MetadataTarget::Layer(title) => {
                if let Some(layer) = self.layers.iter_mut().find(|l| l.spec.title == title) {
                    layer.sb_item = Some(item);
                }
            }
        }
    }

    // ── Shared state ───────────────────────────────────────────────────

    /// Snapshot of the package's UI state. Enabled layers are included only
    /// when this package is priority.
    #[must_use]
    pub fn share_state(&self, priority: Option<&BapId>) -> SharedBapState {
        let enabled_layers = self.is_priority(priority).then(|| {
            self.on_layers()
                .map(|l| EnabledLayer {
                    title: l.spec.title.clone(),
                    opacity: l.opacity,
                })
                .collect()
        });
        SharedBapState {
            is_open: self.is_open,
            enabled_layers,
            extra: self.share_extra.clone(),
        }
    }

    /// Merges panel-specific fields into the snapshot and publishes it.
    pub fn set_share_fields(
        &mut self,
        fields: serde_json::Map<String, serde_json::Value>,
        priority: Option<&BapId>,
    ) -> Vec<BapEvent> {
        self.share_extra.extend(fields);
        vec![self.share_event(priority)]
    }

    fn share_event(&self, priority: Option<&BapId>) -> BapEvent {
        BapEvent::ShareState {
            bap: self.id.clone(),
            state: self.share_state(priority),
        }
    }

    // ── Popups and JSON ────────────────────────────────────────────────

    pub const fn toggle_info_popup(&mut self) {
        self.info_popup_open = !self.info_popup_open;
    }

    /// The package info popup, when open.
    #[must_use]
    pub fn info_popup(&self) -> Option<InfoPopup> {
        self.info_popup_open
            .then(|| InfoPopup::for_package(&self.sb_item))
    }

    pub fn toggle_layer_info_popup(&mut self, title: &str) {
        if !self.layer_info_popups.remove(title) {
            self.layer_info_popups.insert(title.to_string());
        }
    }

    /// A layer's info popup, when open.
    #[must_use]
    pub fn layer_info_popup(&self, title: &str) -> Option<InfoPopup> {
        if !self.layer_info_popups.contains(title) {
            return None;
        }
        self.layers
            .iter()
            .find(|l| l.spec.title == title)
            .map(InfoPopup::for_layer)
    }

    /// Cached JSON as text, compact or pretty-printed per the window toggle.
    #[must_use]
    pub fn raw_json(&self) -> Option<String> {
        self.json_data
            .as_ref()
            .map(|data| json_view::to_text(data, self.pretty_json))
    }

    /// Pretty-printed cached JSON with syntax highlighting spans.
    #[must_use]
    pub fn highlighted_json(&self) -> Option<String> {
        self.json_data.as_ref().map(json_view::highlight)
    }

    /// Data URL for downloading the cached JSON.
    #[must_use]
    pub fn json_download_link(&self) -> Option<String> {
        self.json_data.as_ref().map(json_view::download_link)
    }

    // ── Print ──────────────────────────────────────────────────────────

    /// Print content of the wrapped panel; empty when not mounted.
    #[must_use]
    pub fn print(&self) -> Vec<PrintNode> {
        if !self.mounted {
            return Vec::new();
        }
        self.panel.export_print(&PrintContext {
            bap_id: &self.id,
            sb_item: &self.sb_item,
            charts: &self.charts,
            feature: self.feature.as_ref(),
        })
    }
}
