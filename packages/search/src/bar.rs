//! Search bar state.

use biogeography_map_models::{Basemap, BasemapState, FeatureProperties};

use crate::{Location, SearchHandler};

/// Text shown for a search result: `"{name}, {state} ({class})"`, without
/// the state part when the feature has none.
#[must_use]
pub fn result_label(result: &FeatureProperties) -> String {
    let state = result
        .state
        .as_ref()
        .map(|s| format!(", {}", s.name))
        .unwrap_or_default();
    format!(
        "{}{state} ({})",
        result.feature_name, result.feature_class
    )
}

/// A radio option in the basemap settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasemapOption {
    pub basemap: Basemap,
    pub selected: bool,
}

#[derive(Debug)]
pub struct SearchBar {
    text: String,
    focused: bool,
    results: Vec<FeatureProperties>,
    settings_open: bool,
    help_visible: bool,
    basemap: BasemapState,
    basemap_options: Vec<BasemapOption>,
}

impl SearchBar {
    /// Creates the search bar for a bioscape's basemaps.
    ///
    /// The option matching the current [`BasemapState`] selection is
    /// pre-marked. The first-run help popup is shown only when no package
    /// state was restored.
    #[must_use]
    pub fn new(basemaps: Vec<Basemap>, basemap: BasemapState, has_restored_baps: bool) -> Self {
        let current = basemap.get();
        let basemap_options = basemaps
            .into_iter()
            .map(|b| {
                let selected = current.as_ref().map_or(b.selected, |current| {
                    current.service_url == b.service_url
                });
                BasemapOption {
                    basemap: b,
                    selected,
                }
            })
            .collect();
        Self {
            text: String::new(),
            focused: false,
            results: Vec::new(),
            settings_open: false,
            help_visible: !has_restored_baps,
            basemap,
            basemap_options,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    #[must_use]
    pub const fn is_settings_open(&self) -> bool {
        self.settings_open
    }

    #[must_use]
    pub const fn is_help_visible(&self) -> bool {
        self.help_visible
    }

    #[must_use]
    pub fn basemap_options(&self) -> &[BasemapOption] {
        &self.basemap_options
    }

    pub fn on_key_up(&mut self, text: &str, handler: &mut dyn SearchHandler) {
        text.clone_into(&mut self.text);
        handler.text_search(text);
    }

    pub fn set_results(&mut self, results: Vec<FeatureProperties>) {
        self.results = results;
    }

    /// Results to list. Nothing is listed unless the input has focus.
    #[must_use]
    pub fn visible_results(&self) -> &[FeatureProperties] {
        if self.focused {
            &self.results
        } else {
            &[]
        }
    }

    /// Submits the result at `index` of the visible list. Returns whether
    /// anything was submitted.
    pub fn select(&self, index: usize, handler: &mut dyn SearchHandler) -> bool {
        let Some(result) = self.visible_results().get(index) else {
            return false;
        };
        log::debug!("Selected search result {}", result.feature_id);
        handler.submit(result);
        true
    }

    pub const fn on_focus(&mut self) {
        self.focused = true;
    }

    /// Losing focus also clears the input text.
    pub fn on_blur(&mut self) {
        self.focused = false;
        self.text.clear();
    }

    /// A map click moves focus to the input so nearby results show.
    pub const fn on_map_clicked(&mut self) {
        self.focused = true;
    }

    pub const fn toggle_settings(&mut self) {
        self.settings_open = !self.settings_open;
    }

    /// Any click or key press on the page hides the help popup.
    pub const fn dismiss_help(&mut self) {
        self.help_visible = false;
    }

    /// Picks the basemap option at `index`. Picking the selected option
    /// again deselects it, leaving no basemap.
    pub fn select_basemap(&mut self, index: usize) {
        let Some(option) = self.basemap_options.get(index) else {
            return;
        };
        let choice = (!option.selected).then(|| option.basemap.clone());
        for (i, option) in self.basemap_options.iter_mut().enumerate() {
            option.selected = choice.is_some() && i == index;
        }
        // Keeps the input from grabbing focus after the radio click.
        self.focused = false;
        self.basemap.set(choice);
    }

    /// Clears the deep-link fragment and reloads the application.
    pub fn reset(&self, location: &mut dyn Location) {
        log::info!("Resetting map state");
        location.set_hash("");
        location.reload();
    }
}

#[cfg(test)]
mod tests {
    use biogeography_map_models::{BasemapKind, StateRef};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        searches: Vec<String>,
        submitted: Vec<String>,
    }

    impl SearchHandler for Recorder {
        fn text_search(&mut self, text: &str) {
            self.searches.push(text.to_string());
        }

        fn submit(&mut self, result: &FeatureProperties) {
            self.submitted.push(result.feature_id.clone());
        }
    }

    #[derive(Default)]
    struct FakeLocation {
        hash: Option<String>,
        reloads: usize,
    }

    impl Location for FakeLocation {
        fn set_hash(&mut self, hash: &str) {
            self.hash = Some(hash.to_string());
        }

        fn reload(&mut self) {
            self.reloads += 1;
        }
    }

    fn basemap(title: &str) -> Basemap {
        Basemap {
            title: title.to_string(),
            service_url: format!("https://tiles.example.test/{title}"),
            attribution: String::new(),
            kind: BasemapKind::TileLayer,
            selected: false,
        }
    }

    fn park() -> FeatureProperties {
        FeatureProperties {
            feature_id: "USNationalParks_ROMO".to_string(),
            feature_name: "Rocky Mountain National Park".to_string(),
            feature_class: "National Park".to_string(),
            state: Some(StateRef {
                name: "Colorado".to_string(),
            }),
        }
    }

    fn bar() -> SearchBar {
        SearchBar::new(
            vec![basemap("Imagery"), basemap("Topo")],
            BasemapState::default(),
            false,
        )
    }

    #[test]
    fn labels_results_with_optional_state() {
        assert_eq!(
            result_label(&park()),
            "Rocky Mountain National Park, Colorado (National Park)"
        );
        let ocean = FeatureProperties {
            state: None,
            feature_class: "Ocean Area".to_string(),
            feature_name: "Gulf of Maine".to_string(),
            ..park()
        };
        assert_eq!(result_label(&ocean), "Gulf of Maine (Ocean Area)");
    }

    #[test]
    fn results_show_only_while_focused() {
        let mut bar = bar();
        let mut handler = Recorder::default();
        bar.on_key_up("rocky", &mut handler);
        assert_eq!(handler.searches, vec!["rocky"]);

        bar.set_results(vec![park()]);
        assert!(bar.visible_results().is_empty());
        assert!(!bar.select(0, &mut handler));

        bar.on_focus();
        assert_eq!(bar.visible_results().len(), 1);
        assert!(bar.select(0, &mut handler));
        assert_eq!(handler.submitted, vec!["USNationalParks_ROMO"]);

        bar.on_blur();
        assert!(bar.visible_results().is_empty());
        assert_eq!(bar.text(), "");
    }

    #[test]
    fn map_click_focuses_input() {
        let mut bar = bar();
        bar.on_map_clicked();
        assert!(bar.is_focused());
    }

    #[test]
    fn preselects_current_basemap() {
        let state = BasemapState::new(Some(basemap("Topo")));
        let bar = SearchBar::new(vec![basemap("Imagery"), basemap("Topo")], state, true);
        let selected: Vec<bool> = bar.basemap_options().iter().map(|o| o.selected).collect();
        assert_eq!(selected, vec![false, true]);
        assert!(!bar.is_help_visible());
    }

    #[test]
    fn selecting_basemap_writes_state_and_allows_deselect() {
        let state = BasemapState::default();
        let mut bar = SearchBar::new(
            vec![basemap("Imagery"), basemap("Topo")],
            state.clone(),
            false,
        );
        bar.on_focus();

        bar.select_basemap(0);
        assert_eq!(state.get().unwrap().title, "Imagery");
        assert!(!bar.is_focused());

        bar.select_basemap(1);
        assert_eq!(state.get().unwrap().title, "Topo");
        assert!(!bar.basemap_options()[0].selected);

        bar.select_basemap(1);
        assert!(state.get().is_none());
        assert!(bar.basemap_options().iter().all(|o| !o.selected));
    }

    #[test]
    fn help_popup_on_first_run_until_dismissed() {
        let mut bar = bar();
        assert!(bar.is_help_visible());
        bar.dismiss_help();
        assert!(!bar.is_help_visible());
    }

    #[test]
    fn settings_toggle_and_reset() {
        let mut bar = bar();
        bar.toggle_settings();
        assert!(bar.is_settings_open());
        bar.toggle_settings();
        assert!(!bar.is_settings_open());

        let mut location = FakeLocation::default();
        bar.reset(&mut location);
        assert_eq!(location.hash.as_deref(), Some(""));
        assert_eq!(location.reloads, 1);
    }
}
