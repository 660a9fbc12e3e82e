//! The map view state machine.

use biogeography_map_models::crs::tag_epsg_4326;
use biogeography_map_models::{BasemapState, Bounds, Feature, MapLayer, OverlayService, Point};
use geojson::Geometry;

use crate::bounds::{feature_bounds, geometry_bounds};
use crate::surface::MapSurface;
use crate::upload::parse_upload;
use crate::version::{UNKNOWN_VERSION, fetch_api_version};

/// What the map reports to its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A map click, or the synthetic click at the centre of a feature
    /// selected without clicking (search, deep link).
    Click { point: Point, synthetic: bool },
    /// Polygon input started (`None`) or produced a tagged geometry.
    Draw(Option<Geometry>),
}

/// Polygon input progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing,
    Drawn,
}

/// State of the upload dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDialog {
    pub open: bool,
    pub uploading: bool,
    /// Message of the last rejected upload.
    pub error: Option<String>,
}

/// Decides what the [`MapSurface`] shows.
pub struct MapView {
    surface: Box<dyn MapSurface>,
    basemap: BasemapState,
    bounds: Bounds,
    point: Option<Point>,
    location: Option<Point>,
    attached: Vec<MapLayer>,
    overlay: Option<OverlayService>,
    draw_state: DrawState,
    drawn_polygon: Option<Geometry>,
    clickable: bool,
    tile_error: bool,
    api_version: String,
    upload: UploadDialog,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("bounds", &self.bounds)
            .field("point", &self.point)
            .field("attached", &self.attached.len())
            .field("draw_state", &self.draw_state)
            .field("clickable", &self.clickable)
            .finish_non_exhaustive()
    }
}

impl MapView {
    /// Creates the view and fits the surface to the contiguous US.
    #[must_use]
    pub fn new(mut surface: Box<dyn MapSurface>, basemap: BasemapState) -> Self {
        let bounds = Bounds::CONTIGUOUS_US;
        surface.fit_bounds(bounds);
        surface.set_basemap(basemap.get().as_ref());
        Self {
            surface,
            basemap,
            bounds,
            point: None,
            location: None,
            attached: Vec::new(),
            overlay: None,
            draw_state: DrawState::Idle,
            drawn_polygon: None,
            clickable: true,
            tile_error: false,
            api_version: String::new(),
            upload: UploadDialog::default(),
        }
    }

    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Where the click marker is.
    #[must_use]
    pub const fn point(&self) -> Option<Point> {
        self.point
    }

    /// Location readout under the cursor.
    #[must_use]
    pub const fn location(&self) -> Option<Point> {
        self.location
    }

    #[must_use]
    pub fn attached_layers(&self) -> &[MapLayer] {
        &self.attached
    }

    #[must_use]
    pub const fn overlay(&self) -> Option<&OverlayService> {
        self.overlay.as_ref()
    }

    #[must_use]
    pub const fn draw_state(&self) -> DrawState {
        self.draw_state
    }

    #[must_use]
    pub const fn drawn_polygon(&self) -> Option<&Geometry> {
        self.drawn_polygon.as_ref()
    }

    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.clickable
    }

    #[must_use]
    pub const fn has_tile_error(&self) -> bool {
        self.tile_error
    }

    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    #[must_use]
    pub const fn upload_dialog(&self) -> &UploadDialog {
        &self.upload
    }

    /// Fits the map to a newly selected feature.
    ///
    /// When the selection did not come from a map click, the marker moves
    /// to the centre of the feature and a synthetic click is reported so
    /// point-keyed packages still receive a location.
    pub fn set_feature(&mut self, feature: Option<&Feature>, click_driven: bool) -> Vec<MapEvent> {
        let Some(geometry) = feature.and_then(|f| f.geometry.as_ref()) else {
            return Vec::new();
        };
        let Some(extent) = geometry_bounds(geometry) else {
            log::warn!("Selected feature has no usable extent");
            return Vec::new();
        };
        if let Some(bounds) = feature_bounds(geometry) {
            self.bounds = bounds;
            self.surface.fit_bounds(bounds);
        }

        if click_driven {
            return Vec::new();
        }
        let center = extent.center();
        self.set_point(Some(center));
        vec![MapEvent::Click {
            point: center,
            synthetic: true,
        }]
    }

    /// Replaces the attached analysis layers. Every previously attached
    /// layer is removed before the new set is added.
    pub fn set_analysis_layers(&mut self, layers: &[MapLayer], year: Option<i32>) {
        for old in self.attached.drain(..) {
            self.surface.remove_layer(&old.key);
        }
        let time = year.map(|y| format!("{y}-01-01"));
        for layer in layers {
            let layer_time = if layer.time_enabled {
                time.as_deref()
            } else {
                None
            };
            self.surface.add_layer(layer, layer_time);
        }
        self.attached = layers.to_vec();
        log::debug!("Map shows {} analysis layers", self.attached.len());
    }

    /// Applies an opacity change to an attached layer.
    pub fn set_layer_opacity(&mut self, layer: &MapLayer) {
        if let Some(attached) = self.attached.iter_mut().find(|l| l.key == layer.key) {
            attached.opacity = layer.opacity;
            self.surface.set_layer_opacity(&layer.key, layer.opacity);
        }
    }

    /// Replaces the extra overlay.
    pub fn set_overlay(&mut self, overlay: Option<OverlayService>) {
        if self.overlay.is_some() {
            self.surface.set_overlay(None);
        }
        if overlay.is_some() {
            self.surface.set_overlay(overlay.as_ref());
        }
        self.overlay = overlay;
    }

    /// Handles a map click. Ignored while dragging is disabled.
    pub fn on_click(&mut self, point: Point) -> Vec<MapEvent> {
        if !self.clickable {
            return Vec::new();
        }
        self.set_point(Some(point));
        self.clear_drawn_polygon();
        vec![MapEvent::Click {
            point,
            synthetic: false,
        }]
    }

    pub fn on_mouse_move(&mut self, point: Point) {
        self.location = self.clickable.then_some(point);
    }

    pub fn on_mouse_out(&mut self) {
        self.location = None;
    }

    /// Records a failed tile load. Only the first failure is logged.
    pub fn on_tile_error(&mut self, url: &str) {
        if !self.tile_error {
            log::warn!("Error loading map tiles from {url}");
        }
        self.tile_error = true;
    }

    /// Starts polygon input: hides the marker, removes any drawn polygon
    /// and disables dragging.
    pub fn start_draw(&mut self) -> Vec<MapEvent> {
        self.set_point(None);
        self.clear_drawn_polygon();
        self.set_clickable(false);
        self.draw_state = DrawState::Drawing;
        vec![MapEvent::Draw(None)]
    }

    /// Completes polygon input with the drawn geometry.
    pub fn finish_draw(&mut self, mut geometry: Geometry) -> Vec<MapEvent> {
        tag_epsg_4326(&mut geometry);
        self.surface.show_polygon(Some(&geometry));
        self.drawn_polygon = Some(geometry.clone());
        self.draw_state = DrawState::Drawn;
        vec![MapEvent::Draw(Some(geometry))]
    }

    /// Leaves draw mode, re-enabling dragging. A cancelled draw returns to
    /// idle.
    pub fn stop_draw(&mut self) {
        self.set_clickable(true);
        if self.draw_state == DrawState::Drawing {
            self.draw_state = DrawState::Idle;
        }
    }

    pub fn open_upload_dialog(&mut self) {
        self.upload.open = true;
    }

    pub fn close_upload_dialog(&mut self) {
        self.upload = UploadDialog::default();
    }

    /// Handles a selected upload file.
    ///
    /// On success the dialog closes, polygon input restarts, the map fits
    /// the uploaded extent and the tagged geometry is reported. On failure
    /// the map is untouched and the dialog shows the error.
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Vec<MapEvent> {
        self.upload.uploading = true;
        let geometry = match parse_upload(file_name, bytes) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Rejected upload {file_name}: {e}");
                self.upload.error = Some(e.to_string());
                self.upload.uploading = false;
                return Vec::new();
            }
        };

        self.close_upload_dialog();
        let mut events = self.start_draw();
        if let Some(extent) = geometry_bounds(&geometry) {
            self.surface.fit_bounds(extent);
        }
        self.set_clickable(true);
        self.draw_state = DrawState::Idle;
        events.push(MapEvent::Draw(Some(geometry)));
        events
    }

    /// Pushes the current basemap selection to the surface.
    pub fn render_basemap(&mut self) {
        self.surface.set_basemap(self.basemap.get().as_ref());
    }

    /// Looks up the BIS API version for the info panel.
    pub async fn load_api_version(&mut self, client: &reqwest::Client, bis_api: &str) {
        self.api_version = fetch_api_version(client, bis_api).await;
        if self.api_version == UNKNOWN_VERSION {
            log::debug!("API version unavailable");
        }
    }

    fn set_point(&mut self, point: Option<Point>) {
        self.point = point;
        self.surface.set_marker(point);
    }

    fn set_clickable(&mut self, clickable: bool) {
        self.clickable = clickable;
        self.surface.set_dragging(clickable);
    }

    fn clear_drawn_polygon(&mut self) {
        if self.drawn_polygon.take().is_some() {
            self.surface.show_polygon(None);
            self.draw_state = DrawState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use biogeography_map_models::crs::{EPSG_4326, crs_name};
    use biogeography_map_models::{Basemap, BasemapKind, FeatureProperties, LayerKey};

    use super::*;
    use crate::shp::tests::{SQUARE, polygon_shp};
    use crate::surface::{HeadlessSurface, SurfaceCall};
    use crate::upload::MAX_UPLOAD_BYTES;
    use crate::upload::tests::zip_of;

    /// Shares a [`HeadlessSurface`] between the view and the test.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<HeadlessSurface>>);

    impl Shared {
        fn take(&self) -> Vec<SurfaceCall> {
            self.0.lock().unwrap().take_calls()
        }
    }

    impl MapSurface for Shared {
        fn fit_bounds(&mut self, bounds: Bounds) {
            self.0.lock().unwrap().fit_bounds(bounds);
        }
        fn set_marker(&mut self, point: Option<Point>) {
            self.0.lock().unwrap().set_marker(point);
        }
        fn add_layer(&mut self, layer: &MapLayer, time: Option<&str>) {
            self.0.lock().unwrap().add_layer(layer, time);
        }
        fn remove_layer(&mut self, key: &LayerKey) {
            self.0.lock().unwrap().remove_layer(key);
        }
        fn set_layer_opacity(&mut self, key: &LayerKey, opacity: f64) {
            self.0.lock().unwrap().set_layer_opacity(key, opacity);
        }
        fn set_overlay(&mut self, overlay: Option<&OverlayService>) {
            self.0.lock().unwrap().set_overlay(overlay);
        }
        fn set_dragging(&mut self, enabled: bool) {
            self.0.lock().unwrap().set_dragging(enabled);
        }
        fn show_polygon(&mut self, geometry: Option<&Geometry>) {
            self.0.lock().unwrap().show_polygon(geometry);
        }
        fn set_basemap(&mut self, basemap: Option<&Basemap>) {
            self.0.lock().unwrap().set_basemap(basemap);
        }
    }

    fn view() -> (MapView, Shared) {
        let surface = Shared::default();
        let view = MapView::new(Box::new(surface.clone()), BasemapState::default());
        surface.take();
        (view, surface)
    }

    fn square() -> Geometry {
        Geometry::new(geojson::Value::Polygon(vec![vec![
            vec![-105.0, 40.0],
            vec![-104.0, 40.0],
            vec![-104.0, 41.0],
            vec![-105.0, 41.0],
            vec![-105.0, 40.0],
        ]]))
    }

    fn park() -> Feature {
        Feature {
            geometry: Some(square()),
            properties: FeatureProperties {
                feature_id: "USNationalParks_ROMO".to_string(),
                feature_name: "Rocky Mountain National Park".to_string(),
                ..FeatureProperties::default()
            },
        }
    }

    fn layer(title: &str, time_enabled: bool) -> MapLayer {
        MapLayer {
            key: LayerKey {
                bap_id: "bap10".to_string(),
                title: title.to_string(),
            },
            service: OverlayService::DynamicMapLayer {
                url: format!("https://maps.example.test/{title}/MapServer"),
            },
            opacity: 0.5,
            time_enabled,
        }
    }

    #[test]
    fn starts_at_contiguous_us() {
        let surface = Shared::default();
        let view = MapView::new(Box::new(surface.clone()), BasemapState::default());
        assert_eq!(view.bounds(), Bounds::CONTIGUOUS_US);
        assert_eq!(
            surface.take(),
            vec![
                SurfaceCall::FitBounds(Bounds::CONTIGUOUS_US),
                SurfaceCall::Basemap(None),
            ]
        );
    }

    #[test]
    fn searched_feature_fits_and_clicks_centre() {
        let (mut view, surface) = view();
        let events = view.set_feature(Some(&park()), false);
        let centre = Point::new(40.5, -104.5);
        assert_eq!(
            events,
            vec![MapEvent::Click {
                point: centre,
                synthetic: true
            }]
        );
        assert_eq!(view.point(), Some(centre));
        assert_eq!(view.bounds().corners(), [[39.5, -105.5], [41.5, -103.5]]);
        assert_eq!(
            surface.take(),
            vec![
                SurfaceCall::FitBounds(view.bounds()),
                SurfaceCall::Marker(Some(centre)),
            ]
        );
    }

    #[test]
    fn clicked_feature_only_fits() {
        let (mut view, _) = view();
        assert!(view.set_feature(Some(&park()), true).is_empty());
        assert!(view.point().is_none());
        assert!(view.set_feature(None, false).is_empty());
    }

    #[test]
    fn layers_are_removed_before_adding_with_time() {
        let (mut view, surface) = view();
        view.set_analysis_layers(&[layer("a", false)], Some(2001));
        surface.take();

        view.set_analysis_layers(&[layer("b", true), layer("c", false)], Some(2030));
        let calls = surface.take();
        assert_eq!(calls[0], SurfaceCall::RemoveLayer(layer("a", false).key));
        assert_eq!(
            calls[1],
            SurfaceCall::AddLayer {
                key: layer("b", true).key,
                opacity: 0.5,
                time: Some("2030-01-01".to_string()),
            }
        );
        assert!(matches!(&calls[2], SurfaceCall::AddLayer { time: None, .. }));
        assert_eq!(view.attached_layers().len(), 2);
    }

    #[test]
    fn opacity_only_reaches_attached_layers() {
        let (mut view, surface) = view();
        view.set_analysis_layers(&[layer("a", false)], None);
        surface.take();

        let mut faded = layer("a", false);
        faded.opacity = 0.2;
        view.set_layer_opacity(&faded);
        view.set_layer_opacity(&layer("missing", false));
        assert_eq!(
            surface.take(),
            vec![SurfaceCall::Opacity(faded.key.clone(), 0.2)]
        );
        assert!((view.attached_layers()[0].opacity - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn overlay_is_replaced() {
        let (mut view, surface) = view();
        let wms = |url: &str| OverlayService::WmsTileLayer {
            url: url.to_string(),
            layers: "x".to_string(),
            format: "image/png".to_string(),
            transparent: true,
        };
        view.set_overlay(Some(wms("https://one.test")));
        view.set_overlay(Some(wms("https://two.test")));
        view.set_overlay(None);
        assert_eq!(
            surface.take(),
            vec![
                SurfaceCall::Overlay(Some("https://one.test".to_string())),
                SurfaceCall::Overlay(None),
                SurfaceCall::Overlay(Some("https://two.test".to_string())),
                SurfaceCall::Overlay(None),
            ]
        );
        assert!(view.overlay().is_none());
    }

    #[test]
    fn draw_cycle_disables_clicks_until_stopped() {
        let (mut view, _) = view();
        view.on_click(Point::new(40.0, -105.0));

        assert_eq!(view.start_draw(), vec![MapEvent::Draw(None)]);
        assert_eq!(view.draw_state(), DrawState::Drawing);
        assert!(view.point().is_none());
        assert!(!view.is_clickable());
        assert!(view.on_click(Point::new(1.0, 1.0)).is_empty());

        let events = view.finish_draw(square());
        let [MapEvent::Draw(Some(geometry))] = events.as_slice() else {
            panic!("expected a drawn geometry, got {events:?}");
        };
        assert_eq!(crs_name(geometry), Some(EPSG_4326));
        assert_eq!(view.draw_state(), DrawState::Drawn);

        view.stop_draw();
        assert!(view.is_clickable());
        assert_eq!(view.draw_state(), DrawState::Drawn);
    }

    #[test]
    fn click_clears_drawn_polygon() {
        let (mut view, surface) = view();
        view.start_draw();
        view.finish_draw(square());
        view.stop_draw();
        surface.take();

        let point = Point::new(40.2, -104.9);
        let events = view.on_click(point);
        assert_eq!(
            events,
            vec![MapEvent::Click {
                point,
                synthetic: false
            }]
        );
        assert!(view.drawn_polygon().is_none());
        assert_eq!(view.draw_state(), DrawState::Idle);
        assert!(surface.take().contains(&SurfaceCall::Polygon(false)));
    }

    #[test]
    fn cancelled_draw_returns_to_idle() {
        let (mut view, _) = view();
        view.start_draw();
        view.stop_draw();
        assert_eq!(view.draw_state(), DrawState::Idle);
    }

    #[test]
    fn mouse_location_hidden_while_not_clickable() {
        let (mut view, _) = view();
        view.on_mouse_move(Point::new(40.0, -105.0));
        assert_eq!(view.location(), Some(Point::new(40.0, -105.0)));
        view.start_draw();
        view.on_mouse_move(Point::new(41.0, -105.0));
        assert!(view.location().is_none());
        view.stop_draw();
        view.on_mouse_move(Point::new(41.0, -105.0));
        view.on_mouse_out();
        assert!(view.location().is_none());
    }

    #[test]
    fn tile_errors_only_set_a_flag() {
        let (mut view, surface) = view();
        view.on_tile_error("https://tiles.test/1");
        view.on_tile_error("https://tiles.test/2");
        assert!(view.has_tile_error());
        assert!(surface.take().is_empty());
    }

    #[test]
    fn successful_upload_closes_dialog_and_reports_geometry() {
        let (mut view, surface) = view();
        view.open_upload_dialog();
        let body = serde_json::to_vec(&geojson::Feature::from(square())).unwrap();

        let events = view.upload("area.geojson", &body);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], MapEvent::Draw(None));
        assert!(matches!(&events[1], MapEvent::Draw(Some(g)) if crs_name(g) == Some(EPSG_4326)));
        assert_eq!(view.upload_dialog(), &UploadDialog::default());
        assert!(view.is_clickable());

        let calls = surface.take();
        let fits: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::FitBounds(_)))
            .collect();
        assert_eq!(fits.len(), 1);
        assert_eq!(calls.last(), Some(&SurfaceCall::Dragging(true)));
    }

    #[test]
    fn failed_upload_keeps_map_and_shows_error() {
        let (mut view, surface) = view();
        view.open_upload_dialog();
        assert!(view.upload("notes.txt", b"hello").is_empty());
        let dialog = view.upload_dialog();
        assert!(dialog.open);
        assert!(!dialog.uploading);
        assert_eq!(
            dialog.error.as_deref(),
            Some("Uploads of files with the extension txt are not supported.")
        );
        assert!(surface.take().is_empty());

        view.close_upload_dialog();
        assert_eq!(view.upload_dialog(), &UploadDialog::default());
    }

    #[test]
    fn zipped_shapefile_upload_fits_once_and_forwards_tagged_polygon() {
        let (mut view, surface) = view();
        view.open_upload_dialog();
        let bundle = zip_of(&[("area.shp", polygon_shp(&[SQUARE]))]);

        let events = view.upload("area.zip", &bundle);
        let drawn: Vec<&Geometry> = events
            .iter()
            .filter_map(|e| match e {
                MapEvent::Draw(Some(g)) => Some(g),
                _ => None,
            })
            .collect();
        assert_eq!(drawn.len(), 1);
        assert!(matches!(drawn[0].value, geojson::Value::Polygon(_)));
        assert_eq!(crs_name(drawn[0]), Some(EPSG_4326));
        assert_eq!(view.draw_state(), DrawState::Idle);

        let calls = surface.take();
        let fits: Vec<&SurfaceCall> = calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::FitBounds(_)))
            .collect();
        assert_eq!(fits.len(), 1);
        let SurfaceCall::FitBounds(extent) = fits[0] else {
            unreachable!();
        };
        assert!(extent.south_west.lat < 40.0 && extent.north_east.lat > 41.0);
    }

    #[test]
    fn oversized_upload_leaves_the_map_alone() {
        let (mut view, surface) = view();
        view.open_upload_dialog();
        let big = vec![b' '; MAX_UPLOAD_BYTES + 1];

        assert!(view.upload("area.geojson", &big).is_empty());
        assert_eq!(
            view.upload_dialog().error.as_deref(),
            Some("File size is greater than 5MB")
        );
        assert!(!view.upload_dialog().uploading);
        assert!(surface.take().is_empty());
    }

    #[test]
    fn renders_selected_basemap() {
        let surface = Shared::default();
        let basemap = BasemapState::default();
        let mut view = MapView::new(Box::new(surface.clone()), basemap.clone());
        surface.take();

        basemap.set(Some(Basemap {
            title: "Imagery".to_string(),
            service_url: "https://tiles.test/{z}/{y}/{x}".to_string(),
            attribution: String::new(),
            kind: BasemapKind::TileLayer,
            selected: true,
        }));
        view.render_basemap();
        assert_eq!(
            surface.take(),
            vec![SurfaceCall::Basemap(Some("Imagery".to_string()))]
        );
    }
}
