//! The rendering seam between [`crate::MapView`] and a real map library.

use biogeography_map_models::{Basemap, Bounds, LayerKey, MapLayer, OverlayService, Point};
use geojson::Geometry;

/// Operations the map view performs on the rendered map.
///
/// Calls arrive in the order they must be applied. Within one layer update
/// every removal precedes every addition.
pub trait MapSurface: Send {
    fn fit_bounds(&mut self, bounds: Bounds);

    /// Moves the click marker, or hides it with `None`.
    fn set_marker(&mut self, point: Option<Point>);

    /// Attaches an analysis layer. `time` is the `YYYY-01-01` dimension
    /// value for time-enabled layers.
    fn add_layer(&mut self, layer: &MapLayer, time: Option<&str>);

    fn remove_layer(&mut self, key: &LayerKey);

    fn set_layer_opacity(&mut self, key: &LayerKey, opacity: f64);

    /// Replaces the single extra overlay.
    fn set_overlay(&mut self, overlay: Option<&OverlayService>);

    /// Enables or disables map panning.
    fn set_dragging(&mut self, enabled: bool);

    /// Shows a drawn polygon, or removes it with `None`.
    fn show_polygon(&mut self, geometry: Option<&Geometry>);

    fn set_basemap(&mut self, basemap: Option<&Basemap>);
}

/// One recorded [`MapSurface`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    FitBounds(Bounds),
    Marker(Option<Point>),
    AddLayer {
        key: LayerKey,
        opacity: f64,
        time: Option<String>,
    },
    RemoveLayer(LayerKey),
    Opacity(LayerKey, f64),
    Overlay(Option<String>),
    Dragging(bool),
    Polygon(bool),
    Basemap(Option<String>),
}

/// A surface that draws nothing and records every call.
///
/// Used by the command-line driver and by tests to observe what a real map
/// would have been told to do.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    calls: Vec<SurfaceCall>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Returns and clears the recorded calls.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }
}

impl MapSurface for HeadlessSurface {
    fn fit_bounds(&mut self, bounds: Bounds) {
        self.calls.push(SurfaceCall::FitBounds(bounds));
    }

    fn set_marker(&mut self, point: Option<Point>) {
        self.calls.push(SurfaceCall::Marker(point));
    }

    fn add_layer(&mut self, layer: &MapLayer, time: Option<&str>) {
        self.calls.push(SurfaceCall::AddLayer {
            key: layer.key.clone(),
            opacity: layer.opacity,
            time: time.map(str::to_string),
        });
    }

    fn remove_layer(&mut self, key: &LayerKey) {
        self.calls.push(SurfaceCall::RemoveLayer(key.clone()));
    }

    fn set_layer_opacity(&mut self, key: &LayerKey, opacity: f64) {
        self.calls.push(SurfaceCall::Opacity(key.clone(), opacity));
    }

    fn set_overlay(&mut self, overlay: Option<&OverlayService>) {
        self.calls
            .push(SurfaceCall::Overlay(overlay.map(|o| o.url().to_string())));
    }

    fn set_dragging(&mut self, enabled: bool) {
        self.calls.push(SurfaceCall::Dragging(enabled));
    }

    fn show_polygon(&mut self, geometry: Option<&Geometry>) {
        self.calls.push(SurfaceCall::Polygon(geometry.is_some()));
    }

    fn set_basemap(&mut self, basemap: Option<&Basemap>) {
        self.calls
            .push(SurfaceCall::Basemap(basemap.map(|b| b.title.clone())));
    }
}
