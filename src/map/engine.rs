//! The seam between the parcel controller and whatever draws the map.
//!
//! The controller only issues high-level commands (add a layer, move a
//! marker, fly somewhere) and reacts to [`EngineEvent`]s; camera
//! interpolation, rendering and hit-testing belong to the engine.

use crate::error::EngineError;
use crate::geo::{Bounds, LngLat};
use geojson::Feature;

pub type MarkerId = usize;

/// Initial map setup
#[derive(Clone, Debug, PartialEq)]
pub struct MapOptions {
    pub style: String,
    pub access_token: Option<String>,
    pub center: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Fill { opacity: f64 },
    Line { width: f64 },
}

/// A visual layer bound to a source
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub id: String,
    pub source: String,
    pub paint: Paint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// Parcel label drawn at the centroid
    Label,
    /// Camera icon opening a panorama
    Photo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub position: LngLat,
    pub text: String,
    pub kind: MarkerKind,
}

/// Zoom below which parcel labels are hidden
pub const MARKER_HIDE_ZOOM: f64 = 12.0;
/// Zoom from which parcel labels use their full size
pub const MARKER_FULL_ZOOM: f64 = 13.0;

const MARKER_MIN_PX: f64 = 10.0;
const MARKER_MAX_PX: f64 = 20.0;
/// Font-to-size ratio inside the shrinking band (20 px -> 10.5 px font)
const BAND_FONT_RATIO: f64 = 0.525;

/// Rendered size of a marker
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerStyle {
    pub visible: bool,
    pub size_px: f64,
    pub padding_px: f64,
    pub font_px: f64,
}

impl MarkerStyle {
    pub const FULL: MarkerStyle = MarkerStyle {
        visible: true,
        size_px: 30.0,
        padding_px: 5.0,
        font_px: 14.0,
    };

    /// Label style as a pure function of zoom: full size from
    /// `MARKER_FULL_ZOOM` up, linearly shrinking between the two thresholds,
    /// hidden below `MARKER_HIDE_ZOOM`.
    pub fn for_zoom(zoom: f64) -> Self {
        if zoom >= MARKER_FULL_ZOOM {
            return Self::FULL;
        }
        let t = ((zoom - MARKER_HIDE_ZOOM) / (MARKER_FULL_ZOOM - MARKER_HIDE_ZOOM)).clamp(0.0, 1.0);
        let size_px = MARKER_MIN_PX + (MARKER_MAX_PX - MARKER_MIN_PX) * t;
        MarkerStyle {
            visible: zoom >= MARKER_HIDE_ZOOM,
            size_px,
            padding_px: size_px / 6.0,
            font_px: size_px * BAND_FONT_RATIO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    pub padding: f64,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyTo {
    pub center: LngLat,
    pub zoom: f64,
    pub speed: f64,
    /// Pixel offset of the target from the screen center
    pub offset: (f64, f64),
}

/// Things the engine tells its owner about
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Style loaded; layers may be added. Fires once per `load`.
    Ready,
    /// Zoom level changed (fires during camera animations too)
    Zoom(f64),
    /// Pointer click on a fill layer
    LayerClick(String),
    /// Pointer click on a marker
    MarkerClick(MarkerId),
    /// Internal engine failure; the map keeps running
    Error(EngineError),
}

/// A slippy map surface
pub trait MapEngine {
    /// Create the surface with its style and initial camera. The engine
    /// answers with a single [`EngineEvent::Ready`].
    fn load(&mut self, options: &MapOptions);

    fn add_source(&mut self, id: &str, feature: Feature) -> Result<(), EngineError>;
    /// Drop a source no layer refers to
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;
    fn add_layer(&mut self, layer: Layer) -> Result<(), EngineError>;
    fn set_fill_opacity(&mut self, layer_id: &str, opacity: f64) -> Result<(), EngineError>;

    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn set_marker_style(&mut self, id: MarkerId, style: MarkerStyle) -> Result<(), EngineError>;

    /// Current zoom level
    fn zoom(&self) -> f64;
    /// Surface width in pixels
    fn width(&self) -> f64;

    fn pan_by(&mut self, dx: f64, dy: f64);
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);
    fn rotate_by(&mut self, degrees: f64);
    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions);
    fn fly_to(&mut self, target: FlyTo);

    /// Next pending event, if any
    fn poll_event(&mut self) -> Option<EngineEvent>;

    /// Release the surface with all its sources, layers, markers and
    /// listeners
    fn remove(&mut self);
}
