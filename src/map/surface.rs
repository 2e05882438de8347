use crate::braille::BrailleCanvas;
use crate::error::EngineError;
use crate::geo::{self, Bounds, LngLat, Ring};
use crate::map::engine::{
    EngineEvent, FitOptions, FlyTo, Layer, MapEngine, MapOptions, Marker, MarkerId, MarkerKind,
    MarkerStyle, Paint,
};
use crate::map::geometry::{draw_circle, draw_segment, fill_polygon};
use crate::map::projection::{Camera, Viewport};
use crate::map::spatial::SourceGrid;
use geojson::{Feature, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Fills at or above this opacity are drawn on the highlight canvas
pub const HIGHLIGHT_THRESHOLD: f64 = 0.3;

/// Duration of the short camera moves (pan, zoom step, rotation)
const STEP_DURATION: Duration = Duration::from_millis(300);

/// Grid cell for click hit-testing, in degrees (parcels are ~100 m across)
const HIT_GRID_CELL: f64 = 0.01;

struct Source {
    rings: Vec<Ring>,
    bounds: Bounds,
}

struct SurfaceMarker {
    marker: Marker,
    style: MarkerStyle,
}

/// Animated camera move from one camera to another
struct Transition {
    from: Camera,
    to: Camera,
    elapsed: Duration,
    duration: Duration,
}

impl Transition {
    fn camera(&self) -> Camera {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        self.from.lerp(&self.to, ease_in_out(t))
    }

    fn done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Cubic ease-in-out
fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A marker glyph positioned in character cells
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerGlyph {
    pub id: MarkerId,
    pub col: u16,
    pub row: u16,
    pub text: String,
    pub kind: MarkerKind,
}

/// One rendered frame, layered back to front
pub struct SurfaceFrame {
    pub fills: BrailleCanvas,
    pub highlighted: BrailleCanvas,
    pub outlines: BrailleCanvas,
    pub photos: BrailleCanvas,
    pub markers: Vec<MarkerGlyph>,
}

/// Terminal map surface: keeps sources, layers and markers, animates the
/// camera and rasterizes everything into braille canvases.
pub struct TerminalMap {
    viewport: Viewport,
    style: Option<String>,
    sources: Vec<Source>,
    source_ids: HashMap<String, usize>,
    layers: Vec<(Layer, usize)>,
    markers: Vec<SurfaceMarker>,
    grid: Option<SourceGrid>,
    transition: Option<Transition>,
    events: VecDeque<EngineEvent>,
    last_zoom: f64,
}

impl TerminalMap {
    /// Surface of `width` x `height` braille pixels
    pub fn new(width: usize, height: usize) -> Self {
        let camera = Camera {
            center: (0.0, 0.0),
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
        };
        Self {
            viewport: Viewport::new(camera, width, height),
            style: None,
            sources: Vec::new(),
            source_ids: HashMap::new(),
            layers: Vec::new(),
            markers: Vec::new(),
            grid: None,
            transition: None,
            events: VecDeque::new(),
            last_zoom: 0.0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn camera(&self) -> &Camera {
        &self.viewport.camera
    }

    /// Style name for display: the last path segment of the style URL
    pub fn style_name(&self) -> Option<&str> {
        self.style
            .as_deref()
            .map(|s| s.rsplit('/').next().unwrap_or(s))
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Advance the running camera animation
    pub fn tick(&mut self, dt: Duration) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        transition.elapsed += dt;
        let camera = transition.camera();
        let done = transition.done();
        self.viewport.set_camera(camera);
        if done {
            self.transition = None;
        }
        self.emit_zoom_if_changed();
    }

    /// Start a camera move; a newer move replaces one in flight
    fn animate_to(&mut self, to: Camera, duration: Duration) {
        self.transition = Some(Transition {
            from: self.viewport.camera,
            to,
            elapsed: Duration::ZERO,
            duration,
        });
        if duration.is_zero() {
            self.tick(Duration::ZERO);
        }
    }

    fn emit_zoom_if_changed(&mut self) {
        let zoom = self.viewport.camera.zoom;
        if (zoom - self.last_zoom).abs() > 1e-9 {
            self.last_zoom = zoom;
            self.events.push_back(EngineEvent::Zoom(zoom));
        }
    }

    /// Pointer click at braille pixel `(px, py)`. Markers sit above the
    /// fill layers; the topmost hit fires one event.
    pub fn click_at(&mut self, px: i32, py: i32) {
        let (col, row) = ((px / 2) as i64, (py / 4) as i64);
        if let Some(glyph) = self
            .marker_glyphs()
            .into_iter()
            .rev()
            .find(|g| row == g.row as i64 && col >= g.col as i64 && col < g.col as i64 + glyph_width(g) as i64)
        {
            self.events.push_back(EngineEvent::MarkerClick(glyph.id));
            return;
        }

        let point = self.viewport.unproject(px as f64 + 0.5, py as f64 + 0.5);
        if let Some(layer_id) = self.fill_layer_at(point) {
            self.events.push_back(EngineEvent::LayerClick(layer_id));
        }
    }

    fn fill_layer_at(&mut self, point: LngLat) -> Option<String> {
        if self.grid.is_none() {
            self.grid = Some(SourceGrid::build(
                self.sources.iter().map(|s| &s.bounds),
                HIT_GRID_CELL,
            ));
        }
        let candidates: Vec<usize> = self.grid.as_ref()?.query_point(point).collect();

        self.layers
            .iter()
            .rev()
            .filter(|(layer, _)| matches!(layer.paint, Paint::Fill { .. }))
            .find(|(_, source)| {
                candidates.contains(source) && polygon_contains(&self.sources[*source].rings, point)
            })
            .map(|(layer, _)| layer.id.clone())
    }

    /// Rasterize all layers and markers into a `width` x `height` character
    /// frame
    pub fn render(&self, width: usize, height: usize) -> SurfaceFrame {
        let mut frame = SurfaceFrame {
            fills: BrailleCanvas::new(width, height),
            highlighted: BrailleCanvas::new(width, height),
            outlines: BrailleCanvas::new(width, height),
            photos: BrailleCanvas::new(width, height),
            markers: Vec::new(),
        };

        let mut viewport = self.viewport.clone();
        viewport.width = width * 2;
        viewport.height = height * 4;

        for (layer, source_idx) in &self.layers {
            let source = &self.sources[*source_idx];
            let projected: Vec<Vec<(f64, f64)>> = source
                .rings
                .iter()
                .map(|ring| {
                    ring.iter()
                        .map(|&p| {
                            let v = viewport.project_f(p);
                            (v.x, v.y)
                        })
                        .collect()
                })
                .collect();
            if !rings_might_be_visible(&viewport, &projected) {
                continue;
            }

            match layer.paint {
                Paint::Fill { opacity } => {
                    let canvas = if opacity >= HIGHLIGHT_THRESHOLD {
                        &mut frame.highlighted
                    } else {
                        &mut frame.fills
                    };
                    fill_polygon(canvas, &projected, opacity);
                }
                Paint::Line { width } => {
                    for ring in &projected {
                        for pair in ring.windows(2) {
                            draw_segment(&mut frame.outlines, pair[0], pair[1], width >= 2.0);
                        }
                    }
                }
            }
        }

        for m in &self.markers {
            if m.marker.kind == MarkerKind::Photo && m.style.visible {
                let (px, py) = viewport.project(m.marker.position);
                if viewport.is_visible(px, py) {
                    draw_circle(&mut frame.photos, px, py, 3);
                }
            }
        }

        frame.markers = self.glyphs_for(&viewport);
        frame
    }

    fn marker_glyphs(&self) -> Vec<MarkerGlyph> {
        self.glyphs_for(&self.viewport)
    }

    fn glyphs_for(&self, viewport: &Viewport) -> Vec<MarkerGlyph> {
        let cols = (viewport.width / 2) as i32;
        let rows = (viewport.height / 4) as i32;
        self.markers
            .iter()
            .enumerate()
            .filter(|(_, m)| m.style.visible)
            .filter_map(|(id, m)| {
                let (px, py) = viewport.project(m.marker.position);
                let text = marker_text(m);
                let w = text.chars().count() as i32;
                let col = px / 2 - w / 2;
                let row = py / 4;
                if row < 0 || row >= rows || col + w <= 0 || col >= cols {
                    return None;
                }
                Some(MarkerGlyph {
                    id,
                    col: col.max(0) as u16,
                    row: row as u16,
                    text,
                    kind: m.marker.kind,
                })
            })
            .collect()
    }
}

/// Label text as drawn: circled at full size, bare when shrunk
fn marker_text(m: &SurfaceMarker) -> String {
    match m.marker.kind {
        MarkerKind::Photo => "◉".to_string(),
        MarkerKind::Label if m.style.size_px >= MarkerStyle::FULL.size_px => {
            format!("({})", m.marker.text)
        }
        MarkerKind::Label => m.marker.text.clone(),
    }
}

fn glyph_width(g: &MarkerGlyph) -> usize {
    g.text.chars().count().max(1)
}

fn rings_might_be_visible(viewport: &Viewport, rings: &[Vec<(f64, f64)>]) -> bool {
    let (mut min, mut max) = ((i32::MAX, i32::MAX), (i32::MIN, i32::MIN));
    for &(x, y) in rings.iter().flatten() {
        let (x, y) = (x as i32, y as i32);
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    min.0 <= max.0 && viewport.box_might_be_visible(min, max)
}

/// Inside the outer ring and outside every hole
fn polygon_contains(rings: &[Ring], point: LngLat) -> bool {
    match rings.split_first() {
        Some((outer, holes)) => {
            geo::ring_contains(outer, point) && !holes.iter().any(|h| geo::ring_contains(h, point))
        }
        None => false,
    }
}

fn feature_rings(feature: &Feature) -> Vec<Ring> {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::Polygon(rings)) => rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| (p[0], p[1]))
                    .collect()
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl MapEngine for TerminalMap {
    fn load(&mut self, options: &MapOptions) {
        self.style = Some(options.style.clone());
        self.transition = None;
        self.viewport.set_camera(Camera {
            center: options.center,
            zoom: options.zoom,
            bearing: options.bearing,
            pitch: options.pitch,
        });
        self.last_zoom = self.viewport.camera.zoom;
        tracing::debug!(
            style = %options.style,
            has_token = options.access_token.is_some(),
            "map surface loaded"
        );
        self.events.push_back(EngineEvent::Ready);
    }

    fn add_source(&mut self, id: &str, feature: Feature) -> Result<(), EngineError> {
        if self.source_ids.contains_key(id) {
            return Err(EngineError::SourceExists(id.to_string()));
        }
        let rings = feature_rings(&feature);
        let bounds = geo::accumulate_bounds(&rings);
        self.source_ids.insert(id.to_string(), self.sources.len());
        self.sources.push(Source { rings, bounds });
        self.grid = None;
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        let idx = *self
            .source_ids
            .get(id)
            .ok_or_else(|| EngineError::UnknownSource(id.to_string()))?;
        if self.layers.iter().any(|(_, source)| *source == idx) {
            return Err(EngineError::SourceInUse(id.to_string()));
        }

        self.sources.remove(idx);
        self.source_ids.remove(id);
        for slot in self.source_ids.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        for (_, source) in &mut self.layers {
            if *source > idx {
                *source -= 1;
            }
        }
        self.grid = None;
        Ok(())
    }

    fn add_layer(&mut self, layer: Layer) -> Result<(), EngineError> {
        if self.layers.iter().any(|(l, _)| l.id == layer.id) {
            return Err(EngineError::LayerExists(layer.id));
        }
        let source = *self
            .source_ids
            .get(&layer.source)
            .ok_or_else(|| EngineError::UnknownSource(layer.source.clone()))?;
        self.layers.push((layer, source));
        Ok(())
    }

    fn set_fill_opacity(&mut self, layer_id: &str, opacity: f64) -> Result<(), EngineError> {
        let paint = self
            .layers
            .iter_mut()
            .find(|(l, _)| l.id == layer_id)
            .map(|(l, _)| &mut l.paint);
        match paint {
            Some(Paint::Fill { opacity: current }) => {
                *current = opacity.clamp(0.0, 1.0);
                Ok(())
            }
            _ => Err(EngineError::UnknownLayer(layer_id.to_string())),
        }
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.markers.push(SurfaceMarker {
            marker,
            style: MarkerStyle::FULL,
        });
        self.markers.len() - 1
    }

    fn set_marker_style(&mut self, id: MarkerId, style: MarkerStyle) -> Result<(), EngineError> {
        let marker = self.markers.get_mut(id).ok_or(EngineError::UnknownMarker(id))?;
        marker.style = style;
        Ok(())
    }

    fn zoom(&self) -> f64 {
        self.viewport.camera.zoom
    }

    fn width(&self) -> f64 {
        self.viewport.width as f64
    }

    fn pan_by(&mut self, dx: f64, dy: f64) {
        let mut target = self.viewport.clone();
        target.pan(dx, dy);
        self.animate_to(target.camera, STEP_DURATION);
    }

    fn zoom_in(&mut self) {
        let to = Camera {
            zoom: self.viewport.camera.zoom.round() + 1.0,
            ..self.viewport.camera
        };
        self.animate_to(to, STEP_DURATION);
    }

    fn zoom_out(&mut self) {
        let to = Camera {
            zoom: self.viewport.camera.zoom.round() - 1.0,
            ..self.viewport.camera
        };
        self.animate_to(to, STEP_DURATION);
    }

    fn rotate_by(&mut self, degrees: f64) {
        let to = Camera {
            bearing: self.viewport.camera.bearing + degrees,
            ..self.viewport.camera
        };
        self.animate_to(to, STEP_DURATION);
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) {
        if let Some(to) = self.viewport.camera_for_bounds(&bounds, options.padding) {
            self.animate_to(to, Duration::from_millis(options.duration_ms));
        }
    }

    fn fly_to(&mut self, target: FlyTo) {
        let to = self
            .viewport
            .camera_for_target(target.center, target.zoom, target.offset);

        // Longer for far or deep moves; `speed` divides the whole flight
        let from_px = self.viewport.project_f(to.center);
        let screens = (from_px - glam::DVec2::new(
            self.viewport.width as f64 / 2.0,
            self.viewport.height as f64 / 2.0,
        ))
        .length()
            / (self.viewport.width.max(1) as f64);
        let hops = screens.ln_1p() + (to.zoom - self.viewport.camera.zoom).abs() * 0.5;
        let seconds = ((1.0 + hops) / target.speed.max(0.01)).clamp(0.3, 6.0);

        self.animate_to(to, Duration::from_secs_f64(seconds));
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    fn remove(&mut self) {
        self.sources.clear();
        self.source_ids.clear();
        self.layers.clear();
        self.markers.clear();
        self.events.clear();
        self.grid = None;
        self.transition = None;
        self.style = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Geometry;

    fn options(center: LngLat, zoom: f64) -> MapOptions {
        MapOptions {
            style: "mapbox://styles/test/parcels".into(),
            access_token: None,
            center,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    fn square_feature(lon: f64, lat: f64, size: f64) -> Feature {
        let ring = vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ];
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    fn drain(map: &mut TerminalMap) -> Vec<EngineEvent> {
        std::iter::from_fn(|| map.poll_event()).collect()
    }

    #[test]
    fn test_load_fires_ready_once() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.25, -45.33), 14.0));
        assert_eq!(drain(&mut map), vec![EngineEvent::Ready]);
        assert_eq!(map.style_name(), Some("parcels"));
        assert_eq!(map.zoom(), 14.0);
    }

    #[test]
    fn test_duplicate_source_and_layer_rejected() {
        let mut map = TerminalMap::new(200, 120);
        map.add_source("a", square_feature(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(
            map.add_source("a", square_feature(0.0, 0.0, 1.0)),
            Err(EngineError::SourceExists("a".into()))
        );

        let layer = Layer {
            id: "fill-a".into(),
            source: "a".into(),
            paint: Paint::Fill { opacity: 0.1 },
        };
        map.add_layer(layer.clone()).unwrap();
        assert_eq!(map.add_layer(layer), Err(EngineError::LayerExists("fill-a".into())));

        let orphan = Layer {
            id: "fill-b".into(),
            source: "b".into(),
            paint: Paint::Fill { opacity: 0.1 },
        };
        assert_eq!(map.add_layer(orphan), Err(EngineError::UnknownSource("b".into())));
        assert_eq!(
            map.set_fill_opacity("nope", 0.5),
            Err(EngineError::UnknownLayer("nope".into()))
        );
    }

    #[test]
    fn test_remove_source_keeps_other_layers() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.2495, -45.3295), 15.0));
        drain(&mut map);

        map.add_source("orphan", square_feature(-72.30, -45.30, 0.001)).unwrap();
        map.add_source("lote-1", square_feature(-72.25, -45.33, 0.001)).unwrap();
        map.add_layer(Layer {
            id: "lote-fill-1".into(),
            source: "lote-1".into(),
            paint: Paint::Fill { opacity: 0.1 },
        })
        .unwrap();

        assert_eq!(
            map.remove_source("lote-1"),
            Err(EngineError::SourceInUse("lote-1".into()))
        );
        assert_eq!(
            map.remove_source("missing"),
            Err(EngineError::UnknownSource("missing".into()))
        );

        map.remove_source("orphan").unwrap();
        map.click_at(100, 60);
        assert_eq!(drain(&mut map), vec![EngineEvent::LayerClick("lote-fill-1".into())]);

        // The id is free again
        assert!(map.add_source("orphan", square_feature(0.0, 0.0, 0.001)).is_ok());
    }

    #[test]
    fn test_click_hits_fill_layer() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.2495, -45.3295), 15.0));
        drain(&mut map);

        map.add_source("lote-1", square_feature(-72.25, -45.33, 0.001)).unwrap();
        map.add_layer(Layer {
            id: "lote-fill-1".into(),
            source: "lote-1".into(),
            paint: Paint::Fill { opacity: 0.1 },
        })
        .unwrap();

        map.click_at(100, 60);
        assert_eq!(drain(&mut map), vec![EngineEvent::LayerClick("lote-fill-1".into())]);

        map.click_at(1, 1);
        assert!(drain(&mut map).is_empty());
    }

    #[test]
    fn test_click_hits_wide_parcel() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-75.0, -45.0), 5.0));
        drain(&mut map);

        map.add_source("wide", square_feature(-80.0, -50.0, 10.0)).unwrap();
        map.add_layer(Layer {
            id: "fill-wide".into(),
            source: "wide".into(),
            paint: Paint::Fill { opacity: 0.1 },
        })
        .unwrap();

        map.click_at(100, 60);
        assert_eq!(drain(&mut map), vec![EngineEvent::LayerClick("fill-wide".into())]);
        let grid = map.grid.as_ref().unwrap();
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_click_prefers_marker() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.2495, -45.3295), 15.0));
        drain(&mut map);
        map.add_source("lote-1", square_feature(-72.25, -45.33, 0.001)).unwrap();
        map.add_layer(Layer {
            id: "lote-fill-1".into(),
            source: "lote-1".into(),
            paint: Paint::Fill { opacity: 0.1 },
        })
        .unwrap();
        let id = map.add_marker(Marker {
            position: (-72.2495, -45.3295),
            text: "1".into(),
            kind: MarkerKind::Label,
        });

        map.click_at(100, 60);
        assert_eq!(drain(&mut map), vec![EngineEvent::MarkerClick(id)]);

        // Hidden markers can't be clicked
        map.set_marker_style(id, MarkerStyle::for_zoom(10.0)).unwrap();
        map.click_at(100, 60);
        assert_eq!(drain(&mut map), vec![EngineEvent::LayerClick("lote-fill-1".into())]);
    }

    #[test]
    fn test_fly_to_animates_and_reports_zoom() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.2524, -45.3358), 10.0));
        drain(&mut map);

        map.fly_to(FlyTo {
            center: (-72.25, -45.33),
            zoom: 15.0,
            speed: 1.5,
            offset: (50.0, 0.0),
        });
        assert!(map.is_animating());

        for _ in 0..400 {
            map.tick(Duration::from_millis(16));
        }
        assert!(!map.is_animating());
        assert_eq!(map.zoom(), 15.0);

        let zooms: Vec<f64> = drain(&mut map)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Zoom(z) => Some(z),
                _ => None,
            })
            .collect();
        assert!(zooms.len() > 2);
        assert_eq!(zooms.last().copied(), Some(15.0));
    }

    #[test]
    fn test_new_move_replaces_running_one() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((0.0, 0.0), 5.0));
        map.fly_to(FlyTo {
            center: (10.0, 10.0),
            zoom: 12.0,
            speed: 1.0,
            offset: (0.0, 0.0),
        });
        map.tick(Duration::from_millis(100));
        map.zoom_out();
        for _ in 0..100 {
            map.tick(Duration::from_millis(16));
        }
        assert!(!map.is_animating());
        assert!(map.zoom() < 12.0);
    }

    #[test]
    fn test_fit_bounds_ignores_empty() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((0.0, 0.0), 3.0));
        map.fit_bounds(
            Bounds::EMPTY,
            FitOptions {
                padding: 50.0,
                duration_ms: 2000,
            },
        );
        assert!(!map.is_animating());
    }

    #[test]
    fn test_render_splits_highlighted_fills() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.2495, -45.3295), 15.0));
        map.add_source("a", square_feature(-72.25, -45.33, 0.001)).unwrap();
        map.add_layer(Layer {
            id: "fill-a".into(),
            source: "a".into(),
            paint: Paint::Fill { opacity: 0.1 },
        })
        .unwrap();
        map.add_layer(Layer {
            id: "line-a".into(),
            source: "a".into(),
            paint: Paint::Line { width: 1.0 },
        })
        .unwrap();

        let frame = map.render(100, 30);
        assert!(frame.fills.dot_count() > 0);
        assert_eq!(frame.highlighted.dot_count(), 0);
        assert!(frame.outlines.dot_count() > 0);

        map.set_fill_opacity("fill-a", 0.5).unwrap();
        let frame = map.render(100, 30);
        assert_eq!(frame.fills.dot_count(), 0);
        assert!(frame.highlighted.dot_count() > 0);
    }

    #[test]
    fn test_outline_with_far_vertex_at_max_zoom() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((-72.25, -45.33), 22.0));
        // One vertex near the view, one on the other side of the globe
        let ring = vec![
            vec![-72.25, -45.33],
            vec![110.0, -45.33],
            vec![-72.25, -45.3299],
            vec![-72.25, -45.33],
        ];
        let feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        map.add_source("far", feature).unwrap();
        map.add_layer(Layer {
            id: "line-far".into(),
            source: "far".into(),
            paint: Paint::Line { width: 2.0 },
        })
        .unwrap();

        let frame = map.render(100, 30);
        let (w, h) = frame.outlines.pixel_size();
        assert!(frame.outlines.dot_count() > 0);
        assert!(frame.outlines.dot_count() <= w * h);
    }

    #[test]
    fn test_marker_text_follows_style() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((0.0, 0.0), 14.0));
        let id = map.add_marker(Marker {
            position: (0.0, 0.0),
            text: "12".into(),
            kind: MarkerKind::Label,
        });
        assert_eq!(map.render(100, 30).markers[0].text, "(12)");

        map.set_marker_style(id, MarkerStyle::for_zoom(12.5)).unwrap();
        assert_eq!(map.render(100, 30).markers[0].text, "12");

        map.set_marker_style(id, MarkerStyle::for_zoom(11.0)).unwrap();
        assert!(map.render(100, 30).markers.is_empty());
    }

    #[test]
    fn test_remove_releases_everything() {
        let mut map = TerminalMap::new(200, 120);
        map.load(&options((0.0, 0.0), 14.0));
        map.add_source("a", square_feature(0.0, 0.0, 0.001)).unwrap();
        map.add_marker(Marker {
            position: (0.0, 0.0),
            text: "1".into(),
            kind: MarkerKind::Label,
        });
        map.remove();
        assert!(map.poll_event().is_none());
        assert!(map.render(10, 5).markers.is_empty());
        assert!(map.add_source("a", square_feature(0.0, 0.0, 0.001)).is_ok());
    }
}
