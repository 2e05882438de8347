//! Parcel map interaction: builds one layer set and label per parcel, keeps
//! the selection and drives the camera.

use crate::data::Parcel;
use crate::geo::{self, Bounds, LngLat};
use crate::map::engine::{
    EngineEvent, FitOptions, FlyTo, Layer, MapEngine, MapOptions, Marker, MarkerId, MarkerKind,
    MarkerStyle, Paint,
};
use crate::panorama::PhotoMarker;
use std::collections::HashMap;

/// Fill opacity of an unselected parcel
pub const RESTING_OPACITY: f64 = 0.1;
/// Fill opacity of the selected parcel
pub const HIGHLIGHT_OPACITY: f64 = 0.5;
pub const OUTLINE_WIDTH: f64 = 1.0;

/// Zoom and speed of the fly-to on selection
pub const SELECT_ZOOM: f64 = 15.0;
pub const SELECT_SPEED: f64 = 1.5;

pub const FIT: FitOptions = FitOptions {
    padding: 50.0,
    duration_ms: 2000,
};

pub const PAN_STEP: f64 = 100.0;
pub const BEARING_STEP: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for a non-empty parcel list
    Uninitialized,
    /// Surface created, waiting for its ready signal
    Building,
    /// Layers registered, interaction live
    Ready,
}

/// Everything the controller knows about one drawn parcel, built once when
/// its layers are registered
#[derive(Clone, Debug, PartialEq)]
pub struct ParcelContext {
    /// Position in the parcel list
    pub index: usize,
    pub source_id: String,
    pub fill_layer_id: String,
    pub line_layer_id: String,
    pub centroid: LngLat,
    pub marker: MarkerId,
}

enum MarkerTarget {
    Parcel(usize),
    Photo(String),
}

/// What the owner of the controller should react to
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    Ready,
    Selected(usize),
    OpenPanorama(String),
}

pub struct MapController<E: MapEngine> {
    engine: E,
    options: MapOptions,
    state: ControllerState,
    parcels: Vec<Parcel>,
    contexts: Vec<ParcelContext>,
    by_layer: HashMap<String, usize>,
    by_marker: HashMap<MarkerId, MarkerTarget>,
    photos: Vec<PhotoMarker>,
    bounds: Bounds,
    /// Index into `contexts`
    selected: Option<usize>,
    label_style: Option<MarkerStyle>,
}

impl<E: MapEngine> MapController<E> {
    pub fn new(engine: E, options: MapOptions, photos: Vec<PhotoMarker>) -> Self {
        Self {
            engine,
            options,
            state: ControllerState::Uninitialized,
            parcels: Vec::new(),
            contexts: Vec::new(),
            by_layer: HashMap::new(),
            by_marker: HashMap::new(),
            photos,
            bounds: Bounds::EMPTY,
            selected: None,
            label_style: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    pub fn contexts(&self) -> &[ParcelContext] {
        &self.contexts
    }

    /// Bounds of every drawn parcel's outer ring
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn selected_parcel(&self) -> Option<&Parcel> {
        self.selected
            .map(|ctx| &self.parcels[self.contexts[ctx].index])
    }

    pub fn selected_context(&self) -> Option<&ParcelContext> {
        self.selected.map(|ctx| &self.contexts[ctx])
    }

    /// Hand over the fetched parcels. Only a non-empty list creates the map;
    /// returns whether it did.
    pub fn mount(&mut self, parcels: Vec<Parcel>) -> bool {
        if self.state != ControllerState::Uninitialized || parcels.is_empty() {
            return false;
        }
        self.parcels = parcels;
        self.engine.load(&self.options);
        self.state = ControllerState::Building;
        tracing::debug!(parcels = self.parcels.len(), "map surface created");
        true
    }

    /// Drain and handle every pending engine event
    pub fn pump(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(event) = self.engine.poll_event() {
            notices.extend(self.handle_event(event));
        }
        notices
    }

    pub fn handle_event(&mut self, event: EngineEvent) -> Option<Notice> {
        match event {
            EngineEvent::Ready if self.state == ControllerState::Building => {
                self.build();
                Some(Notice::Ready)
            }
            EngineEvent::Ready => None,
            EngineEvent::Zoom(zoom) => {
                self.restyle_labels(zoom);
                None
            }
            EngineEvent::LayerClick(layer_id) => {
                let ctx = *self.by_layer.get(&layer_id)?;
                self.select(ctx)
            }
            EngineEvent::MarkerClick(marker) => match self.by_marker.get(&marker)? {
                MarkerTarget::Parcel(ctx) => {
                    let ctx = *ctx;
                    self.select(ctx)
                }
                MarkerTarget::Photo(scene) => Some(Notice::OpenPanorama(scene.clone())),
            },
            EngineEvent::Error(err) => {
                tracing::warn!(%err, "map engine error");
                None
            }
        }
    }

    /// Register layers and labels for every parcel with geometry, then frame
    /// them all
    fn build(&mut self) {
        for index in 0..self.parcels.len() {
            if let Some(ctx) = self.register_parcel(index) {
                let ctx_idx = self.contexts.len();
                self.by_layer.insert(ctx.fill_layer_id.clone(), ctx_idx);
                self.by_marker.insert(ctx.marker, MarkerTarget::Parcel(ctx_idx));
                self.contexts.push(ctx);
            }
        }

        for photo in &self.photos {
            let id = self.engine.add_marker(Marker {
                position: photo.position,
                text: photo.scene.clone(),
                kind: MarkerKind::Photo,
            });
            self.by_marker.insert(id, MarkerTarget::Photo(photo.scene.clone()));
        }

        self.restyle_labels(self.engine.zoom());
        self.state = ControllerState::Ready;
        tracing::info!(
            drawn = self.contexts.len(),
            skipped = self.parcels.len() - self.contexts.len(),
            "parcel layers registered"
        );
        self.fit_all();
    }

    fn register_parcel(&mut self, index: usize) -> Option<ParcelContext> {
        let parcel = &self.parcels[index];
        let feature = parcel.to_feature()?;
        let outer = parcel.outer_ring()?;
        let centroid = geo::label_position(outer)?;

        let source_id = parcel.source_id();
        let fill_layer_id = parcel.fill_layer_id();
        let line_layer_id = parcel.line_layer_id();

        if let Err(err) = self.engine.add_source(&source_id, feature) {
            tracing::warn!(parcel = %parcel.id, %err, "skipping parcel");
            return None;
        }
        let fill = Layer {
            id: fill_layer_id.clone(),
            source: source_id.clone(),
            paint: Paint::Fill {
                opacity: RESTING_OPACITY,
            },
        };
        if let Err(err) = self.engine.add_layer(fill) {
            tracing::warn!(parcel = %parcel.id, %err, "skipping parcel");
            if let Err(err) = self.engine.remove_source(&source_id) {
                tracing::warn!(parcel = %parcel.id, %err, "parcel source left registered");
            }
            return None;
        }
        let line = Layer {
            id: line_layer_id.clone(),
            source: source_id.clone(),
            paint: Paint::Line {
                width: OUTLINE_WIDTH,
            },
        };
        if let Err(err) = self.engine.add_layer(line) {
            tracing::warn!(parcel = %parcel.id, %err, "parcel outline not drawn");
        }

        let marker = self.engine.add_marker(Marker {
            position: centroid,
            text: parcel.label().to_string(),
            kind: MarkerKind::Label,
        });

        for &point in outer {
            self.bounds.extend(point);
        }

        Some(ParcelContext {
            index,
            source_id,
            fill_layer_id,
            line_layer_id,
            centroid,
            marker,
        })
    }

    /// Select a parcel: restore the previous highlight, highlight this one and
    /// fly to it
    fn select(&mut self, ctx_idx: usize) -> Option<Notice> {
        if self.state != ControllerState::Ready {
            return None;
        }
        if let Some(prev) = self.selected.replace(ctx_idx) {
            if prev != ctx_idx {
                self.set_opacity(prev, RESTING_OPACITY);
            }
        }
        self.set_opacity(ctx_idx, HIGHLIGHT_OPACITY);

        // Shifted right so the detail card doesn't cover the parcel
        let ctx = &self.contexts[ctx_idx];
        self.engine.fly_to(FlyTo {
            center: ctx.centroid,
            zoom: SELECT_ZOOM,
            speed: SELECT_SPEED,
            offset: (self.engine.width() / 4.0, 0.0),
        });
        tracing::debug!(parcel = %self.parcels[ctx.index].id, "parcel selected");
        Some(Notice::Selected(ctx.index))
    }

    /// Select by position in the parcel list; parcels without geometry can't
    /// be selected
    pub fn select_parcel(&mut self, index: usize) -> Option<Notice> {
        let ctx = self.contexts.iter().position(|c| c.index == index)?;
        self.select(ctx)
    }

    /// Close the selection: restore its opacity and frame every parcel again.
    /// Returns whether anything was selected.
    pub fn deselect(&mut self) -> bool {
        let Some(prev) = self.selected.take() else {
            return false;
        };
        self.set_opacity(prev, RESTING_OPACITY);
        self.fit_all();
        true
    }

    fn set_opacity(&mut self, ctx_idx: usize, opacity: f64) {
        let layer = &self.contexts[ctx_idx].fill_layer_id;
        if let Err(err) = self.engine.set_fill_opacity(layer, opacity) {
            tracing::warn!(%err, "could not update parcel opacity");
        }
    }

    /// Frame every drawn parcel. No-op when nothing was drawn.
    pub fn fit_all(&mut self) {
        if !self.bounds.is_empty() {
            self.engine.fit_bounds(self.bounds, FIT);
        }
    }

    fn restyle_labels(&mut self, zoom: f64) {
        let style = MarkerStyle::for_zoom(zoom);
        if self.label_style == Some(style) {
            return;
        }
        self.label_style = Some(style);
        for ctx in &self.contexts {
            if let Err(err) = self.engine.set_marker_style(ctx.marker, style) {
                tracing::warn!(%err, "could not restyle label");
            }
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.engine.pan_by(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.engine.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.engine.zoom_out();
    }

    pub fn rotate_left(&mut self) {
        self.engine.rotate_by(-BEARING_STEP);
    }

    pub fn rotate_right(&mut self) {
        self.engine.rotate_by(BEARING_STEP);
    }

    /// Release the surface and everything registered on it
    pub fn teardown(mut self) -> E {
        self.engine.remove();
        self.engine
    }
}
