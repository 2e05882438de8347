use crate::config::Config;
use crate::controller::{MapController, Notice, PAN_STEP};
use crate::data::{self, Parcel, ParcelSource};
use crate::map::{MapEngine, MapOptions, TerminalMap};
use crate::panorama::{self, PanoramaDialog};
use crate::presenter::{DetailPresenter, DetailTab};
use crate::ui::Screen;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Start fetching parcels on the runtime. The result arrives on the returned
/// receiver; if the view is gone by then it is dropped.
pub fn spawn_fetch(source: ParcelSource) -> oneshot::Receiver<Vec<Parcel>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let parcels = data::fetch_parcels(&source).await;
        if tx.send(parcels).is_err() {
            tracing::debug!("view closed before parcels arrived, discarding");
        }
    });
    rx
}

/// Application state
pub struct App {
    pub controller: MapController<TerminalMap>,
    pub presenter: DetailPresenter,
    pub panorama: PanoramaDialog,
    pub screen: Screen,
    pub should_quit: bool,
    /// Parcel fetch still in flight
    pending: Option<oneshot::Receiver<Vec<Parcel>>>,
    /// Short message for the status bar
    pub flash: Option<String>,
    /// Frame counter for the loading spinner
    pub frame: u64,
}

impl App {
    pub fn new(config: &Config, width: u16, height: u16, parcels: oneshot::Receiver<Vec<Parcel>>) -> Self {
        let screen = Screen::new(Rect::new(0, 0, width, height));
        let (px, py) = screen.map_pixels();
        let options = MapOptions {
            style: config.map_style.clone(),
            access_token: config.map_token.clone(),
            center: config.center,
            zoom: config.zoom,
            pitch: config.pitch,
            bearing: config.bearing,
        };
        let controller = MapController::new(
            TerminalMap::new(px, py),
            options,
            panorama::default_photo_markers(),
        );

        Self {
            controller,
            presenter: DetailPresenter::default(),
            panorama: PanoramaDialog::new(config.panorama_xml.clone()),
            screen,
            should_quit: false,
            pending: Some(parcels),
            flash: None,
            frame: 0,
        }
    }

    /// Parcels still loading. Stays true for as long as the fetch hangs.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.screen = Screen::new(Rect::new(0, 0, width, height));
        let (px, py) = self.screen.map_pixels();
        self.controller.engine_mut().resize(px, py);
    }

    /// Pick up the fetch result if it has arrived
    pub fn poll_fetch(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        let parcels = match rx.try_recv() {
            Ok(parcels) => parcels,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => {
                tracing::error!("parcel fetch task ended without a result");
                Vec::new()
            }
        };
        self.pending = None;
        if parcels.is_empty() {
            self.flash = Some("0 lotes".into());
        }
        self.controller.mount(parcels);
    }

    /// Advance one frame: fetch, camera animation, engine events
    pub fn update(&mut self, dt: Duration) {
        self.frame = self.frame.wrapping_add(1);
        self.poll_fetch();
        self.controller.engine_mut().tick(dt);
        for notice in self.controller.pump() {
            self.apply(notice);
        }
    }

    fn apply(&mut self, notice: Notice) {
        match notice {
            Notice::Ready => {
                self.flash = Some(format!("{} lotes", self.controller.contexts().len()));
            }
            Notice::Selected(_) => {
                self.presenter.sync(self.controller.selected_parcel());
            }
            Notice::OpenPanorama(scene) => self.panorama.open(scene),
        }
    }

    pub fn card_open(&self) -> bool {
        self.controller.selected_parcel().is_some()
    }

    /// Close the detail card and frame all parcels again
    pub fn close_card(&mut self) {
        if self.controller.deselect() {
            self.presenter.sync(None);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.panorama.is_open() {
            if key.code == KeyCode::Esc {
                self.panorama.close();
            }
            return;
        }

        if self.card_open() {
            match key.code {
                KeyCode::Esc => return self.close_card(),
                KeyCode::Tab => return self.presenter.switch_tab(),
                _ if self.presenter.tab() == DetailTab::Contact => return self.handle_form_key(key),
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc if !self.card_open() => self.should_quit = true,

            KeyCode::Left | KeyCode::Char('h') => self.controller.pan(-PAN_STEP, 0.0),
            KeyCode::Right | KeyCode::Char('l') => self.controller.pan(PAN_STEP, 0.0),
            KeyCode::Up | KeyCode::Char('k') => self.controller.pan(0.0, -PAN_STEP),
            KeyCode::Down | KeyCode::Char('j') => self.controller.pan(0.0, PAN_STEP),

            KeyCode::Char('+') | KeyCode::Char('=') => self.controller.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => self.controller.zoom_out(),

            KeyCode::Char('[') => self.controller.rotate_left(),
            KeyCode::Char(']') => self.controller.rotate_right(),

            KeyCode::Home | KeyCode::Char('r') | KeyCode::Char('0') => self.controller.fit_all(),

            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let form = self.presenter.form_mut();
        match key.code {
            KeyCode::Down => form.focus_next(),
            KeyCode::Up | KeyCode::BackTab => form.focus_prev(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => form.input(ch),
            KeyCode::Enter => {
                self.flash = match self.presenter.submit() {
                    Some(Ok(_)) => Some("Formulario enviado".into()),
                    Some(Err(count)) => Some(format!("{count} campos con errores")),
                    None => None,
                };
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let pos = Position::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(pos),
            MouseEventKind::ScrollUp if self.screen.inner.contains(pos) => self.controller.zoom_in(),
            MouseEventKind::ScrollDown if self.screen.inner.contains(pos) => {
                self.controller.zoom_out()
            }
            _ => {}
        }
    }

    fn click(&mut self, pos: Position) {
        if self.panorama.is_open() {
            if !self.screen.dialog().contains(pos) {
                self.panorama.close();
            }
            return;
        }
        if self.card_open() {
            // The card covers the map; anything outside it is backdrop
            if !self.screen.card().contains(pos) {
                self.close_card();
            }
            return;
        }
        if let Some((px, py)) = self.screen.to_map_pixel(pos) {
            self.controller.engine_mut().click_at(px, py);
        }
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}", self.controller.engine().zoom())
    }

    pub fn center_coords(&self) -> String {
        let camera = self.controller.engine().camera();
        let (lon, lat) = camera.center;
        let lat_dir = if lat >= 0.0 { 'N' } else { 'S' };
        let lon_dir = if lon >= 0.0 { 'E' } else { 'W' };
        format!("{:.4}°{} {:.4}°{}", lat.abs(), lat_dir, lon.abs(), lon_dir)
    }

    pub fn bearing(&self) -> String {
        format!("{:.0}°", self.controller.engine().camera().bearing)
    }

    /// Release the map surface. A fetch still in flight finds its receiver
    /// gone and drops the result.
    pub fn shutdown(self) {
        let engine = self.controller.teardown();
        tracing::debug!(animating = engine.is_animating(), "map surface released");
    }
}
