use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::map::{MarkerKind, SurfaceFrame};
use crate::presenter::{DetailCard, DetailTab, Field};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Widget, Wrap},
    Frame,
};

const PARCEL_FILL: Color = Color::Rgb(0, 136, 136);
const PARCEL_HIGHLIGHT: Color = Color::Rgb(0, 204, 204);
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Where everything goes on screen. Shared by rendering and mouse
/// hit-testing so both agree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Screen {
    pub map: Rect,
    /// Map area inside its border
    pub inner: Rect,
    pub status: Rect,
}

impl Screen {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Map
                Constraint::Length(1), // Status bar
            ])
            .split(area);
        let map = chunks[0];
        Self {
            map,
            inner: Block::default().borders(Borders::ALL).inner(map),
            status: chunks[1],
        }
    }

    /// Map size in braille pixels (2x4 per character)
    pub fn map_pixels(&self) -> (usize, usize) {
        (self.inner.width as usize * 2, self.inner.height as usize * 4)
    }

    /// Braille pixel at the center of a terminal cell, if it lies on the map
    pub fn to_map_pixel(&self, pos: Position) -> Option<(i32, i32)> {
        if !self.inner.contains(pos) {
            return None;
        }
        let col = (pos.x - self.inner.x) as i32;
        let row = (pos.y - self.inner.y) as i32;
        Some((col * 2 + 1, row * 4 + 2))
    }

    /// Detail card, on the left so the selected parcel stays visible on the
    /// right
    pub fn card(&self) -> Rect {
        let width = (self.inner.width / 2).saturating_sub(2).clamp(1, 48);
        let height = self.inner.height.saturating_sub(2).clamp(1, 18);
        Rect::new(self.inner.x + 1, self.inner.y + 1, width, height).intersection(self.inner)
    }

    /// Panorama dialog, centered
    pub fn dialog(&self) -> Rect {
        let width = self.inner.width * 7 / 10;
        let height = self.inner.height * 6 / 10;
        Rect::new(
            self.inner.x + (self.inner.width - width) / 2,
            self.inner.y + (self.inner.height - height) / 2,
            width,
            height,
        )
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let screen = app.screen;

    render_map(frame, app, &screen);

    if app.is_loading() {
        render_loading(frame, app, screen.inner);
    }

    if let Some(card) = app.presenter.card(app.controller.selected_parcel()) {
        render_card(frame, &card, screen.card());
    }

    if app.panorama.is_open() {
        render_panorama(frame, app, screen.dialog());
    }

    render_status_bar(frame, app, screen.status);
}

fn render_map(frame: &mut Frame, app: &App, screen: &Screen) {
    let engine = app.controller.engine();
    let title = match engine.style_name() {
        Some(style) => format!(" Lotes · {style} "),
        None => " Lotes ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, screen.map);

    let inner = screen.inner;
    let surface = engine.render(inner.width as usize, inner.height as usize);
    let overlay_open = app.card_open() || app.panorama.is_open();
    frame.render_widget(MapWidget { surface, dim: overlay_open }, inner);
}

/// Braille parcels with marker labels overlaid
struct MapWidget {
    surface: SurfaceFrame,
    /// Backdrop behind the card or dialog
    dim: bool,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        let color = if self.dim { Color::DarkGray } else { color };
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.render_layer(&self.surface.fills, PARCEL_FILL, area, buf);
        self.render_layer(&self.surface.highlighted, PARCEL_HIGHLIGHT, area, buf);
        self.render_layer(&self.surface.outlines, Color::White, area, buf);
        self.render_layer(&self.surface.photos, Color::Yellow, area, buf);

        for glyph in &self.surface.markers {
            if glyph.row >= area.height || glyph.col >= area.width {
                continue;
            }
            let style = match (self.dim, glyph.kind) {
                (true, _) => Style::default().fg(Color::DarkGray),
                (false, MarkerKind::Photo) => Style::default().fg(Color::Yellow),
                (false, MarkerKind::Label) => Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            };
            let x = area.x + glyph.col;
            let y = area.y + glyph.row;
            for (i, ch) in glyph.text.chars().enumerate() {
                let px = x + i as u16;
                if px < area.x + area.width {
                    buf[(px, y)].set_char(ch).set_style(style);
                }
            }
        }
    }
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let spinner = SPINNER[(app.frame / 4) as usize % SPINNER.len()];
    let text = format!(" {spinner} Cargando lotes... ");
    let width = (text.chars().count() as u16).min(area.width);
    let rect = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + area.height / 2,
        width,
        area.height.min(1),
    );
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Cyan)),
        rect,
    );
}

fn render_card(frame: &mut Frame, card: &DetailCard, area: Rect) {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {} ", card.info.title),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let tabs = Tabs::new(DetailTab::ALL.iter().map(|t| t.title()))
        .select(card.tab.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    frame.render_widget(tabs, chunks[0]);

    let lines = match card.tab {
        DetailTab::Info => info_lines(card),
        DetailTab::Contact => contact_lines(card),
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[1]);
}

fn info_lines(card: &DetailCard) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            card.info.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for (label, value) in &card.info.rows {
        lines.push(Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value.clone()),
        ]));
    }
    lines.push(Line::default());
    lines.push(hint("Tab: contacto  Esc: cerrar"));
    lines
}

fn contact_lines(card: &DetailCard) -> Vec<Line<'static>> {
    let form = card.form;
    let mut lines = Vec::new();
    for field in Field::ALL {
        let focused = form.focused() == field;
        let marker = if focused { "▸ " } else { "  " };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}:", field.label()),
            Style::default().fg(if focused { Color::Cyan } else { Color::Gray }),
        )));
        let cursor = if focused { "▏" } else { "" };
        lines.push(Line::from(format!("  {}{cursor}", form.value(field))));
        if let Some(message) = form.error_for(field) {
            lines.push(Line::from(Span::styled(
                format!("  {message}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines.push(Line::default());
    if form.is_sent() {
        lines.push(Line::from(Span::styled(
            "Formulario enviado",
            Style::default().fg(Color::Green),
        )));
    }
    lines.push(hint("↑↓: campo  Enter: enviar  Tab: info  Esc: cerrar"));
    lines
}

fn hint(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn render_panorama(frame: &mut Frame, app: &App, area: Rect) {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Tour 360° ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    let scene = app.panorama.scene().unwrap_or_default().to_string();
    let command = app.panorama.command().unwrap_or_default();
    let lines = vec![
        Line::from(vec![
            Span::styled("Escena: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(scene),
        ]),
        Line::from(vec![
            Span::styled("Tour: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.panorama.tour_xml().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Comando: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(command, Style::default().fg(Color::Cyan)),
        ]),
        Line::default(),
        hint("Esc: cerrar"),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" Rumbo: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.bearing(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(flash) = &app.flash {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(flash.clone(), Style::default().fg(Color::Green)));
    }
    spans.push(Span::styled(
        " | hjkl:mover +/-:zoom [ ]:rotar r:inicio q:salir",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
