use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use lotes_map::app::{self, App};
use lotes_map::config::Config;
use lotes_map::data::ParcelSource;
use lotes_map::ui;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// ~60fps
const FRAME: Duration = Duration::from_millis(16);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config)?;

    tracing::info!(
        collection = %config.collection,
        source_file = ?config.source_file,
        style = %config.map_style,
        zoom = config.zoom,
        "starting parcel viewer"
    );

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config).await;

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(err) = &result {
        tracing::error!(error = %err, "viewer exited with an error");
    }
    result
}

/// The terminal belongs to the map, so logs go to a file
fn init_logging(config: &Config) -> Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("creating log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lotes_map=debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(terminal: &mut DefaultTerminal, config: &Config) -> Result<()> {
    let size = terminal.size()?;
    let parcels = app::spawn_fetch(ParcelSource::from_config(config));
    let mut app = App::new(config, size.width, size.height, parcels);

    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        app.update(now - last);
        last = now;

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Drain input without blocking so the fetch task keeps running
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }

        tokio::time::sleep(FRAME).await;
    }

    app.shutdown();
    Ok(())
}
