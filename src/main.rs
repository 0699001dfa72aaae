use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::DefaultTerminal;
use shade_map::app::App;
use shade_map::config::Config;
use shade_map::store::{FileStore, KeyValueStore, ProposalStore};
use shade_map::{data, logging, ui};
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    let config = Config::parse();
    let _log_guard = logging::init(&config.log_file()).context("initializing logging")?;

    let datasets = data::load_all(&config.data_dir);
    let store_dir = config.store_dir();
    info!(store = %store_dir.display(), "opening proposal store");
    let kv: Box<dyn KeyValueStore> = Box::new(FileStore::new(store_dir));
    let store = ProposalStore::new(kv);

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let app = App::new(
        size.width,
        size.height,
        (config.lat, config.lng),
        config.zoom,
        store,
        &datasets,
    );
    let result = run(&mut terminal, app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            info!("exiting");
            break;
        }
    }

    Ok(())
}
