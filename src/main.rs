use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::error;
use ratatui::prelude::*;
use std::{error::Error, io};

use todomatic::app::{
    config::Config,
    logging::init_logging,
    storage::Storage,
    store::TaskStore,
    ui::{run_app, App},
};

// Start the app.
// The terminal handling is based on:
// https://github.com/ratatui-org/ratatui/blob/main/examples/list.rs
pub fn main() -> Result<(), Box<dyn Error>> {
    // Everything that can fail on bad settings happens before the terminal is taken over
    let config = Config::from_env()?;
    init_logging(&config.log_level, &config.resolved_log_dir()?)?;

    // Load the tasks saved by the previous session
    let store = TaskStore::open(Storage::open(&config.db_path)?);

    // Position lookups run on a background runtime so the UI never waits for them
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let app = App::new(
        store,
        config.geolocator(),
        config.geolocation_timeout,
        config.camera(),
        config.photo_viewer(),
        runtime.handle().clone(),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, config.tick_rate);

    // Restore previous terminal state after exit
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("event=app_exit module=main status=error error={err}");
        return Err(err.into());
    }

    Ok(())
}
