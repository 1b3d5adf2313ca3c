//! docsage - document analysis assistant
//!
//! Terminal UI for uploading spreadsheets, asking questions about them in
//! English or Indonesian, and exporting spreadsheet reports from the
//! analysis service.

mod app;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use docsage_core::{ApiClient, Config, Language, SessionManager, TokenStore};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;

#[derive(Parser)]
#[command(name = "docsage")]
#[command(about = "Ask questions about your spreadsheets and export the answers")]
#[command(version)]
struct Args {
    /// Path to a config file (defaults to ~/.config/docsage/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analysis service origin, e.g. http://localhost:8000
    #[arg(long)]
    backend: Option<String>,

    /// Initial answer language (en or id)
    #[arg(long)]
    language: Option<Language>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before touching any state
    Config::ensure_xdg_env();

    // Load configuration, then apply command-line overrides
    let mut config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };
    if let Some(backend) = args.backend {
        config.backend.base_url = backend;
    }
    if let Some(language) = args.language {
        config.ui.language = language;
    }

    // Initialize logging (to file, not stdout, since we own the terminal)
    let _log_guard =
        docsage_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(backend = %config.backend.base_url, "docsage TUI starting up");

    // Runtime for the network side; the UI loop itself stays synchronous
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    // Restore any persisted session before the first frame
    let sessions = SessionManager::new(TokenStore::new(Config::session_path()));
    if sessions.restore() {
        tracing::info!("restored a persisted session");
    }

    let client =
        ApiClient::new(&config.backend, sessions.handle()).context("failed to create API client")?;

    let download_dir = config.ui.resolved_download_dir();
    let mut app = App::new(
        sessions,
        client,
        runtime.handle().clone(),
        config.ui.language,
        download_dir,
    );
    app.bootstrap();

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("docsage TUI shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Apply completions from background work before drawing
        app.drain_events();

        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
