mod app;
mod cache;
mod cli;
mod config;
mod event;
mod ipc;
mod model;
mod remote;
mod sync;
mod tracker;
mod ui;
mod util;

use std::io;
use std::panic;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use app::{Action, App};
use cache::DraftSlot;
use sync::Lifecycle;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("capture") | Some("add") => match cli::handle_capture(&args[1..]).await? {
            cli::CaptureOutcome::Done => return Ok(()),
            // The fallback stashed the draft; open the confirmation surface.
            cli::CaptureOutcome::OpenDashboard => {}
        },
        Some("help") | Some("--help") | Some("-h") => {
            cli::print_help();
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown command '{other}'\n");
            cli::print_help();
            std::process::exit(1);
        }
        None => {}
    }

    run_dashboard().await
}

/// Log to a file; the terminal belongs to the dashboard.
fn init_tracing() {
    let log_path = config::data_dir().join("snag.log");
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snag=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
}

async fn run_dashboard() -> Result<()> {
    // Load config
    let config = config::load_config()?;
    let lifecycle = Lifecycle::new(&config);

    // Set up action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    // A capture stashed by the fallback path opens the confirmation form.
    let pending_draft = DraftSlot::new().take();

    let mut app = App::new(lifecycle, action_tx.clone(), pending_draft);

    // Wake the task store in the background; the standby screen tracks it
    // and the app's token cancels the poll on quit.
    {
        let remote = app.lifecycle.remote.clone();
        let cancel = app.wake_cancel.clone();
        let tx = action_tx.clone();
        tokio::spawn(async move { remote.wake_up(cancel, tx).await });
    }

    // Capture socket, so `snag capture` can hand drafts to this instance.
    {
        let tx = action_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = ipc::serve(ipc::socket_path(), tx).await {
                tracing::warn!(error = %err, "capture socket unavailable");
            }
        });
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Spawn event reader
    let event_tx = action_tx.clone();
    tokio::spawn(async move {
        event::run_event_loop(event_tx).await;
    });

    // Main loop
    loop {
        // Render
        terminal.draw(|f| ui::render(f, &app))?;

        // Wait for action
        if let Some(action) = action_rx.recv().await {
            app.update(action).await;
            if app.should_quit {
                break;
            }
        } else {
            break;
        }
    }

    // Drop the socket so later capture probes fail fast.
    let _ = std::fs::remove_file(ipc::socket_path());

    // Restore terminal
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
