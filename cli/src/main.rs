//! Jifra CLI - Binary entry point and terminal session management.
//!
//! # Architecture
//!
//! The CLI bridges [`jifra_engine`] (session state and remote calls) and
//! [`jifra_tui`] (rendering and key mapping), providing RAII-based terminal
//! management with guaranteed cleanup.
//!
//! ```text
//! main() -> load config + credentials -> TerminalSession::new() -> run_app() -> App + TUI
//! ```
//!
//! # Event Loop
//!
//! The loop is event driven rather than frame driven:
//!
//! 1. Render frame
//! 2. Block (off the runtime) until the next terminal event
//! 3. Map the event to an action for the focused widget and apply it
//! 4. If a submit was queued, render the processing frame, then await the call
//!
//! Keys pressed during a remote call wait in the terminal's input buffer and
//! are handled once the call has finished.

use std::{
    fs::{self, OpenOptions},
    io::{Stdout, stdout},
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use jifra_config::JifraConfig;
use jifra_engine::{App, AppSettings, Credentials, GeminiClient};
use jifra_tui::{UiOptions, apply, draw, map_event};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_jifra_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // The TUI owns stdout and stderr; no log file means no logs.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_jifra_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in jifra_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn jifra_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.jifra/logs/jifra.log
    if let Some(config_path) = JifraConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("jifra.log"));
    }

    // Fallback: ./.jifra/logs/jifra.log
    candidates.push(PathBuf::from(".jifra").join("logs").join("jifra.log"));

    candidates
}

fn ui_options(config: Option<&JifraConfig>) -> UiOptions {
    config
        .and_then(|cfg| cfg.app.as_ref())
        .map(|app| UiOptions {
            ascii_only: app.ascii_only,
            high_contrast: app.high_contrast,
        })
        .unwrap_or_default()
}

/// Everything validated before the terminal is touched.
struct Startup {
    app: App<GeminiClient>,
    options: UiOptions,
}

fn startup() -> Result<Startup> {
    let config = JifraConfig::load().context("failed to load configuration")?;
    let credentials = Credentials::from_env(config.as_ref())?;
    let settings = AppSettings::from_config(&credentials, config.as_ref())
        .context("invalid configuration")?;

    let client = match config.as_ref().and_then(JifraConfig::api_base) {
        Some(base) => GeminiClient::with_base_url(credentials.api_key.clone(), base),
        None => GeminiClient::new(credentials.api_key.clone()),
    }
    .context("failed to build the Gemini client")?;

    Ok(Startup {
        app: App::new(client, settings),
        options: ui_options(config.as_ref()),
    })
}

/// RAII wrapper for terminal state with guaranteed cleanup on drop.
///
/// Enables raw mode, bracketed paste and the alternate screen. On drop all of
/// it is restored, so the terminal stays usable after panics or early returns.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnableBracketedPaste, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            let _ = execute!(out, LeaveAlternateScreen, DisableBracketedPaste);
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(t) => t,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen, DisableBracketedPaste);
                return Err(err.into());
            }
        };

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );
        let _ = self.terminal.show_cursor();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let Startup { mut app, options } = match startup() {
        Ok(startup) => startup,
        Err(err) => {
            tracing::error!("startup failed: {err:#}");
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match TerminalSession::new() {
        Ok(mut session) => run_app(&mut session.terminal, &mut app, options).await,
        Err(err) => Err(err.context("failed to initialize the terminal")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_app<B>(
    terminal: &mut Terminal<B>,
    app: &mut App<GeminiClient>,
    options: UiOptions,
) -> Result<()>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
{
    // Show the empty frame while the model list is fetched.
    terminal.draw(|frame| draw(frame, app, options))?;
    app.warm_up().await;

    loop {
        terminal.draw(|frame| draw(frame, app, options))?;
        if app.should_quit() {
            return Ok(());
        }

        let event = tokio::task::spawn_blocking(event::read)
            .await
            .context("input reader task failed")?
            .context("failed to read terminal event")?;

        let Some(action) = map_event(app.focus(), &event) else {
            continue;
        };
        if let Some(request) = apply(app, action) {
            terminal.draw(|frame| draw(frame, app, options))?;
            app.run(request).await;
        }
    }
}
