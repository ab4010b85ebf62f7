pub mod action;
pub mod actor;
pub mod state;
pub mod view;

use crate::client::RestClient;
use crate::config::Config;
use crate::logging;
use crate::session::SessionManager;
use crate::storage::LocalStorage;
use crate::theme::Theme;
use crate::tui::action::{Action, AppEvent};
use crate::tui::actor::Actor;
use crate::tui::state::{AppState, Command};
use crate::tui::view::draw;
use crate::view_model::TaskViewModel;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let storage = LocalStorage::open_default().context("opening local storage")?;
    let log_path = logging::init(storage.root(), &config.log_level)?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("panic: {}", info);
        restore_terminal();
        default_hook(info);
    }));

    info!(base_url = %config.base_url, log = %log_path.display(), "starting");

    let client = Arc::new(RestClient::from_config(&config)?);
    let mut sessions = SessionManager::new(client.clone(), storage.clone());
    if let Err(e) = sessions.restore() {
        warn!(error = %e, "could not read stored session");
    }
    let theme = Theme::load(&storage).unwrap_or_else(|e| {
        warn!(error = %e, "could not read theme preference");
        Theme::default()
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (action_tx, action_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);
    let actor = Actor::new(
        sessions,
        client,
        action_tx.clone(),
        event_tx,
        config.reload_interval(),
    );
    tokio::spawn(actor.run(action_rx));

    let result = ui_loop(&mut terminal, AppState::new(theme), &storage, action_tx, event_rx).await;

    restore_terminal();
    terminal.show_cursor()?;
    info!("stopped");
    result
}

async fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app_state: AppState,
    storage: &LocalStorage,
    action_tx: mpsc::Sender<Action>,
    mut event_rx: mpsc::Receiver<AppEvent<RestClient>>,
) -> Result<()> {
    let mut model: Option<Arc<TaskViewModel<RestClient>>> = None;

    loop {
        if let Some(m) = model.as_deref() {
            app_state.refresh(m);
        }
        terminal.draw(|f| draw(f, &mut app_state))?;

        while let Ok(event) = event_rx.try_recv() {
            match event {
                AppEvent::SessionStarted { username, model: m } => {
                    app_state.message = format!("Signed in as {}", username);
                    app_state.username = Some(username);
                    model = Some(m);
                }
                AppEvent::LoggedOut(msg) => {
                    model = None;
                    app_state.clear_session();
                    app_state.message = msg;
                }
                AppEvent::Status(msg) => app_state.message = msg,
                AppEvent::Error(msg) => app_state.message = format!("Error: {}", msg),
            }
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            Event::Mouse(mouse_event) => match mouse_event.kind {
                MouseEventKind::ScrollDown => app_state.next(),
                MouseEventKind::ScrollUp => app_state.previous(),
                _ => {}
            },
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match app_state.on_key(key) {
                    Some(Command::Quit) => {
                        let _ = action_tx.send(Action::Quit).await;
                        return Ok(());
                    }
                    Some(Command::ToggleTheme) => {
                        app_state.theme = app_state.theme.toggle();
                        if let Err(e) = app_state.theme.save(storage) {
                            warn!(error = %e, "could not save theme preference");
                        }
                    }
                    Some(Command::Send(action)) => {
                        if action_tx.send(action).await.is_err() {
                            app_state.message = "Error: background worker stopped".to_string();
                        }
                    }
                    None => {}
                }
            }
            _ => {}
        }
    }
}
