//! Dashboard event loop: terminal input, polling and backend calls

use super::app::{Action, TuiApp, TuiEvent, Variant};
use crate::api::{ErrorCallback, ReplayClient};
use crate::config::Config;
use crate::poller::TaskGuard;
use crate::session::{self, ViewState};
use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use whreplay_common::constants;

/// Run the dashboard until the user quits
pub async fn run(config: Config) -> Result<()> {
    let (tui_tx, tui_rx) = mpsc::channel::<TuiEvent>(100);

    let error_tx = tui_tx.clone();
    let on_error: ErrorCallback = Arc::new(move |message| {
        if error_tx.try_send(TuiEvent::Notify(Variant::Error, message)).is_err() {
            tracing::warn!("Dropped error notification, event queue full");
        }
    });

    let client = ReplayClient::new(config.base_url(), config.ident(), on_error)?;
    let state = ViewState::new(None, config.replay_url.clone().unwrap_or_default());
    let mut app = TuiApp::new(client.base_url().to_string(), state, Instant::now());

    // Setup terminal
    let guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut runner = Runner {
        client,
        config,
        tasks: TaskGuard::new(),
        tui_tx,
    };
    let result = runner.run_loop(&mut terminal, &mut app, tui_rx).await;
    runner.tasks.abort_all();

    drop(guard);
    result
}

/// Raw mode and alternate screen, undone on drop whichever way we exit
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableMouseCapture,
            cursor::Show
        );
    }
}

struct Runner {
    client: ReplayClient,
    config: Config,
    tasks: TaskGuard,
    tui_tx: mpsc::Sender<TuiEvent>,
}

impl Runner {
    async fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &mut TuiApp,
        mut tui_rx: mpsc::Receiver<TuiEvent>,
    ) -> Result<()> {
        self.bootstrap();

        let mut tick_interval = tokio::time::interval(Duration::from_millis(100));
        // First scheduled refresh one period after start; the bootstrap fetches immediately
        let mut poll_interval = tokio::time::interval_at(
            tokio::time::Instant::now() + constants::POLL_INTERVAL,
            constants::POLL_INTERVAL,
        );

        loop {
            terminal.draw(|f| super::draw(f, app))?;

            let actions = tokio::select! {
                // Handle terminal input (non-blocking)
                _ = tick_interval.tick() => {
                    let mut actions = Vec::new();
                    while event::poll(Duration::from_millis(0))? {
                        let input = match event::read()? {
                            Event::Key(key) if key.kind == KeyEventKind::Press => TuiEvent::Key(key),
                            Event::Mouse(_) => TuiEvent::Input,
                            _ => continue,
                        };
                        actions.extend(app.handle_event(input, Instant::now()));
                    }

                    let now = Instant::now();
                    app.on_idle_check(now);
                    app.prune_notifications(now);
                    actions
                }

                _ = poll_interval.tick() => {
                    app.handle_event(TuiEvent::Tick, Instant::now()).into_iter().collect()
                }

                // Results from spawned backend calls
                Some(event) = tui_rx.recv() => {
                    if let Some(ident) = event.ident() {
                        self.remember_identity(ident);
                    }
                    app.handle_event(event, Instant::now()).into_iter().collect()
                }
            };

            for action in actions {
                if !self.perform(action, app) {
                    return Ok(());
                }
            }
        }
    }

    /// Adopt the stored identity or register a new one
    fn bootstrap(&mut self) {
        let client = self.client.clone();
        let tx = self.tui_tx.clone();
        self.tasks.track(tokio::spawn(async move {
            let outcome = session::ensure_identity(&client).await;
            let _ = tx.send(TuiEvent::Registered(outcome)).await;
        }));
    }

    /// Start the work an action asks for. Returns false on quit.
    fn perform(&mut self, action: Action, app: &mut TuiApp) -> bool {
        match action {
            Action::Fetch(ticket) => {
                let client = self.client.clone();
                let tx = self.tui_tx.clone();
                self.tasks.replace_fetch(tokio::spawn(async move {
                    let requests = client.list_requests().await;
                    // The backend reissues the cookie when it does not know the ident
                    let ident = requests.as_ref().and_then(|_| client.ident());
                    let _ = tx
                        .send(TuiEvent::RequestsLoaded {
                            ticket,
                            requests,
                            ident,
                        })
                        .await;
                }));
            }

            Action::SendReplay {
                request_id,
                destination,
            } => {
                let client = self.client.clone();
                let tx = self.tui_tx.clone();
                self.tasks.track(tokio::spawn(async move {
                    let sent = client.send_replay(request_id, &destination).await.is_some();
                    let _ = tx.send(TuiEvent::ReplayFinished { sent }).await;
                }));
            }

            Action::Register => {
                let client = self.client.clone();
                let tx = self.tui_tx.clone();
                self.tasks.track(tokio::spawn(async move {
                    let outcome = session::register(&client).await;
                    let _ = tx.send(TuiEvent::Registered(outcome)).await;
                }));
            }

            Action::OpenCustomUrl(url) => {
                if let Err(e) = open::that(&url) {
                    tracing::debug!("Failed to open browser: {}", e);
                    app.notify(
                        Variant::Error,
                        format!("Could not open {} in a browser", url),
                        Instant::now(),
                    );
                }
            }

            Action::SaveDestination(destination) => {
                self.config.replay_url = (!destination.is_empty()).then_some(destination);
                if let Err(e) = self.config.save() {
                    tracing::warn!("Failed to save replay URL: {:#}", e);
                }
            }

            Action::Quit => return false,
        }
        true
    }

    fn remember_identity(&mut self, ident: &str) {
        if !self.config.set_ident(ident.to_string()) {
            return;
        }
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save identity: {:#}", e);
        }
    }
}
