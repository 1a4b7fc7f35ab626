//! TUI application state and event handling

use crate::idle::{Activity, IdleTracker};
use crate::poller::{FetchTicket, Poller};
use crate::qr::qr_code_lines;
use crate::session::{Bootstrap, ViewState};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use whreplay_common::{constants, CapturedRequest, DestinationState};

/// Maximum notifications on screen at once
const MAX_NOTIFICATIONS: usize = 5;

/// Which widget receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    RequestList,
    Destination,
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Success,
    Info,
    Error,
}

impl Variant {
    fn lifetime(&self) -> Duration {
        match self {
            Variant::Error => Duration::from_secs(15),
            Variant::Success | Variant::Info => Duration::from_secs(5),
        }
    }
}

/// A transient message shown over the dashboard
#[derive(Debug, Clone)]
pub struct Notification {
    pub variant: Variant,
    pub message: String,
    pub expires_at: Instant,
}

/// Events that can be sent to the TUI
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key event from terminal
    Key(KeyEvent),
    /// Mouse movement or any other input that counts as activity
    Input,
    /// A list fetch finished; `None` means it failed
    RequestsLoaded {
        ticket: FetchTicket,
        requests: Option<Vec<CapturedRequest>>,
        /// Identity cookie as it stands after the fetch
        ident: Option<String>,
    },
    /// A (re-)registration finished
    Registered(Bootstrap),
    /// A replay submission finished
    ReplayFinished { sent: bool },
    /// Message for the notification stack
    Notify(Variant, String),
    /// Poll interval elapsed
    Tick,
}

impl TuiEvent {
    /// Identity carried by this event, if any
    pub fn ident(&self) -> Option<&str> {
        match self {
            TuiEvent::RequestsLoaded { ident, .. } => ident.as_deref(),
            TuiEvent::Registered(outcome) => outcome.ident(),
            _ => None,
        }
    }
}

/// Work the event loop has to start on behalf of the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fetch(FetchTicket),
    SendReplay { request_id: i64, destination: String },
    Register,
    OpenCustomUrl(String),
    SaveDestination(String),
    Quit,
}

/// TUI application state
pub struct TuiApp {
    pub state: ViewState,
    pub base_url: String,
    pub focus: Focus,
    pub confirm_reset: bool,
    pub sending: bool,
    pub registering: bool,
    pub detail_scroll: u16,
    pub notifications: VecDeque<Notification>,
    pub version: String,
    pub qr_code_lines: Vec<String>,
    pub should_quit: bool,
    idle: IdleTracker,
    poller: Poller,
}

impl TuiApp {
    pub fn new(base_url: String, state: ViewState, now: Instant) -> Self {
        let mut app = Self {
            state,
            base_url,
            focus: Focus::RequestList,
            confirm_reset: false,
            sending: false,
            registering: false,
            detail_scroll: 0,
            notifications: VecDeque::with_capacity(MAX_NOTIFICATIONS),
            version: env!("CARGO_PKG_VERSION").to_string(),
            qr_code_lines: Vec::new(),
            should_quit: false,
            idle: IdleTracker::new(constants::IDLE_TIMEOUT, now),
            poller: Poller::new(),
        };
        app.refresh_qr_code();
        app
    }

    fn refresh_qr_code(&mut self) {
        self.qr_code_lines = self
            .custom_url()
            .map(|url| qr_code_lines(&url))
            .unwrap_or_default();
    }

    /// URL that captures requests for the current identity
    pub fn custom_url(&self) -> Option<String> {
        self.state
            .ident()
            .map(|ident| whreplay_common::custom_url(&self.base_url, ident))
    }

    /// Push a notification, dropping the oldest beyond the stack limit
    pub fn notify(&mut self, variant: Variant, message: impl Into<String>, now: Instant) {
        self.notifications.push_back(Notification {
            variant,
            message: message.into(),
            expires_at: now + variant.lifetime(),
        });
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    /// Drop expired notifications
    pub fn prune_notifications(&mut self, now: Instant) {
        self.notifications.retain(|n| n.expires_at > now);
    }

    /// Record user activity; leaves idle if needed
    pub fn on_input(&mut self, now: Instant) {
        if let Some(activity) = self.idle.record_input(now) {
            self.set_activity(activity, now);
        }
    }

    /// Enter idle once the inactivity window has passed
    pub fn on_idle_check(&mut self, now: Instant) {
        if let Some(activity) = self.idle.check(now) {
            self.set_activity(activity, now);
        }
    }

    fn set_activity(&mut self, activity: Activity, now: Instant) {
        tracing::info!("Activity changed to {:?}", activity);
        self.state = std::mem::take(&mut self.state).with_activity(activity);
        self.notify(Variant::Info, activity.transition_message(), now);
    }

    /// Periodic refresh; `None` while idle
    pub fn poll_tick(&mut self) -> Option<Action> {
        self.poller.on_tick(self.state.activity()).map(Action::Fetch)
    }

    /// Manual sync or refresh that ignores idleness
    pub fn force_refresh(&mut self, notify: bool) -> Action {
        Action::Fetch(self.poller.force(notify))
    }

    /// Apply a finished fetch if it is the latest one
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        requests: Option<Vec<CapturedRequest>>,
        ident: Option<String>,
        now: Instant,
    ) {
        if let Some(ident) = ident {
            self.adopt_ident(ident, now);
        }
        if !self.poller.complete(ticket.seq) {
            return;
        }
        let Some(requests) = requests else {
            return;
        };

        tracing::debug!("Done updating, {} requests", requests.len());
        let previous = self.state.selected_id();
        self.state = std::mem::take(&mut self.state).with_requests(requests);
        if self.state.selected_id() != previous {
            self.detail_scroll = 0;
        }

        if ticket.notify {
            self.notify(
                Variant::Success,
                "Successfully synchronized requests and replays with server",
                now,
            );
        }
    }

    /// Follow an identity the backend reissued behind our back
    fn adopt_ident(&mut self, ident: String, now: Instant) {
        if self.state.ident() == Some(ident.as_str()) {
            return;
        }
        tracing::info!("Identity changed to {}", ident);
        self.notify(Variant::Info, format!("Registered as {}", ident), now);
        self.state = std::mem::take(&mut self.state).with_ident(ident);
        self.refresh_qr_code();
    }

    /// A replay submission finished; the list is always refreshed afterwards
    pub fn replay_finished(&mut self, sent: bool, now: Instant) -> Action {
        self.sending = false;
        if sent {
            self.notify(Variant::Info, "Replay completed", now);
        }
        self.force_refresh(false)
    }

    /// A registration finished
    pub fn registered(&mut self, outcome: Bootstrap, now: Instant) -> Option<Action> {
        self.registering = false;
        match outcome {
            Bootstrap::Registered(ident) => {
                self.notify(Variant::Info, format!("Registered as {}", ident), now);
                self.state = std::mem::take(&mut self.state)
                    .with_ident(ident)
                    .cleared_selection();
                self.refresh_qr_code();
                self.detail_scroll = 0;
                Some(self.force_refresh(false))
            }
            Bootstrap::Existing(ident) => {
                self.state = std::mem::take(&mut self.state).with_ident(ident);
                self.refresh_qr_code();
                Some(self.force_refresh(false))
            }
            Bootstrap::Unavailable => None,
        }
    }

    /// Handle an event, returning work for the event loop
    pub fn handle_event(&mut self, event: TuiEvent, now: Instant) -> Option<Action> {
        match event {
            TuiEvent::Key(key) => {
                self.on_input(now);
                self.handle_key(key, now)
            }
            TuiEvent::Input => {
                self.on_input(now);
                None
            }
            TuiEvent::RequestsLoaded {
                ticket,
                requests,
                ident,
            } => {
                self.apply_fetch(ticket, requests, ident, now);
                None
            }
            TuiEvent::Registered(outcome) => self.registered(outcome, now),
            TuiEvent::ReplayFinished { sent } => Some(self.replay_finished(sent, now)),
            TuiEvent::Notify(variant, message) => {
                self.notify(variant, message, now);
                None
            }
            TuiEvent::Tick => self.poll_tick(),
        }
    }

    /// Handle key events
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<Action> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.should_quit = true;
            return Some(Action::Quit);
        }

        if self.confirm_reset {
            return self.handle_confirm_key(key);
        }

        match self.focus {
            Focus::Destination => self.handle_destination_key(key),
            Focus::RequestList => self.handle_list_key(key, now),
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.confirm_reset = false;
                if self.registering {
                    return None;
                }
                self.registering = true;
                Some(Action::Register)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_reset = false;
                None
            }
            _ => None,
        }
    }

    fn handle_destination_key(&mut self, key: KeyEvent) -> Option<Action> {
        let mut destination = self.state.destination().to_string();
        match (key.code, key.modifiers) {
            (KeyCode::Esc | KeyCode::Enter | KeyCode::Tab, _) => {
                self.focus = Focus::RequestList;
                return Some(Action::SaveDestination(destination));
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => destination.clear(),
            (KeyCode::Backspace, _) => {
                destination.pop();
            }
            (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => destination.push(c),
            _ => return None,
        }
        self.state = std::mem::take(&mut self.state).with_destination(destination);
        None
    }

    fn handle_list_key(&mut self, key: KeyEvent, now: Instant) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(Action::Quit)
            }
            KeyCode::Tab | KeyCode::Char('e') => {
                self.focus = Focus::Destination;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(ViewState::select_prev);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(ViewState::select_next);
                None
            }
            KeyCode::PageUp => {
                self.detail_scroll = self.detail_scroll.saturating_sub(10);
                None
            }
            KeyCode::PageDown => {
                self.detail_scroll = self.detail_scroll.saturating_add(10);
                None
            }
            KeyCode::Home => {
                self.detail_scroll = 0;
                None
            }
            KeyCode::Char('s') => Some(self.force_refresh(true)),
            KeyCode::Enter | KeyCode::Char('r') => self.send_replay(now),
            KeyCode::Char('R') => {
                self.confirm_reset = true;
                None
            }
            KeyCode::Char('o') => self.custom_url().map(Action::OpenCustomUrl),
            _ => None,
        }
    }

    fn move_selection(&mut self, step: fn(ViewState) -> ViewState) {
        let previous = self.state.selected_id();
        self.state = step(std::mem::take(&mut self.state));
        if self.state.selected_id() != previous {
            self.detail_scroll = 0;
        }
    }

    fn send_replay(&mut self, now: Instant) -> Option<Action> {
        if self.sending {
            return None;
        }
        let request_id = self.state.current()?.id;

        let destination = self.state.destination().to_string();
        if let Err(e) = DestinationState::of(&destination).check() {
            self.notify(Variant::Error, e.to_string(), now);
            return None;
        }

        tracing::info!("Sending replay of {} to {}", request_id, destination);
        self.sending = true;
        Some(Action::SendReplay {
            request_id,
            destination,
        })
    }
}
