// Operator console: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the orchestrator reports.
// The orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use luckydraw_core::config::Config;
use luckydraw_core::draw::{CommitOutcome, DrawSnapshot};
use luckydraw_core::ledger::WinnerRecord;
use luckydraw_core::protocol::{UiUpdate, UserCommand};
use luckydraw_core::session::SessionState;

use layout::{build_layout, AppLayout};

/// Redraw period of the console (~30 fps).
pub const RENDER_INTERVAL: Duration = Duration::from_millis(33);

// ---------------------------------------------------------------------------
// Login form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    /// A sign-in request is in flight.
    pub pending: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LedgerView {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<WinnerRecord>),
    Error(String),
}

/// TUI-local state that mirrors the orchestrator's state for rendering.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub event_name: String,
    pub event_subtitle: String,
    /// Spinner pads numbers to this many digits.
    pub display_digits: usize,
    pub session: SessionState,
    pub draw: DrawSnapshot,
    /// Winner of the last completed draw. Cleared when a new draw starts.
    pub winner: Option<CommitOutcome>,
    pub draw_error: Option<String>,
    pub ledger: LedgerView,
    pub ledger_scroll: usize,
    pub login: LoginForm,
    pub confirm_quit: bool,
}

impl ViewState {
    /// Initial view; the login form is prefilled from `credentials.toml`.
    pub fn new(config: &Config) -> Self {
        Self {
            event_name: config.event.name.clone(),
            event_subtitle: config.event.subtitle.clone(),
            display_digits: config.draw.display_digits,
            session: SessionState::default(),
            draw: DrawSnapshot::default(),
            winner: None,
            draw_error: None,
            ledger: LedgerView::NotLoaded,
            ledger_scroll: 0,
            login: LoginForm {
                email: config.credentials.email.clone().unwrap_or_default(),
                password: config.credentials.password.clone().unwrap_or_default(),
                ..LoginForm::default()
            },
            confirm_quit: false,
        }
    }

    /// Largest useful ledger scroll offset: the index of the last row.
    pub fn max_ledger_scroll(&self) -> usize {
        match &self.ledger {
            LedgerView::Loaded(records) => records.len().saturating_sub(1),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Session(session) => {
            state.session = session;
            state.login.pending = false;
            if session.is_logged {
                state.login.error = None;
            } else {
                state.winner = None;
                state.draw_error = None;
                state.ledger = LedgerView::NotLoaded;
                state.ledger_scroll = 0;
            }
        }
        // A Settling snapshot carries the number being committed and
        // replaces whatever the last Spin showed.
        UiUpdate::Draw(snapshot) => {
            if snapshot.status == luckydraw_core::draw::DrawStatus::Loading {
                state.winner = None;
                state.draw_error = None;
            }
            state.draw = snapshot;
        }
        UiUpdate::Spin(number) => {
            state.draw.displayed = Some(number);
        }
        UiUpdate::Winner(outcome) => {
            state.winner = Some(*outcome);
        }
        UiUpdate::DrawError(message) => {
            state.draw_error = Some(message);
        }
        UiUpdate::LedgerLoading => {
            state.ledger = LedgerView::Loading;
        }
        UiUpdate::Ledger(records) => {
            state.ledger = LedgerView::Loaded(records);
            state.ledger_scroll = state.ledger_scroll.min(state.max_ledger_scroll());
        }
        UiUpdate::LedgerError(message) => {
            state.ledger = LedgerView::Error(message);
        }
        UiUpdate::SignInStarted => {
            state.login.pending = true;
            state.login.error = None;
        }
        UiUpdate::SignInFailed(message) => {
            state.login.pending = false;
            state.login.error = Some(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the login screen or the dashboard, plus the quit overlay.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let area = frame.area();
    if state.session.is_logged {
        let layout: AppLayout = build_layout(area);
        widgets::status_bar::render(frame, layout.status_bar, state);
        widgets::banner::render(frame, layout.banner, state);
        widgets::spinner::render(frame, layout.spinner, state);
        widgets::ledger::render(frame, layout.ledger, state);
        widgets::help_bar::render(frame, layout.help_bar, state);
    } else {
        widgets::login::render(frame, area, state);
    }

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, area);
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    mut view_state: ViewState,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Restore the terminal before the default panic output.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut event_stream = EventStream::new();

    // 3. Render interval (~30fps)
    let mut render_tick = tokio::time::interval(RENDER_INTERVAL);
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            // UI updates from the app orchestrator
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Orchestrator is gone
                    None => break Ok(()),
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                    None => break Ok(()),
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    // 4. Restore terminal
    ratatui::restore();

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
