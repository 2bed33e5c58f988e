// Application state and orchestration logic.
//
// The central event loop that owns the draw engine and the winner ledger.
// It reacts to user commands from the TUI, results from background tasks,
// spin ticks, and session changes, and pushes UI updates to the TUI render
// loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::RemoteService;
use crate::config::Config;
use crate::db::Database;
use crate::draw::{DrawEngine, PoolEffect};
use crate::ledger::{self, WinnerRecord};
use crate::protocol::{TaskEvent, UiUpdate, UserCommand};
use crate::session::SessionStore;

pub const NO_ENTRANTS_MESSAGE: &str = "No eligible entrants";
pub const SIGN_IN_FAILED_MESSAGE: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub store: Arc<SessionStore>,
    pub service: Arc<dyn RemoteService>,
    pub engine: DrawEngine,
    pub ledger: Vec<WinnerRecord>,
    /// Identifies the latest ledger request. Responses from older requests
    /// are discarded in `handle_task_event`.
    pub ledger_generation: u64,
    /// Background tasks report back through clones of this sender.
    pub task_tx: mpsc::Sender<TaskEvent>,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<SessionStore>,
        service: Arc<dyn RemoteService>,
        db: Option<Arc<Database>>,
        task_tx: mpsc::Sender<TaskEvent>,
    ) -> Self {
        let engine = DrawEngine::new(
            service.clone(),
            db,
            task_tx.clone(),
            config.draw.tick_interval(),
        );
        Self {
            store,
            service,
            engine,
            ledger: Vec::new(),
            ledger_generation: 0,
            task_tx,
        }
    }

    fn is_logged(&self) -> bool {
        self.store.state().is_logged
    }

    /// Spawn a ledger refresh, superseding any in flight.
    fn refresh_ledger(&mut self) -> u64 {
        self.ledger_generation += 1;
        let generation = self.ledger_generation;
        let service = self.service.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = ledger::refresh(service.as_ref()).await;
            let _ = tx.send(TaskEvent::LedgerLoaded { generation, result }).await;
        });
        generation
    }

    fn spawn_sign_in(&self, email: String, password: String) {
        let service = self.service.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = service.sign_in(&email, &password).await;
            let _ = tx.send(TaskEvent::SignedIn(result)).await;
        });
    }

    fn force_logout(&self, cause: &str) {
        warn!("Session rejected by the service ({cause}), signing out");
        self.store.logout();
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens with `tokio::select!` on:
/// 1. User commands from the TUI
/// 2. Results from background tasks (pool load, commit, ledger, sign-in)
/// 3. Spin ticks from the draw engine
/// 4. Session state changes
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut task_rx: mpsc::Receiver<TaskEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut session_rx = state.store.subscribe();
    let mut session_open = true;

    let initial = *session_rx.borrow_and_update();
    let _ = ui_tx.send(UiUpdate::Session(initial)).await;
    let _ = ui_tx
        .send(UiUpdate::Draw(state.engine.session().snapshot()))
        .await;
    if initial.is_logged {
        state.refresh_ledger();
        let _ = ui_tx.send(UiUpdate::LedgerLoading).await;
    }

    loop {
        tokio::select! {
            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Background task results ---
            event = task_rx.recv() => {
                if let Some(event) = event {
                    handle_task_event(&mut state, event, &ui_tx).await;
                }
            }

            // --- Spin ticks ---
            cycle = state.engine.next_tick() => {
                if let Some(number) = state.engine.on_tick(cycle) {
                    let _ = ui_tx.send(UiUpdate::Spin(number)).await;
                }
            }

            // --- Session changes ---
            changed = session_rx.changed(), if session_open => {
                if changed.is_err() {
                    session_open = false;
                    continue;
                }
                let session = *session_rx.borrow_and_update();
                info!(is_logged = session.is_logged, "Session state changed");
                let _ = ui_tx.send(UiUpdate::Session(session)).await;
                if session.is_logged {
                    state.refresh_ledger();
                    let _ = ui_tx.send(UiUpdate::LedgerLoading).await;
                } else {
                    state.engine.cancel();
                    state.ledger.clear();
                    let _ = ui_tx
                        .send(UiUpdate::Draw(state.engine.session().snapshot()))
                        .await;
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::ToggleDraw => {
            if !state.is_logged() {
                debug!("Toggle ignored: not signed in");
                return;
            }
            let effect = state.engine.toggle();
            debug!(?effect, "Toggle");
            let _ = ui_tx
                .send(UiUpdate::Draw(state.engine.session().snapshot()))
                .await;
        }
        UserCommand::RetryLedger => {
            if state.is_logged() {
                info!("Retrying winner ledger");
                state.refresh_ledger();
                let _ = ui_tx.send(UiUpdate::LedgerLoading).await;
            }
        }
        UserCommand::SignIn { email, password } => {
            if state.is_logged() {
                debug!("Sign-in ignored: already signed in");
                return;
            }
            info!(%email, "Signing in");
            state.spawn_sign_in(email, password);
            let _ = ui_tx.send(UiUpdate::SignInStarted).await;
        }
        UserCommand::Logout => {
            state.store.logout();
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Handle a result from a background task.
async fn handle_task_event(
    state: &mut AppState,
    event: TaskEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        TaskEvent::PoolLoaded { cycle, result } => {
            let effect = state.engine.on_pool_loaded(cycle, result);
            if effect == PoolEffect::Stale {
                return;
            }
            let _ = ui_tx
                .send(UiUpdate::Draw(state.engine.session().snapshot()))
                .await;
            match effect {
                PoolEffect::Failed(err) => {
                    let _ = ui_tx.send(UiUpdate::DrawError(err.user_message())).await;
                    if err.requires_login() {
                        state.force_logout("pool load");
                    }
                }
                PoolEffect::NoEntrants => {
                    let _ = ui_tx
                        .send(UiUpdate::DrawError(NO_ENTRANTS_MESSAGE.to_string()))
                        .await;
                }
                PoolEffect::Started | PoolEffect::Disabled | PoolEffect::Stale => {}
            }
        }
        TaskEvent::Committed {
            cycle,
            number,
            result,
        } => {
            let Some(settled) = state.engine.on_committed(cycle, number, result) else {
                return;
            };
            let _ = ui_tx
                .send(UiUpdate::Winner(Box::new(settled.outcome)))
                .await;
            let _ = ui_tx
                .send(UiUpdate::Draw(state.engine.session().snapshot()))
                .await;
            if settled.requires_login {
                state.force_logout("commit");
            } else {
                state.refresh_ledger();
                let _ = ui_tx.send(UiUpdate::LedgerLoading).await;
            }
        }
        TaskEvent::LedgerLoaded { generation, result } => {
            if generation != state.ledger_generation {
                debug!(
                    generation,
                    current = state.ledger_generation,
                    "Discarding stale ledger result"
                );
                return;
            }
            match result {
                Ok(records) => {
                    state.ledger = records.clone();
                    let _ = ui_tx.send(UiUpdate::Ledger(records)).await;
                }
                Err(err) => {
                    warn!("Winner ledger failed to load: {err}");
                    let _ = ui_tx
                        .send(UiUpdate::LedgerError(ledger::error_message(&err)))
                        .await;
                    if err.requires_login() {
                        state.force_logout("ledger");
                    }
                }
            }
        }
        TaskEvent::SignedIn(result) => match result {
            Ok(()) => info!("Sign-in succeeded"),
            Err(err) => {
                warn!("Sign-in failed: {err}");
                let message = err.user_message(SIGN_IN_FAILED_MESSAGE, SIGN_IN_FAILED_MESSAGE);
                let _ = ui_tx.send(UiUpdate::SignInFailed(message)).await;
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::api::{CommitResponse, Entrant, EntrantList, NewEntrant, Prize};
    use crate::config::{CredentialsConfig, DrawConfig, EventConfig, ServerConfig};
    use crate::draw::{DrawStatus, OutcomeSource};
    use crate::error::ApiError;
    use crate::session::Credential;

    struct FakeService {
        store: Arc<SessionStore>,
        prizes: Mutex<Vec<Prize>>,
        commit_error: Option<ApiError>,
    }

    #[async_trait]
    impl RemoteService for FakeService {
        async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
            if password != "secret" {
                return Err(ApiError::Unauthorized {
                    message: String::new(),
                });
            }
            self.store.login(Credential {
                access_token: format!("token-{email}"),
                refresh_token: "refresh".into(),
                subject_id: "1".into(),
            });
            Ok(())
        }

        async fn list_entrants(&self) -> Result<EntrantList, ApiError> {
            let entrants = ["101", "102", "103"]
                .iter()
                .map(|c| serde_json::from_value::<Entrant>(json!({"userContact": c})).unwrap())
                .collect();
            Ok(EntrantList {
                entrants,
                remaining_prizes: 2,
            })
        }

        async fn create_entrant(&self, _: &NewEntrant) -> Result<Entrant, ApiError> {
            unimplemented!()
        }

        async fn list_prizes(&self) -> Result<Vec<Prize>, ApiError> {
            Ok(self.prizes.lock().unwrap().clone())
        }

        async fn commit_winner(&self, number: u64) -> Result<CommitResponse, ApiError> {
            if let Some(err) = &self.commit_error {
                return Err(err.clone());
            }
            let prize = Prize {
                id: 1,
                gift_name: Some("Hamper".into()),
                gift_winner: Some(number.to_string()),
                gift_winner_name: Some("Layla".into()),
                ..Prize::default()
            };
            self.prizes.lock().unwrap().push(prize.clone());
            Ok(CommitResponse {
                status: Some(200),
                message: Some("ok".into()),
                data: Some(prize),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            event: EventConfig {
                name: "Test Draw".into(),
                subtitle: String::new(),
            },
            server: ServerConfig {
                base_url: "http://localhost:5000".into(),
                prefix: "api/v1".into(),
                timeout_ms: 3000,
            },
            draw: DrawConfig {
                tick_interval_ms: 10,
                display_digits: 6,
            },
            credentials: CredentialsConfig::default(),
            db_path: ":memory:".into(),
        }
    }

    struct Harness {
        cmd_tx: mpsc::Sender<UserCommand>,
        ui_rx: mpsc::Receiver<UiUpdate>,
        store: Arc<SessionStore>,
        handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    }

    fn start(logged_in: bool, commit_error: Option<ApiError>) -> Harness {
        let store = Arc::new(SessionStore::in_memory());
        if logged_in {
            store.login(Credential {
                access_token: "a".into(),
                refresh_token: "r".into(),
                subject_id: "1".into(),
            });
        }
        let service = Arc::new(FakeService {
            store: store.clone(),
            prizes: Mutex::new(Vec::new()),
            commit_error,
        });
        let (task_tx, task_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, ui_rx) = mpsc::channel(256);
        let state = AppState::new(&test_config(), store.clone(), service, None, task_tx);
        let handle = tokio::spawn(run(cmd_rx, task_rx, ui_tx, state));
        Harness {
            cmd_tx,
            ui_rx,
            store,
            handle,
        }
    }

    /// Receive updates until one matches, returning it.
    async fn wait_for(
        rx: &mut mpsc::Receiver<UiUpdate>,
        pred: impl Fn(&UiUpdate) -> bool,
    ) -> UiUpdate {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let update = rx.recv().await.expect("ui channel closed");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let h = start(false, None);
        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let result = h.handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn startup_reports_session_and_loads_ledger_when_logged_in() {
        let mut h = start(true, None);

        let first = h.ui_rx.recv().await.unwrap();
        assert_eq!(first, UiUpdate::Session(crate::session::SessionState { is_logged: true }));
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await;

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_ignored_when_logged_out() {
        let mut h = start(false, None);
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Draw(_))).await;

        h.cmd_tx.send(UserCommand::ToggleDraw).await.unwrap();
        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;

        while let Ok(update) = h.ui_rx.try_recv() {
            assert!(
                !matches!(update, UiUpdate::Draw(_)),
                "unexpected draw update {update:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn draw_cycle_announces_winner_and_refreshes_ledger() {
        let mut h = start(true, None);
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await;

        h.cmd_tx.send(UserCommand::ToggleDraw).await.unwrap();
        wait_for(&mut h.ui_rx, |u| {
            matches!(u, UiUpdate::Draw(s) if s.status == DrawStatus::Spinning)
        })
        .await;
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Spin(_))).await;

        h.cmd_tx.send(UserCommand::ToggleDraw).await.unwrap();
        let UiUpdate::Winner(outcome) =
            wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Winner(_))).await
        else {
            unreachable!()
        };
        assert_eq!(outcome.source, OutcomeSource::Confirmed);
        assert_eq!(outcome.outcome.prize, "Hamper");
        assert!([101, 102, 103].contains(&outcome.outcome.winner_number));

        let UiUpdate::Ledger(records) =
            wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await
        else {
            unreachable!()
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].winner_name, "Layla");

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_commit_publishes_fallback_then_logs_out() {
        let mut h = start(
            true,
            Some(ApiError::AuthInvalid {
                message: "expired".into(),
            }),
        );
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await;

        h.cmd_tx.send(UserCommand::ToggleDraw).await.unwrap();
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Spin(_))).await;
        h.cmd_tx.send(UserCommand::ToggleDraw).await.unwrap();

        let UiUpdate::Winner(outcome) =
            wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Winner(_))).await
        else {
            unreachable!()
        };
        assert!(outcome.is_fallback());
        assert_eq!(
            outcome.outcome.winner_name,
            format!("Winner #{}", outcome.outcome.winner_number)
        );

        wait_for(&mut h.ui_rx, |u| {
            matches!(u, UiUpdate::Session(s) if !s.is_logged)
        })
        .await;
        assert!(!h.store.state().is_logged);

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn sign_in_success_loads_ledger() {
        let mut h = start(false, None);

        h.cmd_tx
            .send(UserCommand::SignIn {
                email: "op@example.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();

        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::SignInStarted)).await;
        wait_for(&mut h.ui_rx, |u| {
            matches!(u, UiUpdate::Session(s) if s.is_logged)
        })
        .await;
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await;

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn sign_in_failure_reports_message() {
        let mut h = start(false, None);

        h.cmd_tx
            .send(UserCommand::SignIn {
                email: "op@example.com".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap();

        let update = wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::SignInFailed(_))).await;
        assert_eq!(
            update,
            UiUpdate::SignInFailed(SIGN_IN_FAILED_MESSAGE.to_string())
        );
        assert!(!h.store.state().is_logged);

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn logout_command_clears_session() {
        let mut h = start(true, None);
        wait_for(&mut h.ui_rx, |u| matches!(u, UiUpdate::Ledger(_))).await;

        h.cmd_tx.send(UserCommand::Logout).await.unwrap();
        wait_for(&mut h.ui_rx, |u| {
            matches!(u, UiUpdate::Session(s) if !s.is_logged)
        })
        .await;
        assert!(h.store.access_token().is_none());

        h.cmd_tx.send(UserCommand::Quit).await.unwrap();
        let _ = h.handle.await;
    }
}
