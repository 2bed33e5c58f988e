// Draw engine: runs the draw state machine against the remote service.
//
// The engine is owned by the orchestrator task. Pool loads and commits run
// as spawned tasks that report back as `TaskEvent`s; the spin timer is an
// `Interval` the orchestrator polls through `next_tick`, so ticks queue up
// with every other event.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::outcome::{resolve_commit, CommitOutcome, OutcomeSource};
use super::state::{DrawSession, DrawStatus, StartOutcome};
use crate::api::{CommitResponse, RemoteService};
use crate::db::Database;
use crate::error::ApiError;
use crate::pool::{self, CandidatePool, PoolError};
use crate::protocol::TaskEvent;

/// Result of a Space/Enter press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleEffect {
    Ignored,
    Loading { cycle: u64 },
    Stopped { cycle: u64, number: u64 },
}

/// Result of a finished pool load.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEffect {
    Stale,
    Started,
    Disabled,
    NoEntrants,
    Failed(PoolError),
}

/// A commit answered (or failed) and the session is idle again.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    pub outcome: CommitOutcome,
    /// The commit failed because the session is gone.
    pub requires_login: bool,
}

pub struct DrawEngine {
    session: DrawSession,
    service: Arc<dyn RemoteService>,
    db: Option<Arc<Database>>,
    task_tx: mpsc::Sender<TaskEvent>,
    tick_interval: Duration,
    ticker: Option<(u64, Interval)>,
}

impl DrawEngine {
    pub fn new(
        service: Arc<dyn RemoteService>,
        db: Option<Arc<Database>>,
        task_tx: mpsc::Sender<TaskEvent>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            session: DrawSession::new(),
            service,
            db,
            task_tx,
            tick_interval,
            ticker: None,
        }
    }

    pub fn session(&self) -> &DrawSession {
        &self.session
    }

    /// Start when idle, stop when spinning, ignore otherwise.
    pub fn toggle(&mut self) -> ToggleEffect {
        match self.session.status() {
            DrawStatus::Idle => match self.session.begin_start() {
                Some(cycle) => {
                    info!(cycle, "Draw started, loading candidate pool");
                    self.spawn_pool_load(cycle);
                    ToggleEffect::Loading { cycle }
                }
                None => {
                    debug!("Start ignored: draw disabled");
                    ToggleEffect::Ignored
                }
            },
            DrawStatus::Spinning => match self.session.stop() {
                Some((cycle, number)) => {
                    self.ticker = None;
                    info!(cycle, number, "Draw stopped, committing winner");
                    self.spawn_commit(cycle, number);
                    ToggleEffect::Stopped { cycle, number }
                }
                None => ToggleEffect::Ignored,
            },
            status @ (DrawStatus::Loading | DrawStatus::Settling) => {
                debug!(?status, "Toggle ignored while waiting on the service");
                ToggleEffect::Ignored
            }
        }
    }

    /// Resolves on the next spin tick and yields its cycle. Pending forever
    /// when nothing is spinning.
    pub async fn next_tick(&mut self) -> u64 {
        match self.ticker.as_mut() {
            Some((cycle, interval)) => {
                interval.tick().await;
                *cycle
            }
            None => std::future::pending().await,
        }
    }

    /// Advance the spinner. `None` for a tick from an old cycle.
    pub fn on_tick(&mut self, cycle: u64) -> Option<u64> {
        let shown = self.session.tick(cycle);
        if shown.is_none() {
            debug!(cycle, "Discarding stale tick");
        }
        shown
    }

    pub fn on_pool_loaded(
        &mut self,
        cycle: u64,
        result: Result<CandidatePool, PoolError>,
    ) -> PoolEffect {
        let pool = match result {
            Ok(pool) => pool,
            Err(err) => {
                if !self.session.pool_failed(cycle) {
                    debug!(cycle, "Discarding stale pool failure");
                    return PoolEffect::Stale;
                }
                warn!(cycle, "Candidate pool failed to load: {err}");
                return PoolEffect::Failed(err);
            }
        };

        let size = pool.len();
        let remaining = pool.remaining_prizes;
        match self.session.pool_loaded(cycle, pool) {
            None => {
                debug!(cycle, "Discarding stale candidate pool");
                PoolEffect::Stale
            }
            Some(StartOutcome::Spinning) => {
                info!(cycle, size, remaining, "Spinning");
                self.start_ticker(cycle);
                PoolEffect::Started
            }
            Some(StartOutcome::Disabled) => {
                info!("No prizes remaining, draw disabled");
                PoolEffect::Disabled
            }
            Some(StartOutcome::NoEntrants) => {
                warn!(cycle, "Candidate pool is empty");
                PoolEffect::NoEntrants
            }
        }
    }

    /// Settle the cycle with the commit result. `None` if the cycle is not
    /// the one waiting.
    pub fn on_committed(
        &mut self,
        cycle: u64,
        number: u64,
        result: Result<CommitResponse, ApiError>,
    ) -> Option<Settled> {
        if !self.session.settle(cycle) {
            debug!(cycle, number, "Discarding stale commit result");
            return None;
        }

        let requires_login = matches!(&result, Err(e) if e.requires_login());
        let outcome = resolve_commit(number, &result);
        match &outcome.source {
            OutcomeSource::Confirmed => info!(
                number,
                prize = %outcome.outcome.prize,
                winner = %outcome.outcome.winner_name,
                "Winner confirmed"
            ),
            OutcomeSource::Fallback { reason } => {
                warn!(
                    target: "luckydraw::fallback",
                    number,
                    %reason,
                    "Commit failed, announcing fallback winner"
                );
                self.record_fallback(number, reason);
            }
        }

        Some(Settled {
            outcome,
            requires_login,
        })
    }

    /// Drop a pending start or a running spin, e.g. on logout.
    pub fn cancel(&mut self) {
        if self.session.cancel() {
            self.ticker = None;
            info!("Draw cancelled");
        }
    }

    fn start_ticker(&mut self, cycle: u64) {
        // First tick one period from now; the first number shows until then.
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some((cycle, interval));
    }

    fn spawn_pool_load(&self, cycle: u64) {
        let service = self.service.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = pool::load_pool(service.as_ref()).await;
            let _ = tx.send(TaskEvent::PoolLoaded { cycle, result }).await;
        });
    }

    fn spawn_commit(&self, cycle: u64, number: u64) {
        let service = self.service.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = service.commit_winner(number).await;
            let _ = tx
                .send(TaskEvent::Committed {
                    cycle,
                    number,
                    result,
                })
                .await;
        });
    }

    fn record_fallback(&self, number: u64, reason: &str) {
        let Some(db) = &self.db else {
            return;
        };
        if let Err(e) = db.record_fallback(number, reason) {
            warn!(
                target: "luckydraw::fallback",
                number,
                "Failed to persist fallback outcome: {e:#}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::api::{Entrant, EntrantList, NewEntrant, Prize};

    struct FakeService {
        contacts: Vec<&'static str>,
        remaining_prizes: u32,
        commit: Mutex<Option<Result<CommitResponse, ApiError>>>,
        committed: Mutex<Vec<u64>>,
    }

    impl FakeService {
        fn new(contacts: Vec<&'static str>, remaining_prizes: u32) -> Self {
            Self {
                contacts,
                remaining_prizes,
                commit: Mutex::new(None),
                committed: Mutex::new(Vec::new()),
            }
        }

        fn commit_with(self, result: Result<CommitResponse, ApiError>) -> Self {
            *self.commit.lock().unwrap() = Some(result);
            self
        }
    }

    #[async_trait]
    impl RemoteService for FakeService {
        async fn sign_in(&self, _: &str, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
        async fn list_entrants(&self) -> Result<EntrantList, ApiError> {
            let entrants = self
                .contacts
                .iter()
                .map(|c| serde_json::from_value::<Entrant>(json!({"userContact": c})).unwrap())
                .collect();
            Ok(EntrantList {
                entrants,
                remaining_prizes: self.remaining_prizes,
            })
        }
        async fn create_entrant(&self, _: &NewEntrant) -> Result<Entrant, ApiError> {
            unimplemented!()
        }
        async fn list_prizes(&self) -> Result<Vec<Prize>, ApiError> {
            Ok(Vec::new())
        }
        async fn commit_winner(&self, number: u64) -> Result<CommitResponse, ApiError> {
            self.committed.lock().unwrap().push(number);
            self.commit
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(Err(ApiError::Transport("connection refused".into())))
        }
    }

    fn engine(
        service: FakeService,
        db: Option<Arc<Database>>,
    ) -> (DrawEngine, mpsc::Receiver<TaskEvent>, Arc<FakeService>) {
        let service = Arc::new(service);
        let (task_tx, task_rx) = mpsc::channel(16);
        let engine = DrawEngine::new(service.clone(), db, task_tx, Duration::from_millis(10));
        (engine, task_rx, service)
    }

    async fn feed_pool(engine: &mut DrawEngine, rx: &mut mpsc::Receiver<TaskEvent>) -> PoolEffect {
        match rx.recv().await.unwrap() {
            TaskEvent::PoolLoaded { cycle, result } => engine.on_pool_loaded(cycle, result),
            other => panic!("expected PoolLoaded, got {other:?}"),
        }
    }

    async fn feed_commit(
        engine: &mut DrawEngine,
        rx: &mut mpsc::Receiver<TaskEvent>,
    ) -> Option<Settled> {
        match rx.recv().await.unwrap() {
            TaskEvent::Committed {
                cycle,
                number,
                result,
            } => engine.on_committed(cycle, number, result),
            other => panic!("expected Committed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_commits_the_displayed_number() {
        let confirmed = CommitResponse {
            status: Some(200),
            message: None,
            data: Some(Prize {
                id: 1,
                gift_name: Some("Scooter".into()),
                gift_winner: Some("20".into()),
                gift_winner_name: Some("Nadia".into()),
                ..Prize::default()
            }),
        };
        let (mut engine, mut rx, service) =
            engine(FakeService::new(vec!["10", "20", "30"], 2).commit_with(Ok(confirmed)), None);

        assert!(matches!(engine.toggle(), ToggleEffect::Loading { .. }));
        assert_eq!(feed_pool(&mut engine, &mut rx).await, PoolEffect::Started);
        assert_eq!(engine.session().displayed(), Some(10));

        let cycle = engine.next_tick().await;
        assert_eq!(engine.on_tick(cycle), Some(20));

        let effect = engine.toggle();
        assert_eq!(effect, ToggleEffect::Stopped { cycle, number: 20 });
        assert_eq!(engine.session().status(), DrawStatus::Settling);

        let settled = feed_commit(&mut engine, &mut rx).await.unwrap();
        assert_eq!(settled.outcome.source, OutcomeSource::Confirmed);
        assert_eq!(settled.outcome.outcome.winner_name, "Nadia");
        assert_eq!(*service.committed.lock().unwrap(), vec![20]);
        assert_eq!(engine.session().status(), DrawStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_falls_back_and_is_persisted() {
        let db = Arc::new(Database::open(":memory:").unwrap());
        let (mut engine, mut rx, _) = engine(FakeService::new(vec!["7"], 1), Some(db.clone()));

        engine.toggle();
        feed_pool(&mut engine, &mut rx).await;
        engine.toggle();
        let settled = feed_commit(&mut engine, &mut rx).await.unwrap();

        assert!(settled.outcome.is_fallback());
        assert_eq!(settled.outcome.outcome.winner_name, "Winner #7");
        assert!(!settled.requires_login);

        let records = db.load_fallbacks().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].winner_number, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_on_commit_requires_login() {
        let (mut engine, mut rx, _) = engine(
            FakeService::new(vec!["7"], 1).commit_with(Err(ApiError::AuthInvalid {
                message: String::new(),
            })),
            None,
        );

        engine.toggle();
        feed_pool(&mut engine, &mut rx).await;
        engine.toggle();
        let settled = feed_commit(&mut engine, &mut rx).await.unwrap();

        assert!(settled.outcome.is_fallback());
        assert!(settled.requires_login);
    }

    #[tokio::test(start_paused = true)]
    async fn toggles_while_loading_or_settling_are_ignored() {
        let (mut engine, mut rx, service) = engine(FakeService::new(vec!["1", "2"], 1), None);

        engine.toggle();
        assert_eq!(engine.toggle(), ToggleEffect::Ignored);
        feed_pool(&mut engine, &mut rx).await;

        engine.toggle();
        assert_eq!(engine.toggle(), ToggleEffect::Ignored);
        feed_commit(&mut engine, &mut rx).await;

        assert_eq!(service.committed.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_prizes_disables_start() {
        let (mut engine, mut rx, _) = engine(FakeService::new(vec!["1", "2"], 0), None);

        engine.toggle();
        assert_eq!(feed_pool(&mut engine, &mut rx).await, PoolEffect::Disabled);
        assert!(engine.session().is_disabled());

        assert_eq!(engine.toggle(), ToggleEffect::Ignored);
        assert_eq!(engine.session().status(), DrawStatus::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_pool_reports_no_entrants() {
        let (mut engine, mut rx, _) = engine(FakeService::new(vec!["n/a"], 3), None);
        engine.toggle();
        assert_eq!(feed_pool(&mut engine, &mut rx).await, PoolEffect::NoEntrants);
        assert_eq!(engine.session().status(), DrawStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drops_the_ticker() {
        let (mut engine, mut rx, _) = engine(FakeService::new(vec!["1", "2", "3"], 1), None);
        engine.toggle();
        feed_pool(&mut engine, &mut rx).await;
        let cycle = engine.next_tick().await;
        engine.on_tick(cycle);
        engine.toggle();

        let frozen = engine.session().displayed();
        let tick = tokio::time::timeout(Duration::from_millis(100), engine.next_tick()).await;
        assert!(tick.is_err(), "no tick may fire after stop");

        // A tick already queued for the stopped cycle is a no-op.
        assert_eq!(engine.on_tick(cycle), None);
        assert_eq!(engine.session().displayed(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_pool() {
        let (mut engine, mut rx, _) = engine(FakeService::new(vec!["1"], 1), None);
        engine.toggle();
        engine.cancel();
        assert_eq!(feed_pool(&mut engine, &mut rx).await, PoolEffect::Stale);
        assert_eq!(engine.session().status(), DrawStatus::Idle);
    }
}
