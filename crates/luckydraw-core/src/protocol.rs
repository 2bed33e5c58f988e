// Messages between the TUI, the app orchestrator, and background tasks.

use crate::api::CommitResponse;
use crate::draw::outcome::CommitOutcome;
use crate::draw::state::DrawSnapshot;
use crate::error::ApiError;
use crate::ledger::WinnerRecord;
use crate::pool::{CandidatePool, PoolError};
use crate::session::SessionState;

/// Orchestrator -> TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Session(SessionState),
    Draw(DrawSnapshot),
    /// New number on the spinner. Sent on every tick.
    Spin(u64),
    Winner(Box<CommitOutcome>),
    /// Why the last start press did not begin spinning.
    DrawError(String),
    LedgerLoading,
    Ledger(Vec<WinnerRecord>),
    LedgerError(String),
    SignInStarted,
    SignInFailed(String),
}

/// TUI -> orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Space / Enter: start when idle, stop when spinning.
    ToggleDraw,
    RetryLedger,
    SignIn { email: String, password: String },
    Logout,
    Quit,
}

/// Background task -> orchestrator. Results carry the cycle or generation
/// that requested them so stale ones can be dropped.
#[derive(Debug)]
pub enum TaskEvent {
    PoolLoaded {
        cycle: u64,
        result: Result<CandidatePool, PoolError>,
    },
    Committed {
        cycle: u64,
        number: u64,
        result: Result<CommitResponse, ApiError>,
    },
    LedgerLoaded {
        generation: u64,
        result: Result<Vec<WinnerRecord>, ApiError>,
    },
    SignedIn(Result<(), ApiError>),
}
