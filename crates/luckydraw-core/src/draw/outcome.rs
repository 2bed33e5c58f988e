// Commit reconciliation: turn the commit response into the announced result.

use crate::api::CommitResponse;
use crate::error::ApiError;
use crate::ledger::DEFAULT_PRIZE_NAME;

/// The winner announced for one draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerOutcome {
    pub prize: String,
    pub winner_number: u64,
    pub winner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeSource {
    /// The service recorded the winner and named the prize.
    Confirmed,
    /// The commit failed; the outcome is local only and may not match the
    /// server's record.
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub outcome: WinnerOutcome,
    pub source: OutcomeSource,
}

impl CommitOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, OutcomeSource::Fallback { .. })
    }
}

pub fn fallback_winner_name(winner_number: u64) -> String {
    format!("Winner #{winner_number}")
}

/// Resolve a commit result. Only an envelope with status 200 (or no status)
/// and a `data` prize counts as confirmed; everything else falls back.
pub fn resolve_commit(
    winner_number: u64,
    result: &Result<CommitResponse, ApiError>,
) -> CommitOutcome {
    let response = match result {
        Ok(response) => response,
        Err(err) => return fallback(winner_number, err.to_string()),
    };

    if let Some(status) = response.status.filter(|s| *s != 200) {
        let detail = response.message.as_deref().unwrap_or("no message");
        return fallback(
            winner_number,
            format!("commit returned status {status}: {detail}"),
        );
    }

    let Some(prize) = &response.data else {
        return fallback(winner_number, "commit response has no data".to_string());
    };

    CommitOutcome {
        outcome: WinnerOutcome {
            prize: prize
                .gift_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PRIZE_NAME.to_string()),
            winner_number,
            winner_name: prize
                .gift_winner_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| fallback_winner_name(winner_number)),
        },
        source: OutcomeSource::Confirmed,
    }
}

fn fallback(winner_number: u64, reason: String) -> CommitOutcome {
    CommitOutcome {
        outcome: WinnerOutcome {
            prize: DEFAULT_PRIZE_NAME.to_string(),
            winner_number,
            winner_name: fallback_winner_name(winner_number),
        },
        source: OutcomeSource::Fallback { reason },
    }
}
