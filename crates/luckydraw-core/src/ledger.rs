// Winner ledger: the display-ready list of prizes that have a winner.

use tracing::info;

use crate::api::{Prize, RemoteService};
use crate::error::ApiError;

pub const DEFAULT_PRIZE_NAME: &str = "Prize";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerRecord {
    pub prize_id: i64,
    pub prize_name: String,
    pub winner_number: String,
    pub winner_name: String,
}

/// Keep prizes with both a winner number and a winner name, in the order
/// the service returned them.
pub fn project_ledger(prizes: &[Prize]) -> Vec<WinnerRecord> {
    prizes
        .iter()
        .filter_map(|prize| {
            let number = prize.gift_winner.as_deref().filter(|s| !s.is_empty())?;
            let name = prize
                .gift_winner_name
                .as_deref()
                .filter(|s| !s.is_empty())?;
            Some(WinnerRecord {
                prize_id: prize.id,
                prize_name: prize
                    .gift_name
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_PRIZE_NAME.to_string()),
                winner_number: number.to_string(),
                winner_name: name.to_string(),
            })
        })
        .collect()
}

/// Pull the prize list and project it.
pub async fn refresh(service: &dyn RemoteService) -> Result<Vec<WinnerRecord>, ApiError> {
    let prizes = service.list_prizes().await?;
    let records = project_ledger(&prizes);
    info!(
        prizes = prizes.len(),
        winners = records.len(),
        "Winner ledger refreshed"
    );
    Ok(records)
}

/// Operator-facing text for a ledger failure.
pub fn error_message(err: &ApiError) -> String {
    err.user_message("Winner list not found", "Failed to fetch winner list")
}
