// Candidate pool: the draw numbers eligible in the current cycle.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::api::RemoteService;
use crate::error::ApiError;

/// Eligible draw numbers plus the count of prizes still to be drawn.
/// Rebuilt from the service at the start of every draw cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidatePool {
    pub numbers: Vec<u64>,
    pub remaining_prizes: u32,
}

impl CandidatePool {
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    /// The entrant list did not have the expected shape.
    #[error("entrant list unavailable: {0}")]
    Unavailable(String),

    #[error("entrant list not found")]
    NotFound { message: String },

    #[error("server error ({status}) loading entrants")]
    Server { status: u16, message: String },

    #[error("failed to load entrants: {0}")]
    Request(ApiError),
}

impl From<ApiError> for PoolError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Shape(detail) => PoolError::Unavailable(detail),
            ApiError::NotFound { message } => PoolError::NotFound { message },
            ApiError::Server { status, message } => PoolError::Server { status, message },
            other => PoolError::Request(other),
        }
    }
}

impl PoolError {
    pub fn user_message(&self) -> String {
        match self {
            PoolError::NotFound { message } | PoolError::Server { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            PoolError::NotFound { .. } => "User list not found".to_string(),
            PoolError::Server { status: 500, .. } => "Server error occurred".to_string(),
            PoolError::Request(err) => {
                err.user_message("User list not found", "Failed to fetch user list")
            }
            _ => "Failed to fetch user list".to_string(),
        }
    }

    /// True when the failure came from an unrecoverable session.
    pub fn requires_login(&self) -> bool {
        matches!(self, PoolError::Request(err) if err.requires_login())
    }
}

/// Fetch the entrants and build this cycle's pool.
///
/// Contacts that are not integers are skipped. A number registered twice
/// appears once, at its first position.
pub async fn load_pool(service: &dyn RemoteService) -> Result<CandidatePool, PoolError> {
    let list = service.list_entrants().await?;

    let mut seen = HashSet::new();
    let mut numbers = Vec::with_capacity(list.entrants.len());
    for entrant in &list.entrants {
        match entrant.draw_number() {
            Some(n) => {
                if seen.insert(n) {
                    numbers.push(n);
                }
            }
            None => warn!(
                user_id = ?entrant.user_id,
                contact = ?entrant.user_contact,
                "Skipping entrant without a numeric contact"
            ),
        }
    }

    Ok(CandidatePool {
        numbers,
        remaining_prizes: list.remaining_prizes,
    })
}
