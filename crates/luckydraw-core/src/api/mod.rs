// Typed client for the lucky-draw service.
//
// `LuckyDrawApi` turns the service's nested envelopes into domain types.
// Draw and ledger code depend on the `RemoteService` trait, not on this
// client, so they can run against in-memory fakes.

pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::session::store::Credential;
use crate::session::{ApiRequest, SessionManager, SessionStore};

pub use models::{CommitResponse, Entrant, EntrantList, NewEntrant, Prize, UserType};

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const ENTRANTS_PATH: &str = "/user/get";
pub const CREATE_ENTRANT_PATH: &str = "/user/create";
pub const PRIZES_PATH: &str = "/gift/get";
pub const COMMIT_PATH: &str = "/gift/update";

/// Remaining-prize count assumed when the service omits `gifts`.
pub const DEFAULT_REMAINING_PRIZES: u32 = 1;

/// Operations the rest of the crate needs from the remote service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Exchange operator credentials for a session. On success the session
    /// store is logged in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError>;

    async fn list_entrants(&self) -> Result<EntrantList, ApiError>;

    async fn create_entrant(&self, entrant: &NewEntrant) -> Result<Entrant, ApiError>;

    async fn list_prizes(&self) -> Result<Vec<Prize>, ApiError>;

    /// Submit the stopped number. The server picks the prize.
    async fn commit_winner(&self, winner_number: u64) -> Result<CommitResponse, ApiError>;
}

pub struct LuckyDrawApi {
    session: Arc<SessionManager>,
}

impl LuckyDrawApi {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        self.session.store()
    }
}

#[async_trait]
impl RemoteService for LuckyDrawApi {
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .session
            .call(ApiRequest::post(
                SIGN_IN_PATH,
                json!({ "email": email, "password": password }),
            ))
            .await?;

        let data = response.body.get("data").unwrap_or(&Value::Null);
        let field = |name: &str| -> Result<String, ApiError> {
            match data.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                _ => Err(ApiError::Shape(format!("sign-in response has no data.{name}"))),
            }
        };
        let credential = Credential {
            access_token: field("accessToken")?,
            refresh_token: field("refreshToken")?,
            subject_id: field("userId")?,
        };

        self.store().login(credential);
        Ok(())
    }

    async fn list_entrants(&self) -> Result<EntrantList, ApiError> {
        let response = self.session.call(ApiRequest::get(ENTRANTS_PATH)).await?;
        let entrants: Vec<Entrant> = nested_list(&response.body, "user")?;
        let remaining_prizes = match response.body.get("gifts") {
            None | Some(Value::Null) => DEFAULT_REMAINING_PRIZES,
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ApiError::Shape(format!("gifts is not a count: {v}")))?,
        };
        info!(
            entrants = entrants.len(),
            remaining_prizes, "Fetched entrant list"
        );
        Ok(EntrantList {
            entrants,
            remaining_prizes,
        })
    }

    async fn create_entrant(&self, entrant: &NewEntrant) -> Result<Entrant, ApiError> {
        let body = serde_json::to_value(entrant)
            .map_err(|e| ApiError::Shape(format!("unserializable entrant: {e}")))?;
        let response = self
            .session
            .call(ApiRequest::post(CREATE_ENTRANT_PATH, body))
            .await?;
        let data = response
            .body
            .get("data")
            .cloned()
            .ok_or_else(|| ApiError::Shape("create response has no data".into()))?;
        let created: Entrant = serde_json::from_value(data)
            .map_err(|e| ApiError::Shape(format!("bad entrant in create response: {e}")))?;
        info!(contact = ?created.user_contact, "Registered entrant");
        Ok(created)
    }

    async fn list_prizes(&self) -> Result<Vec<Prize>, ApiError> {
        let response = self.session.call(ApiRequest::get(PRIZES_PATH)).await?;
        let prizes: Vec<Prize> = nested_list(&response.body, "gift")?;
        info!(prizes = prizes.len(), "Fetched prize list");
        Ok(prizes)
    }

    async fn commit_winner(&self, winner_number: u64) -> Result<CommitResponse, ApiError> {
        let response = self
            .session
            .call(ApiRequest::put(
                COMMIT_PATH,
                json!({ "winnerNumber": winner_number }),
            ))
            .await?;
        serde_json::from_value(response.body)
            .map_err(|e| ApiError::Shape(format!("bad commit response: {e}")))
    }
}

/// Decode `data.data` as a list. A missing or non-array list is a shape
/// failure; a row that does not decode is skipped with a warning.
fn nested_list<T: serde::de::DeserializeOwned>(body: &Value, what: &str) -> Result<Vec<T>, ApiError> {
    let rows = body
        .get("data")
        .and_then(|d| d.get("data"))
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Shape(format!("{what} list is missing data.data")))?;

    let mut items = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match T::deserialize(row) {
            Ok(item) => items.push(item),
            Err(e) => warn!(index, error = %e, "Skipping malformed {what} entry"),
        }
    }
    Ok(items)
}
