// Session store: the operator's credential pair and the derived login flag.
//
// The store is the single authority over the credential. The session
// manager writes through `set_tokens` after a refresh; sign-in and logout go
// through `login`/`logout`. Everyone else reads a `watch` snapshot.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::db::Database;

/// Durable storage keys. All three are removed together on logout.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const SUBJECT_ID_KEY: &str = "userId";

/// Credential issued by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub subject_id: String,
}

/// Broadcast snapshot of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub is_logged: bool,
}

#[derive(Debug, Default)]
struct StoredTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
    subject_id: Option<String>,
}

pub struct SessionStore {
    tokens: Mutex<StoredTokens>,
    db: Option<Arc<Database>>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionStore {
    /// A store with no durable backing. Used by tests and tools.
    pub fn in_memory() -> Self {
        Self::with_tokens(StoredTokens::default(), None)
    }

    /// Restore the store from durable storage. `is_logged` is derived from
    /// the presence of an access token.
    pub fn load(db: Arc<Database>) -> anyhow::Result<Self> {
        let tokens = StoredTokens {
            access_token: non_empty(db.get_value(ACCESS_TOKEN_KEY)?),
            refresh_token: non_empty(db.get_value(REFRESH_TOKEN_KEY)?),
            subject_id: non_empty(db.get_value(SUBJECT_ID_KEY)?),
        };
        if tokens.access_token.is_some() {
            info!("Restored operator session from storage");
        }
        Ok(Self::with_tokens(tokens, Some(db)))
    }

    fn with_tokens(tokens: StoredTokens, db: Option<Arc<Database>>) -> Self {
        let state = SessionState {
            is_logged: tokens.access_token.is_some(),
        };
        let (state_tx, _) = watch::channel(state);
        Self {
            tokens: Mutex::new(tokens),
            db,
            state_tx,
        }
    }

    fn tokens(&self) -> MutexGuard<'_, StoredTokens> {
        // The guarded data is plain strings; a poisoned lock still holds a
        // consistent value.
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens().refresh_token.clone()
    }

    pub fn subject_id(&self) -> Option<String> {
        self.tokens().subject_id.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Sign-in transition: store all three values and mark the session live.
    pub fn login(&self, credential: Credential) {
        {
            let mut tokens = self.tokens();
            tokens.access_token = Some(credential.access_token.clone());
            tokens.refresh_token = Some(credential.refresh_token.clone());
            tokens.subject_id = Some(credential.subject_id.clone());
        }
        self.persist(&[
            (ACCESS_TOKEN_KEY, &credential.access_token),
            (REFRESH_TOKEN_KEY, &credential.refresh_token),
            (SUBJECT_ID_KEY, &credential.subject_id),
        ]);
        info!(subject_id = %credential.subject_id, "Operator signed in");
        self.publish(true);
    }

    /// Refresh transition: replace the access token and, when the server
    /// rotated it, the refresh token. The login flag is unchanged.
    pub fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        {
            let mut tokens = self.tokens();
            tokens.access_token = Some(access_token.to_string());
            if let Some(refresh) = refresh_token {
                tokens.refresh_token = Some(refresh.to_string());
            }
        }
        let mut entries = vec![(ACCESS_TOKEN_KEY, access_token)];
        if let Some(refresh) = refresh_token {
            entries.push((REFRESH_TOKEN_KEY, refresh));
        }
        self.persist(&entries);
    }

    /// Logout transition: drop all three values together.
    pub fn logout(&self) {
        *self.tokens() = StoredTokens::default();
        if let Some(db) = &self.db {
            if let Err(e) = db.remove_values(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SUBJECT_ID_KEY])
            {
                warn!("Failed to clear stored session: {e:#}");
            }
        }
        info!("Operator signed out");
        self.publish(false);
    }

    fn persist(&self, entries: &[(&str, &str)]) {
        let Some(db) = &self.db else {
            return;
        };
        for (key, value) in entries {
            if let Err(e) = db.set_value(key, value) {
                warn!("Failed to persist session key {key}: {e:#}");
            }
        }
    }

    fn publish(&self, is_logged: bool) {
        self.state_tx.send_replace(SessionState { is_logged });
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
