// Session manager: bearer attachment plus refresh-and-retry on 401.
//
// Every remote call goes through `SessionManager::call`. A 401 is recovered
// at most once per call: the manager refreshes the access token through
// `/auth/access-token` and replays the original request. Concurrent 401s
// share one in-flight refresh.

use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::store::SessionStore;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::{server_message, ApiError};

pub const REFRESH_PATH: &str = "/auth/access-token";

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ApiError>>>;

/// Where a call is in its retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStep {
    /// First dispatch. A 401 here may be recovered.
    Initial,
    /// Replay after a refresh (or after the credential was rotated by
    /// someone else). A 401 here is final.
    Retried,
}

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    inflight: Mutex<Option<RefreshFuture>>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        Self {
            transport,
            store,
            inflight: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Dispatch `request` with the current credential. Returns the 2xx
    /// response, or the error kind for anything else.
    pub async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut step = AuthStep::Initial;
        loop {
            let token = self.store.access_token();
            let response = self
                .transport
                .send(request.clone().with_bearer(token.clone()))
                .await?;

            if response.is_success() {
                return Ok(response);
            }
            if response.status != 401 || step == AuthStep::Retried {
                return Err(ApiError::from_status(response.status, &response.body));
            }

            if self.store.refresh_token().is_none() {
                debug!("{} {} -> 401 with no refresh token", request.method, request.path);
                return Err(ApiError::from_status(response.status, &response.body));
            }

            if self.store.access_token() != token {
                // Another call already replaced the credential this request
                // was sent with.
                debug!("Credential rotated since dispatch; replaying {}", request.path);
            } else {
                self.refresh().await?;
            }
            step = AuthStep::Retried;
        }
    }

    /// Join the in-flight refresh, or start one.
    async fn refresh(&self) -> Result<String, ApiError> {
        let shared = {
            let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let fresh = refresh_access_token(self.transport.clone(), self.store.clone())
                        .boxed()
                        .shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let result = shared.clone().await;

        let mut slot = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if slot
            .as_ref()
            .is_some_and(|current| Shared::ptr_eq(current, &shared))
        {
            *slot = None;
        }
        result
    }
}

async fn refresh_access_token(
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
) -> Result<String, ApiError> {
    let Some(refresh_token) = store.refresh_token() else {
        return Err(ApiError::Unauthorized {
            message: String::new(),
        });
    };

    let request = ApiRequest::post(REFRESH_PATH, json!({ "refreshToken": refresh_token }))
        .with_bearer(store.access_token());
    let response = transport.send(request).await.inspect_err(|e| {
        warn!("Token refresh failed to complete: {e}");
    })?;

    if !response.is_success() {
        let message = server_message(&response.body).unwrap_or_default();
        warn!(status = response.status, "Token refresh rejected: {message}");
        return Err(ApiError::AuthInvalid { message });
    }

    let data = response.body.get("data").unwrap_or(&Value::Null);
    let access = data
        .get("accessToken")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Shape("refresh response has no data.accessToken".into()))?;
    let rotated = data.get("refreshToken").and_then(Value::as_str);

    store.set_tokens(access, rotated);
    info!(rotated_refresh = rotated.is_some(), "Access token refreshed");
    Ok(access.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
