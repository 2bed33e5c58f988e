// In-memory stand-in for the lucky-draw service, plugged in under the
// session manager through the `Transport` trait.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use luckydraw_core::api::LuckyDrawApi;
use luckydraw_core::error::ApiError;
use luckydraw_core::session::{
    ApiRequest, ApiResponse, Credential, SessionManager, SessionStore, Transport,
};

pub const OPERATOR_EMAIL: &str = "operator@example.com";
pub const OPERATOR_PASSWORD: &str = "hunter2";

#[derive(Debug, Clone)]
pub struct Gift {
    pub id: i64,
    pub name: String,
    pub winner: Option<String>,
    pub winner_name: Option<String>,
}

#[derive(Default)]
struct Backend {
    access_token: String,
    refresh_token: String,
    token_serial: u32,
    refresh_rejected: bool,
    refresh_delay: Option<Duration>,
    users: Vec<Value>,
    gifts: Vec<Gift>,
    /// Canned replies that pre-empt routing, keyed by path.
    overrides: HashMap<String, VecDeque<Result<ApiResponse, ApiError>>>,
    log: Vec<ApiRequest>,
}

pub struct FakeServer {
    backend: Mutex<Backend>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            backend: Mutex::new(Backend {
                access_token: "access-0".into(),
                refresh_token: "refresh-0".into(),
                ..Backend::default()
            }),
        })
    }

    pub fn with_users(self: Arc<Self>, contacts: &[&str]) -> Arc<Self> {
        {
            let mut b = self.backend.lock().unwrap();
            for (i, contact) in contacts.iter().enumerate() {
                b.users.push(json!({
                    "userId": i + 1,
                    "userName": format!("Entrant {}", i + 1),
                    "userType": "individual",
                    "userContact": contact,
                    "userEmail": format!("entrant{}@example.com", i + 1),
                }));
            }
        }
        self
    }

    pub fn with_gifts(self: Arc<Self>, gifts: Vec<Gift>) -> Arc<Self> {
        self.backend.lock().unwrap().gifts = gifts;
        self
    }

    /// Invalidate the current access token; the next call 401s.
    pub fn expire_access_token(&self) {
        let mut b = self.backend.lock().unwrap();
        b.token_serial += 1;
        b.access_token = format!("access-{}", b.token_serial);
    }

    pub fn reject_refresh(&self) {
        self.backend.lock().unwrap().refresh_rejected = true;
    }

    pub fn delay_refresh(&self, delay: Duration) {
        self.backend.lock().unwrap().refresh_delay = Some(delay);
    }

    pub fn fail_next(&self, path: &str, reply: Result<ApiResponse, ApiError>) {
        self.backend
            .lock()
            .unwrap()
            .overrides
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn current_access_token(&self) -> String {
        self.backend.lock().unwrap().access_token.clone()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.backend.lock().unwrap().log.clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn gifts(&self) -> Vec<Gift> {
        self.backend.lock().unwrap().gifts.clone()
    }

    /// A credential the backend currently accepts.
    pub fn valid_credential(&self) -> Credential {
        let b = self.backend.lock().unwrap();
        Credential {
            access_token: b.access_token.clone(),
            refresh_token: b.refresh_token.clone(),
            subject_id: "1".into(),
        }
    }

    fn route(&self, request: &ApiRequest) -> ApiResponse {
        let mut b = self.backend.lock().unwrap();
        let body = request.body.clone().unwrap_or(Value::Null);

        if request.path == "/auth/signin" {
            if body["email"] == OPERATOR_EMAIL && body["password"] == OPERATOR_PASSWORD {
                return ok(json!({
                    "data": {
                        "accessToken": b.access_token,
                        "refreshToken": b.refresh_token,
                        "userId": 1
                    }
                }));
            }
            return status(401, json!({"message": "Invalid credentials"}));
        }

        if request.path == "/auth/access-token" {
            if b.refresh_rejected || body["refreshToken"] != b.refresh_token.as_str() {
                return status(403, json!({"message": "Refresh token invalid"}));
            }
            b.token_serial += 1;
            b.access_token = format!("access-{}", b.token_serial);
            return ok(json!({"data": {"accessToken": b.access_token}}));
        }

        if request.bearer.as_deref() != Some(b.access_token.as_str()) {
            return status(401, json!({"message": "jwt expired"}));
        }

        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/user/get") => {
                let remaining = b.gifts.iter().filter(|g| g.winner.is_none()).count();
                ok(json!({
                    "status": 200,
                    "message": "Users fetched",
                    "data": {"data": b.users},
                    "gifts": remaining
                }))
            }
            ("POST", "/user/create") => {
                let mut user = body.clone();
                user["userId"] = json!(b.users.len() + 1);
                b.users.push(user.clone());
                ok(json!({"status": 201, "message": "User created", "data": user}))
            }
            ("GET", "/gift/get") => {
                let gifts: Vec<Value> = b.gifts.iter().map(gift_json).collect();
                ok(json!({"status": 200, "message": "Gifts fetched", "data": {"data": gifts}}))
            }
            ("PUT", "/gift/update") => {
                let number = body["winnerNumber"].as_u64().unwrap_or_default().to_string();
                let winner_name = b
                    .users
                    .iter()
                    .find(|u| u["userContact"].as_str() == Some(number.as_str()))
                    .and_then(|u| u["userName"].as_str())
                    .map(str::to_string);
                let Some(gift) = b.gifts.iter_mut().find(|g| g.winner.is_none()) else {
                    return ok(json!({"status": 404, "message": "No gifts left"}));
                };
                gift.winner = Some(number);
                gift.winner_name = winner_name;
                let data = gift_json(gift);
                ok(json!({"status": 200, "message": "Winner saved", "data": data}))
            }
            _ => status(404, json!({"message": "Route not found"})),
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let (override_reply, delay) = {
            let mut b = self.backend.lock().unwrap();
            b.log.push(request.clone());
            let reply = b
                .overrides
                .get_mut(&request.path)
                .and_then(VecDeque::pop_front);
            let delay = if request.path == "/auth/access-token" {
                b.refresh_delay
            } else {
                None
            };
            (reply, delay)
        };

        if let Some(reply) = override_reply {
            return reply;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.route(&request))
    }
}

fn gift_json(gift: &Gift) -> Value {
    json!({
        "id": gift.id,
        "giftName": gift.name,
        "giftWinner": gift.winner,
        "giftWinnerName": gift.winner_name,
        "giftIsSelected": if gift.winner.is_some() { 1 } else { 0 },
        "giftIsSpecial": 0
    })
}

fn ok(body: Value) -> ApiResponse {
    status(200, body)
}

fn status(code: u16, body: Value) -> ApiResponse {
    ApiResponse { status: code, body }
}

pub fn gift(id: i64, name: &str) -> Gift {
    Gift {
        id,
        name: name.to_string(),
        winner: None,
        winner_name: None,
    }
}

/// Wire an API client to `server`. With `logged_in`, the store holds a
/// credential the server accepts.
pub fn client(server: &Arc<FakeServer>, logged_in: bool) -> (Arc<LuckyDrawApi>, Arc<SessionStore>) {
    let store = Arc::new(SessionStore::in_memory());
    if logged_in {
        store.login(server.valid_credential());
    }
    let manager = Arc::new(SessionManager::new(server.clone(), store.clone()));
    (Arc::new(LuckyDrawApi::new(manager)), store)
}
