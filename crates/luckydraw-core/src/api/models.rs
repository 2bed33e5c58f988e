// Wire types for the lucky-draw service.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Individual,
    Business,
    /// Any type this client does not know. Never sent.
    #[serde(other, skip_serializing)]
    Other,
}

/// A registered attendee. The contact number doubles as the draw number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrant {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub user_contact: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

impl Entrant {
    /// The contact parsed as a draw number, if it is one.
    pub fn draw_number(&self) -> Option<u64> {
        self.user_contact.as_deref()?.trim().parse().ok()
    }
}

/// Payload for `POST /user/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntrant {
    pub user_name: String,
    pub user_type: UserType,
    pub user_contact: String,
    pub user_email: String,
}

/// Entrant list plus the server's count of unclaimed prizes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrantList {
    pub entrants: Vec<Entrant>,
    pub remaining_prizes: u32,
}

/// A prize row. `gift_winner` is set once the prize has been drawn.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: i64,
    #[serde(default)]
    pub gift_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub gift_winner: Option<String>,
    #[serde(default)]
    pub gift_winner_name: Option<String>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub gift_is_selected: Option<bool>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub gift_is_special: Option<bool>,
}

/// Envelope returned by `PUT /gift/update`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CommitResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Prize>,
}

/// Accept a JSON string or number; the service is inconsistent about which
/// it sends for identifiers and contacts.
pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Accept a flag as a bool, a 0/1 number, or a "true"/"1" string.
pub(crate) fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_f64().is_some_and(|v| v != 0.0))),
        Some(Value::String(s)) => match s.trim() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            other => Err(D::Error::custom(format!("expected a flag, got {other:?}"))),
        },
        Some(other) => Err(D::Error::custom(format!("expected a flag, got {other}"))),
    }
}
