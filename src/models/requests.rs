use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to store age preferences, also used to ask for suggestions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreferencesRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[validate(range(min = 18, max = 100))]
    #[serde(alias = "min_age", rename = "minAge")]
    pub min_age: u8,
    #[validate(range(min = 18, max = 100))]
    #[serde(alias = "max_age", rename = "maxAge")]
    pub max_age: u8,
}

/// Request to send a match request to another user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequestRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: Uuid,
}

/// Request to accept or decline a pending request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "sender_id", rename = "senderId")]
    pub sender_id: Uuid,
}

/// Query string or body carrying only the caller identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}
