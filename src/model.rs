//! Stored entities
//!
//! One struct per table row, in the shape the API returns them. JSON-encoded list
//! columns (`countries`, `key_topics`, `action_items`) are already decoded here.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A user account, keyed by the identity provider's `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub provider: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// An advisory profile. A user may own several (e.g. a parent advising two children).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub profile_id: String,
    pub user_id: String,
    pub user_role: String,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub parent_name: Option<String>,
    pub parent_email: Option<String>,
    pub relationship: Option<String>,
    pub child_name: Option<String>,
    pub child_email: Option<String>,
    pub citizenship: Option<String>,
    pub gpa: Option<f64>,
    pub degree: Option<String>,
    /// Target countries, in the order the user picked them
    pub countries: Vec<String>,
    pub budget: Option<i64>,
    pub target_intake: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Who produced a chat message. Decoding is case-insensitive and accepts `assistant` for `ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageType {
    /// Typed by the student or parent
    User,
    /// Generated by the advisor model
    Ai,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Ai => "ai",
        }
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageType::User),
            "ai" | "assistant" => Ok(MessageType::Ai),
            _ => Err(Error::MalformedRequest(format!("Unknown message type: {}", s))),
        }
    }
}

impl TryFrom<String> for MessageType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MessageType> for String {
    fn from(message_type: MessageType) -> Self {
        message_type.as_str().to_string()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of a chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub profile_id: String,
    pub user_id: String,
    /// Stored as written. Rows from older deployments may hold values outside [`MessageType`].
    pub message_type: String,
    pub message_content: String,
    pub language: Option<String>,
    pub user_role: Option<String>,
    pub created_at: Option<String>,
}

/// Number of usage events of one action type on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActionCount {
    pub date: String,
    pub action_type: String,
    pub count: i64,
}

/// A tracked step of an application (test scores, documents, visa, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyProgress {
    pub id: i64,
    pub profile_id: String,
    pub user_id: String,
    pub progress_category: String,
    pub progress_item: String,
    pub status: String,
    pub completion_percentage: i64,
    pub notes: Option<String>,
    pub target_date: Option<String>,
    pub completed_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A periodic digest of a profile's conversations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub profile_id: String,
    pub user_id: String,
    pub summary_period: String,
    pub summary_content: String,
    pub key_topics: Vec<String>,
    pub action_items: Vec<String>,
    pub advisor_notes: Option<String>,
    pub created_at: Option<String>,
}

/// Notification preferences of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub notification_frequency: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl UserSettings {
    /// The column defaults, used when a user never saved settings
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email_notifications: false,
            push_notifications: true,
            notification_frequency: "daily".to_string(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Decode a JSON-encoded string list column. Missing or corrupt values yield an empty list.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}
