//! Wire types shared by the HTTP service and the client
//!
//! Every response is wrapped in an [`Envelope`]. Request bodies are typed per endpoint;
//! a body that does not decode into its type is rejected as a malformed request.

use crate::model::MessageType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Uniform response wrapper: `{"ok": true, "data": ..}` or `{"ok": false, "error": ..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self { ok: true, data: Some(data), message: None, error: None }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self { ok: true, data: None, message: Some(message.into()), error: None }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, message: None, error: Some(error.into()) }
    }
}

impl Envelope<Value> {
    /// Decode the `data` payload into a concrete type, if present and well-formed.
    pub fn parse_data<D: DeserializeOwned>(&self) -> Option<D> {
        self.data.clone().and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/users`. The whole row is replaced on every write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(alias = "userId")]
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Defaults to `google`
    pub provider: Option<String>,
}

/// Body of `POST /api/profiles`. The whole row is replaced on every write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProfile {
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
    pub countries: Option<Vec<String>>,
    pub budget: Option<i64>,
    pub target_intake: Option<String>,
}

/// Body of `PUT /api/profiles/{id}`.
///
/// Outer `None` leaves the column untouched, `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub student_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub student_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub parent_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub child_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub child_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub citizenship: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gpa: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub degree: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub countries: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub budget: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub target_intake: Option<Option<String>>,
}

/// Body of `POST /api/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub profile_id: String,
    pub user_id: String,
    pub message_type: MessageType,
    pub message_content: String,
    /// Defaults to `zh`
    pub language: Option<String>,
    pub user_role: Option<String>,
}

/// Body of `POST /api/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUsageStat {
    pub user_id: String,
    pub profile_id: Option<String>,
    pub action_type: String,
    /// Free-form details, stored as JSON text. Defaults to `{}`.
    pub action_details: Option<Value>,
}

/// Body of `POST /api/progress`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudyProgress {
    pub profile_id: String,
    pub user_id: String,
    pub progress_category: String,
    pub progress_item: String,
    pub status: String,
    pub completion_percentage: Option<i64>,
    pub notes: Option<String>,
    pub target_date: Option<String>,
    pub completed_date: Option<String>,
}

/// Body of `POST /api/summaries`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewChatSummary {
    pub profile_id: String,
    pub user_id: String,
    pub summary_period: String,
    pub summary_content: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    pub advisor_notes: Option<String>,
}

/// Body of `PUT /api/users/{id}/settings`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub notification_frequency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// Payload of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub database_path: String,
    pub user_count: usize,
    pub profile_count: usize,
    pub message_count: usize,
    pub timestamp: String,
}

/// Payload of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: ProfilePatch =
            serde_json::from_str(r#"{"budget": 5000, "degree": null}"#).unwrap();
        assert_eq!(patch.budget, Some(Some(5000)));
        assert_eq!(patch.degree, Some(None));
        assert_eq!(patch.student_name, None);
        assert_eq!(patch.countries, None);
    }

    #[test]
    fn test_new_user_accepts_camel_case_id() {
        let user: NewUser = serde_json::from_str(r#"{"userId": "u-1", "name": "Amy"}"#).unwrap();
        assert_eq!(user.user_id, "u-1");
        assert!(serde_json::from_str::<NewUser>(r#"{"name": "Amy"}"#).is_err());
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let ok = serde_json::to_value(Envelope::<Value>::message("saved")).unwrap();
        assert_eq!(ok, serde_json::json!({"ok": true, "message": "saved"}));

        let err = serde_json::to_value(Envelope::<Value>::error("Profile not found")).unwrap();
        assert_eq!(err, serde_json::json!({"ok": false, "error": "Profile not found"}));
    }
}
