//! Typed HTTP client for the database service
//!
//! Every method performs exactly one request and always yields an [`Envelope`].
//! Transport failures, non-2xx answers and undecodable bodies come back as
//! `{"ok": false, "error": ..}` rather than as `Err`, so callers check `ok`.

use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use crate::api::{
    Envelope, NewChatMessage, NewChatSummary, NewProfile, NewStudyProgress, NewUsageStat, NewUser,
    ProfilePatch, SettingsUpdate,
};
use crate::config;

#[derive(Debug, Clone)]
pub struct DatabaseClient {
    base_url: String,
    http: reqwest::Client,
}

impl DatabaseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http: reqwest::Client::new() }
    }

    /// Client for `DATABASE_SERVICE_URL`, or the default deployment
    pub fn from_env() -> Self {
        Self::new(config::service_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http.request(method, self.url(endpoint))
    }

    fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> RequestBuilder {
        self.request(Method::POST, endpoint).json(body)
    }

    fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> RequestBuilder {
        self.request(Method::PUT, endpoint).json(body)
    }

    async fn send(&self, request: RequestBuilder) -> Envelope {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Database service request failed: {}", e);
                return Envelope::error(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to read database service response: {}", e);
                return Envelope::error(e.to_string());
            }
        };
        let decoded = serde_json::from_slice::<Envelope>(&body);

        if status.is_success() {
            return decoded.unwrap_or_else(|e| {
                tracing::error!("Unexpected response from database service: {}", e);
                Envelope::error(format!("Invalid response from database service: {}", e))
            });
        }

        match decoded {
            Ok(envelope) if !envelope.ok && envelope.error.is_some() => envelope,
            _ => {
                tracing::error!("Database service returned {}", status);
                Envelope::error(format!("Database service returned {}", status))
            }
        }
    }

    pub async fn health_check(&self) -> Envelope {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn service_info(&self) -> Envelope {
        self.send(self.request(Method::GET, "/")).await
    }

    pub async fn save_user(&self, user: &NewUser) -> Envelope {
        self.send(self.post("/api/users", user)).await
    }

    pub async fn get_user(&self, user_id: &str) -> Envelope {
        let endpoint = format!("/api/users/{}", urlencoding::encode(user_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn get_user_profiles(&self, user_id: &str) -> Envelope {
        let endpoint = format!("/api/users/{}/profiles", urlencoding::encode(user_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn get_settings(&self, user_id: &str) -> Envelope {
        let endpoint = format!("/api/users/{}/settings", urlencoding::encode(user_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn update_settings(&self, user_id: &str, update: &SettingsUpdate) -> Envelope {
        let endpoint = format!("/api/users/{}/settings", urlencoding::encode(user_id));
        self.send(self.put(&endpoint, update)).await
    }

    pub async fn save_profile(&self, profile: &NewProfile) -> Envelope {
        self.send(self.post("/api/profiles", profile)).await
    }

    pub async fn get_profile(&self, profile_id: &str) -> Envelope {
        let endpoint = format!("/api/profiles/{}", urlencoding::encode(profile_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn update_profile(&self, profile_id: &str, patch: &ProfilePatch) -> Envelope {
        let endpoint = format!("/api/profiles/{}", urlencoding::encode(profile_id));
        self.send(self.put(&endpoint, patch)).await
    }

    pub async fn save_message(&self, message: &NewChatMessage) -> Envelope {
        self.send(self.post("/api/messages", message)).await
    }

    pub async fn get_messages(&self, profile_id: &str, limit: i64) -> Envelope {
        let endpoint = format!("/api/messages/{}", urlencoding::encode(profile_id));
        self.send(self.request(Method::GET, &endpoint).query(&[("limit", limit)])).await
    }

    pub async fn save_usage_stat(&self, stat: &NewUsageStat) -> Envelope {
        self.send(self.post("/api/stats", stat)).await
    }

    pub async fn get_usage_stats(&self, days: i64) -> Envelope {
        self.send(self.request(Method::GET, "/api/stats").query(&[("days", days)])).await
    }

    pub async fn save_progress(&self, progress: &NewStudyProgress) -> Envelope {
        self.send(self.post("/api/progress", progress)).await
    }

    pub async fn get_progress(&self, profile_id: &str) -> Envelope {
        let endpoint = format!("/api/progress/{}", urlencoding::encode(profile_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn save_summary(&self, summary: &NewChatSummary) -> Envelope {
        self.send(self.post("/api/summaries", summary)).await
    }

    pub async fn get_summaries(&self, profile_id: &str) -> Envelope {
        let endpoint = format!("/api/summaries/{}", urlencoding::encode(profile_id));
        self.send(self.request(Method::GET, &endpoint)).await
    }

    pub async fn create_backup(&self) -> Envelope {
        self.send(self.request(Method::POST, "/api/backup")).await
    }
}
