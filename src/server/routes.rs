use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use crate::api::{
    Envelope, HealthReport, MessageQuery, NewChatMessage, NewChatSummary, NewProfile,
    NewStudyProgress, NewUsageStat, NewUser, ProfilePatch, ServiceInfo, SettingsUpdate, StatsQuery,
};
use crate::model::{ChatMessage, ChatSummary, DailyActionCount, Profile, StudyProgress, User, UserSettings};
use crate::server::{ApiError, AppState};
use crate::storage::SqliteStore;
use crate::Error;

const DEFAULT_MESSAGE_LIMIT: i64 = 100;
const DEFAULT_STATS_DAYS: i64 = 30;

/// Every route the router serves, in registration order
pub const ENDPOINTS: &[&str] = &[
    "/health",
    "/api/users",
    "/api/users/{user_id}",
    "/api/users/{user_id}/profiles",
    "/api/users/{user_id}/settings",
    "/api/profiles",
    "/api/profiles/{profile_id}",
    "/api/messages",
    "/api/messages/{profile_id}",
    "/api/stats",
    "/api/progress",
    "/api/progress/{profile_id}",
    "/api/summaries",
    "/api/summaries/{profile_id}",
    "/api/backup",
];

type ApiResult<T = Value> = Result<Json<Envelope<T>>, ApiError>;

/// Run store work on the blocking pool; rusqlite calls must not stall the executor.
async fn with_store<T, F>(state: &Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState, &SqliteStore) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        let store = state.store()?;
        work(&state, &store)
    })
    .await
    .map_err(Error::from)?;
    Ok(result?)
}

/// Acknowledgement carrying the new row id
fn saved(message: &str, id: i64) -> Envelope {
    Envelope { data: Some(json!({ "id": id })), ..Envelope::message(message) }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub async fn service_info() -> Json<Envelope<ServiceInfo>> {
    Json(Envelope::data(ServiceInfo {
        service: "AI Study Advisor Database Service".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now_iso(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let report = with_store(&state, |_, store| {
        let stats = store.stats()?;
        Ok(HealthReport {
            status: "healthy".to_string(),
            database_path: store.path().display().to_string(),
            user_count: stats.users,
            profile_count: stats.profiles,
            message_count: stats.messages,
            timestamp: now_iso(),
        })
    })
    .await;

    match report {
        Ok(report) => Json(Envelope::data(report)).into_response(),
        Err(ApiError(e)) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "status": "unhealthy",
                    "error": e.to_string(),
                    "timestamp": now_iso(),
                })),
            )
                .into_response()
        }
    }
}

// ========== Users ==========

pub async fn save_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult {
    let Json(user) = payload?;
    with_store(&state, move |_, store| store.upsert_user(&user)).await?;
    Ok(Json(Envelope::message("User saved successfully")))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<User> {
    let user = with_store(&state, move |_, store| {
        store.get_user(&user_id)?.ok_or_else(|| Error::not_found("User", user_id))
    })
    .await?;
    Ok(Json(Envelope::data(user)))
}

pub async fn get_user_profiles(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Profile>> {
    let profiles = with_store(&state, move |_, store| store.list_profiles_for_user(&user_id)).await?;
    Ok(Json(Envelope::data(profiles)))
}

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<UserSettings> {
    let settings = with_store(&state, move |_, store| {
        Ok(store
            .get_settings(&user_id)?
            .unwrap_or_else(|| UserSettings::defaults_for(&user_id)))
    })
    .await?;
    Ok(Json(Envelope::data(settings)))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> ApiResult {
    let Json(update) = payload?;
    with_store(&state, move |_, store| store.upsert_settings(&user_id, &update)).await?;
    Ok(Json(Envelope::message("Settings saved successfully")))
}

// ========== Profiles ==========

pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult {
    let Json(profile) = payload?;
    with_store(&state, move |state, store| {
        store.upsert_profile(&profile)?;
        state.backups.create_backup(store);
        Ok(())
    })
    .await?;
    Ok(Json(Envelope::message("Profile saved successfully")))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Profile> {
    let profile = with_store(&state, move |_, store| {
        store.get_profile(&profile_id)?.ok_or_else(|| Error::not_found("Profile", profile_id))
    })
    .await?;
    Ok(Json(Envelope::data(profile)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult {
    let Json(patch) = payload?;
    let changed = with_store(&state, move |_, store| store.update_profile(&profile_id, &patch)).await?;
    if changed == 0 {
        tracing::debug!("Profile update matched no rows");
    }
    Ok(Json(Envelope::message("Profile updated successfully")))
}

// ========== Chat messages ==========

pub async fn save_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewChatMessage>, JsonRejection>,
) -> ApiResult {
    let Json(message) = payload?;
    let id = with_store(&state, move |_, store| store.insert_message(&message)).await?;
    Ok(Json(saved("Message saved successfully", id)))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> ApiResult<Vec<ChatMessage>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
    let messages = with_store(&state, move |_, store| store.recent_messages(&profile_id, limit)).await?;
    Ok(Json(Envelope::data(messages)))
}

// ========== Usage stats ==========

pub async fn save_usage_stat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewUsageStat>, JsonRejection>,
) -> ApiResult {
    let Json(stat) = payload?;
    let id = with_store(&state, move |_, store| store.insert_usage_stat(&stat)).await?;
    Ok(Json(saved("Usage stat saved successfully", id)))
}

pub async fn get_usage_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Vec<DailyActionCount>> {
    let Query(query) = query?;
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS);
    let counts = with_store(&state, move |_, store| store.daily_action_counts(days)).await?;
    Ok(Json(Envelope::data(counts)))
}

// ========== Progress & summaries ==========

pub async fn save_progress(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewStudyProgress>, JsonRejection>,
) -> ApiResult {
    let Json(progress) = payload?;
    let id = with_store(&state, move |_, store| store.insert_progress(&progress)).await?;
    Ok(Json(saved("Progress saved successfully", id)))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Vec<StudyProgress>> {
    let entries = with_store(&state, move |_, store| store.list_progress(&profile_id)).await?;
    Ok(Json(Envelope::data(entries)))
}

pub async fn save_summary(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewChatSummary>, JsonRejection>,
) -> ApiResult {
    let Json(summary) = payload?;
    let id = with_store(&state, move |_, store| store.insert_summary(&summary)).await?;
    Ok(Json(saved("Summary saved successfully", id)))
}

pub async fn get_summaries(
    State(state): State<Arc<AppState>>,
    Path(profile_id): Path<String>,
) -> ApiResult<Vec<ChatSummary>> {
    let summaries = with_store(&state, move |_, store| store.list_summaries(&profile_id)).await?;
    Ok(Json(Envelope::data(summaries)))
}

// ========== Backup ==========

pub async fn create_backup(State(state): State<Arc<AppState>>) -> ApiResult {
    let created = with_store(&state, |state, store| Ok(state.backups.create_backup(store))).await?;
    let envelope = match created {
        Some(path) => Envelope {
            data: Some(json!({ "path": path.display().to_string() })),
            ..Envelope::message("Backup created successfully")
        },
        None => Envelope::message("Backup skipped: no usable backup directory"),
    };
    Ok(Json(envelope))
}
