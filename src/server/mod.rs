//! HTTP service
//!
//! One axum router over a shared [`AppState`]. The store is opened once at startup;
//! if that fails the service still starts and every handler answers with a
//! "Database not available" error instead.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::config::ServiceSettings;
use crate::storage::{BackupManager, SqliteStore};
use crate::{Error, Result};

pub mod error;
pub mod routes;

pub use error::ApiError;

/// Whether the database could be opened at startup
pub enum StoreState {
    Ready(Arc<SqliteStore>),
    Unavailable { reason: String },
}

/// Server state
pub struct AppState {
    pub store: StoreState,
    pub backups: BackupManager,
}

impl AppState {
    pub fn new(store: Result<SqliteStore>, backups: BackupManager) -> Self {
        let store = match store {
            Ok(store) => StoreState::Ready(Arc::new(store)),
            Err(e) => {
                tracing::error!("Database initialization failed: {}", e);
                StoreState::Unavailable { reason: e.to_string() }
            }
        };
        Self { store, backups }
    }

    /// Open the configured database and backup location
    pub fn open(settings: &ServiceSettings) -> Self {
        Self::new(
            SqliteStore::open(&settings.database_path),
            BackupManager::new(settings.backup_location()),
        )
    }

    /// The store, or `Error::Unavailable` when startup failed
    pub fn store(&self) -> Result<Arc<SqliteStore>> {
        match &self.store {
            StoreState::Ready(store) => Ok(store.clone()),
            StoreState::Unavailable { reason } => Err(Error::Unavailable(reason.clone())),
        }
    }
}

/// Build the router with all endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::service_info))
        .route("/health", get(routes::health))
        .route("/api/users", post(routes::save_user))
        .route("/api/users/{user_id}", get(routes::get_user))
        .route("/api/users/{user_id}/profiles", get(routes::get_user_profiles))
        .route(
            "/api/users/{user_id}/settings",
            get(routes::get_settings).put(routes::update_settings),
        )
        .route("/api/profiles", post(routes::save_profile))
        .route(
            "/api/profiles/{profile_id}",
            get(routes::get_profile).put(routes::update_profile),
        )
        .route("/api/messages", post(routes::save_message))
        .route("/api/messages/{profile_id}", get(routes::get_messages))
        .route("/api/stats", post(routes::save_usage_stat).get(routes::get_usage_stats))
        .route("/api/progress", post(routes::save_progress))
        .route("/api/progress/{profile_id}", get(routes::get_progress))
        .route("/api/summaries", post(routes::save_summary))
        .route("/api/summaries/{profile_id}", get(routes::get_summaries))
        .route("/api/backup", post(routes::create_backup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until the process stops
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn start_server(settings: &ServiceSettings) -> anyhow::Result<()> {
    let state = Arc::new(AppState::open(settings));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Starting database service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}
