//! # Advisor Store - persistence service for the AI study advisor
//!
//! Stores user accounts, advisory profiles, chat transcripts, usage statistics and
//! progress records in a single SQLite file, and serves them over a small REST API.
//!
//! Advisor Store provides:
//! - SQLite-backed storage with WAL journaling and full synchronous durability
//! - Rotating file-copy backups (newest five kept)
//! - An axum HTTP service speaking a uniform `{"ok": ..}` JSON envelope
//! - A typed async client for front-end services

pub mod model;
pub mod api;
pub mod storage;
pub mod server;
pub mod client;
pub mod config;

// Re-exports for convenient access
pub use api::Envelope;
pub use client::DatabaseClient;
pub use storage::{BackupManager, SqliteStore};

/// Result type alias for Advisor Store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Advisor Store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Database not available: {0}")]
    Unavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound { entity, key: key.into() }
    }
}
