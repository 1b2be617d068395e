//! Storage Layer - SQLite-backed persistence
//!
//! System of record is one SQLite file with tables:
//! - users(user_id, email, name, avatar, provider)
//! - user_profiles(profile_id, user_id, user_role, contact fields, countries, budget, ...)
//! - chat_messages(profile_id, user_id, message_type, message_content, language)
//! - usage_stats(user_id, profile_id, action_type, action_details)
//! - study_progress, chat_summaries, user_settings
//! - admins, admin_sessions (inert)
//!
//! Backups are timestamped copies of that file, see [`backup`].

pub mod schema;
pub mod sqlite;
pub mod backup;

pub use sqlite::{SqliteStore, DbStats};
pub use backup::{BackupLocation, BackupManager, FixedLocation, ProbedLocation};
