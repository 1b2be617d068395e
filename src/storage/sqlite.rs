//! SQLite storage implementation

use std::path::{Path, PathBuf};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use crate::Result;
use crate::api::{
    NewChatMessage, NewChatSummary, NewProfile, NewStudyProgress, NewUsageStat, NewUser,
    ProfilePatch, SettingsUpdate,
};
use crate::model::{
    decode_string_list, ChatMessage, ChatSummary, DailyActionCount, Profile,
    StudyProgress, User, UserSettings,
};
use super::schema;

/// Upper bound for the stats window. SQLite date arithmetic yields NULL past year 0.
const MAX_STATS_DAYS: i64 = 365_000;

const USER_COLUMNS: &str = "id, user_id, email, name, avatar, provider, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, profile_id, user_id, user_role, student_name, student_email, \
    parent_name, parent_email, relationship, child_name, child_email, citizenship, gpa, degree, \
    countries, budget, target_intake, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, profile_id, user_id, message_type, message_content, language, user_role, created_at";

const PROGRESS_COLUMNS: &str = "id, profile_id, user_id, progress_category, progress_item, status, \
    completion_percentage, notes, target_date, completed_date, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, profile_id, user_id, summary_period, summary_content, key_topics, \
    action_items, advisor_notes, created_at";

/// SQLite-backed storage for the advisor data.
///
/// Holds only the database path. Each operation opens its own connection and drops it
/// when done, so the store can be shared freely between request handlers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist) and bring the schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self { path: path.to_path_buf() };
        let conn = store.connect()?;
        store.initialize_schema(&conn)?;
        tracing::info!("Database initialized at {}", path.display());
        Ok(store)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with the durability settings applied
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!("journal_mode is {} instead of wal for {}", mode, self.path.display());
        }
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.pragma_update(None, "cache_size", 1000)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        // Messages and stats may arrive before their user or profile row exists
        conn.pragma_update(None, "foreign_keys", false)?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn initialize_schema(&self, conn: &Connection) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Fold the write-ahead log back into the main file so a plain file copy is complete
    pub fn checkpoint(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(()))?;
        Ok(())
    }

    // ========== User Operations ==========

    /// Insert or replace a user. Columns missing from `user` are reset, not kept.
    pub fn upsert_user(&self, user: &NewUser) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO users (user_id, email, name, avatar, provider, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user.user_id,
                user.email,
                user.name,
                user.avatar,
                user.provider.as_deref().unwrap_or("google"),
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Get a user by its business key
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
            [user_id],
            row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    // ========== Profile Operations ==========

    /// Insert or replace a profile. Columns missing from `profile` are reset, not kept.
    pub fn upsert_profile(&self, profile: &NewProfile) -> Result<()> {
        let countries = serde_json::to_string(profile.countries.as_deref().unwrap_or_default())?;
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO user_profiles (
                profile_id, user_id, user_role, student_name, student_email,
                parent_name, parent_email, relationship, child_name, child_email,
                citizenship, gpa, degree, countries, budget, target_intake, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                profile.profile_id,
                profile.user_id,
                profile.user_role,
                profile.student_name,
                profile.student_email,
                profile.parent_name,
                profile.parent_email,
                profile.relationship,
                profile.child_name,
                profile.child_email,
                profile.citizenship,
                profile.gpa,
                profile.degree,
                countries,
                profile.budget,
                profile.target_intake,
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Get a profile by its business key
    pub fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM user_profiles WHERE profile_id = ?1", PROFILE_COLUMNS),
            [profile_id],
            row_to_profile,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All profiles of a user, newest first
    pub fn list_profiles_for_user(&self, user_id: &str) -> Result<Vec<Profile>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            PROFILE_COLUMNS
        ))?;

        let profiles = stmt
            .query_map([user_id], row_to_profile)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(profiles)
    }

    /// Apply a partial update. `updated_at` is always refreshed, even for an empty patch.
    ///
    /// Returns the number of rows touched (0 when the profile does not exist).
    pub fn update_profile(&self, profile_id: &str, patch: &ProfilePatch) -> Result<usize> {
        let mut fields = profile_assignments(patch)?;
        fields.push(("updated_at", Value::from(now_timestamp())));

        let set_clause = fields
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE user_profiles SET {} WHERE profile_id = ?{}",
            set_clause,
            fields.len() + 1
        );

        let mut values: Vec<Value> = fields.into_iter().map(|(_, value)| value).collect();
        values.push(Value::from(profile_id.to_string()));

        let conn = self.connect()?;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        Ok(changed)
    }

    // ========== Chat Message Operations ==========

    /// Append a chat message, returning its row id
    pub fn insert_message(&self, message: &NewChatMessage) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO chat_messages (profile_id, user_id, message_type, message_content, language, user_role)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                message.profile_id,
                message.user_id,
                message.message_type.as_str(),
                message.message_content,
                message.language.as_deref().unwrap_or("zh"),
                message.user_role,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The `limit` most recent messages of a profile, newest first
    pub fn recent_messages(&self, profile_id: &str, limit: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chat_messages WHERE profile_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            MESSAGE_COLUMNS
        ))?;

        let messages = stmt
            .query_map(params![profile_id, limit.max(0)], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    // ========== Usage Stat Operations ==========

    /// Append a usage event, returning its row id
    pub fn insert_usage_stat(&self, stat: &NewUsageStat) -> Result<i64> {
        let details = match &stat.action_details {
            Some(details) => serde_json::to_string(details)?,
            None => "{}".to_string(),
        };
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO usage_stats (user_id, profile_id, action_type, action_details) VALUES (?1, ?2, ?3, ?4)",
            params![stat.user_id, stat.profile_id, stat.action_type, details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Event counts per day and action type over the last `days` days, newest day first
    pub fn daily_action_counts(&self, days: i64) -> Result<Vec<DailyActionCount>> {
        let window = format!("-{} days", days.clamp(0, MAX_STATS_DAYS));
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DATE(created_at) AS date, action_type, COUNT(*) AS count
            FROM usage_stats
            WHERE created_at > datetime('now', ?1)
            GROUP BY DATE(created_at), action_type
            ORDER BY date DESC, action_type
            "#,
        )?;

        let counts = stmt
            .query_map([window], |row| {
                Ok(DailyActionCount {
                    date: row.get(0)?,
                    action_type: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    // ========== Study Progress Operations ==========

    /// Append a progress entry, returning its row id
    pub fn insert_progress(&self, progress: &NewStudyProgress) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO study_progress (
                profile_id, user_id, progress_category, progress_item, status,
                completion_percentage, notes, target_date, completed_date, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                progress.profile_id,
                progress.user_id,
                progress.progress_category,
                progress.progress_item,
                progress.status,
                progress.completion_percentage.unwrap_or(0),
                progress.notes,
                progress.target_date,
                progress.completed_date,
                now_timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Progress entries of a profile, most recently updated first
    pub fn list_progress(&self, profile_id: &str) -> Result<Vec<StudyProgress>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM study_progress WHERE profile_id = ?1 ORDER BY updated_at DESC, id DESC",
            PROGRESS_COLUMNS
        ))?;

        let entries = stmt
            .query_map([profile_id], row_to_progress)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    // ========== Chat Summary Operations ==========

    /// Append a chat summary, returning its row id
    pub fn insert_summary(&self, summary: &NewChatSummary) -> Result<i64> {
        let key_topics = serde_json::to_string(&summary.key_topics)?;
        let action_items = serde_json::to_string(&summary.action_items)?;
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO chat_summaries (
                profile_id, user_id, summary_period, summary_content, key_topics, action_items, advisor_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                summary.profile_id,
                summary.user_id,
                summary.summary_period,
                summary.summary_content,
                key_topics,
                action_items,
                summary.advisor_notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Summaries of a profile, newest first
    pub fn list_summaries(&self, profile_id: &str) -> Result<Vec<ChatSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chat_summaries WHERE profile_id = ?1 ORDER BY created_at DESC, id DESC",
            SUMMARY_COLUMNS
        ))?;

        let summaries = stmt
            .query_map([profile_id], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }

    // ========== User Settings Operations ==========

    /// Stored settings of a user, if any were ever saved
    pub fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let conn = self.connect()?;
        conn.query_row(
            r#"
            SELECT user_id, email_notifications, push_notifications, notification_frequency, created_at, updated_at
            FROM user_settings WHERE user_id = ?1
            "#,
            [user_id],
            |row| {
                Ok(UserSettings {
                    user_id: row.get(0)?,
                    email_notifications: row.get::<_, Option<bool>>(1)?.unwrap_or(false),
                    push_notifications: row.get::<_, Option<bool>>(2)?.unwrap_or(true),
                    notification_frequency: row
                        .get::<_, Option<String>>(3)?
                        .unwrap_or_else(|| "daily".to_string()),
                    created_at: text_column(row, 4)?,
                    updated_at: text_column(row, 5)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Create or merge a user's settings. Absent fields keep their stored (or default) value.
    pub fn upsert_settings(&self, user_id: &str, update: &SettingsUpdate) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO user_settings (user_id, email_notifications, push_notifications, notification_frequency, updated_at)
            VALUES (?1, COALESCE(?2, 0), COALESCE(?3, 1), COALESCE(?4, 'daily'), ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                email_notifications = COALESCE(?2, email_notifications),
                push_notifications = COALESCE(?3, push_notifications),
                notification_frequency = COALESCE(?4, notification_frequency),
                updated_at = ?5
            "#,
            params![
                user_id,
                update.email_notifications,
                update.push_notifications,
                update.notification_frequency,
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    // ========== Statistics ==========

    /// Count rows of one of the schema's tables
    fn count_rows(&self, conn: &Connection, table: &'static str) -> Result<usize> {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.connect()?;
        Ok(DbStats {
            users: self.count_rows(&conn, "users")?,
            profiles: self.count_rows(&conn, "user_profiles")?,
            messages: self.count_rows(&conn, "chat_messages")?,
        })
    }
}

/// Column assignments for the fields present in a patch
fn profile_assignments(patch: &ProfilePatch) -> Result<Vec<(&'static str, Value)>> {
    fn assign<T>(fields: &mut Vec<(&'static str, Value)>, column: &'static str, value: &Option<Option<T>>)
    where
        T: Clone + Into<Value>,
    {
        if let Some(value) = value {
            fields.push((column, Value::from(value.clone())));
        }
    }

    let mut fields = Vec::new();
    if let Some(role) = &patch.user_role {
        fields.push(("user_role", Value::from(role.clone())));
    }
    assign(&mut fields, "student_name", &patch.student_name);
    assign(&mut fields, "student_email", &patch.student_email);
    assign(&mut fields, "parent_name", &patch.parent_name);
    assign(&mut fields, "parent_email", &patch.parent_email);
    assign(&mut fields, "relationship", &patch.relationship);
    assign(&mut fields, "child_name", &patch.child_name);
    assign(&mut fields, "child_email", &patch.child_email);
    assign(&mut fields, "citizenship", &patch.citizenship);
    assign(&mut fields, "gpa", &patch.gpa);
    assign(&mut fields, "degree", &patch.degree);
    if let Some(countries) = &patch.countries {
        let encoded = match countries {
            Some(list) => Value::from(serde_json::to_string(list)?),
            None => Value::Null,
        };
        fields.push(("countries", encoded));
    }
    assign(&mut fields, "budget", &patch.budget);
    assign(&mut fields, "target_intake", &patch.target_intake);
    Ok(fields)
}

/// Timestamp for `updated_at` columns, in the layout SQLite's CURRENT_TIMESTAMP uses
/// plus microseconds so successive writes stay ordered.
fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Read a loosely typed column as text. DATE/TIMESTAMP columns have numeric affinity,
/// so a bare year like `2026` comes back as an integer.
fn text_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        avatar: row.get(4)?,
        provider: row.get(5)?,
        created_at: text_column(row, 6)?,
        updated_at: text_column(row, 7)?,
    })
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    let countries: Option<String> = row.get(14)?;
    Ok(Profile {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        user_id: row.get(2)?,
        user_role: row.get(3)?,
        student_name: row.get(4)?,
        student_email: row.get(5)?,
        parent_name: row.get(6)?,
        parent_email: row.get(7)?,
        relationship: row.get(8)?,
        child_name: row.get(9)?,
        child_email: row.get(10)?,
        citizenship: row.get(11)?,
        gpa: row.get(12)?,
        degree: row.get(13)?,
        countries: decode_string_list(countries.as_deref()),
        budget: row.get(15)?,
        target_intake: row.get(16)?,
        created_at: text_column(row, 17)?,
        updated_at: text_column(row, 18)?,
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        user_id: row.get(2)?,
        message_type: text_column(row, 3)?.unwrap_or_default(),
        message_content: row.get(4)?,
        language: row.get(5)?,
        user_role: row.get(6)?,
        created_at: text_column(row, 7)?,
    })
}

fn row_to_progress(row: &rusqlite::Row) -> rusqlite::Result<StudyProgress> {
    Ok(StudyProgress {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        user_id: row.get(2)?,
        progress_category: row.get(3)?,
        progress_item: row.get(4)?,
        status: row.get(5)?,
        completion_percentage: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        notes: row.get(7)?,
        target_date: text_column(row, 8)?,
        completed_date: text_column(row, 9)?,
        created_at: text_column(row, 10)?,
        updated_at: text_column(row, 11)?,
    })
}

fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<ChatSummary> {
    let key_topics: Option<String> = row.get(5)?;
    let action_items: Option<String> = row.get(6)?;
    Ok(ChatSummary {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        user_id: row.get(2)?,
        summary_period: row.get(3)?,
        summary_content: row.get(4)?,
        key_topics: decode_string_list(key_topics.as_deref()),
        action_items: decode_string_list(action_items.as_deref()),
        advisor_notes: row.get(7)?,
        created_at: text_column(row, 8)?,
    })
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    pub users: usize,
    pub profiles: usize,
    pub messages: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Users: {}", self.users)?;
        writeln!(f, "  Profiles: {}", self.profiles)?;
        write!(f, "  Messages: {}", self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageType;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("advisor.db")).unwrap();
        (dir, store)
    }

    fn sample_profile(profile_id: &str) -> NewProfile {
        NewProfile {
            profile_id: profile_id.to_string(),
            user_id: "u-1".to_string(),
            user_role: "student".to_string(),
            student_name: Some("Mei".to_string()),
            citizenship: Some("TW".to_string()),
            gpa: Some(3.7),
            degree: Some("master".to_string()),
            countries: Some(vec!["US".to_string(), "UK".to_string()]),
            budget: Some(40000),
            target_intake: Some("2027 Fall".to_string()),
            ..Default::default()
        }
    }

    fn sample_message(profile_id: &str, content: String) -> NewChatMessage {
        NewChatMessage {
            profile_id: profile_id.to_string(),
            user_id: "u-1".to_string(),
            message_type: MessageType::User,
            message_content: content,
            language: None,
            user_role: Some("student".to_string()),
        }
    }

    #[test]
    fn test_wal_mode_is_enabled() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        let sync: i64 = conn.query_row("PRAGMA synchronous", [], |row| row.get(0)).unwrap();
        assert_eq!(sync, 2); // FULL
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let (dir, store) = temp_store();
        store.upsert_user(&NewUser { user_id: "u-1".into(), ..Default::default() }).unwrap();

        let reopened = SqliteStore::open(&dir.path().join("advisor.db")).unwrap();
        assert_eq!(reopened.stats().unwrap().users, 1);
    }

    #[test]
    fn test_user_upsert_replaces_row() {
        let (_dir, store) = temp_store();

        store
            .upsert_user(&NewUser { user_id: "u-1".into(), name: Some("Amy".into()), ..Default::default() })
            .unwrap();
        store
            .upsert_user(&NewUser { user_id: "u-1".into(), name: Some("Amy Chen".into()), ..Default::default() })
            .unwrap();

        assert_eq!(store.stats().unwrap().users, 1);
        let user = store.get_user("u-1").unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Amy Chen"));
        assert_eq!(user.provider.as_deref(), Some("google"));
    }

    #[test]
    fn test_missing_user_is_none() {
        let (_dir, store) = temp_store();
        assert!(store.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_profile_countries_round_trip_in_order() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();

        let profile = store.get_profile("p-1").unwrap().unwrap();
        assert_eq!(profile.countries, vec!["US", "UK"]);
        assert_eq!(profile.gpa, Some(3.7));
        assert!(store.get_profile("p-unknown").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_countries_read_as_empty() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();
        store
            .connect()
            .unwrap()
            .execute("UPDATE user_profiles SET countries = '[\"US\",' WHERE profile_id = 'p-1'", [])
            .unwrap();

        let profile = store.get_profile("p-1").unwrap().unwrap();
        assert!(profile.countries.is_empty());
    }

    #[test]
    fn test_partial_update_touches_only_given_fields() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();
        let before = store.get_profile("p-1").unwrap().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let patch = ProfilePatch { budget: Some(Some(5000)), ..Default::default() };
        assert_eq!(store.update_profile("p-1", &patch).unwrap(), 1);

        let after = store.get_profile("p-1").unwrap().unwrap();
        assert_eq!(after.budget, Some(5000));
        assert_ne!(after.updated_at, before.updated_at);
        assert_eq!(
            Profile { budget: before.budget, updated_at: before.updated_at.clone(), ..after.clone() },
            before
        );
    }

    #[test]
    fn test_empty_patch_only_refreshes_timestamp() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();
        let before = store.get_profile("p-1").unwrap().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(store.update_profile("p-1", &ProfilePatch::default()).unwrap(), 1);

        let after = store.get_profile("p-1").unwrap().unwrap();
        assert_ne!(after.updated_at, before.updated_at);
        assert_eq!(Profile { updated_at: before.updated_at.clone(), ..after }, before);
    }

    #[test]
    fn test_patch_null_clears_column() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();

        let patch = ProfilePatch { degree: Some(None), countries: Some(None), ..Default::default() };
        store.update_profile("p-1", &patch).unwrap();

        let profile = store.get_profile("p-1").unwrap().unwrap();
        assert_eq!(profile.degree, None);
        assert!(profile.countries.is_empty());
        assert_eq!(profile.student_name.as_deref(), Some("Mei"));
    }

    #[test]
    fn test_update_unknown_profile_changes_nothing() {
        let (_dir, store) = temp_store();
        assert_eq!(store.update_profile("p-404", &ProfilePatch::default()).unwrap(), 0);
    }

    #[test]
    fn test_profiles_for_user_newest_first() {
        let (_dir, store) = temp_store();
        store.upsert_profile(&sample_profile("p-1")).unwrap();
        store.upsert_profile(&sample_profile("p-2")).unwrap();

        let ids: Vec<_> = store
            .list_profiles_for_user("u-1")
            .unwrap()
            .into_iter()
            .map(|p| p.profile_id)
            .collect();
        assert_eq!(ids, vec!["p-2", "p-1"]);
    }

    #[test]
    fn test_recent_messages_limit_and_order() {
        let (_dir, store) = temp_store();
        for i in 0..150 {
            store.insert_message(&sample_message("p-1", format!("msg {}", i))).unwrap();
        }
        store.insert_message(&sample_message("p-2", "other".into())).unwrap();

        let messages = store.recent_messages("p-1", 100).unwrap();
        assert_eq!(messages.len(), 100);
        assert_eq!(messages[0].message_content, "msg 149");
        assert_eq!(messages[99].message_content, "msg 50");
        assert!(messages.windows(2).all(|w| w[0].id > w[1].id));
        assert_eq!(messages[0].language.as_deref(), Some("zh"));
    }

    #[test]
    fn test_foreign_keys_are_not_enforced() {
        let (_dir, store) = temp_store();
        let conn = store.connect().unwrap();
        let enforced: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)).unwrap();
        assert_eq!(enforced, 0);

        // Neither the user nor the profile exists
        store.insert_message(&sample_message("p-orphan", "hello".into())).unwrap();
        store
            .upsert_profile(&NewProfile { user_id: "nobody".into(), ..sample_profile("p-2") })
            .unwrap();
        assert_eq!(store.recent_messages("p-orphan", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_stored_message_type_is_kept() {
        let (_dir, store) = temp_store();
        store.insert_message(&sample_message("p-1", "hi".into())).unwrap();
        store
            .connect()
            .unwrap()
            .execute(
                "INSERT INTO chat_messages (profile_id, user_id, message_type, message_content) \
                 VALUES ('p-1', 'u-1', 'system', 'legacy')",
                [],
            )
            .unwrap();

        let messages = store.recent_messages("p-1", 10).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_type, "system");
        assert_eq!(messages[1].message_type, MessageType::User.as_str());
    }

    #[test]
    fn test_daily_action_counts_window() {
        let (_dir, store) = temp_store();
        for action in ["chat", "chat", "profile_save"] {
            store
                .insert_usage_stat(&NewUsageStat {
                    user_id: "u-1".into(),
                    action_type: action.into(),
                    action_details: Some(serde_json::json!({"source": "web"})),
                    ..Default::default()
                })
                .unwrap();
        }
        // Backdate one event well outside a one-week window
        store
            .connect()
            .unwrap()
            .execute(
                "INSERT INTO usage_stats (user_id, action_type, created_at) VALUES ('u-1', 'chat', datetime('now', '-40 days'))",
                [],
            )
            .unwrap();

        assert!(store.daily_action_counts(0).unwrap().is_empty());
        assert!(store.daily_action_counts(-3).unwrap().is_empty());

        let week = store.daily_action_counts(7).unwrap();
        assert_eq!(week.len(), 2);
        let chat = week.iter().find(|c| c.action_type == "chat").unwrap();
        assert_eq!(chat.count, 2);

        let all = store.daily_action_counts(100_000).unwrap();
        assert_eq!(all.iter().map(|c| c.count).sum::<i64>(), 4);
        assert!(all.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_progress_and_summaries() {
        let (_dir, store) = temp_store();
        store
            .insert_progress(&NewStudyProgress {
                profile_id: "p-1".into(),
                user_id: "u-1".into(),
                progress_category: "exams".into(),
                progress_item: "IELTS".into(),
                status: "in_progress".into(),
                target_date: Some("2026-12-01".into()),
                ..Default::default()
            })
            .unwrap();
        let progress = store.list_progress("p-1").unwrap();
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].completion_percentage, 0);
        assert_eq!(progress[0].target_date.as_deref(), Some("2026-12-01"));

        store
            .insert_summary(&NewChatSummary {
                profile_id: "p-1".into(),
                user_id: "u-1".into(),
                summary_period: "2026-W42".into(),
                summary_content: "Discussed UK options".into(),
                key_topics: vec!["UK".into(), "budget".into()],
                ..Default::default()
            })
            .unwrap();
        let summaries = store.list_summaries("p-1").unwrap();
        assert_eq!(summaries[0].key_topics, vec!["UK", "budget"]);
        assert!(summaries[0].action_items.is_empty());
    }

    #[test]
    fn test_settings_merge() {
        let (_dir, store) = temp_store();
        assert!(store.get_settings("u-1").unwrap().is_none());

        store
            .upsert_settings("u-1", &SettingsUpdate { email_notifications: Some(true), ..Default::default() })
            .unwrap();
        store
            .upsert_settings(
                "u-1",
                &SettingsUpdate { notification_frequency: Some("weekly".into()), ..Default::default() },
            )
            .unwrap();

        let settings = store.get_settings("u-1").unwrap().unwrap();
        assert!(settings.email_notifications);
        assert!(settings.push_notifications);
        assert_eq!(settings.notification_frequency, "weekly");
    }
}
