//! Database schema definitions

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT UNIQUE NOT NULL,
    email TEXT,
    name TEXT,
    avatar TEXT,
    provider TEXT DEFAULT 'google',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the user_profiles table
/// `countries` holds a JSON array of country names
pub const CREATE_PROFILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id TEXT UNIQUE NOT NULL,
    user_id TEXT NOT NULL,
    user_role TEXT NOT NULL,
    student_name TEXT,
    student_email TEXT,
    parent_name TEXT,
    parent_email TEXT,
    relationship TEXT,
    child_name TEXT,
    child_email TEXT,
    citizenship TEXT,
    gpa REAL,
    degree TEXT,
    countries TEXT,
    budget INTEGER,
    target_intake TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users (user_id)
)
"#;

/// SQL to create the chat_messages table
pub const CREATE_CHAT_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    message_type TEXT NOT NULL,
    message_content TEXT NOT NULL,
    language TEXT DEFAULT 'zh',
    user_role TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (profile_id) REFERENCES user_profiles (profile_id),
    FOREIGN KEY (user_id) REFERENCES users (user_id)
)
"#;

/// SQL to create the usage_stats table
pub const CREATE_USAGE_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS usage_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    profile_id TEXT,
    action_type TEXT NOT NULL,
    action_details TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users (user_id),
    FOREIGN KEY (profile_id) REFERENCES user_profiles (profile_id)
)
"#;

/// SQL to create the study_progress table
pub const CREATE_STUDY_PROGRESS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS study_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    progress_category TEXT NOT NULL,
    progress_item TEXT NOT NULL,
    status TEXT NOT NULL,
    completion_percentage INTEGER DEFAULT 0,
    notes TEXT,
    target_date DATE,
    completed_date DATE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (profile_id) REFERENCES user_profiles (profile_id),
    FOREIGN KEY (user_id) REFERENCES users (user_id)
)
"#;

/// SQL to create the chat_summaries table
pub const CREATE_CHAT_SUMMARIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chat_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    summary_period TEXT NOT NULL,
    summary_content TEXT NOT NULL,
    key_topics TEXT,
    action_items TEXT,
    advisor_notes TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (profile_id) REFERENCES user_profiles (profile_id),
    FOREIGN KEY (user_id) REFERENCES users (user_id)
)
"#;

/// SQL to create the admins table. Rows are inert: nothing in the service authenticates against them.
pub const CREATE_ADMINS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS admins (
    admin_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    role TEXT NOT NULL DEFAULT 'advisor',
    permissions TEXT NOT NULL DEFAULT 'read_only',
    is_active BOOLEAN DEFAULT 1,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    last_login TIMESTAMP,
    created_by TEXT
)
"#;

/// SQL to create the admin_sessions table
pub const CREATE_ADMIN_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS admin_sessions (
    session_id TEXT PRIMARY KEY,
    admin_id INTEGER NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    expires_at TIMESTAMP NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    FOREIGN KEY (admin_id) REFERENCES admins (admin_id)
)
"#;

/// SQL to create the user_settings table
pub const CREATE_USER_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT UNIQUE NOT NULL,
    email_notifications BOOLEAN DEFAULT 0,
    push_notifications BOOLEAN DEFAULT 1,
    notification_frequency TEXT DEFAULT 'daily',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users (user_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_profiles_user ON user_profiles(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_profile ON chat_messages(profile_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_stats_created ON usage_stats(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_progress_profile ON study_progress(profile_id)",
    "CREATE INDEX IF NOT EXISTS idx_summaries_profile ON chat_summaries(profile_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_USERS_TABLE,
        CREATE_PROFILES_TABLE,
        CREATE_CHAT_MESSAGES_TABLE,
        CREATE_USAGE_STATS_TABLE,
        CREATE_STUDY_PROGRESS_TABLE,
        CREATE_CHAT_SUMMARIES_TABLE,
        CREATE_ADMINS_TABLE,
        CREATE_ADMIN_SESSIONS_TABLE,
        CREATE_USER_SETTINGS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
