use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::storage::{BackupLocation, FixedLocation, ProbedLocation};
use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PERSISTENT_DIR: &str = "/data";
pub const DATABASE_FILE: &str = "ai_study_advisor.db";
pub const DEFAULT_SERVICE_URL: &str = "https://ai-study-advisor-database.zeabur.app";

pub const ENV_PERSISTENT_DIR: &str = "ZEABUR_PERSISTENT_DIR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BACKUP_DIR: &str = "BACKUP_DIR";
pub const ENV_SERVICE_URL: &str = "DATABASE_SERVICE_URL";

/// Optional `advisor-store.toml` contents
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdvisorConfig {
    pub data_dir: Option<String>,
    pub port: Option<u16>,
    pub backup_dir: Option<String>,
}

/// Values given on the command line; these win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub port: Option<u16>,
    pub backup_dir: Option<PathBuf>,
}

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub persistent_dir: PathBuf,
    pub database_path: PathBuf,
    pub port: u16,
    pub backup_dir: Option<PathBuf>,
}

impl ServiceSettings {
    /// Resolve from the process environment
    pub fn resolve(file: Option<&AdvisorConfig>, overrides: Overrides) -> Result<Self> {
        Self::resolve_with(file, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with precedence: overrides, then environment, then config file, then defaults
    pub fn resolve_with(
        file: Option<&AdvisorConfig>,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        let persistent_dir = match overrides.data_dir {
            Some(dir) => dir,
            None => {
                let dir = env(ENV_PERSISTENT_DIR)
                    .or(file.data_dir)
                    .unwrap_or_else(|| DEFAULT_PERSISTENT_DIR.to_string());
                let dir = PathBuf::from(dir);
                if dir.exists() {
                    dir
                } else {
                    let fallback = std::env::temp_dir();
                    tracing::warn!(
                        "Persistent directory {} does not exist, using {}; data may be lost on restart",
                        dir.display(),
                        fallback.display()
                    );
                    fallback
                }
            }
        };

        let port = match overrides.port {
            Some(port) => port,
            None => match env(ENV_PORT) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid {} value: {}", ENV_PORT, raw)))?,
                None => file.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let backup_dir = overrides
            .backup_dir
            .or_else(|| env(ENV_BACKUP_DIR).map(PathBuf::from))
            .or_else(|| file.backup_dir.map(PathBuf::from));

        Ok(Self {
            database_path: persistent_dir.join(DATABASE_FILE),
            persistent_dir,
            port,
            backup_dir,
        })
    }

    /// Fixed directory when one is configured, otherwise the probing fallback chain
    pub fn backup_location(&self) -> Box<dyn BackupLocation> {
        match &self.backup_dir {
            Some(dir) => Box::new(FixedLocation::new(dir)),
            None => Box::new(ProbedLocation::for_database(&self.persistent_dir, &self.database_path)),
        }
    }
}

/// Base URL the client talks to
pub fn service_url() -> String {
    std::env::var(ENV_SERVICE_URL).unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string())
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("advisor-store.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AdvisorConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AdvisorConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_beats_file_and_overrides_beat_env() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().to_string_lossy().to_string();
        let file = AdvisorConfig { data_dir: Some("/nonexistent".into()), port: Some(7000), backup_dir: None };

        let settings = ServiceSettings::resolve_with(
            Some(&file),
            Overrides::default(),
            env_from(&[(ENV_PERSISTENT_DIR, data.as_str()), (ENV_PORT, "8080")]),
        )
        .unwrap();
        assert_eq!(settings.persistent_dir, dir.path());
        assert_eq!(settings.database_path, dir.path().join(DATABASE_FILE));
        assert_eq!(settings.port, 8080);

        let settings = ServiceSettings::resolve_with(
            Some(&file),
            Overrides { port: Some(9000), ..Default::default() },
            env_from(&[(ENV_PERSISTENT_DIR, data.as_str())]),
        )
        .unwrap();
        assert_eq!(settings.port, 9000);

        let settings =
            ServiceSettings::resolve_with(Some(&file), Overrides::default(), env_from(&[(ENV_PERSISTENT_DIR, data.as_str())]))
                .unwrap();
        assert_eq!(settings.port, 7000);
    }

    #[test]
    fn test_missing_persistent_dir_falls_back_to_temp() {
        let settings = ServiceSettings::resolve_with(
            None,
            Overrides::default(),
            env_from(&[(ENV_PERSISTENT_DIR, "/definitely/not/here")]),
        )
        .unwrap();
        assert_eq!(settings.persistent_dir, std::env::temp_dir());
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let result = ServiceSettings::resolve_with(None, Overrides::default(), env_from(&[(ENV_PORT, "http")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_file_parses() {
        let config: AdvisorConfig =
            toml::from_str("data_dir = \"/srv/advisor\"\nport = 5050\nbackup_dir = \"/srv/backups\"\n").unwrap();
        assert_eq!(config.port, Some(5050));
        assert_eq!(config.backup_dir.as_deref(), Some("/srv/backups"));
    }
}
