//! Configuration management for the backup tool.
//!
//! Loads configuration from a JSON file with environment variable overrides.

use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under `~/.config` holding config and state.
pub const APP_DIR: &str = "incr-backup";

pub const ENV_SMB_USER: &str = "INCR_BACKUP_SMB_USER";
pub const ENV_SMB_PASSWORD: &str = "INCR_BACKUP_SMB_PASS";
pub const ENV_BACKUP_ROOT: &str = "INCR_BACKUP_BACKUP_ROOT";

/// Keys missing from the file keep their `Default` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination root, local or a mounted network share
    pub backup_root: PathBuf,

    /// Namespaces this machine's files under the destination root
    pub device_id: String,

    /// Source files and directories
    pub paths_to_backup: Vec<PathBuf>,

    /// Glob patterns excluded from scanning
    pub files_to_ignore_patterns: Vec<String>,

    /// Network share credentials, used by whatever mounts the share
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smb_user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub smb_password: Option<String>,

    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_root: PathBuf::from("/mnt/backup"),
            device_id: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| "unknown-device".to_string()),
            paths_to_backup: Vec::new(),
            files_to_ignore_patterns: vec!["*.tmp".to_string(), ".cache/*".to_string()],
            smb_user: None,
            smb_password: None,
            log: LogConfig::default(),
        }
    }
}

/// `~/.config/incr-backup`
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(BackupError::HomeDirUnavailable)?;
    Ok(home.join(".config").join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn default_state_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("state.json"))
}

impl Config {
    /// Load from `path`, then apply environment overrides.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = serde_json::from_str(&content).map_err(|e| {
                    BackupError::Config(format!("invalid JSON in {}: {e}", path.display()))
                })?;
                info!(path = %path.display(), "loaded config from file");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(BackupError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// Unset or empty variables leave the value untouched.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(user) = get(ENV_SMB_USER) {
            debug!("overriding SMB user from environment");
            self.smb_user = Some(user);
        }
        if let Some(password) = get(ENV_SMB_PASSWORD) {
            debug!("overriding SMB password from environment");
            self.smb_password = Some(password);
        }
        if let Some(root) = get(ENV_BACKUP_ROOT) {
            debug!(backup_root = %root, "overriding backup root from environment");
            self.backup_root = PathBuf::from(root);
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "saved config to file");
        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = match &self.smb_password {
            Some(p) if !p.is_empty() => "***REDACTED***",
            _ => "",
        };

        writeln!(f, "Configuration:")?;
        writeln!(f, "  Backup Root: {}", self.backup_root.display())?;
        writeln!(f, "  Device ID: {}", self.device_id)?;
        writeln!(f, "  Paths to Backup: {:?}", self.paths_to_backup)?;
        writeln!(f, "  Ignore Patterns: {:?}", self.files_to_ignore_patterns)?;
        writeln!(f, "  SMB User: {}", self.smb_user.as_deref().unwrap_or(""))?;
        writeln!(f, "  SMB Password: {password}")?;
        write!(f, "  Log Level: {}", self.log.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default() {
        let config = Config::default();
        assert!(!config.device_id.is_empty());
        assert!(config.paths_to_backup.is_empty());
        assert_eq!(config.files_to_ignore_patterns, vec!["*.tmp", ".cache/*"]);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_from_valid_file() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "backup_root": "/mnt/nas/backups",
                "device_id": "laptop",
                "paths_to_backup": ["/home/user/docs", "/home/user/photos"],
                "files_to_ignore_patterns": ["*.log"],
                "smb_user": "alice"
            }"#,
        )?;

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.backup_root, PathBuf::from("/mnt/nas/backups"));
        assert_eq!(config.device_id, "laptop");
        assert_eq!(config.paths_to_backup.len(), 2);
        assert_eq!(config.files_to_ignore_patterns, vec!["*.log"]);
        assert_eq!(config.smb_user.as_deref(), Some("alice"));
        assert!(config.smb_password.is_none());
        assert_eq!(config.log.level, "info");
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "paths_to_backup": ["/home/user/docs"] }"#)?;

        let config = Config::read_file(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(config.paths_to_backup, vec![PathBuf::from("/home/user/docs")]);
        assert_eq!(config.backup_root, defaults.backup_root);
        assert_eq!(config.device_id, defaults.device_id);
        assert_eq!(config.files_to_ignore_patterns, vec!["*.tmp", ".cache/*"]);
        assert_eq!(config.log.level, "info");
        Ok(())
    }

    #[test]
    fn test_explicit_empty_list_overrides_default() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "device_id": "nas-client", "files_to_ignore_patterns": [] }"#)?;

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.device_id, "nas-client");
        assert!(config.files_to_ignore_patterns.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_returns_defaults() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::read_file(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config.files_to_ignore_patterns, Config::default().files_to_ignore_patterns);
        Ok(())
    }

    #[test]
    fn test_invalid_json_is_an_error() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ invalid json }")?;

        let err = Config::read_file(&path).unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
        assert!(err.to_string().contains("invalid JSON"));
        Ok(())
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            (ENV_SMB_USER, "bob"),
            (ENV_SMB_PASSWORD, "hunter2"),
            (ENV_BACKUP_ROOT, "/media/share"),
        ]));

        assert_eq!(config.smb_user.as_deref(), Some("bob"));
        assert_eq!(config.smb_password.as_deref(), Some("hunter2"));
        assert_eq!(config.backup_root, PathBuf::from("/media/share"));
    }

    #[test]
    fn test_empty_environment_values_are_ignored() {
        let mut config = Config::default();
        let root = config.backup_root.clone();
        config.apply_overrides(env(&[(ENV_BACKUP_ROOT, ""), (ENV_SMB_USER, "")]));

        assert_eq!(config.backup_root, root);
        assert!(config.smb_user.is_none());
    }

    #[test]
    fn test_save_and_reload() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested/config.json");

        let mut config = Config::default();
        config.device_id = "workstation".to_string();
        config.paths_to_backup = vec![PathBuf::from("/srv/data")];
        config.save_to(&path).unwrap();

        assert_eq!(Config::read_file(&path).unwrap(), config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
        }
        Ok(())
    }

    #[test]
    fn test_display_redacts_password() {
        let mut config = Config::default();
        config.smb_user = Some("alice".to_string());
        config.smb_password = Some("secret-password".to_string());

        let rendered = config.to_string();
        assert!(rendered.contains("SMB User: alice"));
        assert!(rendered.contains("***REDACTED***"));
        assert!(!rendered.contains("secret-password"));
    }
}
