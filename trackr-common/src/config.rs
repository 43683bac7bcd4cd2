//! Configuration loading and root folder resolution
//!
//! Startup configuration is read once:
//! - root folder: CLI argument, then `TRACKR_ROOT_FOLDER`, then the user
//!   config file, then the OS default data directory
//! - `config.toml` inside the root folder (optional; defaults when missing)
//! - secrets from the environment

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::period::{default_disabled_periods, default_windows, PeriodTable, PeriodWindow};
use crate::time::{SchoolCalendar, DEFAULT_OFFSET_MINUTES};
use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TRACKR_ROOT_FOLDER";
pub const ADMIN_PASSWORD_ENV: &str = "TRACKR_ADMIN_PASSWORD";
pub const ADMIN_ACCESS_ID_ENV: &str = "TRACKR_ADMIN_ACCESS_ID";
pub const SESSION_SECRET_ENV: &str = "TRACKR_SESSION_SECRET";

/// Name of the per-installation config file inside the root folder
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `root_folder` key of the user TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: User config file
    if let Some(config_path) = user_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent default
    default_root_folder()
}

/// `~/.config/trackr/config.toml` (or the platform equivalent) if it exists
fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("trackr").join(CONFIG_FILE_NAME);
    path.exists().then_some(path)
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("trackr"))
        .unwrap_or_else(|| PathBuf::from("./trackr_data"))
}

/// Kiosk settings from `config.toml`
///
/// Every field has a default so a partial (or missing) file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub bind_addr: String,
    pub port: u16,
    /// School local time as minutes east of UTC
    pub timezone_offset_minutes: i32,
    /// Maximum accepted visits per period per day
    pub capacity: i64,
    pub disabled_periods: Vec<u8>,
    pub periods: Vec<PeriodWindow>,
    pub roster_ttl_secs: u64,
    /// Row limit applied when loading records for reporting views
    pub list_row_limit: i64,
    /// Default warning length
    pub warning_days: i64,
    /// Append accepted records to a CSV file next to the database
    pub csv_backup: bool,
    /// Roster spreadsheet; `.xlsx` is read as a workbook, anything else as CSV
    pub roster_file: String,
    pub database_file: String,
    pub backup_file: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            timezone_offset_minutes: DEFAULT_OFFSET_MINUTES,
            capacity: 30,
            disabled_periods: default_disabled_periods(),
            periods: default_windows(),
            roster_ttl_secs: 1800,
            list_row_limit: 500,
            warning_days: 30,
            csv_backup: true,
            roster_file: "students.xlsx".to_string(),
            database_file: "trackr.db".to_string(),
            backup_file: "attendance_backup.csv".to_string(),
        }
    }
}

impl KioskConfig {
    /// Load `config.toml` from the root folder
    ///
    /// A missing file is not an error: defaults are used and a warning logged.
    /// A present but malformed file is an error.
    pub fn load(root_folder: &Path) -> Result<Self> {
        let path = root_folder.join(CONFIG_FILE_NAME);
        if !path.exists() {
            warn!("No {} in {}, using defaults", CONFIG_FILE_NAME, root_folder.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.capacity < 1 {
            return Err(Error::Config("capacity must be at least 1".to_string()));
        }
        if self.list_row_limit < 1 {
            return Err(Error::Config("list_row_limit must be at least 1".to_string()));
        }
        if self.warning_days < 1 {
            return Err(Error::Config("warning_days must be at least 1".to_string()));
        }
        self.period_table()?;
        self.calendar()?;
        Ok(())
    }

    pub fn period_table(&self) -> Result<PeriodTable> {
        PeriodTable::new(&self.periods, &self.disabled_periods)
    }

    pub fn calendar(&self) -> Result<SchoolCalendar> {
        SchoolCalendar::new(self.timezone_offset_minutes)
    }

    pub fn roster_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join(&self.roster_file)
    }

    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join(&self.database_file)
    }

    pub fn backup_path(&self, root_folder: &Path) -> PathBuf {
        root_folder.join(&self.backup_file)
    }
}

/// Credentials read from the environment at startup
#[derive(Clone)]
pub struct Secrets {
    pub admin_password: String,
    /// Alternate admin credential accepted by the login form
    pub admin_access_id: Option<String>,
    pub session_secret: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("admin_password", &"<redacted>")
            .field("admin_access_id", &self.admin_access_id.as_ref().map(|_| "<redacted>"))
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Read secrets; the admin password is mandatory
    pub fn from_env() -> Result<Self> {
        let admin_password = non_empty_env(ADMIN_PASSWORD_ENV).ok_or_else(|| {
            Error::Config(format!("{} must be set", ADMIN_PASSWORD_ENV))
        })?;
        Ok(Self {
            admin_password,
            admin_access_id: non_empty_env(ADMIN_ACCESS_ID_ENV),
            session_secret: non_empty_env(SESSION_SECRET_ENV),
        })
    }

    /// True when `candidate` matches the password or the access id
    pub fn accepts(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        candidate == self.admin_password
            || self.admin_access_id.as_deref() == Some(candidate)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
