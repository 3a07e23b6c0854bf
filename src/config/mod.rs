use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use crate::utils::time::{parse_offset, parse_time};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_key_file")]
    pub key_file: String,
    #[serde(default = "default_remote_url")]
    pub remote_url: String,
    /// Fixed offset of the institution's wall clock, e.g. "-06:00".
    #[serde(default = "default_offset")]
    pub institution_utc_offset: String,
    #[serde(default = "default_probe_interval")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_fail_threshold")]
    pub probe_fail_threshold: u32,
    #[serde(default = "default_window_start")]
    pub capture_window_start: String,
    #[serde(default = "default_window_end")]
    pub capture_window_end: String,
    /// UTC time of day used as the timestamp of synthesized absences.
    #[serde(default = "default_anchor")]
    pub absence_anchor_utc: String,
    #[serde(default = "default_expiration_hours")]
    pub offline_expiration_hours: i64,
    #[serde(default = "default_max_distance")]
    pub max_distance_meters: f64,
    #[serde(default = "default_pin_days")]
    pub pin_days_per_month: usize,
}

fn default_key_file() -> String {
    Config::config_dir()
        .join("device.key")
        .to_string_lossy()
        .to_string()
}
fn default_remote_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_offset() -> String {
    "-06:00".to_string()
}
fn default_probe_interval() -> u64 {
    5000
}
fn default_probe_timeout() -> u64 {
    2500
}
fn default_fail_threshold() -> u32 {
    2
}
fn default_window_start() -> String {
    "07:50".to_string()
}
fn default_window_end() -> String {
    "16:40".to_string()
}
fn default_anchor() -> String {
    "06:00".to_string()
}
fn default_expiration_hours() -> i64 {
    24
}
fn default_max_distance() -> f64 {
    100.0
}
fn default_pin_days() -> usize {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            key_file: default_key_file(),
            remote_url: default_remote_url(),
            institution_utc_offset: default_offset(),
            probe_interval_ms: default_probe_interval(),
            probe_timeout_ms: default_probe_timeout(),
            probe_fail_threshold: default_fail_threshold(),
            capture_window_start: default_window_start(),
            capture_window_end: default_window_end(),
            absence_anchor_utc: default_anchor(),
            offline_expiration_hours: default_expiration_hours(),
            max_distance_meters: default_max_distance(),
            pin_days_per_month: default_pin_days(),
        }
    }
}

/// Parsed, ready-to-use view of the policy values in [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub offset: FixedOffset,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub absence_anchor: NaiveTime,
    pub expiration: chrono::Duration,
    pub max_distance_meters: f64,
    pub pin_days_per_month: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            offset: FixedOffset::west_opt(6 * 3600).unwrap_or(Utc.fix()),
            window_start: NaiveTime::from_hms_opt(7, 50, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(16, 40, 0).unwrap_or_default(),
            absence_anchor: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            expiration: chrono::Duration::hours(24),
            max_distance_meters: 100.0,
            pin_days_per_month: 2,
        }
    }
}

/// Reachability probe settings.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub fail_threshold: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(default_probe_interval()),
            timeout: Duration::from_millis(default_probe_timeout()),
            fail_threshold: default_fail_threshold(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("rfieldclock")
        } else {
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".rfieldclock")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rfieldclock.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rfieldclock.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|_| AppError::ConfigLoad)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Key file lives next to the database unless configured otherwise.
    pub fn key_path(&self) -> PathBuf {
        expand_tilde(&self.key_file)
    }

    pub fn policy(&self) -> AppResult<Policy> {
        let bad = |field: &str, v: &str| AppError::Config(format!("{field}: '{v}'"));

        let offset = parse_offset(&self.institution_utc_offset)
            .ok_or_else(|| bad("institution_utc_offset", &self.institution_utc_offset))?;
        let window_start = parse_time(&self.capture_window_start)
            .ok_or_else(|| bad("capture_window_start", &self.capture_window_start))?;
        let window_end = parse_time(&self.capture_window_end)
            .ok_or_else(|| bad("capture_window_end", &self.capture_window_end))?;
        let absence_anchor = parse_time(&self.absence_anchor_utc)
            .ok_or_else(|| bad("absence_anchor_utc", &self.absence_anchor_utc))?;

        if window_end < window_start {
            return Err(AppError::Config(
                "capture_window_end precedes capture_window_start".into(),
            ));
        }

        Ok(Policy {
            offset,
            window_start,
            window_end,
            absence_anchor,
            expiration: chrono::Duration::hours(self.offline_expiration_hours),
            max_distance_meters: self.max_distance_meters,
            pin_days_per_month: self.pin_days_per_month,
        })
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            interval: Duration::from_millis(self.probe_interval_ms),
            timeout: Duration::from_millis(self.probe_timeout_ms),
            fail_threshold: self.probe_fail_threshold.max(1),
        }
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = std::path::Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let key_file = db_path.with_extension("key");

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            key_file: key_file.to_string_lossy().to_string(),
            ..Config::default()
        };

        // Write config file
        if !is_test {
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        Ok(config)
    }
}
