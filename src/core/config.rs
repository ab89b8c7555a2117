use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::mirror::{default_mirrors, Mirror};

const APP_DIR_NAME: &str = ".faculty-launcher";
const SETTINGS_FILE: &str = "launcher_settings.json";

pub const ENV_API_URL: &str = "FACULTY_API_URL";
pub const ENV_DATA_DIR: &str = "FACULTY_DATA_DIR";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const AUTHLIB_INJECTOR_URL: &str =
    "https://github.com/yushijinhun/authlib-injector/releases/download/v1.2.5/authlib-injector-1.2.5.jar";
const AUTHLIB_INJECTOR_METADATA_URL: &str = "https://authlib-injector.yushi.moe/artifact/latest.json";

/// Tuning for the file synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub progress_every: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency: 10,
            progress_every: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryOptions {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
        }
    }
}

impl RetryOptions {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// The Java agent that redirects game authentication to the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthBridgeArtifact {
    pub url: String,
    /// Pinned SHA-256. When absent the digest is read from `metadata_url`.
    pub sha256: Option<String>,
    /// Release metadata (`download_url` + `checksums.sha256`) published by
    /// authlib-injector. Used only when `sha256` is not pinned.
    pub metadata_url: Option<String>,
    /// File name under the data dir.
    pub file_name: String,
    /// Keep going with a warning when the downloaded file does not match
    /// `sha256`, instead of failing the installation.
    pub tolerates_integrity_mismatch: bool,
}

impl Default for AuthBridgeArtifact {
    fn default() -> Self {
        Self {
            url: AUTHLIB_INJECTOR_URL.to_string(),
            sha256: None,
            metadata_url: Some(AUTHLIB_INJECTOR_METADATA_URL.to_string()),
            file_name: "authlib-injector.jar".to_string(),
            tolerates_integrity_mismatch: true,
        }
    }
}

/// Persisted launcher configuration (`launcher_settings.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub mirrors: Vec<Mirror>,
    pub sync: SyncOptions,
    pub retry: RetryOptions,
    pub download_timeout_secs: u64,
    pub default_memory_mb: u32,
    pub auth_bridge: AuthBridgeArtifact,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            data_dir: default_data_dir(),
            mirrors: default_mirrors(),
            sync: SyncOptions::default(),
            retry: RetryOptions::default(),
            download_timeout_secs: 60,
            default_memory_mb: 2048,
            auth_bridge: AuthBridgeArtifact::default(),
        }
    }
}

impl LauncherConfig {
    /// Resolve the data dir (env or default), read the settings file if any,
    /// then apply environment overrides.
    pub fn load() -> LauncherResult<Self> {
        let data_dir = std::env::var_os(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let mut config = Self::load_from_dir(&data_dir)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `<data_dir>/launcher_settings.json`. A missing file yields the
    /// defaults; a corrupt one is logged and replaced by the defaults.
    pub fn load_from_dir(data_dir: &Path) -> LauncherResult<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<LauncherConfig>(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring unreadable settings at {:?}: {}", path, e);
                    LauncherConfig::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LauncherConfig::default(),
            Err(e) => return Err(LauncherError::io(&path, e)),
        };
        config.data_dir = data_dir.to_path_buf();
        if config.mirrors.is_empty() {
            config.mirrors = default_mirrors();
        }
        debug!("Loaded launcher config from {:?}", data_dir);
        Ok(config)
    }

    pub fn save(&self) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| LauncherError::io(&self.data_dir, e))?;
        let path = self.data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }

    /// Environment wins over the settings file for the API endpoint.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs.max(1))
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join("instances")
    }

    pub fn auth_bridge_path(&self) -> PathBuf {
        self.data_dir.join(&self.auth_bridge.file_name)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
