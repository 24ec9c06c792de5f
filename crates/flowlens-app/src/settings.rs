use crate::error::SettingsError;
use crate::render_health::MonitorConfig;
use directories::ProjectDirs;
use flowlens_graph::{DEFAULT_FALLBACK_CAP, DEFAULT_LABEL_BUDGET};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub monitor_poll_interval_ms: u64,
    pub monitor_max_attempts: u32,
    pub fallback_label_cap: usize,
    pub label_budget: usize,
    /// Theme token overrides, e.g. `"accent": "#FF8800"`.
    pub palette: HashMap<String, String>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            request_timeout_secs: 30,
            monitor_poll_interval_ms: 100,
            monitor_max_attempts: 20,
            fallback_label_cap: DEFAULT_FALLBACK_CAP,
            label_budget: DEFAULT_LABEL_BUDGET,
            palette: HashMap::new(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl ViewerSettings {
    /// `<config dir>/flowlens/settings.json` for the current platform.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let dirs = ProjectDirs::from("", "", "flowlens").ok_or(SettingsError::NoConfigDir)?;
        Ok(dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Read settings from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!("Settings file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        tracing::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Load from `path` when given, else from the platform config dir.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::default_path()?),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.monitor_poll_interval_ms),
            max_attempts: self.monitor_max_attempts,
        }
    }
}
