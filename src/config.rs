use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.mojang.com/profiles/minecraft";
pub const DEFAULT_HELP_URL: &str = "http://drnaylor.co.uk/uuid";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "mcuuid", "mcuuid")
        .context("Unable to resolve platform config directory")
}

/// User configuration for the lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "AppSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "AppSettings::default_help_url")]
    pub help_url: String,
    #[serde(default = "AppSettings::default_user_agent")]
    pub user_agent: String,
    /// Request timeout; transport defaults apply when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Optional override for where the display preference is stored.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
    /// Optional override for the program used to open URLs.
    #[serde(default)]
    pub opener: Option<PathBuf>,
    #[serde(default)]
    pub traces: TraceSettings,
}

impl AppSettings {
    fn default_endpoint() -> String {
        DEFAULT_ENDPOINT.into()
    }

    fn default_help_url() -> String {
        DEFAULT_HELP_URL.into()
    }

    fn default_user_agent() -> String {
        format!("mcuuid/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            help_url: Self::default_help_url(),
            user_agent: Self::default_user_agent(),
            request_timeout_secs: None,
            preferences_path: None,
            opener: None,
            traces: TraceSettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from disk, writing defaults if missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Unable to read config at {}", path.display()))?;
            let parsed: Self = serde_json::from_str(&raw)
                .with_context(|| format!("Malformed config at {}", path.display()))?;
            Ok(parsed)
        } else {
            let settings = Self::default();
            settings
                .save(path)
                .with_context(|| format!("Failed to write default config to {}", path.display()))?;
            Ok(settings)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let serialised = serde_json::to_string_pretty(self)?;
        fs::write(path, serialised)
            .with_context(|| format!("Failed to persist config to {}", path.display()))
    }

    /// Resolve the preference file, next to the config file unless overridden.
    pub fn resolve_preferences_path(&self, config_path: &Path) -> PathBuf {
        if let Some(path) = &self.preferences_path {
            return path.clone();
        }
        match config_path.parent() {
            Some(parent) => parent.join("preferences.json"),
            None => PathBuf::from("preferences.json"),
        }
    }
}

/// Controls structured JSON trace files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "TraceSettings::default_max_files")]
    pub max_files: usize,
}

impl TraceSettings {
    const fn default_max_files() -> usize {
        10
    }

    /// Resolve the trace directory, defaulting to the platform cache dir.
    pub fn resolve_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.directory {
            return Ok(dir.clone());
        }
        Ok(project_dirs()?.cache_dir().join("traces"))
    }
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: None,
            max_files: Self::default_max_files(),
        }
    }
}

/// Compute the default path to the configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let settings = AppSettings::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.help_url, DEFAULT_HELP_URL);
        assert!(settings.request_timeout_secs.is_none());
        assert!(settings.user_agent.starts_with("mcuuid/"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"endpoint": "http://127.0.0.1:9000/profiles", "request_timeout_secs": 5}"#,
        )
        .unwrap();

        let settings = AppSettings::load_or_default(&path).unwrap();
        assert_eq!(settings.endpoint, "http://127.0.0.1:9000/profiles");
        assert_eq!(settings.request_timeout_secs, Some(5));
        assert_eq!(settings.help_url, DEFAULT_HELP_URL);
        assert_eq!(settings.traces.max_files, 10);
    }

    #[test]
    fn malformed_config_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = AppSettings::load_or_default(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed config"));
    }

    #[test]
    fn preferences_live_next_to_config_unless_overridden() {
        let mut settings = AppSettings::default();
        let config = Path::new("/tmp/mcuuid/config.json");
        assert_eq!(
            settings.resolve_preferences_path(config),
            PathBuf::from("/tmp/mcuuid/preferences.json")
        );

        settings.preferences_path = Some(PathBuf::from("/elsewhere/prefs.json"));
        assert_eq!(
            settings.resolve_preferences_path(config),
            PathBuf::from("/elsewhere/prefs.json")
        );
    }
}
