pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod form;
pub mod lookup;
pub mod preference;
pub mod render;
pub mod telemetry;
pub mod username;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::app::App;
use crate::browser::HelpLauncher;
use crate::config::{AppSettings, default_config_path};
use crate::form::LookupForm;
use crate::lookup::{BlockingProfileHttp, ProfileLookup};
use crate::preference::FilePreferenceStore;

pub use crate::error::LookupError;
pub use crate::lookup::{LookupResult, ProfileMatch};
pub use crate::render::DisplayFields;
pub use crate::username::{Username, is_valid_username};

/// Resolved settings plus the path they were loaded from.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub config_path: PathBuf,
    pub settings: AppSettings,
}

impl Bootstrap {
    /// Load configuration from the default path unless overridden.
    pub fn load(config_path_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path_override {
            Some(path) => path,
            None => default_config_path()?,
        };
        let settings = AppSettings::load_or_default(&config_path)?;
        Ok(Self {
            config_path,
            settings,
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.settings.resolve_preferences_path(&self.config_path)
    }

    /// Wire the production HTTP client, preference file and help launcher.
    pub fn build_app(&self) -> Result<App<BlockingProfileHttp>> {
        let preferences = FilePreferenceStore::open(self.preferences_path())?;
        info!(path = %preferences.path().display(), "using preference file");
        let form = LookupForm::new(Box::new(preferences))?;
        let http = BlockingProfileHttp::from_settings(&self.settings)?;
        let lookup = ProfileLookup::new(&self.settings.endpoint, http)?;
        let help = HelpLauncher::from_settings(&self.settings);
        Ok(App::new(form, lookup, help))
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_path.parent()
    }
}
