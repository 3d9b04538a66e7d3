use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::FeatureKind;
use crate::generation::{GeminiSettings, DEFAULT_API_BASE_URL};
use crate::session::{PromptRetentionPolicy, RetentionRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "pixmuse";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
const DEFAULT_API_KEY_ENV: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) api_base_url: String,
    pub(crate) edit_model: String,
    pub(crate) image_model: String,
    /// Checked in order; the first non-empty variable supplies the key.
    pub(crate) api_key_env: Vec<String>,
    pub(crate) catalog_path: Option<PathBuf>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) prompt_retention: HashMap<FeatureKind, RetentionRule>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.iter().map(|name| name.to_string()).collect(),
            catalog_path: None,
            output_dir: None,
            prompt_retention: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub(crate) fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            base_url: self.api_base_url.clone(),
            edit_model: self.edit_model.clone(),
            image_model: self.image_model.clone(),
        }
    }

    pub(crate) fn retention_policy(&self) -> PromptRetentionPolicy {
        PromptRetentionPolicy::with_overrides(&self.prompt_retention)
    }

    pub(crate) fn api_key_env_names(&self) -> Vec<&str> {
        self.api_key_env.iter().map(String::as_str).collect()
    }
}

pub(crate) fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
