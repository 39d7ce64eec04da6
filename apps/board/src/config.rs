use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use client_core::{ConfigError, Endpoint, Renderer, StoreConfig, SubmitEncoding};
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "board.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint_url: Option<String>,
    pub submit_encoding: SubmitEncoding,
    /// Offset used when printing timestamps. Defaults to Japan (+09:00).
    pub display_offset_minutes: i32,
    /// Where to write the rendered page; stdout when unset.
    pub output: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            submit_encoding: SubmitEncoding::Form,
            display_offset_minutes: 9 * 60,
            output: None,
        }
    }
}

impl Settings {
    pub fn store_config(&self) -> Result<StoreConfig, ConfigError> {
        let raw = self
            .endpoint_url
            .as_deref()
            .ok_or(ConfigError::MissingEndpoint)?;
        Ok(StoreConfig::new(Endpoint::parse(raw)?).with_submit_encoding(self.submit_encoding))
    }

    pub fn renderer(&self) -> anyhow::Result<Renderer> {
        Renderer::with_offset_minutes(self.display_offset_minutes).ok_or_else(|| {
            anyhow!(
                "display_offset_minutes {} is outside the valid range",
                self.display_offset_minutes
            )
        })
    }
}

/// Loads `board.toml` (or `path`) and then applies environment overrides.
/// A missing default file is fine; a missing explicit file is not.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                read_settings_file(default_path)?
            } else {
                Settings::default()
            }
        }
    };

    apply_env_overrides(settings, |name| std::env::var(name).ok())
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))
}

/// Later names win: `APP__*` overrides the short form.
pub fn apply_env_overrides(
    mut settings: Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(v) = non_empty("BOARD_ENDPOINT_URL") {
        settings.endpoint_url = Some(v);
    }
    if let Some(v) = non_empty("APP__ENDPOINT_URL") {
        settings.endpoint_url = Some(v);
    }

    if let Some(v) = non_empty("APP__SUBMIT_ENCODING") {
        settings.submit_encoding = v.parse()?;
    }

    if let Some(v) = non_empty("APP__DISPLAY_OFFSET_MINUTES") {
        settings.display_offset_minutes = v
            .trim()
            .parse()
            .with_context(|| format!("APP__DISPLAY_OFFSET_MINUTES is not an integer: '{v}'"))?;
    }

    if let Some(v) = non_empty("APP__OUTPUT") {
        settings.output = Some(PathBuf::from(v));
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
