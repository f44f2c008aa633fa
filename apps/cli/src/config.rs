use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use client_core::{ControllerOptions, VersionSource};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "sentiment.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub version_source: VersionSource,
    pub fetch_model_version: bool,
    pub require_ticker: bool,
    pub show_confidence: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            version_source: VersionSource::Combined,
            fetch_model_version: true,
            require_ticker: false,
            show_confidence: false,
        }
    }
}

impl Settings {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            version_source: self.version_source,
            fetch_model_version: self.fetch_model_version,
            require_ticker: self.require_ticker,
            show_confidence: self.show_confidence,
            ..ControllerOptions::default()
        }
    }
}

/// Defaults, then the TOML file, then environment variables.
pub fn load_settings(explicit_file: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(explicit_file, |key| std::env::var(key).ok())
}

fn load_settings_with(
    explicit_file: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = match explicit_file {
        Some(path) => read_settings_file(path)?,
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read_settings_file(&path).unwrap_or_else(|error| {
                    warn!(%error, "ignoring unreadable default config file");
                    Settings::default()
                })
            } else {
                Settings::default()
            }
        }
    };

    apply_env(&mut settings, env);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("SENTIMENT_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__VERSION_SOURCE").and_then(|v| parse_version_source(&v)) {
        settings.version_source = v;
    }
    if let Some(v) = env("APP__FETCH_MODEL_VERSION").and_then(|v| parse_bool(&v)) {
        settings.fetch_model_version = v;
    }
    if let Some(v) = env("APP__REQUIRE_TICKER").and_then(|v| parse_bool(&v)) {
        settings.require_ticker = v;
    }
    if let Some(v) = env("APP__SHOW_CONFIDENCE").and_then(|v| parse_bool(&v)) {
        settings.show_confidence = v;
    }
}

fn parse_version_source(raw: &str) -> Option<VersionSource> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "combined" => Some(VersionSource::Combined),
        "split" => Some(VersionSource::Split),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
