use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{
    types::{DEFAULT_API_BASE_URL, DEFAULT_DEBOUNCE, DEFAULT_SPECIALTY_QUERY_KEY},
    ClientConfig, FilterRoute,
};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub debounce_ms: u64,
    pub filter_route: String,
    pub specialty_query_key: String,
    pub session_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            filter_route: "query".into(),
            specialty_query_key: DEFAULT_SPECIALTY_QUERY_KEY.into(),
            session_file: PathBuf::from("./data/portal-session.json"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    debounce_ms: Option<u64>,
    filter_route: Option<String>,
    specialty_query_key: Option<String>,
    session_file: Option<PathBuf>,
}

pub fn load_settings(path: &Path) -> Settings {
    let raw = fs::read_to_string(path).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// File values first, then environment overrides. A malformed file is ignored.
pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(file_cfg) = file.and_then(|raw| toml::from_str::<FileSettings>(raw).ok()) {
        if let Some(v) = file_cfg.api_base_url {
            settings.api_base_url = v;
        }
        if let Some(v) = file_cfg.debounce_ms {
            settings.debounce_ms = v;
        }
        if let Some(v) = file_cfg.filter_route {
            settings.filter_route = v;
        }
        if let Some(v) = file_cfg.specialty_query_key {
            settings.specialty_query_key = v;
        }
        if let Some(v) = file_cfg.session_file {
            settings.session_file = v;
        }
    }

    if let Some(v) = env("PORTAL_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("APP__DEBOUNCE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.debounce_ms = parsed;
        }
    }

    if let Some(v) = env("APP__FILTER_ROUTE") {
        settings.filter_route = v;
    }
    if let Some(v) = env("APP__SPECIALTY_QUERY_KEY") {
        settings.specialty_query_key = v;
    }
    if let Some(v) = env("APP__SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    settings
}

impl Settings {
    pub fn filter_route(&self) -> anyhow::Result<FilterRoute> {
        match self.filter_route.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(FilterRoute::Query {
                specialty_key: self.specialty_query_key.clone(),
            }),
            "path" => Ok(FilterRoute::Path),
            other => bail!("unknown filter route '{other}', expected 'query' or 'path'"),
        }
    }

    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let api_base_url = Url::parse(self.api_base_url.trim())
            .with_context(|| format!("invalid api base url '{}'", self.api_base_url))?;
        if api_base_url.cannot_be_a_base() {
            bail!("api base url '{}' cannot carry request paths", self.api_base_url);
        }

        let mut config = ClientConfig::new(api_base_url);
        config.debounce = Duration::from_millis(self.debounce_ms);
        config.filter_route = self.filter_route()?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
