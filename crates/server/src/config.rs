use std::{collections::HashMap, fs};

use anyhow::{bail, Context};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use url::Url;

const SETTINGS_FILE: &str = "server.toml";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub backend_url: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            backend_url: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES as usize,
        }
    }
}

impl Settings {
    /// Validated backend origin, or `None` when no backend is configured.
    pub fn backend_origin(&self) -> anyhow::Result<Option<BackendOrigin>> {
        match self.backend_url.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => BackendOrigin::parse(raw).map(Some),
        }
    }
}

/// Base URL of the backend service every proxy route forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOrigin(Url);

impl BackendOrigin {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let url = Url::parse(raw.trim())
            .with_context(|| format!("invalid backend url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("backend url '{raw}' must use http or https");
        }
        if url.cannot_be_a_base() {
            bail!("backend url '{raw}' cannot be used as a base url");
        }
        Ok(Self(url))
    }

    /// Appends path segments (percent-encoded) to the origin's own path.
    /// An empty trailing segment yields a trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.0.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    build_settings(file.as_deref(), std::env::vars().collect())
}

/// Layers defaults, the optional TOML file and `APP__*` variables, then the
/// plain `SERVER_BIND` / `API_BASE_URL` variables where no `APP__` key is set.
pub fn build_settings(
    file_toml: Option<&str>,
    env: HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let mut builder = Config::builder()
        .set_default("bind_addr", DEFAULT_BIND_ADDR)?
        .set_default("max_body_bytes", DEFAULT_MAX_BODY_BYTES)?;

    if let Some(raw) = file_toml {
        builder = builder.add_source(File::from_str(raw, FileFormat::Toml));
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true)
            .source(Some(env.clone())),
    );

    let mut settings: Settings = builder
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize()
        .context("failed to read server settings")?;

    if !env.contains_key("APP__BIND_ADDR") {
        if let Some(v) = env.get("SERVER_BIND") {
            settings.bind_addr = v.clone();
        }
    }
    if !env.contains_key("APP__BACKEND_URL") {
        if let Some(v) = env.get("API_BASE_URL") {
            settings.backend_url = Some(v.clone());
        }
    }

    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
