use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::nasne_repo::{
    DEFAULT_GENERIC_ENDPOINTS, DEFAULT_NOT_FOUND_EVENT_ID, DEFAULT_RECORDED_PORT,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub nasne: NasneConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub metrics_path: String,
    pub health_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9900".into(),
            metrics_path: "/metrics".into(),
            health_path: "/healthz".into(),
        }
    }
}

/// How a target's API surface is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Fixed sequence of typed sub-API calls.
    #[default]
    Structured,
    /// Configured endpoint documents run through the alias extractor.
    Generic,
}

impl std::str::FromStr for ClientMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "generic" => Ok(Self::Generic),
            other => anyhow::bail!("unknown nasne.mode {:?} (structured|generic)", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NasneConfig {
    /// Device base URLs, e.g. "http://192.168.1.10:64210". Each is also its `target` label.
    pub targets: Vec<String>,
    pub mode: ClientMode,
    /// Only used in generic mode.
    pub endpoints: Vec<String>,
    /// Bound on each HTTP call to a device.
    pub http_timeout_ms: u64,
    /// Bound on one target's whole fetch within a scrape.
    pub scrape_timeout_ms: u64,
    pub recorded_port: u16,
    pub not_found_event_id: i64,
}

impl Default for NasneConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            mode: ClientMode::Structured,
            endpoints: DEFAULT_GENERIC_ENDPOINTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            http_timeout_ms: 5_000,
            scrape_timeout_ms: 10_000,
            recorded_port: DEFAULT_RECORDED_PORT,
            not_found_event_id: DEFAULT_NOT_FOUND_EVENT_ID,
        }
    }
}

impl NasneConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_millis(self.scrape_timeout_ms)
    }
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default config.toml) if present, applies env overrides, validates.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = if Path::new(&path).exists() {
            std::fs::read_to_string(&path)?
        } else {
            tracing::info!(path = %path, "config file not found; using defaults and environment");
            String::new()
        };
        let mut config: AppConfig = toml::from_str(&s)?;
        config.apply_env(|k| std::env::var(k).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config file without env overrides.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays environment variables read through `lookup`. Blank values are ignored,
    /// unparsable numbers are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("NASNE_URLS").or_else(|| get("NASNE_URL")) {
            self.nasne.targets = split_csv(&v);
        }
        if let Some(v) = get("NASNE_ENDPOINTS") {
            self.nasne.endpoints = split_csv(&v);
        }
        if let Some(v) = get("NASNE_MODE") {
            match v.parse() {
                Ok(mode) => self.nasne.mode = mode,
                Err(e) => tracing::warn!(error = %e, "ignoring NASNE_MODE"),
            }
        }
        if let Some(v) = get("LISTEN_ADDRESS") {
            self.server.listen_address = v;
        }
        if let Some(v) = get("METRICS_PATH") {
            self.server.metrics_path = v;
        }
        if let Some(v) = get("HEALTH_PATH") {
            self.server.health_path = v;
        }
        if let Some(ms) = get("HTTP_TIMEOUT_MS").and_then(|v| parse_ms("HTTP_TIMEOUT_MS", &v)) {
            self.nasne.http_timeout_ms = ms;
        }
        if let Some(ms) = get("SCRAPE_TIMEOUT_MS").and_then(|v| parse_ms("SCRAPE_TIMEOUT_MS", &v)) {
            self.nasne.scrape_timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.server.listen_address.trim().is_empty(),
            "server.listen_address must be non-empty"
        );
        for (field, path) in [
            ("server.metrics_path", &self.server.metrics_path),
            ("server.health_path", &self.server.health_path),
        ] {
            anyhow::ensure!(
                path.starts_with('/') && path.len() > 1,
                "{} must start with '/' and not be '/', got {:?}",
                field,
                path
            );
        }
        anyhow::ensure!(
            self.server.metrics_path != self.server.health_path,
            "server.metrics_path and server.health_path must differ, both are {:?}",
            self.server.metrics_path
        );
        anyhow::ensure!(
            !self.nasne.targets.is_empty(),
            "nasne.targets must list at least one device (or set NASNE_URL)"
        );
        anyhow::ensure!(
            self.nasne.targets.iter().all(|t| !t.trim().is_empty()),
            "nasne.targets must not contain empty entries"
        );
        let mut seen = HashSet::new();
        if let Some(dup) = self
            .nasne
            .targets
            .iter()
            .map(|t| t.trim())
            .find(|t| !seen.insert(*t))
        {
            anyhow::bail!(
                "nasne.targets must be distinct, {:?} is listed more than once",
                dup
            );
        }
        anyhow::ensure!(
            self.nasne.http_timeout_ms > 0,
            "nasne.http_timeout_ms must be > 0, got {}",
            self.nasne.http_timeout_ms
        );
        anyhow::ensure!(
            self.nasne.scrape_timeout_ms > 0,
            "nasne.scrape_timeout_ms must be > 0, got {}",
            self.nasne.scrape_timeout_ms
        );
        anyhow::ensure!(
            self.nasne.recorded_port > 0,
            "nasne.recorded_port must be between 1 and 65535, got {}",
            self.nasne.recorded_port
        );
        Ok(())
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn parse_ms(key: &str, v: &str) -> Option<u64> {
    match v.parse() {
        Ok(ms) => Some(ms),
        Err(e) => {
            tracing::warn!(key, value = v, error = %e, "invalid duration in ms; keeping configured value");
            None
        }
    }
}
