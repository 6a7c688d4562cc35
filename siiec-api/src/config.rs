//! Startup configuration, read once from the environment.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use siiec_envelope::{KeySources, DEFAULT_MAX_ENVELOPE_BYTES};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_DIR: &str = "./siiec-data";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub keys: KeySources,
    pub max_envelope_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub log_format: LogFormat,
    /// Expose internal error detail in responses.
    pub development: bool,
}

impl ServerConfig {
    /// Parse through `lookup` so tests can supply their own variables.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = match get("SIIEC_PORT") {
            Some(v) => v.parse().with_context(|| format!("SIIEC_PORT: invalid port `{}`", v))?,
            None => DEFAULT_PORT,
        };
        let max_envelope_bytes = match get("SIIEC_MAX_ENVELOPE_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("SIIEC_MAX_ENVELOPE_BYTES: invalid size `{}`", v))?,
            None => DEFAULT_MAX_ENVELOPE_BYTES,
        };
        if max_envelope_bytes == 0 {
            bail!("SIIEC_MAX_ENVELOPE_BYTES must be positive");
        }
        let log_format = match get("SIIEC_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("SIIEC_LOG_FORMAT: expected `json` or `pretty`, got `{}`", other),
        };
        let allowed_origins = get("SIIEC_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self {
            port,
            data_dir: get("SIIEC_DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            keys: KeySources::from_lookup(&lookup),
            max_envelope_bytes,
            allowed_origins,
            log_format,
            development: get("SIIEC_ENV").as_deref() == Some("development"),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}
