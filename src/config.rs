use std::path::PathBuf;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database file. Created on first start if missing.
    pub db_file: PathBuf,
    pub server_host: String,
    pub server_port: u16,
    /// Verbose logging and per-request tracing.
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("missing required env var: {key}"))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            db_file: PathBuf::from(required("DB_FILE")?),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: required("PORT")?
                .trim()
                .parse()
                .context("PORT must be a valid port number")?,
            debug: parse_flag(&optional("DEBUG", "")),
        })
    }

    /// Default `tracing` filter directive when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "sensor_registry=debug,tower_http=debug"
        } else {
            "sensor_registry=info,tower_http=info"
        }
    }
}

/// Interpret a boolean-ish environment value (`1`, `true`, `yes`, `on`).
fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
