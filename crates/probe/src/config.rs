//! Probe configuration.
//!
//! Selects which observers the [`Installer`](crate::Installer) puts in
//! place. Stored as TOML; every switch defaults to on:
//!
//! ```toml
//! errors = true
//! console = true
//! network = true
//! fetch = true
//! ```
//!
//! `network` gates both request observers; `fetch` can additionally turn
//! off the fetch observer alone. Unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Observer switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Listen on the uncaught-error channel.
    #[serde(default = "default_true")]
    pub errors: bool,

    /// Wrap the console logging and timer functions.
    #[serde(default = "default_true")]
    pub console: bool,

    /// Wrap the request APIs: the legacy request object and fetch.
    #[serde(default = "default_true")]
    pub network: bool,

    /// Wrap the fetch-style function when the host provides it. Has no
    /// effect while `network` is off.
    #[serde(default = "default_true")]
    pub fetch: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            errors: default_true(),
            console: default_true(),
            network: default_true(),
            fetch: default_true(),
        }
    }
}

impl ProbeConfig {
    /// Whether the legacy request observer should be installed.
    pub fn requests_enabled(&self) -> bool {
        self.network
    }

    /// Whether the fetch observer should be installed.
    pub fn fetch_enabled(&self) -> bool {
        self.network && self.fetch
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ProbeError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no probe config, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "invalid probe config");
        })?;
        tracing::debug!(path = %path.display(), ?config, "probe config loaded");
        Ok(config)
    }

    /// Writes configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ProbeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "probe config saved");
        Ok(())
    }
}
