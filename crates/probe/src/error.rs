//! Error types for the probe.

/// Errors produced while loading or saving probe configuration.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to encode config: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
}
