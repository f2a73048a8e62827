use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to (or replaying) the analysis backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid backend document {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("analysis backend reported an error: {0}")]
    Remote(String),
    #[error("no project has been analyzed yet")]
    NoProject,
    #[error("unknown graph node: {0}")]
    UnknownNode(String),
}

/// Failures loading the TOML settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
