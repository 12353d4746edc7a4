//! Errors of loading and validating simulation inputs.

use std::path::PathBuf;

use storage_network::error::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("node {0} is declared more than once")]
    DuplicateNode(String),
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("invalid transfer of {file_name}: {reason}")]
    InvalidTransfer { file_name: String, reason: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
}
