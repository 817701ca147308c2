use std::path::PathBuf;

use thiserror::Error;

use crate::domain::value_objects::ProcessRole;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("YAML error: {0}")]
    ConfigFormat(String),

    #[error("Invalid configuration: {0}")]
    ConfigSemantic(String),

    #[error("Config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log file {path:?}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {role} ({program}): {source}")]
    ProcessSpawn {
        role: ProcessRole,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty command line for {0}")]
    EmptyCommand(ProcessRole),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
