pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{PipelineController, ProcessSupervisor, DEFAULT_GRACE_PERIOD};
pub use config::Config;
pub use domain::entities::{ManagedProcess, ProcessStatus};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{ChildProcess, ProcessLauncher};
pub use domain::value_objects::{
    EncodeConfig, LoggingConfig, PipelineConfig, ProcessRole, ProcessState, RistConfig,
    SourceConfig, SourceMode,
};
pub use infrastructure::http::{routes, serve};
pub use infrastructure::process::{normalize_peer, CommandBuilder, OsProcessLauncher};
pub use infrastructure::storage::ConfigStore;
