mod pipeline_config;
mod process_role;
mod process_state;

pub use pipeline_config::{
    EncodeConfig, LoggingConfig, PipelineConfig, RistConfig, SourceConfig, SourceMode,
};
pub use process_role::ProcessRole;
pub use process_state::ProcessState;
