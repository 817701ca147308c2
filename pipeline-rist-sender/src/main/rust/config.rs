use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::application::services::{PipelineController, ProcessSupervisor};
use crate::domain::ports::ProcessLauncher;
use crate::infrastructure::process::CommandBuilder;
use crate::infrastructure::storage::ConfigStore;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipeline-rist-sender",
    version = "0.1.0",
    author = "RIST Sender Pipeline",
    about = "RIST contribution sender: supervises mediamtx, ffmpeg and ristsender"
)]
pub struct Config {
    /// Pipeline configuration document (YAML), created with defaults if missing
    #[arg(long, env = "CONFIG_PATH", default_value = "/data/config.yml")]
    pub config_path: PathBuf,

    /// Media relay binary
    #[arg(long, env = "MEDIAMTX_BIN", default_value = "/opt/mediamtx/mediamtx")]
    pub relay_bin: String,

    /// Static configuration file passed to the relay
    #[arg(long, env = "MEDIAMTX_CFG", default_value = "/etc/mediamtx.yml")]
    pub relay_config: String,

    /// Encoder binary
    #[arg(long, env = "FFMPEG_BIN", default_value = "ffmpeg")]
    pub encoder_bin: String,

    /// RIST sender binary
    #[arg(long, env = "RISTSENDER_BIN", default_value = "ristsender")]
    pub sender_bin: String,

    /// Control surface HTTP port
    #[arg(long, env = "HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    /// Seconds a stopping process gets before it is killed
    #[arg(long, default_value = "5")]
    pub stop_grace_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http_port == 0 {
            anyhow::bail!("Invalid HTTP port: port cannot be 0");
        }

        if self.config_path.is_dir() {
            anyhow::bail!("Config path is a directory: {:?}", self.config_path);
        }

        for (name, value) in [
            ("relay binary", &self.relay_bin),
            ("relay config", &self.relay_config),
            ("encoder binary", &self.encoder_bin),
            ("sender binary", &self.sender_bin),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("The {} cannot be empty", name);
            }
        }

        if self.stop_grace_secs == 0 {
            anyhow::bail!("Stop grace period cannot be 0");
        }

        Ok(())
    }

    pub fn to_config_store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path.clone())
    }

    pub fn to_command_builder(&self) -> CommandBuilder {
        CommandBuilder::new(self.encoder_bin.clone(), self.sender_bin.clone())
    }

    pub fn to_relay_command(&self) -> Vec<String> {
        CommandBuilder::build_relay_command(&self.relay_bin, &self.relay_config)
    }

    pub fn to_controller(&self, launcher: Arc<dyn ProcessLauncher>) -> PipelineController {
        let supervisor = ProcessSupervisor::new(launcher)
            .with_grace_period(Duration::from_secs(self.stop_grace_secs));
        PipelineController::new(
            self.to_config_store(),
            self.to_command_builder(),
            self.to_relay_command(),
            supervisor,
        )
    }
}
