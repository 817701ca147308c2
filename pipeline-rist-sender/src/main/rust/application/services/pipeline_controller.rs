use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::application::services::ProcessSupervisor;
use crate::domain::entities::ProcessStatus;
use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::{PipelineConfig, ProcessRole};
use crate::infrastructure::process::CommandBuilder;
use crate::infrastructure::storage::ConfigStore;

/// Application service sequencing the relay, encoder and sender
///
/// Every lifecycle transition happens under the one supervisor lock, held for
/// the whole stop/start sequence.
pub struct PipelineController {
    store: ConfigStore,
    builder: CommandBuilder,
    relay_command: Vec<String>,
    supervisor: Mutex<ProcessSupervisor>,
}

impl PipelineController {
    pub fn new(
        store: ConfigStore,
        builder: CommandBuilder,
        relay_command: Vec<String>,
        supervisor: ProcessSupervisor,
    ) -> Self {
        Self {
            store,
            builder,
            relay_command,
            supervisor: Mutex::new(supervisor),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Initial bring-up: relay first, then sender and encoder
    pub fn startup(&self) -> Result<()> {
        let config = self.store.load()?;

        fs::create_dir_all(&config.logging.dir).map_err(|source| DomainError::LogSink {
            path: config.logging.dir.clone(),
            source,
        })?;

        let mut supervisor = self.lock();
        supervisor.start(
            ProcessRole::Relay,
            self.relay_command.clone(),
            config.logging.log_dir().map(|p| p.as_path()),
        )?;
        self.start_pipeline(&mut supervisor, &config)?;

        tracing::info!(mode = %config.source.mode, peers = config.rist.peers.len(), "Pipeline started");
        Ok(())
    }

    /// Restart sender and encoder from the persisted configuration
    ///
    /// The relay is not restarted. A configuration that fails to load leaves
    /// the running pipeline untouched; a spawn failure leaves it stopped.
    pub fn apply(&self) -> Result<()> {
        let config = self.store.load()?;

        let mut supervisor = self.lock();
        tracing::info!("Applying configuration");
        supervisor.stop_all();
        self.start_pipeline(&mut supervisor, &config)?;

        tracing::info!(mode = %config.source.mode, peers = config.rist.peers.len(), "Pipeline reloaded");
        Ok(())
    }

    pub fn status(&self) -> Vec<ProcessStatus> {
        self.lock().status()
    }

    /// Stop everything, relay included
    pub fn shutdown(&self) {
        tracing::info!("Stopping all managed processes");
        self.lock().shutdown();
    }

    /// Sender first so it is listening before the encoder starts writing
    fn start_pipeline(&self, supervisor: &mut ProcessSupervisor, config: &PipelineConfig) -> Result<()> {
        let log_dir = config.logging.log_dir().map(|p| p.as_path());

        let result = match self.builder.build_sender_command(config) {
            Some(argv) => supervisor.start(ProcessRole::Sender, argv, log_dir),
            None => {
                tracing::info!("No peers configured, sender not started");
                Ok(())
            }
        }
        .and_then(|_| {
            let argv = self.builder.build_encoder_command(config);
            supervisor.start(ProcessRole::Encoder, argv, log_dir)
        });

        if let Err(e) = result {
            tracing::error!("Pipeline start failed, stopping partial pipeline: {}", e);
            supervisor.stop_all();
            return Err(e);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ProcessSupervisor> {
        // The supervisor stays consistent even if a holder panicked
        self.supervisor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
