use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::entities::{ManagedProcess, ProcessStatus};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::ProcessLauncher;
use crate::domain::value_objects::ProcessRole;

/// Time a stopping process gets to exit after SIGTERM before it is killed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns at most one live process per role
///
/// Holds no lock of its own: callers serialize access (see `PipelineController`).
pub struct ProcessSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    processes: [Option<ManagedProcess>; 3],
    grace_period: Duration,
}

impl ProcessSupervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            processes: [None, None, None],
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Start `argv` for `role` unless a live process already holds the slot
    ///
    /// With `log_dir` set, stdout and stderr are appended to the role's log
    /// file in that directory; otherwise they are inherited.
    pub fn start(&mut self, role: ProcessRole, argv: Vec<String>, log_dir: Option<&Path>) -> Result<()> {
        let slot = &mut self.processes[role.index()];

        if let Some(process) = slot.as_mut() {
            if process.is_alive() {
                tracing::debug!(%role, pid = process.pid(), "Already running, start skipped");
                return Ok(());
            }
        }
        if let Some(exited) = slot.take() {
            tracing::info!(%role, pid = exited.pid(), "Releasing exited process");
        }

        let program = argv
            .first()
            .cloned()
            .ok_or(DomainError::EmptyCommand(role))?;

        let log_sink = log_dir.map(|dir| open_log_sink(dir, role)).transpose()?;

        let child = self
            .launcher
            .launch(&argv, log_sink.as_ref())
            .map_err(|source| DomainError::ProcessSpawn {
                role,
                program,
                source,
            })?;

        tracing::info!(%role, pid = child.id(), "Started {}", argv.join(" "));
        *slot = Some(ManagedProcess::new(role, argv, child, log_sink));
        Ok(())
    }

    /// Best-effort stop: SIGTERM, wait out the grace period, then kill
    ///
    /// Never fails. The slot is cleared and the log sink closed afterwards.
    pub fn stop(&mut self, role: ProcessRole) {
        let Some(mut process) = self.processes[role.index()].take() else {
            return;
        };

        if !process.is_alive() {
            tracing::debug!(%role, "Process already exited");
            return;
        }

        let pid = process.pid();
        tracing::info!(%role, pid, "Stopping process");
        process.mark_stopping();

        if let Err(e) = self.terminate(&mut process) {
            tracing::warn!(%role, pid, "Error while stopping process: {}", e);
        }

        process.mark_stopped();
        tracing::info!(%role, pid, "Process stopped");
    }

    fn terminate(&self, process: &mut ManagedProcess) -> io::Result<()> {
        let role = process.role();
        let child = process.child_mut();

        if let Err(e) = child.terminate() {
            tracing::warn!(%role, "SIGTERM failed ({}), killing", e);
            return child.kill();
        }

        let deadline = Instant::now() + self.grace_period;
        loop {
            match child.try_wait() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%role, "Failed to poll exit status: {}", e);
                    break;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    %role,
                    "No exit within {:?} grace period, killing",
                    self.grace_period
                );
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }

        child.kill()
    }

    /// Stop the sender, then the encoder. The relay is left alone.
    pub fn stop_all(&mut self) {
        self.stop(ProcessRole::Sender);
        self.stop(ProcessRole::Encoder);
    }

    /// Stop every role, relay included
    pub fn shutdown(&mut self) {
        self.stop_all();
        self.stop(ProcessRole::Relay);
    }

    pub fn is_running(&mut self, role: ProcessRole) -> bool {
        self.processes[role.index()]
            .as_mut()
            .map_or(false, |p| p.is_alive())
    }

    pub fn pid(&mut self, role: ProcessRole) -> Option<u32> {
        let process = self.processes[role.index()].as_mut()?;
        process.is_alive().then(|| process.pid())
    }

    pub fn status(&mut self) -> Vec<ProcessStatus> {
        ProcessRole::ALL
            .iter()
            .map(|&role| match self.processes[role.index()].as_mut() {
                Some(process) => process.status(),
                None => ProcessStatus::stopped(role),
            })
            .collect()
    }
}

fn open_log_sink(dir: &Path, role: ProcessRole) -> Result<File> {
    let path = dir.join(role.log_file_name());
    fs::create_dir_all(dir)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path))
        .map_err(|source| DomainError::LogSink { path, source })
}
