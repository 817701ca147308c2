use std::fs::File;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::domain::ports::ChildProcess;
use crate::domain::value_objects::{ProcessRole, ProcessState};

/// A live external program owned by the supervisor
///
/// Created by a start, dropped by the stop that observes its exit. Dropping it
/// closes the log sink.
pub struct ManagedProcess {
    role: ProcessRole,
    argv: Vec<String>,
    child: Box<dyn ChildProcess>,
    log_sink: Option<File>,
    state: ProcessState,
    started_at: Instant,
}

impl ManagedProcess {
    pub fn new(
        role: ProcessRole,
        argv: Vec<String>,
        child: Box<dyn ChildProcess>,
        log_sink: Option<File>,
    ) -> Self {
        Self {
            role,
            argv,
            child,
            log_sink,
            state: ProcessState::Running,
            started_at: Instant::now(),
        }
    }

    pub fn role(&self) -> ProcessRole {
        self.role
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn child_mut(&mut self) -> &mut dyn ChildProcess {
        self.child.as_mut()
    }

    /// Poll the OS for exit. An exited process is moved to `Stopped`.
    pub fn is_alive(&mut self) -> bool {
        if !self.state.is_running() {
            return false;
        }

        match self.child.try_wait() {
            Ok(true) => {
                tracing::info!(role = %self.role, pid = self.pid(), "Process has exited");
                self.state = ProcessState::Stopped;
                false
            }
            Ok(false) => true,
            Err(e) => {
                // Exit status unknown, treated as alive
                tracing::warn!(role = %self.role, "Failed to poll process status: {}", e);
                true
            }
        }
    }

    pub fn mark_stopping(&mut self) {
        self.state = ProcessState::Stopping;
    }

    pub fn mark_stopped(&mut self) {
        self.state = ProcessState::Stopped;
    }

    pub fn status(&mut self) -> ProcessStatus {
        let alive = self.is_alive();
        ProcessStatus {
            role: self.role,
            state: self.state,
            pid: alive.then(|| self.pid()),
            uptime_secs: alive.then(|| self.uptime().as_secs_f64()),
            argv: self.argv.clone(),
        }
    }
}

impl std::fmt::Debug for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedProcess")
            .field("role", &self.role)
            .field("pid", &self.pid())
            .field("state", &self.state)
            .field("argv", &self.argv)
            .field("logs_to_file", &self.log_sink.is_some())
            .finish()
    }
}

/// Point-in-time view of one role, as reported by the control surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStatus {
    pub role: ProcessRole,
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub uptime_secs: Option<f64>,
    pub argv: Vec<String>,
}

impl ProcessStatus {
    pub fn stopped(role: ProcessRole) -> Self {
        Self {
            role,
            state: ProcessState::Stopped,
            pid: None,
            uptime_secs: None,
            argv: Vec::new(),
        }
    }
}
