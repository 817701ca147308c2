use std::fs::File;
use std::io;
use std::process::{Child, Command, Stdio};

use crate::domain::ports::{ChildProcess, ProcessLauncher};

/// Launches real OS processes via `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessLauncher;

impl OsProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for OsProcessLauncher {
    fn launch(&self, argv: &[String], log_sink: Option<&File>) -> io::Result<Box<dyn ChildProcess>> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        // stdout and stderr share one append-mode sink
        if let Some(sink) = log_sink {
            command
                .stdout(Stdio::from(sink.try_clone()?))
                .stderr(Stdio::from(sink.try_clone()?));
        }

        let child = command.spawn()?;
        tracing::debug!(pid = child.id(), "Spawned {}", program);

        Ok(Box::new(OsChild { child }))
    }
}

struct OsChild {
    child: Child,
}

impl ChildProcess for OsChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = Pid::from_raw(self.child.id() as i32);
        kill(pid, Signal::SIGTERM).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        // No graceful signal available, escalate straight away
        self.child.kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}
