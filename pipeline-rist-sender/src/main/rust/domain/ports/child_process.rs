use std::io;

/// Handle to a spawned OS process, exclusively owned by the supervisor
pub trait ChildProcess: Send {
    /// OS process id
    fn id(&self) -> u32;

    /// Poll for exit without blocking; `true` once the process has exited
    fn try_wait(&mut self) -> io::Result<bool>;

    /// Ask the process to exit (SIGTERM on unix)
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the process to exit and reap it
    fn kill(&mut self) -> io::Result<()>;
}
