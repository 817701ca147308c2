use std::fs::File;
use std::io;

use super::ChildProcess;

/// Port for creating OS processes
///
/// `argv[0]` is the program, the rest are its arguments. When `log_sink` is
/// given both stdout and stderr go to it, otherwise they are inherited.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, argv: &[String], log_sink: Option<&File>) -> io::Result<Box<dyn ChildProcess>>;
}
