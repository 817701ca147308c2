mod child_process;
mod process_launcher;

pub use child_process::ChildProcess;
pub use process_launcher::ProcessLauncher;
