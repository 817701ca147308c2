mod command_builder;
mod os_launcher;

pub use command_builder::{
    normalize_peer, CommandBuilder, DEFAULT_ENCODER_PROGRAM, DEFAULT_SENDER_PROGRAM,
};
pub use os_launcher::OsProcessLauncher;
