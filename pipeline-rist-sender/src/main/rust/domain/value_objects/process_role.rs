use std::fmt;

use serde::Serialize;

/// The three external programs making up the contribution pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    /// Media relay server (mediamtx)
    Relay,
    /// Video/audio encoder (ffmpeg)
    Encoder,
    /// Reliable-transport sender (ristsender)
    Sender,
}

impl ProcessRole {
    pub const ALL: [ProcessRole; 3] = [Self::Relay, Self::Encoder, Self::Sender];

    /// Slot of this role in the supervisor's process table
    pub fn index(&self) -> usize {
        match self {
            Self::Relay => 0,
            Self::Encoder => 1,
            Self::Sender => 2,
        }
    }

    /// File name of the append-only log written by this role
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Self::Relay => "mediamtx.log",
            Self::Encoder => "ffmpeg.log",
            Self::Sender => "ristsender.log",
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay => write!(f, "relay"),
            Self::Encoder => write!(f, "encoder"),
            Self::Sender => write!(f, "sender"),
        }
    }
}
