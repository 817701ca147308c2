use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, Result};

/// Where the encoder pulls its input from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Synthetic test pattern and sine tone
    Test,
    /// Live RTMP pull
    Rtmp,
    /// Local V4L2 camera and ALSA capture device
    Uvc,
}

impl Default for SourceMode {
    fn default() -> Self {
        Self::Test
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Rtmp => write!(f, "rtmp"),
            Self::Uvc => write!(f, "uvc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,
    pub rtmp_url: String,
    pub uvc_video: String,
    pub uvc_audio: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Test,
            rtmp_url: "rtmp://127.0.0.1:1935/live/stream".to_string(),
            uvc_video: "/dev/video0".to_string(),
            uvc_audio: "hw:1,0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub framerate: u32,
    pub gop_seconds: u32,
}

impl EncodeConfig {
    /// GOP length in frames, used for both `-g` and `-keyint_min`
    pub fn gop_frames(&self) -> u32 {
        self.framerate.saturating_mul(self.gop_seconds)
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_bitrate: "6000k".to_string(),
            audio_bitrate: "128k".to_string(),
            framerate: 25,
            gop_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RistConfig {
    pub profile: u8,
    pub buffer_ms: u32,
    /// AES key size in bits, 0 disables encryption
    pub aes: u16,
    pub secret: String,
    /// Loopback port shared by the encoder output and the sender input
    pub base_udp_port: u16,
    pub peers: Vec<String>,
}

impl Default for RistConfig {
    fn default() -> Self {
        Self {
            profile: 1,
            buffer_ms: 1200,
            aes: 128,
            secret: "pass123".to_string(),
            base_udp_port: 10000,
            peers: vec!["rist://127.0.0.1:8000?weight=5".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub to_file: bool,
    pub dir: PathBuf,
    pub verbose: u8,
    pub stats_ms: u32,
}

impl LoggingConfig {
    /// Directory process logs go to, or `None` when children inherit our stdio
    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.to_file.then_some(&self.dir)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            to_file: true,
            dir: PathBuf::from("/var/log/rist"),
            verbose: 3,
            stats_ms: 0,
        }
    }
}

/// The persisted pipeline configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub encode: EncodeConfig,
    pub rist: RistConfig,
    pub logging: LoggingConfig,
}

const SUPPORTED_AES_KEY_SIZES: [u16; 3] = [0, 128, 256];

/// The secret is injected into peer query strings unescaped
const SECRET_FORBIDDEN_CHARS: [char; 3] = ['&', '#', '?'];

impl PipelineConfig {
    /// Range checks the typed model cannot express
    pub fn validate(&self) -> Result<()> {
        if self.encode.framerate == 0 {
            return Err(semantic("encode.framerate must be positive"));
        }
        if self.encode.gop_seconds == 0 {
            return Err(semantic("encode.gop_seconds must be positive"));
        }
        if self.rist.buffer_ms == 0 {
            return Err(semantic("rist.buffer_ms must be positive"));
        }
        if self.rist.base_udp_port == 0 {
            return Err(semantic("rist.base_udp_port cannot be 0"));
        }
        if !SUPPORTED_AES_KEY_SIZES.contains(&self.rist.aes) {
            return Err(semantic(format!(
                "rist.aes must be one of {:?}, got {}",
                SUPPORTED_AES_KEY_SIZES, self.rist.aes
            )));
        }
        if self.rist.secret.contains(&SECRET_FORBIDDEN_CHARS[..]) {
            return Err(semantic(format!(
                "rist.secret cannot contain any of {:?}",
                SECRET_FORBIDDEN_CHARS
            )));
        }
        if self.source.mode == SourceMode::Rtmp && !self.source.rtmp_url.starts_with("rtmp") {
            return Err(semantic(format!(
                "source.rtmp_url must be an rtmp URL: {}",
                self.source.rtmp_url
            )));
        }
        if let Some(peer) = self.rist.peers.iter().find(|p| p.trim().is_empty()) {
            return Err(semantic(format!("rist.peers contains an empty entry: {:?}", peer)));
        }
        Ok(())
    }
}

fn semantic(msg: impl Into<String>) -> DomainError {
    DomainError::ConfigSemantic(msg.into())
}
