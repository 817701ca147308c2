use crate::domain::value_objects::{PipelineConfig, RistConfig, SourceMode};

pub const DEFAULT_ENCODER_PROGRAM: &str = "ffmpeg";
pub const DEFAULT_SENDER_PROGRAM: &str = "ristsender";

/// MPEG-TS payload size: 7 TS packets of 188 bytes
const TS_PACKET_SIZE: u32 = 1316;
const UDP_FIFO_SIZE: u32 = 1_000_000;
const TEST_PATTERN_SIZE: &str = "1280x720";
const AUDIO_SAMPLE_RATE: u32 = 48_000;
const CAPTURE_QUEUE_SIZE: u32 = 1024;

/// Query parameters that belong on the sender command line, not in peer URLs
const SENDER_FLAG_PARAMS: [&str; 2] = ["profile", "buffer"];

/// Translates a pipeline configuration into encoder and sender command lines
///
/// Pure: holds only the program names, touches neither processes nor files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    encoder_program: String,
    sender_program: String,
}

impl CommandBuilder {
    pub fn new(encoder_program: impl Into<String>, sender_program: impl Into<String>) -> Self {
        Self {
            encoder_program: encoder_program.into(),
            sender_program: sender_program.into(),
        }
    }

    /// Relay runs from its own static config file
    pub fn build_relay_command(relay_program: &str, relay_config: &str) -> Vec<String> {
        vec![relay_program.to_string(), relay_config.to_string()]
    }

    /// Loopback endpoint the encoder writes to and the sender reads from
    pub fn loopback_endpoint(rist: &RistConfig) -> String {
        format!("udp://127.0.0.1:{}", rist.base_udp_port)
    }

    pub fn build_encoder_command(&self, config: &PipelineConfig) -> Vec<String> {
        let mut argv = vec![
            self.encoder_program.clone(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-hide_banner".to_string(),
        ];
        argv.extend(Self::input_clause(config));
        argv.extend(Self::output_clause(config));
        argv
    }

    fn input_clause(config: &PipelineConfig) -> Vec<String> {
        let source = &config.source;
        let framerate = config.encode.framerate;

        match source.mode {
            SourceMode::Test => vec![
                "-re".into(),
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!(
                    "testsrc2=size={}:rate={},format=yuv420p",
                    TEST_PATTERN_SIZE, framerate
                ),
                "-f".into(),
                "lavfi".into(),
                "-i".into(),
                format!("sine=frequency=1000:sample_rate={}", AUDIO_SAMPLE_RATE),
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
            ],
            SourceMode::Rtmp => vec![
                "-re".into(),
                "-fflags".into(),
                "nobuffer".into(),
                "-flags".into(),
                "low_delay".into(),
                "-rtmp_live".into(),
                "live".into(),
                "-i".into(),
                source.rtmp_url.clone(),
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "0:a?".into(),
            ],
            SourceMode::Uvc => vec![
                "-f".into(),
                "v4l2".into(),
                "-thread_queue_size".into(),
                CAPTURE_QUEUE_SIZE.to_string(),
                "-framerate".into(),
                framerate.to_string(),
                "-i".into(),
                source.uvc_video.clone(),
                "-f".into(),
                "alsa".into(),
                "-thread_queue_size".into(),
                CAPTURE_QUEUE_SIZE.to_string(),
                "-i".into(),
                source.uvc_audio.clone(),
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
            ],
        }
    }

    fn output_clause(config: &PipelineConfig) -> Vec<String> {
        let encode = &config.encode;
        let gop = encode.gop_frames().to_string();
        let output_url = format!(
            "{}?pkt_size={}&fifo_size={}&overrun_nonfatal=1",
            Self::loopback_endpoint(&config.rist),
            TS_PACKET_SIZE,
            UDP_FIFO_SIZE
        );

        vec![
            "-fflags".into(),
            "+genpts".into(),
            "-mpegts_flags".into(),
            "+resend_headers".into(),
            "-muxpreload".into(),
            "0".into(),
            "-muxdelay".into(),
            "0".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "veryfast".into(),
            "-tune".into(),
            "zerolatency".into(),
            "-b:v".into(),
            encode.video_bitrate.clone(),
            "-maxrate".into(),
            encode.video_bitrate.clone(),
            "-bufsize".into(),
            encode.video_bitrate.clone(),
            "-g".into(),
            gop.clone(),
            "-keyint_min".into(),
            gop,
            "-sc_threshold".into(),
            "0".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            encode.audio_bitrate.clone(),
            "-ar".into(),
            AUDIO_SAMPLE_RATE.to_string(),
            "-ac".into(),
            "2".into(),
            "-f".into(),
            "mpegts".into(),
            output_url,
        ]
    }

    /// `None` when there are no peers to send to
    pub fn build_sender_command(&self, config: &PipelineConfig) -> Option<Vec<String>> {
        let rist = &config.rist;
        if rist.peers.is_empty() {
            return None;
        }

        let outputs = rist
            .peers
            .iter()
            .map(|peer| normalize_peer(peer, rist))
            .collect::<Vec<_>>()
            .join(",");

        let mut argv = vec![
            self.sender_program.clone(),
            "-i".to_string(),
            Self::loopback_endpoint(rist),
            "-o".to_string(),
            outputs,
            "-p".to_string(),
            rist.profile.to_string(),
            "-b".to_string(),
            rist.buffer_ms.to_string(),
            "-e".to_string(),
            rist.aes.to_string(),
            "-S".to_string(),
            config.logging.stats_ms.to_string(),
            "-v".to_string(),
            config.logging.verbose.to_string(),
        ];
        if !rist.secret.is_empty() {
            argv.push("-s".to_string());
            argv.push(rist.secret.clone());
        }
        Some(argv)
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODER_PROGRAM, DEFAULT_SENDER_PROGRAM)
    }
}

/// Strip sender-flag parameters from a peer URL and add the shared secret
///
/// `profile` and `buffer` are removed with their values. `secret` and
/// `aes-type` are appended only when a secret is configured and the URL does
/// not carry them already. Idempotent.
pub fn normalize_peer(url: &str, rist: &RistConfig) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, query),
        None => (url, ""),
    };

    let mut params: Vec<String> = query
        .split('&')
        .filter(|param| !param.is_empty())
        .filter(|param| !SENDER_FLAG_PARAMS.contains(&param_key(param)))
        .map(str::to_string)
        .collect();

    if !rist.secret.is_empty() {
        if !params.iter().any(|p| param_key(p) == "secret") {
            params.push(format!("secret={}", rist.secret));
        }
        if !params.iter().any(|p| param_key(p) == "aes-type") {
            params.push(format!("aes-type={}", rist.aes));
        }
    }

    if params.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, params.join("&"))
    }
}

fn param_key(param: &str) -> &str {
    param.split_once('=').map_or(param, |(key, _)| key)
}
