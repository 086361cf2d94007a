//! Stream-captured video: frames are piped to a recorder that emits container bytes.

use std::io::{Read, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{FileType, FinalizeProgress, FinishCtx, FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ErrorCategory, LoomError, LoomResult};
use crate::foundation::events::{EventSink, Notice, Severity};
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::surface::Surface;

const CHUNK_BYTES: usize = 64 * 1024;

/// Codec profile for the video format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoProfile {
    /// VP9 in WebM.
    Vp9,
    /// VP8 in WebM; the fallback.
    #[default]
    Vp8,
    /// H.264 in fragmented MP4.
    H264,
}

impl VideoProfile {
    /// Every profile, most preferred first.
    pub const ALL: [VideoProfile; 3] = [Self::Vp9, Self::Vp8, Self::H264];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vp9 => "vp9",
            Self::Vp8 => "vp8",
            Self::H264 => "h264",
        }
    }

    /// Parse a name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }

    /// `ffmpeg` encoder implementing this profile.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
            Self::H264 => "libx264",
        }
    }

    /// Container extension and MIME type.
    pub fn file_type(self) -> FileType {
        match self {
            Self::Vp9 | Self::Vp8 => FileType {
                ext: "webm",
                mime: "video/webm",
            },
            Self::H264 => FileType {
                ext: "mp4",
                mime: "video/mp4",
            },
        }
    }

    fn output_args(self) -> &'static [&'static str] {
        match self {
            Self::Vp9 => &[
                "-deadline",
                "realtime",
                "-row-mt",
                "1",
                "-b:v",
                "0",
                "-crf",
                "32",
                "-f",
                "webm",
            ],
            Self::Vp8 => &["-deadline", "realtime", "-b:v", "2M", "-f", "webm"],
            // Non-seekable output needs a fragmented mp4.
            Self::H264 => &[
                "-preset",
                "veryfast",
                "-movflags",
                "frag_keyframe+empty_moov",
                "-f",
                "mp4",
            ],
        }
    }
}

impl std::fmt::Display for VideoProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for the video format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoOptions {
    /// Requested profile. Degrades to [`VideoProfile::default`] when unavailable.
    pub profile: VideoProfile,
}

/// Parameters handed to [`CapturePort::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Frame width in pixels; even.
    pub width: u32,
    /// Frame height in pixels; even.
    pub height: u32,
    /// Capture rate.
    pub fps: u32,
    /// Negotiated profile.
    pub profile: VideoProfile,
}

/// Recorder boundary: consumes opaque RGBA8 frames at a fixed rate and emits container bytes.
pub trait CapturePort: Send {
    /// Profiles this recorder can encode. A capability error when recording is impossible.
    fn profiles(&mut self) -> LoomResult<Vec<VideoProfile>>;
    /// Begin recording with `cfg`.
    fn start(&mut self, cfg: &CaptureConfig) -> LoomResult<()>;
    /// Feed one straight-alpha RGBA8 frame.
    fn push(&mut self, rgba: &[u8]) -> LoomResult<()>;
    /// Stop recording and wait for the recorder to flush every chunk.
    fn stop(&mut self) -> LoomResult<Vec<u8>>;
    /// Tear down without waiting for output.
    fn abort(&mut self);
}

/// Pick the profile to record with, degrading to the default one with a warning.
pub fn negotiate_profile(
    requested: VideoProfile,
    available: &[VideoProfile],
    events: &dyn EventSink,
) -> LoomResult<VideoProfile> {
    if available.contains(&requested) {
        return Ok(requested);
    }
    let fallback = VideoProfile::default();
    if available.contains(&fallback) {
        events.notify(Notice::new(
            Severity::Warning,
            ErrorCategory::Encode,
            format!("video profile '{requested}' unavailable, recording with '{fallback}'"),
        ));
        return Ok(fallback);
    }
    Err(LoomError::capability(
        "video",
        format!("no usable encoder for '{requested}' or '{fallback}'"),
    ))
}

/// Recorder backed by the system `ffmpeg`: raw RGBA on stdin, container bytes on stdout.
pub struct FfmpegCapture {
    program: PathBuf,
    encoders: Option<Vec<String>>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl FfmpegCapture {
    /// Recorder using `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Use a specific `ffmpeg` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            encoders: None,
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
        }
    }

    /// Join both pipe readers. Neither handle survives, whatever the outcome.
    fn join_drains(&mut self) -> (LoomResult<Vec<Vec<u8>>>, LoomResult<Vec<u8>>) {
        let chunks = match self.stdout_drain.take() {
            Some(h) => h
                .join()
                .map_err(|_| LoomError::encode("ffmpeg stdout drain thread panicked"))
                .and_then(|r| r.map_err(LoomError::from)),
            None => Ok(Vec::new()),
        };
        let stderr = match self.stderr_drain.take() {
            Some(h) => h
                .join()
                .map_err(|_| LoomError::encode("ffmpeg stderr drain thread panicked"))
                .and_then(|r| r.map_err(LoomError::from)),
            None => Ok(Vec::new()),
        };
        (chunks, stderr)
    }

    fn query_encoders(&mut self) -> LoomResult<&[String]> {
        if self.encoders.is_none() {
            let out = Command::new(&self.program)
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .map_err(|e| {
                    LoomError::capability(
                        "video",
                        format!(
                            "ffmpeg is required for video export, but '{}' could not be run: {e}",
                            self.program.display()
                        ),
                    )
                })?;
            if !out.status.success() {
                return Err(LoomError::capability(
                    "video",
                    format!("ffmpeg encoder listing exited with status {}", out.status),
                ));
            }
            let found = parse_encoder_list(&String::from_utf8_lossy(&out.stdout));
            tracing::debug!(count = found.len(), "listed ffmpeg encoders");
            self.encoders = Some(found);
        }
        Ok(self.encoders.as_deref().unwrap_or_default())
    }
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CapturePort for FfmpegCapture {
    fn profiles(&mut self) -> LoomResult<Vec<VideoProfile>> {
        let encoders = self.query_encoders()?;
        Ok(VideoProfile::ALL
            .into_iter()
            .filter(|p| encoders.iter().any(|e| e == p.encoder()))
            .collect())
    }

    fn start(&mut self, cfg: &CaptureConfig) -> LoomResult<()> {
        if self.child.is_some() {
            return Err(LoomError::encode("ffmpeg capture already started"));
        }

        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            cfg.profile.encoder(),
            "-pix_fmt",
            "yuv420p",
        ]);
        cmd.args(cfg.profile.output_args());
        cmd.arg("pipe:1");

        let mut child = cmd.spawn().map_err(|e| {
            LoomError::capability("video", format!("failed to spawn ffmpeg: {e}"))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LoomError::encode("failed to open ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LoomError::encode("failed to open ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LoomError::encode("failed to open ffmpeg stderr"))?;

        let stdout_drain = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; CHUNK_BYTES];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                chunks.push(buf[..n].to_vec());
            }
            Ok(chunks)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(
            profile = %cfg.profile,
            width = cfg.width,
            height = cfg.height,
            "ffmpeg capture started"
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        Ok(())
    }

    fn push(&mut self, rgba: &[u8]) -> LoomResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| LoomError::encode("ffmpeg capture is not recording"))?;
        stdin
            .write_all(rgba)
            .map_err(|e| LoomError::encode(format!("failed to write frame to ffmpeg: {e}")))
    }

    fn stop(&mut self) -> LoomResult<Vec<u8>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| LoomError::encode("ffmpeg capture not started"))?;
        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = self.join_drains();
                return Err(LoomError::encode(format!("failed to wait for ffmpeg: {e}")));
            }
        };

        let (chunks, stderr) = self.join_drains();
        let (chunks, stderr) = (chunks?, stderr?);

        if !status.success() {
            return Err(LoomError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        tracing::debug!(chunks = chunks.len(), "ffmpeg capture stopped");
        Ok(chunks.concat())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_drains();
    }
}

/// Encoder names from `ffmpeg -encoders` output.
pub fn parse_encoder_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            let is_entry = flags.len() == 6
                && flags.starts_with(['V', 'A', 'S'])
                && flags != "------";
            is_entry.then(|| name.to_owned())
        })
        .collect()
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Recording,
    Stopped,
}

/// Feeds flattened frames into a [`CapturePort`].
pub struct StreamSink {
    opts: VideoOptions,
    port: Box<dyn CapturePort>,
    profile: VideoProfile,
    state: CaptureState,
    cfg: Option<SinkConfig>,
    scratch: Vec<u8>,
}

impl StreamSink {
    /// Sink recording through [`FfmpegCapture`].
    pub fn new(opts: VideoOptions) -> Self {
        Self::with_port(opts, Box::new(FfmpegCapture::new()))
    }

    /// Sink recording through `port`.
    pub fn with_port(opts: VideoOptions, port: Box<dyn CapturePort>) -> Self {
        Self {
            opts,
            port,
            profile: opts.profile,
            state: CaptureState::Idle,
            cfg: None,
            scratch: Vec::new(),
        }
    }

    /// Profile in use; the requested one until `begin` negotiates.
    pub fn profile(&self) -> VideoProfile {
        self.profile
    }
}

impl FrameSink for StreamSink {
    fn file_type(&self) -> FileType {
        self.profile.file_type()
    }

    fn begin(&mut self, cfg: &SinkConfig, events: &dyn EventSink) -> LoomResult<()> {
        if cfg.width == 0 || cfg.height == 0 || cfg.fps == 0 {
            return Err(LoomError::validation("video width/height/fps must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(LoomError::validation(
                "video width/height must be even (required for yuv420p output)",
            ));
        }

        let available = self.port.profiles()?;
        self.profile = negotiate_profile(self.opts.profile, &available, events)?;
        self.port.start(&CaptureConfig {
            width: cfg.width,
            height: cfg.height,
            fps: cfg.fps,
            profile: self.profile,
        })?;

        self.state = CaptureState::Recording;
        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, surface: &dyn Surface) -> LoomResult<()> {
        if self.state != CaptureState::Recording {
            return Err(LoomError::encode("video capture is not recording"));
        }
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| LoomError::encode("stream sink not started"))?;
        flatten_premul_over_bg(&mut self.scratch, surface.pixels(), cfg.background)?;
        self.port.push(&self.scratch)
    }

    fn finish(&mut self, mut ctx: FinishCtx<'_>) -> LoomResult<Option<Vec<u8>>> {
        match self.state {
            CaptureState::Recording => {}
            CaptureState::Stopped => return Err(LoomError::encode("video capture already stopped")),
            CaptureState::Idle => return Err(LoomError::encode("video capture never started")),
        }
        self.state = CaptureState::Stopped;

        if ctx.cancel.is_cancelled() {
            self.port.abort();
            return Ok(None);
        }
        let bytes = match self.port.stop() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.port.abort();
                return Err(e);
            }
        };
        (ctx.progress)(FinalizeProgress {
            percent: 100.0,
            eta: Some(std::time::Duration::ZERO),
        });
        Ok(Some(bytes))
    }

    fn release(&mut self) {
        if self.state == CaptureState::Recording {
            self.port.abort();
        }
        self.state = CaptureState::Idle;
        self.scratch = Vec::new();
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/stream.rs"]
mod tests;
