use std::io::Read;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::backend::{EncoderBackend, EncoderConfig};
use crate::foundation::core::MediaTime;
use crate::foundation::error::{StillreelError, StillreelResult};
use crate::foundation::fs::{ensure_parent_dir, remove_file_if_exists};
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::pixel_buffer::PixelBuffer;
use crate::render::settings::VideoCodec;

/// Options for [`FfmpegBackend`].
#[derive(Clone, Debug)]
pub struct FfmpegBackendOpts {
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegBackendOpts {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Backend that spawns the system `ffmpeg` and streams raw frames to its stdin.
///
/// Output is MP4 with yuv420p video, so width and height must be even.
pub struct FfmpegBackend {
    opts: FfmpegBackendOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    last_pts: Option<MediaTime>,
}

impl FfmpegBackend {
    /// Create a backend; nothing is spawned until `begin`.
    pub fn new(opts: FfmpegBackendOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_pts: None,
        }
    }

    // Kill and reap a still-running ffmpeg.
    fn kill_child(&mut self) {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "ffmpeg already exited");
        }
        if let Err(e) = child.wait() {
            tracing::warn!(error = %e, "failed to reap ffmpeg");
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FfmpegBackend {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(FfmpegBackendOpts::default())
    }
}

impl EncoderBackend for FfmpegBackend {
    fn supports(&self, cfg: &EncoderConfig) -> StillreelResult<()> {
        cfg.validate()?;
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(StillreelError::unsupported(format!(
                "{}x{}: width/height must be even (required for yuv420p mp4 output)",
                cfg.width, cfg.height
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(StillreelError::unsupported(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }
        let encoder = codec_encoder_name(cfg.codec);
        if !is_encoder_available(encoder) {
            return Err(StillreelError::unsupported(format!(
                "ffmpeg on PATH has no '{encoder}' encoder"
            )));
        }
        Ok(())
    }

    fn begin(&mut self, cfg: &EncoderConfig) -> StillreelResult<()> {
        ensure_parent_dir(&cfg.out_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // The session guarantees the output does not exist; never clobber.
        cmd.arg("-n");

        // Input: raw premultiplied RGBA8 frames, flattened before they hit stdin.
        cmd.args([
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
            codec_encoder_name(cfg.codec),
        ]);
        match cfg.codec {
            VideoCodec::H264 => {
                cmd.args(["-profile:v", "high"]);
            }
            VideoCodec::Hevc => {
                cmd.args(["-tag:v", "hvc1"]);
            }
        }
        cmd.args([
            "-b:v",
            &cfg.bitrate.to_string(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            StillreelError::encoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StillreelError::encoder("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StillreelError::encoder("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; cfg.size().rgba8_len().unwrap_or(0)];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg.clone());
        self.last_pts = None;
        Ok(())
    }

    fn write_frame(&mut self, frame: &PixelBuffer, pts: MediaTime) -> StillreelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StillreelError::encoder("ffmpeg backend not started"))?;
        if let Some(last) = self.last_pts
            && pts <= last
        {
            return Err(StillreelError::encoder(
                "ffmpeg backend received non-increasing presentation time",
            ));
        }
        self.last_pts = Some(pts);

        if frame.size() != cfg.size() {
            let got = frame.size();
            return Err(StillreelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                got.width, got.height, cfg.width, cfg.height
            )));
        }

        flatten_premul_over_bg(&mut self.scratch, frame.data(), self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StillreelError::encoder("ffmpeg backend is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            StillreelError::encoder(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> StillreelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StillreelError::encoder("ffmpeg backend not started"))?;

        let status = child.wait().map_err(|e| {
            StillreelError::encoder(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StillreelError::encoder("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StillreelError::encoder(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StillreelError::encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }

    fn abort(&mut self) {
        self.kill_child();
        if let Some(cfg) = self.cfg.take() {
            match remove_file_if_exists(&cfg.out_path) {
                Ok(true) => tracing::debug!(path = %cfg.out_path.display(), "removed partial output"),
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "could not remove partial output"),
            }
        }
        self.last_pts = None;
    }
}

/// ffmpeg encoder used for `codec`.
pub fn codec_encoder_name(codec: VideoCodec) -> &'static str {
    match codec {
        VideoCodec::H264 => "libx264",
        VideoCodec::Hevc => "libx265",
    }
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

/// Return `true` when `ffmpeg -encoders` lists `name`.
pub fn is_encoder_available(name: &str) -> bool {
    let Ok(output) = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
    else {
        return false;
    };
    output.status.success() && encoders_list_contains(&String::from_utf8_lossy(&output.stdout), name)
}

fn encoders_list_contains(listing: &str, name: &str) -> bool {
    // Rows look like " V....D libx264   libx264 H.264 / AVC ...".
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|encoder| encoder == name)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
