use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};

use crate::foundation::core::{Canvas, MediaTime};
use crate::foundation::error::{StillreelError, StillreelResult};
use crate::render::pixel_buffer::PixelBuffer;
use crate::render::settings::{RenderSettings, VideoCodec};

/// Default number of frames that may wait in the session write queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

/// Everything an encoder backend needs to open its output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Output video codec.
    pub codec: VideoCodec,
    /// Average bitrate in bits per second.
    pub bitrate: u32,
    /// Output file path. Must not exist when the session starts.
    pub out_path: PathBuf,
    /// Bounded write queue capacity (frames).
    pub queue_depth: usize,
}

impl EncoderConfig {
    /// Build a config from render settings and a resolved output path.
    pub fn from_settings(settings: &RenderSettings, out_path: impl Into<PathBuf>) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            codec: settings.codec,
            bitrate: settings.bitrate,
            out_path: out_path.into(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Set the write queue capacity.
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Output size.
    pub fn size(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Check values every backend relies on.
    pub fn validate(&self) -> StillreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StillreelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        MediaTime::frame_duration(self.fps)?;
        if self.bitrate == 0 {
            return Err(StillreelError::validation("encode bitrate must be non-zero"));
        }
        if self.queue_depth == 0 {
            return Err(StillreelError::validation(
                "encode queue_depth must be >= 1",
            ));
        }
        Ok(())
    }
}

/// The external encoder: compresses frames and muxes them into the output file.
///
/// Call order: `supports`, `begin`, any number of `write_frame` with strictly increasing
/// presentation times, then either `end` or, when the render failed, `abort`. `write_frame`, `end`
/// and `abort` run on the session writer thread.
pub trait EncoderBackend: Send {
    /// Fail with [`StillreelError::Unsupported`] when the combination cannot be encoded.
    fn supports(&self, cfg: &EncoderConfig) -> StillreelResult<()>;
    /// Create the output resource.
    fn begin(&mut self, cfg: &EncoderConfig) -> StillreelResult<()>;
    /// Encode one frame.
    fn write_frame(&mut self, frame: &PixelBuffer, pts: MediaTime) -> StillreelResult<()>;
    /// Flush and close the output.
    fn end(&mut self) -> StillreelResult<()>;
    /// Stop without finalizing and discard any partial output. Never fails.
    fn abort(&mut self);
}

/// A frame captured by [`InMemoryBackend`].
#[derive(Clone, Debug)]
pub struct RecordedFrame {
    /// Presentation time the frame was appended with.
    pub pts: MediaTime,
    /// The frame pixels.
    pub frame: PixelBuffer,
}

#[derive(Debug, Default)]
struct Recording {
    cfg: Option<EncoderConfig>,
    frames: Vec<RecordedFrame>,
    ended: bool,
    aborted: bool,
    waiting_at_gate: bool,
}

/// Backend that keeps frames in memory, for tests and debugging.
///
/// Clones share the same recording, so a test can keep one handle while the session owns the
/// other.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    recording: Arc<Mutex<Recording>>,
    gate: Option<Receiver<()>>,
}

impl InMemoryBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose writer blocks before each frame until a token arrives on the returned
    /// sender. Dropping the sender opens the gate for good.
    pub fn gated() -> (Self, Sender<()>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                recording: Arc::default(),
                gate: Some(rx),
            },
            tx,
        )
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<EncoderConfig> {
        self.lock().cfg.clone()
    }

    /// Frames written so far, in write order.
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.lock().frames.clone()
    }

    /// Presentation times written so far.
    pub fn timestamps(&self) -> Vec<MediaTime> {
        self.lock().frames.iter().map(|f| f.pts).collect()
    }

    /// Whether `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Whether `abort` has been called.
    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    /// Whether the writer is currently blocked on the gate.
    pub fn is_waiting_at_gate(&self) -> bool {
        self.lock().waiting_at_gate
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EncoderBackend for InMemoryBackend {
    fn supports(&self, cfg: &EncoderConfig) -> StillreelResult<()> {
        cfg.validate()
    }

    fn begin(&mut self, cfg: &EncoderConfig) -> StillreelResult<()> {
        let mut rec = self.lock();
        rec.cfg = Some(cfg.clone());
        rec.frames.clear();
        rec.ended = false;
        rec.aborted = false;
        Ok(())
    }

    fn write_frame(&mut self, frame: &PixelBuffer, pts: MediaTime) -> StillreelResult<()> {
        if let Some(gate) = self.gate.as_ref() {
            self.lock().waiting_at_gate = true;
            // A dropped sender means the gate is open.
            let _ = gate.recv();
            self.lock().waiting_at_gate = false;
        }

        let mut rec = self.lock();
        if rec.cfg.is_none() {
            return Err(StillreelError::encoder("in-memory backend not started"));
        }
        if let Some(last) = rec.frames.last()
            && pts <= last.pts
        {
            return Err(StillreelError::encoder(
                "in-memory backend received non-increasing presentation time",
            ));
        }
        rec.frames.push(RecordedFrame {
            pts,
            frame: frame.clone(),
        });
        Ok(())
    }

    fn end(&mut self) -> StillreelResult<()> {
        self.lock().ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.lock().aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/backend.rs"]
mod tests;
