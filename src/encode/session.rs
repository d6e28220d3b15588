use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::encode::backend::{EncoderBackend, EncoderConfig};
use crate::foundation::core::MediaTime;
use crate::foundation::error::{StillreelError, StillreelResult};
use crate::foundation::fs::ensure_parent_dir;
use crate::render::buffer_pool::PixelBufferPool;
use crate::render::pixel_buffer::PixelBuffer;

/// Lifecycle of an [`EncoderSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing opened yet.
    Idle,
    /// Output opened and writer running, no frame accepted yet.
    Started,
    /// At least one frame accepted.
    Writing,
    /// Queue closed, waiting for the backend to flush.
    Finishing,
    /// Output closed successfully.
    Finished,
    /// Resources released, either after `Finished` or after a failure.
    Cancelled,
}

/// What a [`FrameSource`] reports after one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
    /// More frames remain; invoke again once the session is ready.
    Pending,
    /// No frames remain; the session may finalize.
    Finished,
}

/// Result of a finalized session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Output file path.
    pub out_path: std::path::PathBuf,
    /// Frames the backend wrote.
    pub frames_written: u64,
    /// Total timeline length: `frames_written * frame_duration`.
    pub duration: MediaTime,
}

/// Producer driven by [`EncoderSession::request_media_data_when_ready`].
pub trait FrameSource: Send + 'static {
    /// Append as many frames as the session accepts, then report whether more remain.
    fn append_pixel_buffers(&mut self, session: &mut EncoderSession) -> StillreelResult<Feed>;
}

impl<F> FrameSource for F
where
    F: FnMut(&mut EncoderSession) -> StillreelResult<Feed> + Send + 'static,
{
    fn append_pixel_buffers(&mut self, session: &mut EncoderSession) -> StillreelResult<Feed> {
        self(session)
    }
}

struct FrameMsg {
    buffer: PixelBuffer,
    pts: MediaTime,
}

struct Writer {
    frames_tx: Sender<FrameMsg>,
    ready_rx: Receiver<()>,
    // Set before closing the queue to discard the output instead of finalizing it.
    abort: Arc<AtomicBool>,
    handle: JoinHandle<StillreelResult<u64>>,
}

/// Owns the encoder backend for one output file.
///
/// Frames are appended on the caller side and written by a dedicated writer thread through a
/// bounded queue. A full queue is backpressure: [`EncoderSession::is_ready_for_more_data`] turns
/// false and [`EncoderSession::append`] returns `Ok(false)`.
pub struct EncoderSession {
    cfg: EncoderConfig,
    state: SessionState,
    backend: Option<Box<dyn EncoderBackend>>,
    pool: Option<PixelBufferPool>,
    writer: Option<Writer>,
    frame_duration: MediaTime,
    last_pts: Option<MediaTime>,
    frames_appended: u64,
}

impl EncoderSession {
    /// Create an idle session.
    pub fn new(cfg: EncoderConfig, backend: Box<dyn EncoderBackend>) -> Self {
        Self {
            cfg,
            state: SessionState::Idle,
            backend: Some(backend),
            pool: None,
            writer: None,
            frame_duration: MediaTime::ZERO,
            last_pts: None,
            frames_appended: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }

    /// Duration of one frame; zero until started.
    pub fn frame_duration(&self) -> MediaTime {
        self.frame_duration
    }

    /// Frames accepted by `append` so far.
    pub fn frames_appended(&self) -> u64 {
        self.frames_appended
    }

    /// Pool of buffers sized to the session resolution; available between `start` and `cancel`.
    pub fn pixel_buffer_pool(&self) -> Option<&PixelBufferPool> {
        self.pool.as_ref()
    }

    /// Open the output and spawn the writer thread: `Idle -> Started`.
    ///
    /// Fails when a file already exists at the output path, the configuration is invalid or
    /// unsupported by the backend, the buffer pool cannot be allocated, or the backend cannot
    /// create its output.
    #[tracing::instrument(skip(self), fields(out = %self.cfg.out_path.display()))]
    pub fn start(&mut self) -> StillreelResult<()> {
        if self.state != SessionState::Idle {
            return Err(StillreelError::validation(format!(
                "start() called in state {:?}",
                self.state
            )));
        }
        if self.cfg.out_path.exists() {
            return Err(StillreelError::OutputExists(self.cfg.out_path.clone()));
        }
        self.cfg.validate()?;
        let frame_duration = MediaTime::frame_duration(self.cfg.fps)?;

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| StillreelError::validation("session backend already consumed"))?;
        backend.supports(&self.cfg)?;

        let depth = self.cfg.queue_depth;
        let pool = PixelBufferPool::new(self.cfg.size(), depth + 2, depth + 1)?;

        ensure_parent_dir(&self.cfg.out_path)?;
        backend.begin(&self.cfg)?;

        let Some(backend) = self.backend.take() else {
            return Err(StillreelError::validation("session backend already consumed"));
        };
        let (frames_tx, frames_rx) = crossbeam_channel::bounded::<FrameMsg>(depth);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<()>(1);
        let writer_pool = pool.clone();
        let abort = Arc::new(AtomicBool::new(false));
        let writer_abort = Arc::clone(&abort);
        let handle = std::thread::Builder::new()
            .name("stillreel-writer".to_string())
            .spawn(move || run_writer(backend, frames_rx, ready_tx, writer_pool, writer_abort))
            .map_err(|e| StillreelError::encoder(format!("failed to spawn writer thread: {e}")))?;

        self.pool = Some(pool);
        self.writer = Some(Writer {
            frames_tx,
            ready_rx,
            abort,
            handle,
        });
        self.frame_duration = frame_duration;
        self.state = SessionState::Started;
        tracing::debug!(
            width = self.cfg.width,
            height = self.cfg.height,
            fps = self.cfg.fps,
            codec = ?self.cfg.codec,
            "encoder session started"
        );
        Ok(())
    }

    /// Whether `append` would currently be accepted.
    pub fn is_ready_for_more_data(&self) -> bool {
        self.accepts_frames()
            && self
                .writer
                .as_ref()
                .is_some_and(|w| !w.frames_tx.is_full())
    }

    /// Queue one frame for writing.
    ///
    /// `Ok(false)` means the queue is full; the buffer goes back to the pool and nothing else
    /// changes. Presentation times must be strictly increasing.
    pub fn append(&mut self, buffer: PixelBuffer, pts: MediaTime) -> StillreelResult<bool> {
        if !self.accepts_frames() {
            return Err(StillreelError::validation(format!(
                "append() called in state {:?}",
                self.state
            )));
        }
        if buffer.size() != self.cfg.size() {
            let got = buffer.size();
            return Err(StillreelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                got.width, got.height, self.cfg.width, self.cfg.height
            )));
        }
        let in_order = match self.last_pts {
            Some(last) => pts > last,
            None => pts >= MediaTime::ZERO,
        };
        if !in_order {
            return Err(StillreelError::validation(format!(
                "presentation time {}/{} is not after the previous frame",
                pts.value, pts.timescale
            )));
        }

        let Some(writer) = self.writer.as_ref() else {
            return Err(StillreelError::validation("session writer is not running"));
        };
        match writer.frames_tx.try_send(FrameMsg { buffer, pts }) {
            Ok(()) => {
                self.last_pts = Some(pts);
                self.frames_appended += 1;
                self.state = SessionState::Writing;
                tracing::trace!(pts = pts.value, "frame appended");
                Ok(true)
            }
            Err(TrySendError::Full(msg)) => {
                self.recycle(msg.buffer);
                Ok(false)
            }
            Err(TrySendError::Disconnected(msg)) => {
                self.recycle(msg.buffer);
                Err(self.writer_failure())
            }
        }
    }

    /// Block until the writer frees room in the queue.
    ///
    /// Wakeups may be spurious; callers re-check readiness. Returns the writer's error if it
    /// stopped.
    pub fn wait_until_ready(&mut self) -> StillreelResult<()> {
        if !self.accepts_frames() {
            return Err(StillreelError::validation(format!(
                "wait_until_ready() called in state {:?}",
                self.state
            )));
        }
        if self.is_ready_for_more_data() {
            return Ok(());
        }
        let Some(writer) = self.writer.as_ref() else {
            return Err(StillreelError::validation("session writer is not running"));
        };
        match writer.ready_rx.recv() {
            Ok(()) => Ok(()),
            Err(_) => Err(self.writer_failure()),
        }
    }

    /// Close the queue and wait for the backend to flush: `Started|Writing -> Finished`.
    #[tracing::instrument(skip(self), fields(out = %self.cfg.out_path.display()))]
    pub fn finish(&mut self) -> StillreelResult<EncodeSummary> {
        if !self.accepts_frames() {
            return Err(StillreelError::validation(format!(
                "finish() called in state {:?}",
                self.state
            )));
        }
        let Some(writer) = self.writer.take() else {
            return Err(StillreelError::validation("session writer is not running"));
        };
        self.state = SessionState::Finishing;

        match join_writer(writer) {
            Ok(frames_written) => {
                self.state = SessionState::Finished;
                let summary = EncodeSummary {
                    out_path: self.cfg.out_path.clone(),
                    frames_written,
                    duration: self.frame_duration.multiply(frames_written),
                };
                tracing::info!(
                    frames = frames_written,
                    secs = summary.duration.as_secs_f64(),
                    "encoder session finished"
                );
                Ok(summary)
            }
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    /// Release remaining resources: `Finished -> Cancelled`.
    ///
    /// Only valid once `finish` has completed.
    pub fn cancel(&mut self) -> StillreelResult<()> {
        if self.state != SessionState::Finished {
            return Err(StillreelError::validation(format!(
                "cancel() is only valid after finish(), session is {:?}",
                self.state
            )));
        }
        self.release();
        Ok(())
    }

    /// Hand the session to a dedicated media-input thread that invokes `source` whenever the
    /// session is ready, until it reports [`Feed::Finished`]; the session then finishes and
    /// cancels itself.
    pub fn request_media_data_when_ready<S: FrameSource>(
        mut self,
        source: S,
    ) -> StillreelResult<RenderHandle<S>> {
        if !self.accepts_frames() {
            return Err(StillreelError::validation(format!(
                "request_media_data_when_ready() called in state {:?}",
                self.state
            )));
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let thread = std::thread::Builder::new()
            .name("stillreel-media-input".to_string())
            .spawn(move || {
                let mut source = source;
                let res = drive(&mut self, &mut source).map(|summary| (source, summary));
                let _ = done_tx.send(res);
            })
            .map_err(|e| {
                StillreelError::encoder(format!("failed to spawn media input thread: {e}"))
            })?;

        Ok(RenderHandle {
            done_rx,
            thread: Some(thread),
        })
    }

    fn accepts_frames(&self) -> bool {
        matches!(self.state, SessionState::Started | SessionState::Writing)
    }

    fn recycle(&self, buffer: PixelBuffer) {
        if let Some(pool) = self.pool.as_ref() {
            pool.release(buffer);
        }
    }

    fn writer_failure(&mut self) -> StillreelError {
        let err = match self.writer.take() {
            Some(writer) => match join_writer(writer) {
                Ok(_) => StillreelError::encoder("writer thread stopped unexpectedly"),
                Err(e) => e,
            },
            None => StillreelError::encoder("writer thread is not running"),
        };
        self.release();
        err
    }

    /// Discard queued frames and have the backend abort its output, then drop the pool.
    fn abandon(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort.store(true, Ordering::Release);
            match join_writer(writer) {
                Ok(written) => tracing::debug!(written, "session abandoned, output discarded"),
                Err(e) => tracing::warn!(error = %e, "writer failed while abandoning session"),
            }
        }
        self.release();
    }

    fn release(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.drain();
        }
        self.backend = None;
        self.state = SessionState::Cancelled;
    }
}

fn drive<S: FrameSource>(
    session: &mut EncoderSession,
    source: &mut S,
) -> StillreelResult<EncodeSummary> {
    let fed = loop {
        match source.append_pixel_buffers(session) {
            Ok(Feed::Finished) => break Ok(()),
            Ok(Feed::Pending) => {
                if let Err(e) = session.wait_until_ready() {
                    break Err(e);
                }
            }
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = fed {
        if session.accepts_frames() {
            session.abandon();
        }
        return Err(e);
    }

    let summary = session.finish()?;
    session.cancel()?;
    Ok(summary)
}

fn run_writer(
    mut backend: Box<dyn EncoderBackend>,
    frames_rx: Receiver<FrameMsg>,
    ready_tx: Sender<()>,
    pool: PixelBufferPool,
    abort: Arc<AtomicBool>,
) -> StillreelResult<u64> {
    let mut written = 0u64;
    for msg in frames_rx.iter() {
        if abort.load(Ordering::Acquire) {
            break;
        }
        // Room just opened in the queue; coalesce with any unread signal.
        let _ = ready_tx.try_send(());
        if let Err(e) = backend.write_frame(&msg.buffer, msg.pts) {
            backend.abort();
            return Err(e);
        }
        pool.release(msg.buffer);
        written += 1;
    }
    if abort.load(Ordering::Acquire) {
        backend.abort();
        return Ok(written);
    }
    backend.end()?;
    Ok(written)
}

fn join_writer(writer: Writer) -> StillreelResult<u64> {
    let Writer {
        frames_tx,
        ready_rx,
        abort: _,
        handle,
    } = writer;
    drop(frames_tx);
    drop(ready_rx);
    handle
        .join()
        .map_err(|_| StillreelError::encoder("writer thread panicked"))?
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        // A session dropped before `finish` never produces a valid file.
        if self.writer.is_some() {
            self.abandon();
        }
    }
}

/// Handle to a render running on the media-input thread.
///
/// Dropping the handle detaches the render; it still runs to completion.
pub struct RenderHandle<S> {
    done_rx: Receiver<StillreelResult<(S, EncodeSummary)>>,
    thread: Option<JoinHandle<()>>,
}

impl<S> RenderHandle<S> {
    /// Block the calling thread until the render completes.
    ///
    /// Returns the frame source (for inspection) and the encode summary.
    pub fn wait(mut self) -> StillreelResult<(S, EncodeSummary)> {
        let res = self.done_rx.recv();
        self.join_thread();
        res.map_err(|_| StillreelError::encoder("media input thread panicked"))?
    }

    /// Non-blocking check; `None` while the render is still running.
    pub fn try_wait(&mut self) -> Option<StillreelResult<(S, EncodeSummary)>> {
        let res = match self.done_rx.try_recv() {
            Ok(res) => res,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(StillreelError::encoder(
                "media input thread panicked",
            )),
        };
        self.join_thread();
        Some(res)
    }

    fn join_thread(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
