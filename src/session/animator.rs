use std::path::{Path, PathBuf};

use crate::assets::decode::{FsImageDecoder, ImageDecoder};
use crate::encode::backend::{DEFAULT_QUEUE_DEPTH, EncoderBackend, EncoderConfig};
use crate::encode::ffmpeg::FfmpegBackend;
use crate::encode::session::{EncoderSession, RenderHandle};
use crate::foundation::core::MediaTime;
use crate::foundation::error::StillreelResult;
use crate::foundation::fs::remove_file_if_exists;
use crate::render::settings::RenderSettings;
use crate::session::sequencer::{DecodeFailurePolicy, FrameSequencer, SkippedImage};

/// Result of a completed render, handed to the completion callback and returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOutput {
    /// Path of the finished video file.
    pub path: PathBuf,
    /// Frames written, one per decoded image.
    pub frames_written: u64,
    /// Video length.
    pub duration: MediaTime,
    /// Images dropped because they could not be decoded.
    pub skipped: Vec<SkippedImage>,
}

/// Turns an ordered list of still images into a video, one frame per image.
///
/// The output size comes from the first image (rounded down to even). When the first image
/// cannot be decoded, the size configured in the settings is used instead.
pub struct ImageAnimator {
    settings: RenderSettings,
    images: Vec<PathBuf>,
    decoder: Box<dyn ImageDecoder>,
    backend: Box<dyn EncoderBackend>,
    policy: DecodeFailurePolicy,
    queue_depth: usize,
}

impl ImageAnimator {
    /// Animator decoding from disk and encoding with the system `ffmpeg`.
    pub fn new(settings: RenderSettings, images: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            settings,
            images: images.into_iter().collect(),
            decoder: Box::new(FsImageDecoder),
            backend: Box::new(FfmpegBackend::default()),
            policy: DecodeFailurePolicy::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Use another image decoder.
    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Use another encoder backend.
    pub fn with_backend(mut self, backend: impl EncoderBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Set what happens to images that fail to decode.
    pub fn with_decode_failure_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set how many frames may wait for the writer thread.
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Start rendering in the background.
    ///
    /// Any file at the output path is removed first. Errors here mean nothing was started;
    /// errors during the render come back from [`RenderJob::wait`]. `on_complete` runs on the
    /// thread that calls `wait`, once, after a successful render.
    #[tracing::instrument(skip_all, fields(images = self.images.len()))]
    pub fn render<C>(self, on_complete: C) -> StillreelResult<RenderJob<C>>
    where
        C: FnOnce(&RenderOutput),
    {
        let Self {
            settings,
            images,
            decoder,
            backend,
            policy,
            queue_depth,
        } = self;

        let first = match images.first().map(|path| decoder.decode(path)) {
            Some(Ok(image)) => Some(image),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "first image not decodable, keeping configured size");
                None
            }
            None => None,
        };
        let settings = match &first {
            Some(image) => settings.with_size_of(image),
            None => settings,
        };
        settings.validate()?;

        let out_path = settings.output_path()?;
        match remove_file_if_exists(&out_path) {
            Ok(true) => tracing::debug!(path = %out_path.display(), "removed stale output"),
            Ok(false) => {}
            // The session refuses to start over an existing file.
            Err(e) => tracing::warn!(error = %e, "could not remove stale output"),
        }

        let cfg = EncoderConfig::from_settings(&settings, out_path.clone())
            .with_queue_depth(queue_depth);
        let mut session = EncoderSession::new(cfg, backend);
        session.start()?;

        tracing::info!(
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            out = %out_path.display(),
            "render started"
        );
        let mut sequencer = FrameSequencer::new(images, decoder).with_policy(policy);
        if let Some(image) = first {
            sequencer = sequencer.with_decoded_front(image);
        }
        let handle = session.request_media_data_when_ready(sequencer)?;

        Ok(RenderJob {
            handle,
            on_complete,
            out_path,
        })
    }
}

/// A render running in the background.
pub struct RenderJob<C> {
    handle: RenderHandle<FrameSequencer>,
    on_complete: C,
    out_path: PathBuf,
}

impl<C> RenderJob<C>
where
    C: FnOnce(&RenderOutput),
{
    /// Where the video is being written.
    pub fn output_path(&self) -> &Path {
        &self.out_path
    }

    /// Block until the render finishes, run the completion callback and return the output.
    pub fn wait(self) -> StillreelResult<RenderOutput> {
        let (sequencer, summary) = self.handle.wait()?;
        let report = sequencer.into_report();
        let output = RenderOutput {
            path: summary.out_path,
            frames_written: summary.frames_written,
            duration: summary.duration,
            skipped: report.skipped,
        };
        if !output.skipped.is_empty() {
            tracing::warn!(skipped = output.skipped.len(), "some images were skipped");
        }
        (self.on_complete)(&output);
        Ok(output)
    }
}

/// Render `images` into a video with the default decoder and `ffmpeg`, blocking until done.
pub fn render_images(
    settings: RenderSettings,
    images: impl IntoIterator<Item = PathBuf>,
) -> StillreelResult<RenderOutput> {
    ImageAnimator::new(settings, images).render(|_| {})?.wait()
}

#[cfg(test)]
#[path = "../../tests/unit/session/animator.rs"]
mod tests;
