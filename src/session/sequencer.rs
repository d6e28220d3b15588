use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assets::decode::{DecodedImage, ImageDecoder};
use crate::encode::session::{EncoderSession, Feed, FrameSource};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{StillreelError, StillreelResult};
use crate::render::pixel_buffer::convert_into;

/// What to do with an image that fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeFailurePolicy {
    /// Drop the image, log it and continue with the next one.
    #[default]
    Skip,
    /// Stop the render with a decode error.
    Abort,
}

/// An image dropped because it could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedImage {
    /// Path as given in the image list.
    pub path: PathBuf,
    /// Decoder error message.
    pub reason: String,
}

/// Outcome of draining the image list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Frames accepted by the session.
    pub frames_written: u64,
    /// Images dropped under [`DecodeFailurePolicy::Skip`], in list order.
    pub skipped: Vec<SkippedImage>,
}

/// Feeds one frame per image, in list order, into an [`EncoderSession`].
///
/// Frame `i` is presented at `i * frame_duration`. Skipped images do not consume a frame index,
/// so timestamps stay contiguous.
pub struct FrameSequencer {
    images: VecDeque<PathBuf>,
    frame_index: FrameIndex,
    decoder: Box<dyn ImageDecoder>,
    policy: DecodeFailurePolicy,
    skipped: Vec<SkippedImage>,
    // Decoded copy of the front image, kept across backpressure.
    pending: Option<DecodedImage>,
}

impl FrameSequencer {
    /// Sequence `images` with `decoder`, skipping undecodable images.
    pub fn new(images: impl IntoIterator<Item = PathBuf>, decoder: Box<dyn ImageDecoder>) -> Self {
        Self {
            images: images.into_iter().collect(),
            frame_index: FrameIndex::default(),
            decoder,
            policy: DecodeFailurePolicy::default(),
            skipped: Vec::new(),
            pending: None,
        }
    }

    /// Set the decode failure policy.
    pub fn with_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reuse an already decoded copy of the front image instead of decoding it again.
    pub(crate) fn with_decoded_front(mut self, image: DecodedImage) -> Self {
        if !self.images.is_empty() {
            self.pending = Some(image);
        }
        self
    }

    /// Images not yet appended.
    pub fn remaining(&self) -> usize {
        self.images.len()
    }

    /// Index of the next frame to append.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    /// Progress so far.
    pub fn report(&self) -> SequenceReport {
        SequenceReport {
            frames_written: self.frame_index.0,
            skipped: self.skipped.clone(),
        }
    }

    /// Consume the sequencer into its report.
    pub fn into_report(self) -> SequenceReport {
        SequenceReport {
            frames_written: self.frame_index.0,
            skipped: self.skipped,
        }
    }

    fn decode_front(&mut self) -> StillreelResult<Option<DecodedImage>> {
        while let Some(path) = self.images.front() {
            if let Some(image) = self.pending.take() {
                return Ok(Some(image));
            }
            match self.decoder.decode(path) {
                Ok(image) => return Ok(Some(image)),
                Err(e) => match self.policy {
                    DecodeFailurePolicy::Skip => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping image");
                        let reason = e.to_string();
                        if let Some(path) = self.images.pop_front() {
                            self.skipped.push(SkippedImage { path, reason });
                        }
                    }
                    DecodeFailurePolicy::Abort => {
                        return Err(StillreelError::decode(format!(
                            "frame {}: {e}",
                            self.frame_index.0
                        )));
                    }
                },
            }
        }
        Ok(None)
    }
}

impl FrameSource for FrameSequencer {
    #[tracing::instrument(skip_all, fields(next_frame = self.frame_index.0, remaining = self.images.len()))]
    fn append_pixel_buffers(&mut self, session: &mut EncoderSession) -> StillreelResult<Feed> {
        loop {
            if self.images.is_empty() {
                return Ok(Feed::Finished);
            }
            if !session.is_ready_for_more_data() {
                return Ok(Feed::Pending);
            }

            let Some(image) = self.decode_front()? else {
                return Ok(Feed::Finished);
            };

            let pool = session
                .pixel_buffer_pool()
                .ok_or_else(|| StillreelError::validation("session has no pixel buffer pool"))?;
            let mut buffer = pool.acquire()?;
            if let Err(e) = convert_into(&image, &mut buffer) {
                pool.release(buffer);
                return Err(e);
            }

            let pts = session.frame_duration().at_frame(self.frame_index);
            if !session.append(buffer, pts)? {
                self.pending = Some(image);
                return Ok(Feed::Pending);
            }

            self.images.pop_front();
            self.frame_index = self.frame_index.next();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/sequencer.rs"]
mod tests;
