//! Stillreel turns an ordered list of still images into a video, one frame per image.
//!
//! The pipeline is pull-based:
//!
//! - Build an [`ImageAnimator`] from [`RenderSettings`] and image paths
//! - [`ImageAnimator::render`] opens an [`EncoderSession`] and hands a [`FrameSequencer`] to a
//!   media-input thread that appends frames whenever the session is ready
//! - [`RenderJob::wait`] returns the [`RenderOutput`] and runs the completion callback
//!
//! Encoding goes through an [`EncoderBackend`]; [`FfmpegBackend`] writes MP4 through the system
//! `ffmpeg`, [`InMemoryBackend`] keeps frames for inspection.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Image decoding.
pub mod assets;
/// Encoder backends and the encoder session.
pub mod encode;
/// Output settings and pixel buffers.
pub mod render;
/// Frame sequencing and top-level orchestration.
pub mod session;

pub use crate::foundation::core::{Canvas, FrameIndex, MediaTime, TIMESCALE};
pub use crate::foundation::error::{StillreelError, StillreelResult};
pub use crate::foundation::fs::{ensure_parent_dir, remove_file_if_exists};

pub use crate::assets::decode::{DecodedImage, FsImageDecoder, ImageDecoder, decode_image};
pub use crate::encode::backend::{EncoderBackend, EncoderConfig, InMemoryBackend, RecordedFrame};
pub use crate::encode::ffmpeg::{FfmpegBackend, FfmpegBackendOpts};
pub use crate::encode::session::{
    EncodeSummary, EncoderSession, Feed, FrameSource, RenderHandle, SessionState,
};
pub use crate::render::buffer_pool::{PixelBufferPool, PoolStats};
pub use crate::render::pixel_buffer::{FitRect, PixelBuffer, convert, convert_into, fit_rect};
pub use crate::render::settings::{RenderSettings, VideoCodec};
pub use crate::session::animator::{ImageAnimator, RenderJob, RenderOutput, render_images};
pub use crate::session::sequencer::{
    DecodeFailurePolicy, FrameSequencer, SequenceReport, SkippedImage,
};
