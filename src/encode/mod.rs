//! Encoding: backends that turn pixel buffers into a video file, and the session that feeds them.
//!
//! Frames flow from the caller through [`session::EncoderSession`] into a bounded queue drained by
//! a dedicated writer thread that owns the [`backend::EncoderBackend`].

/// Backend trait, encoder configuration and the in-memory backend.
pub mod backend;
/// `ffmpeg`-based backend (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Encoder session state machine, write queue and readiness signalling.
pub mod session;
