//! Orchestration: turning an ordered list of images into a finished video.

/// Top-level animator and the blocking `render_images` helper.
pub mod animator;
/// Frame source draining the image list into an encoder session.
pub mod sequencer;
