//! Frame preparation: output settings and the pixel buffers frames are rendered into.

/// Reusable pool of session-sized pixel buffers.
pub mod buffer_pool;
/// Pixel buffers and fit-scaling of decoded images into them.
pub mod pixel_buffer;
/// Output configuration and path resolution.
pub mod settings;
