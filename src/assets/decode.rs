use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{StillreelError, StillreelResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// A decoded still image as premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Source of decoded images for the frame sequencer.
pub trait ImageDecoder: Send {
    /// Decode the image at `path`. Fails when the path is unreadable or the format unsupported.
    fn decode(&self, path: &Path) -> StillreelResult<DecodedImage>;
}

/// Decoder reading files from disk and decoding them with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn decode(&self, path: &Path) -> StillreelResult<DecodedImage> {
        let bytes = std::fs::read(path).map_err(|e| {
            StillreelError::decode(format!("failed to read '{}': {e}", path.display()))
        })?;
        decode_image(&bytes)
            .map_err(|e| StillreelError::decode(format!("'{}': {e}", path.display())))
    }
}

/// Decode an in-memory encoded image (PNG, JPEG, ...) to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> StillreelResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StillreelError::decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(StillreelError::decode("image has zero width or height"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
