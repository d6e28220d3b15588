use image::imageops::FilterType;
use image::{ImageBuffer, Rgba};

use crate::assets::decode::DecodedImage;
use crate::foundation::core::Canvas;
use crate::foundation::error::{StillreelError, StillreelResult};

/// Encoder input surface: premultiplied RGBA8, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a fully transparent buffer of `size`.
    pub fn allocate(size: Canvas) -> StillreelResult<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(StillreelError::buffer_allocation(format!(
                "cannot allocate a {}x{} pixel buffer",
                size.width, size.height
            )));
        }
        let len = size.rgba8_len().ok_or_else(|| {
            StillreelError::buffer_allocation(format!(
                "pixel buffer size overflows: {}x{}",
                size.width, size.height
            ))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            StillreelError::buffer_allocation(format!(
                "failed to allocate {len} bytes for a {}x{} pixel buffer: {e}",
                size.width, size.height
            ))
        })?;
        data.resize(len, 0);

        Ok(Self {
            width: size.width,
            height: size.height,
            data,
        })
    }

    /// Wrap existing premultiplied RGBA8 bytes.
    pub fn from_raw(size: Canvas, data: Vec<u8>) -> StillreelResult<Self> {
        if size.rgba8_len() != Some(data.len()) {
            return Err(StillreelError::validation(format!(
                "pixel buffer data is {} bytes, expected width*height*4 for {}x{}",
                data.len(),
                size.width,
                size.height
            )));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
        })
    }

    /// Buffer dimensions.
    pub fn size(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Raw premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Premultiplied RGBA8 value at `(x, y)`; `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Placement of a fitted image inside a target surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitRect {
    /// Left edge in target pixels.
    pub x: u32,
    /// Top edge in target pixels.
    pub y: u32,
    /// Scaled width.
    pub width: u32,
    /// Scaled height.
    pub height: u32,
}

/// Aspect-preserving "fit" of `src` into `target`, centered.
///
/// The uniform scale is `min(tw / sw, th / sh)`; the scaled size is rounded and clamped to
/// `1..=target`. Leftover space is split evenly, odd pixels go to the right/bottom.
/// A zero-sized `src` or `target` yields an empty rect at the origin.
pub fn fit_rect(src: Canvas, target: Canvas) -> FitRect {
    if src.width == 0 || src.height == 0 || target.width == 0 || target.height == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    let sx = f64::from(target.width) / f64::from(src.width);
    let sy = f64::from(target.height) / f64::from(src.height);
    let scale = sx.min(sy);

    let width = ((f64::from(src.width) * scale).round() as u32).clamp(1, target.width);
    let height = ((f64::from(src.height) * scale).round() as u32).clamp(1, target.height);

    FitRect {
        x: (target.width - width) / 2,
        y: (target.height - height) / 2,
        width,
        height,
    }
}

/// Convert a decoded image into a freshly allocated buffer of `target` size.
pub fn convert(image: &DecodedImage, target: Canvas) -> StillreelResult<PixelBuffer> {
    let mut buf = PixelBuffer::allocate(target)?;
    convert_into(image, &mut buf)?;
    Ok(buf)
}

/// Fit `image` into `buf`, clearing everything outside the image to transparent.
pub fn convert_into(image: &DecodedImage, buf: &mut PixelBuffer) -> StillreelResult<FitRect> {
    let src_size = Canvas::new(image.width, image.height)?;
    if src_size.rgba8_len() != Some(image.rgba8_premul.len()) {
        return Err(StillreelError::validation(
            "decoded image data size mismatch with width*height*4",
        ));
    }

    let rect = fit_rect(src_size, buf.size());
    buf.clear();

    if rect.width == image.width && rect.height == image.height {
        blit(buf, rect, image.rgba8_premul.as_slice());
        return Ok(rect);
    }

    let src = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(
        image.width,
        image.height,
        image.rgba8_premul.as_slice(),
    )
    .ok_or_else(|| StillreelError::validation("decoded image buffer is too small"))?;
    let mut scaled = image::imageops::resize(&src, rect.width, rect.height, FilterType::CatmullRom);

    // Catmull-Rom overshoots; keep the result a valid premultiplied color.
    for px in scaled.pixels_mut() {
        let a = px.0[3];
        px.0[0] = px.0[0].min(a);
        px.0[1] = px.0[1].min(a);
        px.0[2] = px.0[2].min(a);
    }

    blit(buf, rect, scaled.as_raw());
    Ok(rect)
}

fn blit(dst: &mut PixelBuffer, rect: FitRect, src: &[u8]) {
    let stride = dst.stride();
    let row_len = rect.width as usize * 4;
    for (row, src_row) in src.chunks_exact(row_len).take(rect.height as usize).enumerate() {
        let off = (rect.y as usize + row) * stride + rect.x as usize * 4;
        dst.data[off..off + row_len].copy_from_slice(src_row);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pixel_buffer.rs"]
mod tests;
