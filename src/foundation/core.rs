use std::cmp::Ordering;

use crate::foundation::error::{StillreelError, StillreelResult};

/// Timestamp units per second used for every presentation time this crate produces.
pub const TIMESCALE: i32 = 1000;

/// 0-based index of a frame that was actually appended to the output.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Index of the frame after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Output dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, rejecting zero-sized dimensions.
    pub fn new(width: u32, height: u32) -> StillreelResult<Self> {
        if width == 0 || height == 0 {
            return Err(StillreelError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Number of bytes an RGBA8 surface of this size occupies, `None` on overflow.
    pub fn rgba8_len(self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }

    /// Largest canvas with even width and height that fits in `self` (never below 2x2).
    ///
    /// yuv420p subsamples chroma 2x2, so encoders reject odd sizes.
    pub fn even_floor(self) -> Self {
        Self {
            width: (self.width & !1).max(2),
            height: (self.height & !1).max(2),
        }
    }
}

/// Rational media timestamp: `value / timescale` seconds.
///
/// Equality and ordering compare the represented instant, so `1/2 == 500/1000`.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaTime {
    /// Tick count.
    pub value: i64,
    /// Ticks per second, always > 0.
    pub timescale: i32,
}

impl MediaTime {
    /// Time origin in the crate timescale.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: TIMESCALE,
    };

    /// Create a timestamp; `timescale` must be positive.
    pub fn new(value: i64, timescale: i32) -> StillreelResult<Self> {
        if timescale <= 0 {
            return Err(StillreelError::validation("MediaTime timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    /// Duration of one frame at `fps` in [`TIMESCALE`] ticks (integer division).
    pub fn frame_duration(fps: u32) -> StillreelResult<Self> {
        if fps == 0 || fps > TIMESCALE as u32 {
            return Err(StillreelError::validation(format!(
                "fps must be in 1..={TIMESCALE}, got {fps}"
            )));
        }
        Ok(Self {
            value: i64::from(TIMESCALE / fps as i32),
            timescale: TIMESCALE,
        })
    }

    /// Scale the tick count by `multiplier`, keeping the timescale.
    pub fn multiply(self, multiplier: u64) -> Self {
        Self {
            value: self.value.saturating_mul(multiplier as i64),
            timescale: self.timescale,
        }
    }

    /// Presentation time of `frame` when every frame lasts `self`.
    pub fn at_frame(self, frame: FrameIndex) -> Self {
        self.multiply(frame.0)
    }

    /// Convert to floating-point seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.value as f64 / f64::from(self.timescale)
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.value) * i128::from(other.timescale);
        let rhs = i128::from(other.value) * i128::from(self.timescale);
        lhs.cmp(&rhs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
