use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assets::decode::DecodedImage;
use crate::foundation::core::{Canvas, MediaTime};
use crate::foundation::error::{StillreelError, StillreelResult};

/// Application name used to locate the platform cache directory.
pub const APP_NAME: &str = "stillreel";

/// Default average bitrate, in bits per second.
pub const DEFAULT_BITRATE: u32 = 12_000_000;

/// Video codec of the output stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC, high profile.
    #[default]
    H264,
    /// H.265 / HEVC.
    Hevc,
}

/// Per-run render configuration.
///
/// `width`/`height` are usually taken from the first image (see
/// [`ImageAnimator::render`](crate::ImageAnimator::render)).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second, in `1..=TIMESCALE`.
    pub fps: u32,
    /// Output video codec.
    pub codec: VideoCodec,
    /// Output file stem.
    pub video_filename: String,
    /// Output file extension, without the dot.
    pub video_filename_ext: String,
    /// Average bitrate in bits per second.
    pub bitrate: u32,
    /// Directory for the output file. `None` uses the platform cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            fps: 60,
            codec: VideoCodec::H264,
            video_filename: "ImageToVideo".to_string(),
            video_filename_ext: "mp4".to_string(),
            bitrate: DEFAULT_BITRATE,
            cache_dir: None,
        }
    }
}

impl RenderSettings {
    /// Default settings with an explicit output size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the output directory instead of the platform cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the output file stem and extension.
    pub fn with_filename(mut self, stem: impl Into<String>, ext: impl Into<String>) -> Self {
        self.video_filename = stem.into();
        self.video_filename_ext = ext.into();
        self
    }

    /// Adopt the size of `image`, rounded down to even dimensions.
    pub fn with_size_of(mut self, image: &DecodedImage) -> Self {
        let even = Canvas {
            width: image.width,
            height: image.height,
        }
        .even_floor();
        self.width = even.width;
        self.height = even.height;
        self
    }

    /// Output size.
    pub fn size(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Duration of one frame in `TIMESCALE` ticks.
    pub fn frame_duration(&self) -> StillreelResult<MediaTime> {
        MediaTime::frame_duration(self.fps)
    }

    /// Check the settings can start an encode session.
    pub fn validate(&self) -> StillreelResult<()> {
        Canvas::new(self.width, self.height)?;
        self.frame_duration()?;
        if self.bitrate == 0 {
            return Err(StillreelError::validation("bitrate must be non-zero"));
        }
        if self.video_filename.is_empty() {
            return Err(StillreelError::validation("video_filename must not be empty"));
        }
        Ok(())
    }

    /// Full output path: `<cache dir>/<video_filename>.<video_filename_ext>`.
    ///
    /// The directory is created when missing. Failure here is fatal for the run.
    pub fn output_path(&self) -> StillreelResult<PathBuf> {
        let dir = self.resolve_cache_dir()?;
        let file_name = if self.video_filename_ext.is_empty() {
            self.video_filename.clone()
        } else {
            format!("{}.{}", self.video_filename, self.video_filename_ext)
        };
        Ok(dir.join(file_name))
    }

    fn resolve_cache_dir(&self) -> StillreelResult<PathBuf> {
        let dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => platform_dirs::AppDirs::new(Some(APP_NAME), false)
                .map(|dirs| dirs.cache_dir)
                .ok_or_else(|| {
                    StillreelError::path_resolution("no platform cache directory available")
                })?,
        };

        std::fs::create_dir_all(&dir).map_err(|e| {
            StillreelError::path_resolution(format!(
                "failed to create cache directory '{}': {e}",
                dir.display()
            ))
        })?;

        let meta = std::fs::metadata(&dir).map_err(|e| {
            StillreelError::path_resolution(format!(
                "failed to stat cache directory '{}': {e}",
                dir.display()
            ))
        })?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(StillreelError::path_resolution(format!(
                "cache directory '{}' is not writable",
                dir.display()
            )));
        }

        Ok(dir)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/settings.rs"]
mod tests;
