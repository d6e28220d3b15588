use std::path::PathBuf;

/// Crate-wide result alias.
pub type StillreelResult<T> = Result<T, StillreelError>;

/// Errors produced while preparing or running a render.
///
/// Every variant is terminal for the render it came from. Backpressure is not an error and never
/// shows up here.
#[derive(thiserror::Error, Debug)]
pub enum StillreelError {
    /// Invalid settings or a call made in the wrong session state.
    #[error("validation error: {0}")]
    Validation(String),

    /// No writable output directory could be resolved.
    #[error("path resolution error: {0}")]
    PathResolution(String),

    /// A file already exists where the session wants to write.
    #[error("output file '{}' already exists", .0.display())]
    OutputExists(PathBuf),

    /// The encoder cannot produce the requested codec/resolution/bitrate combination.
    #[error("unsupported settings: {0}")]
    Unsupported(String),

    /// A pixel buffer could not be allocated for the requested size.
    #[error("buffer allocation error: {0}")]
    BufferAllocation(String),

    /// An image could not be read or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The encoder backend failed while writing or finalizing output.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// Any other error, usually IO with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StillreelError {
    /// Build a [`StillreelError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StillreelError::PathResolution`].
    pub fn path_resolution(msg: impl Into<String>) -> Self {
        Self::PathResolution(msg.into())
    }

    /// Build a [`StillreelError::Unsupported`].
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`StillreelError::BufferAllocation`].
    pub fn buffer_allocation(msg: impl Into<String>) -> Self {
        Self::BufferAllocation(msg.into())
    }

    /// Build a [`StillreelError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`StillreelError::Encoder`].
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
