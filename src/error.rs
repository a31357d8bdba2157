use std::path::PathBuf;

/// Why an input image could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    /// The path does not point at an existing file
    #[error("file not found")]
    NotFound,

    /// The file decoded to an image with zero width or height
    #[error("image has no pixels")]
    Empty,

    /// The codec rejected the file
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Errors returned by the measurement engine
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    /// Input missing or not a decodable image
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        /// Input path that failed
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: DecodeFailure,
    },

    /// Threshold outside the 8-bit intensity range
    #[error("threshold {0} is outside 0..=255")]
    InvalidThreshold(i64),

    /// Filesystem failure while preparing or publishing output
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// The annotated image could not be encoded or written
    #[error("cannot write {}: {source}", path.display())]
    Encode {
        /// Output path being written
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: image::ImageError,
    },

    /// Engine configuration or caller-supplied name is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse error classes callers map onto their own surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input file missing or not an image
    Decode,
    /// Threshold or configuration rejected up front
    InvalidInput,
    /// Output could not be written
    Io,
}

impl MeasureError {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: impl Into<DecodeFailure>) -> Self {
        Self::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode { .. } => ErrorKind::Decode,
            Self::InvalidThreshold(_) | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
            Self::Io { .. } | Self::Encode { .. } => ErrorKind::Io,
        }
    }
}

/// Result alias for measurement operations
pub type Result<T> = std::result::Result<T, MeasureError>;
