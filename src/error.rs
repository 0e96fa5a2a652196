use miette::Diagnostic;
use thiserror::Error;

/// Main error type for depthframe operations
#[derive(Error, Diagnostic, Debug)]
pub enum FrameError {
    #[error("IO error: {0}")]
    #[diagnostic(code(depthframe::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(depthframe::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Shape mismatch: expected {expected} pixel values, got {actual}")]
    #[diagnostic(code(depthframe::shape_mismatch))]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Invalid raster shape: {message}")]
    #[diagnostic(code(depthframe::invalid_shape))]
    InvalidShape { message: String },

    #[error("Invalid raster type: expected 8-bit grayscale, got {found}")]
    #[diagnostic(code(depthframe::invalid_dtype))]
    InvalidDtype { found: String },

    #[error("Invalid colour stops: {message}")]
    #[diagnostic(code(depthframe::colour_stops))]
    InvalidColorStops {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("PNG encoding failed: {message}")]
    #[diagnostic(code(depthframe::encode))]
    Encode { message: String },

    #[error("Cache key error: {message}")]
    #[diagnostic(code(depthframe::cache_key))]
    CacheKey { message: String },

    #[error("Invalid query: {message}")]
    #[diagnostic(code(depthframe::query))]
    InvalidQuery { message: String },

    #[error("Parse error: {message}")]
    #[diagnostic(code(depthframe::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Store error: {message}")]
    #[diagnostic(code(depthframe::store))]
    Store { message: String },

    #[error("Background task failed: {message}")]
    #[diagnostic(code(depthframe::task))]
    Task { message: String },
}

impl FrameError {
    /// Whether the failure only concerns a single input row.
    ///
    /// The ingest driver skips such rows and keeps going; anything else aborts
    /// the batch.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            FrameError::ShapeMismatch { .. }
                | FrameError::InvalidShape { .. }
                | FrameError::InvalidDtype { .. }
                | FrameError::Encode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
