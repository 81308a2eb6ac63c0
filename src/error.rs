//! Error types shared by every stage of the normal map pipeline.
//!
//! Structural problems (empty input, mismatched field sizes, bad parameters)
//! abort the current pass and surface here. The zero-length normal case is
//! not an error: it resolves to a flat normal inside the synthesis stage.

/// Errors raised by the normal map pipeline.
#[derive(thiserror::Error, Debug)]
pub enum NormalMapError {
    /// The source image is missing, unreadable or has no pixels.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two fields that must share dimensions do not.
    #[error("Dimension mismatch: expected {expected:?} (height, width), found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A buffer has the wrong number of channels.
    #[error("Channel mismatch: expected {expected} channels, found {found}")]
    ChannelMismatch { expected: usize, found: usize },

    /// A parameter cannot produce a well-defined kernel or normal.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A flat buffer does not match the declared image shape.
    #[error("Invalid shape")]
    Shape(#[from] ndarray::ShapeError),

    /// The background recompute thread is no longer running.
    #[error("Recompute worker has stopped")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter file could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NormalMapError>;

/// Fail with [`NormalMapError::DimensionMismatch`] unless both shapes agree.
pub(crate) fn ensure_same_dim(expected: (usize, usize), found: (usize, usize)) -> Result<()> {
    if expected != found {
        return Err(NormalMapError::DimensionMismatch { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = ensure_same_dim((4, 5), (4, 6)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(4, 5)"));
        assert!(msg.contains("(4, 6)"));
    }

    #[test]
    fn test_same_dim_ok() {
        assert!(ensure_same_dim((3, 3), (3, 3)).is_ok());
    }
}
