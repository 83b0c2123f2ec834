//! Error handling for Voxline
//!
//! The taxonomy mirrors the batch tool's fail-soft policy: individual
//! effect stages and clips are recoverable and get skipped with a logged
//! warning, empty batches abort early with an explanatory error, and only
//! a structurally broken configuration is treated as fatal.

use thiserror::Error;

/// Result type alias for Voxline operations
pub type Result<T> = std::result::Result<T, VoxlineError>;

/// Main error type for Voxline operations
#[derive(Error, Debug)]
pub enum VoxlineError {
    // File errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Processing errors (recoverable per stage)
    #[error("Effect stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("Invalid parameter {param}={value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Loudness matching errors (recoverable per clip)
    #[error("Clip '{clip}' has zero or near-zero RMS, cannot solve gain")]
    DegenerateRms { clip: String },

    #[error("No reference clips match base name '{base}'")]
    NoReferenceMatch { base: String },

    // Batch errors
    #[error("No files to process in '{path}'")]
    EmptyBatch { path: String },

    #[error("Operation cancelled after {completed} clips")]
    Cancelled { completed: usize },

    // Library errors
    #[error("File name '{name}' has no numeric ordinal suffix")]
    MalformedName { name: String },

    // Fatal configuration errors
    #[error("Configuration invalid: {reason}")]
    ConfigInvalid { reason: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VoxlineError {
    /// Check if this error is recoverable within a batch run.
    ///
    /// Recoverable errors are logged and the offending stage or clip is
    /// skipped; the batch continues.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VoxlineError::StageFailed { .. } => true,
            VoxlineError::InvalidParameter { .. } => true,
            VoxlineError::DegenerateRms { .. } => true,
            VoxlineError::NoReferenceMatch { .. } => true,
            VoxlineError::InvalidAudio { .. } => true,
            VoxlineError::FileNotFound { .. } => true,
            VoxlineError::MalformedName { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_is_recoverable() {
        let err = VoxlineError::StageFailed {
            stage: "bandpass".to_string(),
            reason: "cutoff above Nyquist".to_string(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = VoxlineError::ConfigInvalid {
            reason: "missing section".to_string(),
        };
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_degenerate_rms_names_clip() {
        let err = VoxlineError::DegenerateRms {
            clip: "judge_3".to_string(),
        };
        assert!(err.to_string().contains("judge_3"));
        assert!(err.is_recoverable());
    }
}
