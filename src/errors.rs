/*!
 * Error types for the subsplit engine.
 *
 * This module contains custom error types for the different stages of the
 * segmentation pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to an LLM provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors produced by a semantic split oracle.
///
/// These never escape the hybrid segmenter: every variant triggers the
/// deterministic force-split fallback.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The call did not answer within its timeout
    #[error("Oracle timed out after {0} ms")]
    Timeout(u64),

    /// The underlying provider failed
    #[error("Oracle provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The answer could not be interpreted as a split
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    /// The suggestion scored below the acceptance threshold
    #[error("Split rejected: score {score:.2} below threshold {threshold:.2}")]
    Rejected {
        /// Score reported with the suggestion
        score: f32,
        /// Configured acceptance threshold
        threshold: f32,
    },

    /// No oracle is configured
    #[error("No semantic oracle available")]
    Unavailable,
}

/// Errors that can occur while turning segments into timed subtitles
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    /// No transcript word could be matched to the segment
    #[error("Alignment failed for segment {index}: {reason}")]
    AlignmentFailure {
        /// Index of the segment that could not be aligned
        index: usize,
        /// Human readable cause
        reason: String,
    },

    /// Inputs violate the pipeline preconditions; fatal for the run
    #[error("Malformed input{}: {reason}", index.map(|i| format!(" at segment {}", i)).unwrap_or_default())]
    MalformedInput {
        /// Offending segment, when the problem is tied to one
        index: Option<usize>,
        /// Human readable cause
        reason: String,
    },
}

impl SegmentError {
    /// Shorthand for an input error not tied to a segment
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            index: None,
            reason: reason.into(),
        }
    }

    /// Shorthand for an input error tied to a segment index
    pub fn malformed_at(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            index: Some(index),
            reason: reason.into(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the segmentation pipeline
    #[error("Segment error: {0}")]
    Segment(#[from] SegmentError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
