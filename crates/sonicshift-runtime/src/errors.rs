//! Runtime error types.

use sonicshift_core::AudioFormat;
use thiserror::Error;

/// Failure to synthesize a converted result.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The transcoder could not produce output for the requested format.
    #[error("failed to encode {format}: {message}")]
    Encode {
        /// Requested output format.
        format: AudioFormat,
        /// Error description.
        message: String,
    },
}

/// Failure while exporting completed files.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Building the combined archive failed.
    #[error("archive error: {0}")]
    Archive(String),
    /// Handing the download to its destination failed.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}
