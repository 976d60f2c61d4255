//! Result synthesis.
//!
//! The only step a real encoder would replace: everything else in the
//! pipeline is timing and bookkeeping.

use async_trait::async_trait;
use bytes::Bytes;

use sonicshift_core::{AudioFormat, Blob};

use crate::errors::ConvertError;

/// Produces the converted payload for a file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `data` (declared as `mime_type`) into `format`.
    async fn transcode(
        &self,
        data: Bytes,
        mime_type: &str,
        format: AudioFormat,
    ) -> Result<Blob, ConvertError>;
}

/// Re-wraps the original bytes under the target format's media type.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn transcode(
        &self,
        data: Bytes,
        _mime_type: &str,
        format: AudioFormat,
    ) -> Result<Blob, ConvertError> {
        Ok(Blob::new(data, format.mime_type()))
    }
}
