//! # sonicshift-describe
//!
//! One-sentence AI descriptions of audio payloads.
//!
//! The [`Describer`] trait is the seam the conversion driver calls while a
//! file is converting. It never fails: every error is logged and mapped to a
//! fixed fallback sentence, so a description can never turn into a
//! conversion failure.
//!
//! - [`GeminiDescriber`] sends the bytes to the Gemini `generateContent` API
//! - [`StaticDescriber`] answers with a fixed sentence (disabled service, tests)

#![deny(unsafe_code)]

pub mod errors;
pub mod gemini;
mod types;

use async_trait::async_trait;
use bytes::Bytes;

pub use errors::DescribeError;
pub use gemini::GeminiDescriber;

/// Produces a short text description of an audio payload.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe `data`, declared as `mime_type`.
    ///
    /// Always resolves to a string; failures resolve to a fallback sentence.
    async fn describe(&self, data: Bytes, mime_type: &str) -> String;
}

/// Describer that always answers with the same sentence.
#[derive(Clone, Debug)]
pub struct StaticDescriber {
    text: String,
}

impl StaticDescriber {
    /// Create a describer answering with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Describer for StaticDescriber {
    async fn describe(&self, _data: Bytes, _mime_type: &str) -> String {
        self.text.clone()
    }
}
