use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Gemini REST base URL (API-key auth).
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for short audio descriptions.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Instruction sent alongside the audio payload.
pub const DEFAULT_DESCRIBE_PROMPT: &str = "Describe this audio content in exactly one short, punchy sentence. Focus on the main sound, mood, or speech content.";

/// Text used when the description request fails for any reason.
pub const DEFAULT_DESCRIBE_FALLBACK: &str = "AI insight unavailable for this format.";

/// Text used when the service answers without any text.
pub const DEFAULT_EMPTY_RESPONSE: &str = "Audio processed successfully.";

/// AI description service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescribeSettings {
    /// Whether to call the service at all.
    pub enabled: bool,
    /// Gemini model id.
    pub model: String,
    /// REST base URL (overridable for proxies and tests).
    pub base_url: String,
    /// API key. Usually supplied through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Instruction prompt.
    pub prompt: String,
    /// Text used on failure.
    pub fallback: String,
    /// Text used when the response carries no text.
    pub empty_response: String,
}

impl Default for DescribeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key: None,
            timeout_ms: 30_000,
            prompt: DEFAULT_DESCRIBE_PROMPT.to_string(),
            fallback: DEFAULT_DESCRIBE_FALLBACK.to_string(),
            empty_response: DEFAULT_EMPTY_RESPONSE.to_string(),
        }
    }
}

impl DescribeSettings {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
