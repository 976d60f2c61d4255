//! Gemini-backed [`Describer`].
//!
//! Sends one non-streaming `generateContent` request per file with the audio
//! inlined as base64 and a fixed instruction prompt. Thinking is disabled
//! (`thinkingBudget: 0`) since the answer is a single sentence.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info, instrument};

use sonicshift_settings::DescribeSettings;

use crate::Describer;
use crate::errors::DescribeError;
use crate::types::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData,
    RequestContent, RequestPart, ThinkingConfig,
};

/// Header carrying the API key. Kept out of the URL so transport errors
/// cannot echo it.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Declared type used when the file carries none.
const FALLBACK_MIME_TYPE: &str = "audio/mpeg";

/// Gemini description client.
pub struct GeminiDescriber {
    settings: DescribeSettings,
    client: reqwest::Client,
}

impl GeminiDescriber {
    /// Create a describer with its own HTTP client.
    #[must_use]
    pub fn new(settings: DescribeSettings) -> Self {
        Self::with_client(settings, reqwest::Client::new())
    }

    /// Create a describer with a shared HTTP client.
    #[must_use]
    pub fn with_client(settings: DescribeSettings, client: reqwest::Client) -> Self {
        info!(
            model = %settings.model,
            has_api_key = settings.api_key.is_some(),
            "Gemini describer initialized"
        );
        Self { settings, client }
    }

    fn endpoint(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        format!("{base}/models/{}:generateContent", self.settings.model)
    }

    fn build_request(&self, data: &[u8], mime_type: &str) -> GenerateContentRequest {
        let mime_type = if mime_type.is_empty() {
            FALLBACK_MIME_TYPE
        } else {
            mime_type
        };
        GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(data),
                        },
                    },
                    RequestPart::Text {
                        text: self.settings.prompt.clone(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        }
    }

    /// Perform the request and return the raw response text (possibly empty).
    #[instrument(skip_all, fields(model = %self.settings.model, bytes = data.len()))]
    pub async fn request_description(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String, DescribeError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(DescribeError::MissingApiKey)?;

        let body = self.build_request(data, mime_type);
        let response = self
            .client
            .post(self.endpoint())
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .timeout(self.settings.timeout())
            .json(&body)
            .send()
            .await
            .map_err(DescribeError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(DescribeError::from_transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(DescribeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        let out = parsed.text();
        debug!(chars = out.len(), "description received");
        Ok(out)
    }
}

#[async_trait]
impl Describer for GeminiDescriber {
    async fn describe(&self, data: Bytes, mime_type: &str) -> String {
        match self.request_description(&data, mime_type).await {
            Ok(text) if text.trim().is_empty() => self.settings.empty_response.clone(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Gemini analysis failed");
                self.settings.fallback.clone()
            }
        }
    }
}
