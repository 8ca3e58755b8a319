//! OpenAI Images API を使った ImageGenerator 実装
//!
//! `POST {base_url}/images/generations` に `response_format: "b64_json"` で依頼し、
//! 返ってきた base64 をデコードして画像のバイト列を返す。

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::domain::{GenerationError, ImageGenerator, Prompt};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// OpenAI Images API クライアント
#[derive(Debug, Clone)]
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    size: String,
    base_url: String,
}

impl OpenAiImageGenerator {
    pub fn new(api_key: String, model: String, size: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            size,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// API のベース URL を差し替える（互換サーバーやテスト用）
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<Vec<u8>, GenerationError> {
        let request = GenerationRequest {
            model: &self.model,
            prompt: prompt.as_str(),
            n: 1,
            size: &self.size,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        tracing::debug!("OpenAI image generation responded with {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::RequestFailed(format!(
                "API returned {}: {}",
                status, message
            )));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let encoded = body
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .ok_or_else(|| GenerationError::InvalidResponse("no image in response".to_string()))?;

        STANDARD
            .decode(encoded)
            .map_err(|e| GenerationError::InvalidResponse(format!("invalid base64: {}", e)))
    }
}
