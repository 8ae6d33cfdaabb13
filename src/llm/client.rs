use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::Client;

use crate::config::GeminiConfig;
use crate::error::{InsightError, Result};
use crate::llm::gateway::GenerativeBackend;
use crate::llm::types::*;

/// Gemini `generateContent` backend.
///
/// Holds a single `reqwest::Client`; clone the `GeminiClient` to share it.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn to_wire_parts(parts: &[PromptPart]) -> Vec<Part> {
        parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => Part::Text { text: text.clone() },
                PromptPart::Document(doc) => Part::InlineData {
                    inline_data: Blob {
                        mime_type: doc.mime_type.clone(),
                        data: STANDARD.encode(&doc.bytes),
                    },
                },
            })
            .collect()
    }

    pub(crate) async fn generate_content(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let payload = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: Self::to_wire_parts(&request.parts),
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema.clone(),
            },
        };

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(InsightError::Provider(format!(
                "Gemini API error for '{}' (status {}): {}",
                request.operation, status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        extract_text(request.operation, body)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!("{}: calling {}", request.operation, self.config.model);
        self.generate_content(request).await
    }
}

fn extract_text(operation: &str, body: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(InsightError::Provider(format!(
            "Prompt for '{}' was blocked: {}",
            operation, reason
        )));
    }

    let candidate = body
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| InsightError::Provider(format!("No candidates returned for '{}'", operation)))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let text: String = parts
        .iter()
        .filter(|part| part.get("thought").and_then(|t| t.as_bool()) != Some(true))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(InsightError::Provider(format!(
            "Model returned no text for '{}' (finish reason: {})",
            operation,
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}
