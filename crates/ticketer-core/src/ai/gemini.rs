//! Gemini backend
//!
//! Talks to the `generateContent` REST endpoint. The receipt image is sent
//! inline as base64 next to the text prompt. Store identification uses the
//! light model and free text; extraction uses the full model with a JSON
//! response schema.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::prompts::PromptLibrary;

use super::parsing::{parse_receipt_response, parse_store_name};
use super::types::ExtractedReceipt;
use super::ExtractionBackend;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini extraction backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    api_key: String,
    identify_model: String,
    extract_model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Result<String> {
        let candidate = self.candidates.first().ok_or_else(|| {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .unwrap_or("no candidates");
            Error::Extraction(format!("Gemini returned no answer ({})", reason))
        })?;

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(Error::Extraction(format!(
                "Gemini returned an empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Response schema for receipt extraction
fn receipt_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "store_name": { "type": "STRING", "nullable": true },
            "bought_date": { "type": "STRING", "nullable": true },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "quantity": { "type": "NUMBER" },
                        "price": { "type": "NUMBER" }
                    },
                    "propertyOrdering": ["name", "quantity", "price"]
                }
            },
            "discounts": { "type": "NUMBER", "nullable": true }
        },
        "propertyOrdering": ["store_name", "bought_date", "items", "discounts"]
    })
}

impl GeminiBackend {
    /// Create a backend from configuration; fails without an API key
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        Self::with_prompts(config, PromptLibrary::new())
    }

    /// Create a backend with an explicit prompt library
    pub fn with_prompts(config: &GeminiConfig, prompts: PromptLibrary) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::InvalidData("GEMINI_API_KEY is not set".into()))?;

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            identify_model: config.identify_model.clone(),
            extract_model: config.extract_model.clone(),
            prompts: Arc::new(RwLock::new(prompts)),
        })
    }

    fn render<F>(&self, render: F) -> Result<String>
    where
        F: FnOnce(&mut PromptLibrary) -> Result<String>,
    {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        render(&mut prompts)
    }

    async fn generate(
        &self,
        model: &str,
        prompt: String,
        image: &[u8],
        mime_type: &str,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(prompt),
                        ..Default::default()
                    },
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        }),
                        ..Default::default()
                    },
                ],
            }],
            generation_config,
        };

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "Gemini API returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        body.text()
    }
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    async fn identify_store(&self, image: &[u8], mime_type: &str) -> Result<String> {
        info!("Identifying store from receipt");

        let prompt = self.render(|p| p.identify_store_prompt())?;
        let text = self
            .generate(&self.identify_model, prompt, image, mime_type, None)
            .await?;

        let store = parse_store_name(&text);
        info!(store = %store, "Store identified");
        Ok(store)
    }

    async fn extract_receipt(
        &self,
        image: &[u8],
        mime_type: &str,
        store_name: &str,
    ) -> Result<ExtractedReceipt> {
        let prompt = self.render(|p| p.extraction_prompt(store_name))?;

        info!(store = %store_name, "Sending receipt to model for extraction");
        let config = GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: receipt_schema(),
        };
        let text = self
            .generate(&self.extract_model, prompt, image, mime_type, Some(config))
            .await?;
        debug!(response = %text, "Raw model response");

        let receipt = parse_receipt_response(&text, store_name)?;
        info!(
            store = %receipt.store_name,
            items = receipt.items.len(),
            discounts = ?receipt.discounts,
            "Parsed receipt"
        );
        Ok(receipt)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!(
                "{}/v1beta/models/{}",
                self.base_url, self.extract_model
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.extract_model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockGeminiServer;
    use std::time::Duration;

    fn config_for(server: &MockGeminiServer) -> GeminiConfig {
        GeminiConfig {
            api_key: Some(crate::test_utils::TEST_API_KEY.to_string()),
            base_url: server.url(),
            timeout: Duration::from_secs(5),
            ..GeminiConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let result = GeminiBackend::new(&GeminiConfig::default());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some("hello".into()),
                        ..Default::default()
                    },
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: "image/png".into(),
                            data: "AAAA".into(),
                        }),
                        ..Default::default()
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: receipt_schema(),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_response_text_errors() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = blocked.text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let empty: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert!(empty.text().unwrap_err().to_string().contains("MAX_TOKENS"));
    }

    #[tokio::test]
    async fn test_identify_and_extract_against_mock_server() {
        let server = MockGeminiServer::start().await;
        let backend =
            GeminiBackend::with_prompts(&config_for(&server), PromptLibrary::embedded_only())
                .unwrap();

        assert!(backend.health_check().await);

        let store = backend.identify_store(b"fake-image", "image/jpeg").await.unwrap();
        assert_eq!(store, "ALDI");

        let receipt = backend
            .extract_receipt(b"fake-image", "image/jpeg", &store)
            .await
            .unwrap();
        assert_eq!(receipt.store_name, "ALDI");
        assert_eq!(receipt.bought_date.as_deref(), Some("2024-01-15"));
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.discounts, Some(0.5));
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_extraction_error() {
        let server = MockGeminiServer::start().await;
        let mut config = config_for(&server);
        config.api_key = Some("wrong".into());
        let backend =
            GeminiBackend::with_prompts(&config, PromptLibrary::embedded_only()).unwrap();

        assert!(!backend.health_check().await);
        let err = backend
            .identify_store(b"fake-image", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let config = GeminiConfig {
            api_key: Some("key".into()),
            base_url: "http://127.0.0.1:1".into(),
            timeout: Duration::from_secs(2),
            ..GeminiConfig::default()
        };
        let backend = GeminiBackend::with_prompts(&config, PromptLibrary::embedded_only()).unwrap();
        let err = backend
            .identify_store(b"fake-image", "image/jpeg")
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }
}
