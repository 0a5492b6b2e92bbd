//! Gemini REST client.
//!
//! One request per model attempt, JSON response mode enabled so the model is
//! pushed toward returning a single parseable object. No streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ModelClient, ModelError};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Fixed sampling temperature for every attempt.
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, model, self.config.api_key
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateResponse {
    /// Primary extraction: the concatenated text of every part of the first
    /// candidate, mirroring the provider's own text accessor.
    fn text(&self) -> Option<String> {
        let parts = self
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?;
        let joined: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    /// Fallback extraction: the first content segment alone.
    fn first_part_text(&self) -> Option<String> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?
            .first()?
            .text
            .clone()
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(self.build_url(model))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Response(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| ModelError::Serialization(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ModelError::Response(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        parsed
            .text()
            .or_else(|| parsed.first_part_text())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| ModelError::Response("no extractable text in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_includes_model_and_key() {
        let client = GeminiClient::new(GeminiConfig::new("test-key".to_string())).unwrap();
        let url = client.build_url("gemini-pro");
        assert!(url.contains("models/gemini-pro:generateContent"));
        assert!(url.contains("key=test-key"));
    }

    #[test]
    fn primary_extraction_joins_all_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"reply\""},{"text":":\"ok\"}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().unwrap(), "{\"reply\":\"ok\"}");
    }

    #[test]
    fn extraction_fails_cleanly_without_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
        assert!(parsed.first_part_text().is_none());
    }

    #[test]
    fn fallback_extraction_takes_first_segment() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.first_part_text().unwrap(), "first");
    }
}
