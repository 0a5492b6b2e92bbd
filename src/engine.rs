//! The reconciliation orchestrator.
//!
//! Takes raw user text, runs the model with ordered fallback, then
//! cleans, parses, normalizes, and validates the output. Every failure
//! mode is recovered into a reply-only response with empty mutation
//! lists; nothing here is fatal to the process.

use log::info;
use thiserror::Error;

use crate::llm::gemini::{GeminiClient, GeminiConfig};
use crate::llm::normalize::normalize_response;
use crate::llm::parsing::parse_json_safely;
use crate::llm::prompt::{build_prompt, today_string};
use crate::llm::validate::{validate_response, ValidationError};
use crate::llm::{generate_with_fallback, ModelClient, ModelError, MODEL_FALLBACK_CHAIN};
use crate::models::AiResponse;

// Fixed user-facing replies, matching the product's Japanese surface.
pub const API_KEY_MISSING: &str =
    "申し訳ございません。APIキーが設定されていません。設定を確認してください。";
pub const PARSE_ERROR: &str =
    "申し訳ございません。応答の解析に失敗しました。もう一度お試しください。";
pub const VALIDATION_ERROR: &str =
    "申し訳ございません。応答の形式が正しくありませんでした。もう一度お試しください。";
pub const GENERIC_ERROR: &str =
    "申し訳ございません。エラーが発生しました。もう一度お試しください。";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("all model attempts failed: {0}")]
    AllModelsExhausted(#[from] ModelError),
    #[error("model text was not parseable JSON")]
    MalformedResponse,
    #[error(transparent)]
    SchemaValidation(#[from] ValidationError),
}

/// Every pipeline failure maps to a fixed reply; the exhausted case carries
/// the last underlying error's message for diagnosis.
pub fn fallback_reply(error: &ReconcileError) -> String {
    match error {
        ReconcileError::MissingCredential => API_KEY_MISSING.to_string(),
        ReconcileError::AllModelsExhausted(e) => format!("{}: {}", GENERIC_ERROR, e),
        ReconcileError::MalformedResponse => PARSE_ERROR.to_string(),
        ReconcileError::SchemaValidation(_) => VALIDATION_ERROR.to_string(),
    }
}

/// API key from process configuration. Absence is recoverable, not a crash.
pub fn api_key_from_env() -> Option<String> {
    ["GOOGLE_GENERATIVE_AI_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .filter(|key| !key.trim().is_empty())
}

async fn run_pipeline<C: ModelClient>(
    client: &C,
    input: &str,
) -> Result<AiResponse, ReconcileError> {
    let prompt = build_prompt(input, &today_string());
    let text = generate_with_fallback(client, &MODEL_FALLBACK_CHAIN, &prompt).await?;
    let parsed = parse_json_safely(&text).ok_or(ReconcileError::MalformedResponse)?;
    let normalized = normalize_response(parsed);
    let response = validate_response(&normalized)?;
    info!(
        "reconciled input into {} action(s), {} command(s)",
        response.actions.len(),
        response.commands.len()
    );
    Ok(response)
}

/// Analyze user input with an injected model client. Never errors: failures
/// degrade to a reply-only response.
pub async fn analyze_input<C: ModelClient>(client: &C, input: &str) -> AiResponse {
    match run_pipeline(client, input).await {
        Ok(response) => response,
        Err(e) => AiResponse::reply_only(fallback_reply(&e)),
    }
}

/// Production entry point: credential check, then Gemini with fallback.
pub async fn analyze_with_gemini(input: &str) -> AiResponse {
    let Some(api_key) = api_key_from_env() else {
        return AiResponse::reply_only(fallback_reply(&ReconcileError::MissingCredential));
    };
    let client = match GeminiClient::new(GeminiConfig::new(api_key)) {
        Ok(client) => client,
        Err(e) => {
            return AiResponse::reply_only(fallback_reply(&ReconcileError::AllModelsExhausted(e)))
        }
    };
    analyze_input(&client, input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandKind, ItemKind};
    use async_trait::async_trait;

    struct FixedClient {
        text: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl ModelClient for FixedClient {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, ModelError> {
            match self.text {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(ModelError::Response(msg.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn multiple_items_become_separate_task_actions() {
        let client = FixedClient {
            text: Ok(r#"{
                "reply": "了解です。2つのタスクを登録しました。",
                "actions": [
                    { "type": "TASK", "title": "牛乳を買う", "tags": ["買い物"], "priority": "MEDIUM" },
                    { "type": "TASK", "title": "パンを買う", "tags": ["買い物"], "priority": "MEDIUM" }
                ],
                "commands": []
            }"#),
        };
        let response = analyze_input(&client, "牛乳を買う、パンを買う").await;
        assert_eq!(response.actions.len(), 2);
        assert_eq!(response.actions[0].title, "牛乳を買う");
        assert_eq!(response.actions[1].title, "パンを買う");
        assert!(response
            .actions
            .iter()
            .all(|a| a.kind == ItemKind::Task));
    }

    #[tokio::test]
    async fn edit_intent_becomes_an_edit_command() {
        let client = FixedClient {
            text: Ok(r#"{
                "reply": "会議の時間を15時に変更しました。",
                "actions": [],
                "commands": [{
                    "type": "EDIT",
                    "targetType": "SCHEDULE",
                    "targetTitle": "会議",
                    "newData": { "date": "2024-01-15T15:00:00" }
                }]
            }"#),
        };
        let response = analyze_input(&client, "会議の時間を15時に変更").await;
        let command = &response.commands[0];
        assert_eq!(command.kind, CommandKind::Edit);
        assert_eq!(command.target_title, "会議");
        let new_data = command.new_data.as_ref().unwrap();
        assert_eq!(new_data.date.as_deref(), Some("2024-01-15T15:00:00"));
        assert!(new_data.title.is_none());
    }

    #[tokio::test]
    async fn fenced_output_is_cleaned_before_parsing() {
        let client = FixedClient {
            text: Ok("```json\n{\"reply\":\"ok\",\"actions\":[],\"commands\":[]}\n```"),
        };
        let response = analyze_input(&client, "hello").await;
        assert_eq!(response.reply, "ok");
    }

    #[tokio::test]
    async fn unparseable_text_degrades_to_parse_error_reply() {
        let client = FixedClient {
            text: Ok("sorry, I cannot answer that"),
        };
        let response = analyze_input(&client, "x").await;
        assert_eq!(response.reply, PARSE_ERROR);
        assert!(response.actions.is_empty());
        assert!(response.commands.is_empty());
    }

    #[tokio::test]
    async fn unsalvageable_shape_degrades_to_validation_error_reply() {
        let client = FixedClient {
            text: Ok(r#"{ "actions": [{ "type": 5 }] }"#),
        };
        let response = analyze_input(&client, "x").await;
        assert_eq!(response.reply, VALIDATION_ERROR);
        assert!(response.actions.is_empty());
    }

    #[tokio::test]
    async fn exhausted_models_degrade_to_generic_reply_with_cause() {
        let client = FixedClient {
            text: Err("quota exceeded"),
        };
        let response = analyze_input(&client, "x").await;
        assert!(response.reply.starts_with(GENERIC_ERROR));
        assert!(response.reply.contains("quota exceeded"));
        assert!(response.actions.is_empty());
    }

    #[test]
    fn missing_credential_maps_to_the_fixed_reply() {
        assert_eq!(
            fallback_reply(&ReconcileError::MissingCredential),
            API_KEY_MISSING
        );
    }
}
