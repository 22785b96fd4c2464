//! Chat-completion client for the quiz generator.
//!
//! Speaks the OpenAI-compatible `chat/completions` API (OpenRouter by default).
//! Only the text of the first choice is used. The API key is never logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::Config;

const CLIENT_USER_AGENT: &str = concat!("aiquizbot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Anything that turns a prompt into raw quiz text.
#[async_trait]
pub trait GenerateQuiz: Send + Sync {
    async fn generate_quiz_text(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct OpenRouter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouter {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.generation_timeout,
        )
    }
}

#[async_trait]
impl GenerateQuiz for OpenRouter {
    #[instrument(level = "info", skip(self, prompt), fields(model = %self.model))]
    async fn generate_quiz_text(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = extract_api_error(&body).unwrap_or(body);
            return Err(LlmError::Status { status, message });
        }

        let body: ChatCompletionResponse = res.json().await?;
        let text = first_choice_text(body)?;
        tracing::info!(reply_len = text.len(), "model reply received");
        Ok(text)
    }
}

fn first_choice_text(body: ChatCompletionResponse) -> Result<String, LlmError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or(LlmError::EmptyReply)
}

/// Pulls `error.message` out of an API error body, if it has one.
fn extract_api_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<String, LlmError> {
        first_choice_text(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn takes_first_choice_only() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"  Q1\nA\nB\nC\nD \n"}},
            {"message":{"role":"assistant","content":"ignored"}}
        ]}"#;

        assert_eq!(parse(body).unwrap(), "Q1\nA\nB\nC\nD");
    }

    #[test]
    fn empty_or_missing_content_is_an_error() {
        assert!(matches!(parse(r#"{"choices":[]}"#), Err(LlmError::EmptyReply)));
        assert!(matches!(parse(r#"{}"#), Err(LlmError::EmptyReply)));
        assert!(matches!(
            parse(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::EmptyReply)
        ));
        assert!(matches!(
            parse(r#"{"choices":[{"message":{"content":"   "}}]}"#),
            Err(LlmError::EmptyReply)
        ));
    }

    #[test]
    fn api_error_message_is_extracted() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;

        assert_eq!(extract_api_error(body).as_deref(), Some("Rate limit exceeded"));
        assert_eq!(extract_api_error("<html>bad gateway</html>"), None);
    }

    #[test]
    fn request_serializes_single_user_message() {
        let request = ChatCompletionRequest {
            model: "some/model",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "some/model",
                "messages": [{"role": "user", "content": "hello"}]
            })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = OpenRouter::new(
            "key".into(),
            "https://example.com/api/v1/".into(),
            "m".into(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.base_url, "https://example.com/api/v1");
    }
}
