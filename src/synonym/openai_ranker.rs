//! OpenAI chat-completions ranker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{ApiKey, RankingConfig};
use crate::error::{IdiolinkError, Result};
use crate::synonym::ranker::{Ranker, RankingRequest};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// JSON schema constraining the answer to `{"synonyms": [string, ...]}`.
fn synonyms_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "synonyms",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "synonyms": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["synonyms"],
                "additionalProperties": false
            }
        }
    })
}

/// Ranker backed by an OpenAI compatible `/chat/completions` endpoint.
pub struct OpenAIRanker {
    client: Client,
    api_key: ApiKey,
    config: RankingConfig,
}

impl OpenAIRanker {
    pub fn new(api_key: ApiKey, config: RankingConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, request: &'a RankingRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: self
                .config
                .structured_output
                .then(synonyms_response_format),
        }
    }
}

#[async_trait]
impl Ranker for OpenAIRanker {
    async fn rank(&self, request: &RankingRequest) -> Result<String> {
        let http_response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose())
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = http_response.status();
        let response_text = http_response.text().await?;

        if !status.is_success() {
            let message = format!("Chat API error (status {status}): {response_text}");
            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    IdiolinkError::ranking(message)
                } else {
                    IdiolinkError::invalid_config(message)
                },
            );
        }

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            IdiolinkError::ranking(format!(
                "Failed to parse chat response: {e}. Response text: {response_text}"
            ))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| IdiolinkError::ranking("chat response has no message content"))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
