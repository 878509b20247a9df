//! Text generation collaborator and an OpenAI-compatible chat client.

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::Deserialize;

/// One prompt for the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Prompt in, free text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// The outermost `{...}` of a generated reply, or the whole text when there
/// is none. Drops code fences and chatter around a JSON object.
#[must_use]
pub fn json_payload(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Chat-completions client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": request.system },
                    { "role": "user", "content": request.prompt },
                ],
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
            }))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GenerationError::Transport(format!("HTTP {status}")));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Transport(format!("unreadable response: {e}")))?;

        let Some(choice) = body.choices.into_iter().next() else {
            return Err(GenerationError::Empty);
        };
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(GenerationError::Ineligible(
                "response withheld by content filter".to_string(),
            ));
        }

        choice
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::Empty)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records the prompts it was given.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::default(),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::Empty))
        }
    }

    #[test]
    fn chat_response_tolerates_missing_fields() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert!(body.choices[0].message.as_ref().unwrap().content.is_none());

        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.choices.is_empty());
    }

    #[test]
    fn json_payload_strips_fences() {
        assert_eq!(json_payload("```json\n{\"a\": {}}\n```"), r#"{"a": {}}"#);
        assert_eq!(json_payload("no json"), "no json");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", "key", "gpt-3.5-turbo");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
        assert_eq!(client.model(), "gpt-3.5-turbo");
    }
}
