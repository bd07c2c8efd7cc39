//! Client for remote text-generation endpoints.
//!
//! One attempt per call against the endpoint under the pool cursor. Transport
//! failures rotate the pool so the next call tries a different endpoint;
//! concurrent failures on the same endpoint rotate it only once.

use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::relay::endpoint::{EndpointDescriptor, EndpointPool, PayloadShape};
use crate::relay::history::ConversationLog;

/// Fixed generation parameters for prompt-shaped requests.
const MAX_LENGTH: u32 = 100;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub timeout: Duration,
    pub max_reply_chars: usize,
    pub api_token: Option<String>,
    pub history_max_users: NonZeroUsize,
    pub history_max_messages: NonZeroUsize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_reply_chars: 200,
            api_token: None,
            history_max_users: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            history_max_messages: NonZeroUsize::new(50).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Conversational {
        inputs: ConversationInputs<'a>,
    },
    Prompt {
        inputs: &'a str,
        parameters: GenerationParameters,
    },
}

#[derive(Serialize)]
struct ConversationInputs<'a> {
    past_user_inputs: Vec<String>,
    generated_responses: Vec<String>,
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_length: u32,
    temperature: f32,
    do_sample: bool,
}

impl<'a> Payload<'a> {
    fn build(shape: PayloadShape, text: &'a str, past_user_inputs: Vec<String>) -> Self {
        match shape {
            PayloadShape::Conversational => Payload::Conversational {
                inputs: ConversationInputs {
                    past_user_inputs,
                    generated_responses: Vec::new(),
                    text,
                },
            },
            PayloadShape::Prompt => Payload::Prompt {
                inputs: text,
                parameters: GenerationParameters {
                    max_length: MAX_LENGTH,
                    temperature: TEMPERATURE,
                    do_sample: true,
                },
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoteError {
    /// Timeout, transport failure, non-200 status or a body that isn't JSON.
    Unavailable(String),
    /// JSON without a usable `generated_text` field.
    Malformed(String),
    /// Nothing left after removing the echoed input.
    EmptyText,
}

impl RemoteError {
    /// Whether this failure should move the pool to the next endpoint.
    pub fn rotates(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Unavailable(e) => write!(f, "remote unavailable: {e}"),
            RemoteError::Malformed(e) => write!(f, "malformed remote response: {e}"),
            RemoteError::EmptyText => write!(f, "empty generated text"),
        }
    }
}

impl std::error::Error for RemoteError {}

pub struct RemoteClient {
    http: reqwest::Client,
    pool: Arc<EndpointPool>,
    history: Mutex<ConversationLog>,
    config: RemoteConfig,
}

impl RemoteClient {
    pub fn new(pool: Arc<EndpointPool>, config: RemoteConfig) -> Self {
        let history = ConversationLog::new(config.history_max_users, config.history_max_messages);
        Self {
            http: reqwest::Client::new(),
            pool,
            history: Mutex::new(history),
            config,
        }
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Try the current endpoint once. Failures are logged and yield `None`.
    pub async fn try_complete(&self, text: &str, user_id: &str) -> Option<String> {
        let (index, endpoint) = self.pool.checkout();
        let past = self.history().record(user_id, text);

        match self.request(&endpoint, text, past).await {
            Ok(reply) => {
                info!("🌐 Remote reply from {} ({} chars)", endpoint.url, reply.chars().count());
                Some(reply)
            }
            Err(e) => {
                warn!("Remote completion via {} failed: {e}", endpoint.url);
                if e.rotates() {
                    self.pool.advance_from(index);
                }
                None
            }
        }
    }

    async fn request(
        &self,
        endpoint: &EndpointDescriptor,
        text: &str,
        past: Vec<String>,
    ) -> Result<String, RemoteError> {
        let payload = Payload::build(endpoint.shape, text, past);

        let mut request = self
            .http
            .post(&endpoint.url)
            .header("content-type", "application/json")
            .timeout(self.config.timeout)
            .json(&payload);
        if let Some(ref token) = self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(RemoteError::Unavailable(format!("{status}: {preview}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("unreadable body: {e}")))?;
        debug!("Remote response: {body}");

        let generated = extract_generated_text(&body)?;
        clean_reply(generated, text, self.config.max_reply_chars)
    }

    /// Remove a user's conversation log. Returns true if one existed.
    pub fn clear_history(&self, user_id: &str) -> bool {
        self.history().clear(user_id)
    }

    pub fn active_conversations(&self) -> usize {
        self.history().active_users()
    }

    pub fn history_for(&self, user_id: &str) -> Option<Vec<String>> {
        self.history().messages(user_id)
    }

    fn history(&self) -> std::sync::MutexGuard<'_, ConversationLog> {
        // A panic mid-append leaves at worst one missing entry.
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pull `generated_text` out of `[{generated_text}]` or `{generated_text}`.
fn extract_generated_text(body: &Value) -> Result<&str, RemoteError> {
    let object = match body {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| RemoteError::Malformed("empty array".to_string()))?,
        Value::Object(_) => body,
        other => {
            return Err(RemoteError::Malformed(format!("unexpected JSON type: {other}")));
        }
    };

    match object.get("generated_text") {
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(other) => Err(RemoteError::Malformed(format!(
            "generated_text is not a string: {other}"
        ))),
        None => Err(RemoteError::Malformed("missing generated_text".to_string())),
    }
}

/// Strip echoes of the input and surrounding whitespace, then cap the length.
fn clean_reply(generated: &str, input: &str, max_chars: usize) -> Result<String, RemoteError> {
    let stripped = if !input.is_empty() && generated.contains(input) {
        generated.replace(input, "")
    } else {
        generated.to_string()
    };

    let text = stripped.trim();
    if text.is_empty() {
        return Err(RemoteError::EmptyText);
    }
    Ok(text.chars().take(max_chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversational_payload() {
        let payload = Payload::build(
            PayloadShape::Conversational,
            "how are you",
            vec!["hello".to_string()],
        );
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "inputs": {
                    "past_user_inputs": ["hello"],
                    "generated_responses": [],
                    "text": "how are you"
                }
            })
        );
    }

    #[test]
    fn test_prompt_payload() {
        let payload = Payload::build(PayloadShape::Prompt, "how are you", vec!["ignored".to_string()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["inputs"], "how are you");
        assert_eq!(value["parameters"]["max_length"], 100);
        assert_eq!(value["parameters"]["do_sample"], true);
        let temperature = value["parameters"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_extract_from_list() {
        let body = json!([{ "generated_text": "hi there", "score": 1 }]);
        assert_eq!(extract_generated_text(&body), Ok("hi there"));
    }

    #[test]
    fn test_extract_from_object() {
        let body = json!({ "generated_text": "hi there" });
        assert_eq!(extract_generated_text(&body), Ok("hi there"));
    }

    #[test]
    fn test_extract_rejects_bad_shapes() {
        for body in [
            json!([]),
            json!([{ "text": "x" }]),
            json!({ "generated_text": 5 }),
            json!({ "error": "loading" }),
            json!("plain"),
        ] {
            assert!(matches!(
                extract_generated_text(&body),
                Err(RemoteError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_clean_strips_echo() {
        assert_eq!(
            clean_reply("how are you? I'm fine", "how are you?", 200),
            Ok("I'm fine".to_string())
        );
    }

    #[test]
    fn test_clean_truncates_by_chars() {
        let long = "ü".repeat(300);
        let reply = clean_reply(&long, "zzz", 200).unwrap();
        assert_eq!(reply.chars().count(), 200);
    }

    #[test]
    fn test_clean_empty_after_strip() {
        assert_eq!(clean_reply("  echo  ", "echo", 200), Err(RemoteError::EmptyText));
        assert_eq!(clean_reply("", "anything", 200), Err(RemoteError::EmptyText));
    }

    #[test]
    fn test_clean_blank_text_is_empty() {
        assert_eq!(clean_reply("  \n ", "hello", 200), Err(RemoteError::EmptyText));
        assert_eq!(clean_reply("\t", "", 200), Err(RemoteError::EmptyText));
    }

    #[test]
    fn test_clean_trims_before_truncating() {
        let generated = format!("   {}", "a".repeat(300));
        let reply = clean_reply(&generated, "zzz", 200).unwrap();
        assert_eq!(reply, "a".repeat(200));
    }

    #[test]
    fn test_only_unavailable_rotates() {
        assert!(RemoteError::Unavailable("x".into()).rotates());
        assert!(!RemoteError::Malformed("x".into()).rotates());
        assert!(!RemoteError::EmptyText.rotates());
    }
}
