use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Instrument};

use super::backend::{open_stream, ChatBackend, RequestOptions, Vendor};
use super::conversation::{create_conversation, ConversationResult};
use super::error::AIError;
use super::event::{ConversationMessage, Parsed, Role};
use super::sse::ANTHROPIC_FRAMING;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    options: RequestOptions,
}

impl AnthropicClient {
    pub fn new(
        api_key: Option<&str>,
        base_url: Option<&str>,
        options: RequestOptions,
    ) -> Result<Self, AIError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AIError::MissingCredential(Vendor::Anthropic.credential_var()))?;

        let mut headers = HeaderMap::new();
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|e| AIError::InvalidCredential(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            headers,
            options,
        })
    }

    pub fn request_body(&self, model: &str, messages: &[ConversationMessage]) -> serde_json::Value {
        json!({
            "model": model,
            "messages": to_message_params(messages),
            "max_tokens": self.options.max_tokens,
            "stream": true,
        })
    }
}

impl ChatBackend for AnthropicClient {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    fn open_turn(
        &self,
        model: &str,
        messages: &[ConversationMessage],
        cancel: CancellationToken,
    ) -> ConversationResult {
        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .headers(self.headers.clone())
            .json(&self.request_body(model, messages));

        let span = tracing::debug_span!("anthropic_turn", model, messages = messages.len());
        let setup = open_stream::<StreamEvent>(request, ANTHROPIC_FRAMING).instrument(span);

        create_conversation(setup, parse, cancel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageParam {
    pub role: ParamRole,
    pub content: String,
}

/// Fold the transcript into the strict user/assistant alternation the
/// Messages API expects.
///
/// The leading system prompt and user context become one user message;
/// later system entries are the assistant's own earlier replies.
pub fn to_message_params(messages: &[ConversationMessage]) -> Vec<MessageParam> {
    let (head, rest) = match messages {
        [system, user, rest @ ..] => (
            Some(MessageParam {
                role: ParamRole::User,
                content: [system.content.as_str(), user.content.as_str()].join("\n"),
            }),
            rest,
        ),
        _ => (None, messages),
    };

    head.into_iter()
        .chain(rest.iter().map(|message| MessageParam {
            role: match message.role {
                Role::System => ParamRole::Assistant,
                Role::User => ParamRole::User,
            },
            content: message.content.clone(),
        }))
        .collect()
}

/// One `data:` payload of the message stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<BlockDelta>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Only `content_block_delta` carries visible text; the body simply ends
/// after `message_stop`. An `error` event ends the turn.
pub fn parse(event: StreamEvent) -> Result<Parsed, AIError> {
    match event.kind.as_str() {
        "content_block_delta" => {
            let delta = event.delta.ok_or_else(|| {
                AIError::UnexpectedPayload("content_block_delta without delta".to_string())
            })?;
            match delta.text {
                Some(text) => Ok(Parsed::delta(text)),
                None => Ok(Parsed::Continue),
            }
        }
        "error" => {
            let error = event.error.ok_or_else(|| {
                AIError::BackendError {
                    kind: "error".to_string(),
                    message: "error event without body".to_string(),
                }
            })?;
            warn!(kind = %error.kind, message = %error.message, "backend reported an error event");
            Err(AIError::from_stream_error(&error.kind, error.message))
        }
        _ => Ok(Parsed::Continue),
    }
}
