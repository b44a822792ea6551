use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::backend::{open_stream, ChatBackend, RequestOptions, Vendor};
use super::conversation::{create_conversation, ConversationResult};
use super::error::AIError;
use super::event::{ConversationMessage, Parsed};
use super::sse::OPENAI_FRAMING;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    options: RequestOptions,
}

impl OpenAIClient {
    pub fn new(
        api_key: Option<&str>,
        base_url: Option<&str>,
        options: RequestOptions,
    ) -> Result<Self, AIError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AIError::MissingCredential(Vendor::OpenAI.credential_var()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| AIError::InvalidCredential(e.to_string()))?,
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
            "messages": messages,
            "stream": true,
            "temperature": self.options.temperature,
            "frequency_penalty": self.options.frequency_penalty,
        })
    }
}

impl ChatBackend for OpenAIClient {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAI
    }

    fn open_turn(
        &self,
        model: &str,
        messages: &[ConversationMessage],
        cancel: CancellationToken,
    ) -> ConversationResult {
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers.clone())
            .json(&self.request_body(model, messages));

        let span = tracing::debug_span!("openai_turn", model, messages = messages.len());
        let setup = open_stream::<ChatCompletionChunk>(request, OPENAI_FRAMING).instrument(span);

        create_conversation(setup, parse, cancel)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Only the first choice's text is user-visible.
pub fn parse(chunk: ChatCompletionChunk) -> Result<Parsed, AIError> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(Parsed::Continue);
    };

    let delta = choice
        .delta
        .ok_or_else(|| AIError::UnexpectedPayload("choice without delta".to_string()))?;

    match delta.content {
        Some(content) if !content.is_empty() => Ok(Parsed::delta(content)),
        _ => Ok(Parsed::Continue),
    }
}
