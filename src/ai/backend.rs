use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::conversation::ConversationResult;
use super::error::AIError;
use super::event::ConversationMessage;
use super::sse::{Framing, SseStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    OpenAI,
    Anthropic,
}

impl Vendor {
    pub fn credential_var(&self) -> &'static str {
        match self {
            Vendor::OpenAI => "OPENAI_API_KEY",
            Vendor::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::OpenAI => write!(f, "OpenAI"),
            Vendor::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.4,
            frequency_penalty: 1.2,
        }
    }
}

/// A generation backend able to open one streaming turn for a transcript.
///
/// Implementations hide their wire format: callers only ever see
/// [`ConversationResult`]s producing normalized events.
pub trait ChatBackend: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Prepare a turn. The request is sent when the turn is started.
    fn open_turn(
        &self,
        model: &str,
        messages: &[ConversationMessage],
        cancel: CancellationToken,
    ) -> ConversationResult;
}

/// Send a prepared request and frame its body as a payload stream.
pub(crate) async fn open_stream<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    framing: Framing,
) -> Result<SseStream<T>, AIError> {
    let response = request
        .send()
        .await
        .map_err(|e| AIError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        return Err(AIError::from_status(status.as_u16(), body));
    }

    if response.content_length() == Some(0) {
        return Err(AIError::MissingBody);
    }

    debug!(%status, "stream opened");
    Ok(SseStream::new(response.bytes_stream(), framing))
}
