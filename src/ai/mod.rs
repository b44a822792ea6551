//! Streaming conversation engine.
//!
//! Vendor clients turn a transcript into a lazily-opened [`Turn`]; the
//! [`ConversationDriver`] chains turns together with user feedback.

mod adapter;
mod anthropic;
mod backend;
mod conversation;
mod driver;
mod error;
mod event;
mod openai;
mod sse;

pub use adapter::{adapter_names, get_adapter, Adapter, ClientPool, ClientSettings, ADAPTERS, DEFAULT_ADAPTER};
pub use anthropic::AnthropicClient;
pub use backend::{ChatBackend, RequestOptions, Vendor};
pub use conversation::{
    create_conversation, ConversationEmitter, ConversationResult, EmitterEvent, FinalMessage, Turn,
};
pub use driver::ConversationDriver;
pub use error::AIError;
pub use event::{ConversationEvent, ConversationMessage, Parsed, Role};
pub use openai::OpenAIClient;
pub use sse::{Framing, SseStream, ANTHROPIC_FRAMING, OPENAI_FRAMING};
