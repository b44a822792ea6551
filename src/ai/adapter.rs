use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::anthropic::AnthropicClient;
use super::backend::{ChatBackend, RequestOptions, Vendor};
use super::driver::ConversationDriver;
use super::error::AIError;
use super::event::ConversationMessage;
use super::openai::OpenAIClient;

/// A named (vendor, model) binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adapter {
    pub name: &'static str,
    pub vendor: Vendor,
    pub model: &'static str,
}

pub const ADAPTERS: &[Adapter] = &[
    Adapter {
        name: "openai",
        vendor: Vendor::OpenAI,
        model: "gpt-4-turbo-preview",
    },
    Adapter {
        name: "claude",
        vendor: Vendor::Anthropic,
        model: "claude-3-opus-20240229",
    },
    Adapter {
        name: "claude_fast",
        vendor: Vendor::Anthropic,
        model: "claude-3-haiku-20240307",
    },
];

pub const DEFAULT_ADAPTER: &str = "claude_fast";

pub fn adapter_names() -> Vec<&'static str> {
    ADAPTERS.iter().map(|a| a.name).collect()
}

/// Look up an adapter by name. Unknown names are an error, never a default.
pub fn get_adapter(name: &str) -> Result<&'static Adapter, AIError> {
    ADAPTERS
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| AIError::UnknownAdapter {
            name: name.to_string(),
            valid: adapter_names().join(", "),
        })
}

impl Adapter {
    /// Bind a fresh conversation to this adapter's backend and model.
    pub fn connect(
        &self,
        clients: &ClientPool,
        initial: Vec<ConversationMessage>,
    ) -> Result<ConversationDriver, AIError> {
        let backend = clients.backend(self.vendor)?;
        Ok(ConversationDriver::new(backend, self.model, initial))
    }
}

/// Everything needed to build vendor clients.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub options: RequestOptions,
}

/// Owns at most one client per vendor, built on first use.
///
/// Construction fails immediately when the vendor's credential is absent.
#[derive(Debug, Default)]
pub struct ClientPool {
    settings: ClientSettings,
    openai: Mutex<Option<Arc<OpenAIClient>>>,
    anthropic: Mutex<Option<Arc<AnthropicClient>>>,
}

impl ClientPool {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            openai: Mutex::new(None),
            anthropic: Mutex::new(None),
        }
    }

    pub fn backend(&self, vendor: Vendor) -> Result<Arc<dyn ChatBackend>, AIError> {
        match vendor {
            Vendor::OpenAI => Ok(self.openai()?),
            Vendor::Anthropic => Ok(self.anthropic()?),
        }
    }

    pub fn openai(&self) -> Result<Arc<OpenAIClient>, AIError> {
        let mut slot = self.openai.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        debug!("building OpenAI client");
        let client = Arc::new(OpenAIClient::new(
            self.settings.openai_api_key.as_deref(),
            self.settings.openai_base_url.as_deref(),
            self.settings.options.clone(),
        )?);
        *slot = Some(client.clone());
        Ok(client)
    }

    pub fn anthropic(&self) -> Result<Arc<AnthropicClient>, AIError> {
        let mut slot = self.anthropic.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        debug!("building Anthropic client");
        let client = Arc::new(AnthropicClient::new(
            self.settings.anthropic_api_key.as_deref(),
            self.settings.anthropic_base_url.as_deref(),
            self.settings.options.clone(),
        )?);
        *slot = Some(client.clone());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_adapter_lists_valid_names() {
        let err = get_adapter("gpt5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid adapter: 'gpt5' Valid adapters: openai, claude, claude_fast"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn registered_adapters() {
        let adapter = get_adapter("claude_fast").unwrap();
        assert_eq!(adapter.vendor, Vendor::Anthropic);
        assert_eq!(adapter.model, "claude-3-haiku-20240307");
        assert_eq!(get_adapter("openai").unwrap().model, "gpt-4-turbo-preview");
        assert!(get_adapter(DEFAULT_ADAPTER).is_ok());
    }

    #[test]
    fn connect_without_credential_fails_fast() {
        let pool = ClientPool::default();
        let err = get_adapter("claude").unwrap().connect(&pool, Vec::new()).unwrap_err();
        assert_eq!(err, AIError::MissingCredential("ANTHROPIC_API_KEY"));

        let err = get_adapter("openai").unwrap().connect(&pool, Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "OPENAI_API_KEY is required");
    }

    #[test]
    fn clients_are_reused() {
        let pool = ClientPool::new(ClientSettings {
            anthropic_api_key: Some("key".into()),
            ..Default::default()
        });

        let first = pool.anthropic().unwrap();
        let second = pool.anthropic().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(pool.openai().is_err());
    }

    #[test]
    fn connect_binds_the_model() {
        let pool = ClientPool::new(ClientSettings {
            openai_api_key: Some("sk".into()),
            ..Default::default()
        });
        let driver = get_adapter("openai").unwrap().connect(&pool, Vec::new()).unwrap();
        assert_eq!(driver.model(), "gpt-4-turbo-preview");
        assert_eq!(driver.turns(), 0);
    }
}
