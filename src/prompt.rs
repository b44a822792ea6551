use inquire::{Confirm, InquireError, Text};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    /// The user escaped or interrupted the prompt.
    #[error("Cancelled")]
    Cancelled,
    #[error("Prompt error: {0}")]
    Failed(String),
}

impl From<InquireError> for PromptError {
    fn from(error: InquireError) -> Self {
        match error {
            InquireError::OperationCanceled | InquireError::OperationInterrupted => {
                PromptError::Cancelled
            }
            other => PromptError::Failed(other.to_string()),
        }
    }
}

/// Result of a step the user may turn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Declined(&'static str),
}

/// Interactive questions asked during the pipeline.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;
    fn text(&mut self, message: &str) -> Result<String, PromptError>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct Terminal;

impl Prompter for Terminal {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }

    fn text(&mut self, message: &str) -> Result<String, PromptError> {
        Ok(Text::new(message).prompt()?)
    }
}
