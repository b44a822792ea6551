use std::collections::VecDeque;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ai::{
    create_conversation, AIError, ChatBackend, ConversationMessage, ConversationResult, Parsed,
    Vendor,
};
use crate::prompt::{PromptError, Prompter};

mod content;

type Chunks = BoxStream<'static, Result<&'static str, AIError>>;

#[derive(Debug, Clone)]
enum Script {
    Chunks(Vec<&'static str>),
    Fail(AIError),
    Pending,
}

/// In-memory backend that replays scripted turns and records every
/// transcript it was asked to continue.
#[derive(Debug)]
pub(crate) struct ScriptedBackend {
    turns: Mutex<VecDeque<Script>>,
    fallback: Script,
    requests: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedBackend {
    /// One entry per turn, each a list of deltas. Turns past the script
    /// produce no text.
    pub fn new(turns: Vec<Vec<&'static str>>) -> Self {
        Self::with(turns.into_iter().map(Script::Chunks).collect(), Script::Chunks(Vec::new()))
    }

    /// Every turn fails to open with `error`.
    pub fn failing(error: AIError) -> Self {
        Self::with(VecDeque::new(), Script::Fail(error))
    }

    /// Every turn opens but never yields.
    pub fn pending() -> Self {
        Self::with(VecDeque::new(), Script::Pending)
    }

    fn with(turns: VecDeque<Script>, fallback: Script) -> Self {
        Self {
            turns: Mutex::new(turns),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
        self.requests.lock().clone()
    }
}

impl ChatBackend for ScriptedBackend {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAI
    }

    fn open_turn(
        &self,
        _model: &str,
        messages: &[ConversationMessage],
        cancel: CancellationToken,
    ) -> ConversationResult {
        self.requests.lock().push(messages.to_vec());

        let script = self
            .turns
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let setup: BoxFuture<'static, Result<Chunks, AIError>> = match script {
            Script::Chunks(chunks) => {
                let chunks: Chunks = stream::iter(chunks.into_iter().map(Ok)).boxed();
                async move { Ok::<_, AIError>(chunks) }.boxed()
            }
            Script::Fail(error) => async move { Err::<Chunks, _>(error) }.boxed(),
            Script::Pending => {
                let chunks: Chunks = stream::pending().boxed();
                async move { Ok::<_, AIError>(chunks) }.boxed()
            }
        };

        create_conversation(setup, |chunk: &'static str| Ok(Parsed::delta(chunk)), cancel)
    }
}

#[derive(Debug)]
pub(crate) enum Answer {
    Confirm(bool),
    Text(&'static str),
    Cancel,
}

/// Answers prompts from a fixed script and records the questions asked.
/// Running out of answers behaves like the user cancelling.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, message: &str) -> Answer {
        self.asked.push(message.to_string());
        self.answers.pop_front().unwrap_or(Answer::Cancel)
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(message) {
            Answer::Confirm(yes) => Ok(yes),
            Answer::Cancel => Err(PromptError::Cancelled),
            other => Err(PromptError::Failed(format!("expected a confirm, got {other:?}"))),
        }
    }

    fn text(&mut self, message: &str) -> Result<String, PromptError> {
        match self.next(message) {
            Answer::Text(text) => Ok(text.to_string()),
            Answer::Cancel => Err(PromptError::Cancelled),
            other => Err(PromptError::Failed(format!("expected text, got {other:?}"))),
        }
    }
}
