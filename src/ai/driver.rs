use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::ChatBackend;
use super::conversation::{ConversationResult, FinalMessage};
use super::error::AIError;
use super::event::ConversationMessage;

#[derive(Debug)]
enum DriverState {
    AwaitingFirstTurn,
    TurnInFlight { turn: usize, message: FinalMessage },
    Closed,
}

/// Multi-turn conversation over one backend and model.
///
/// Each [`advance`](Self::advance) opens the next turn. Every resumption
/// extends the transcript with the previous turn's text (as `system`) and
/// the caller's feedback (as `user`), in that order.
pub struct ConversationDriver {
    backend: Arc<dyn ChatBackend>,
    model: String,
    initial: Vec<ConversationMessage>,
    transcript: Vec<ConversationMessage>,
    state: DriverState,
    turns: usize,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ConversationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationDriver")
            .field("vendor", &self.backend.vendor())
            .field("model", &self.model)
            .field("transcript", &self.transcript.len())
            .field("state", &self.state)
            .finish()
    }
}

impl ConversationDriver {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        initial: Vec<ConversationMessage>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            initial,
            transcript: Vec::new(),
            state: DriverState::AwaitingFirstTurn,
            turns: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel this conversation whenever `parent` is cancelled.
    pub fn cancel_on(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transcript(&self) -> &[ConversationMessage] {
        &self.transcript
    }

    /// Number of turns opened so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DriverState::Closed)
    }

    /// Token whose cancellation stops the in-flight turn.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn close(&mut self) {
        self.state = DriverState::Closed;
    }

    /// Open the next turn.
    ///
    /// The first call takes no feedback. Every later call requires it and
    /// waits for the previous turn's final text, so that turn must have been
    /// started (or dropped) by the caller. A failed previous turn closes the
    /// conversation and its error is returned.
    pub async fn advance(&mut self, feedback: Option<String>) -> Result<ConversationResult, AIError> {
        match std::mem::replace(&mut self.state, DriverState::Closed) {
            DriverState::Closed => Err(AIError::ConversationEnded),

            DriverState::AwaitingFirstTurn => {
                if feedback.is_some() {
                    self.state = DriverState::AwaitingFirstTurn;
                    return Err(AIError::InvalidTransition("no turn to give feedback on"));
                }
                self.transcript = self.initial.clone();
                Ok(self.open_turn(1))
            }

            DriverState::TurnInFlight { turn, message } => {
                let Some(feedback) = feedback else {
                    self.state = DriverState::TurnInFlight { turn, message };
                    return Err(AIError::InvalidTransition("feedback is required to resume"));
                };

                let text = message.wait().await?;
                debug!(turn, chars = text.len(), "resuming with feedback");

                self.transcript.push(ConversationMessage::system(text));
                self.transcript.push(ConversationMessage::user(feedback));
                Ok(self.open_turn(turn + 1))
            }
        }
    }

    fn open_turn(&mut self, turn: usize) -> ConversationResult {
        self.turns = turn;
        info!(
            turn,
            vendor = %self.backend.vendor(),
            model = %self.model,
            messages = self.transcript.len(),
            "opening turn"
        );

        let result = self
            .backend
            .open_turn(&self.model, &self.transcript, self.cancel.child_token());

        self.state = DriverState::TurnInFlight {
            turn,
            message: result.turn.message(),
        };
        result
    }
}
