//! One streaming turn: a drain loop on one side, observers on the other.
//!
//! [`create_conversation`] wires a lazily-opened payload stream and a
//! normalizer into a [`Turn`] (drives the network) and a
//! [`ConversationEmitter`] (observes it). The final text is also published
//! through [`FinalMessage`], which can be asked for the text at any point,
//! including after the turn is over.

use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::AIError;
use super::event::{ConversationEvent, Parsed};

type ParsedStream = BoxStream<'static, Result<Parsed, AIError>>;
type Setup = BoxFuture<'static, Result<ParsedStream, AIError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum EmitterEvent {
    Data(ConversationEvent),
    Error(AIError),
    /// Always the last event of a successful turn; carries the full text.
    Done(String),
}

/// Receiving side of a turn's events, in network order.
///
/// The sequence ends after `Done`, or without `Done` when the turn fails or
/// is cancelled.
#[derive(Debug)]
pub struct ConversationEmitter {
    events: mpsc::UnboundedReceiver<EmitterEvent>,
}

impl ConversationEmitter {
    pub async fn next(&mut self) -> Option<EmitterEvent> {
        self.events.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = EmitterEvent> {
        futures::stream::unfold(self, |mut emitter| async move {
            emitter.next().await.map(|event| (event, emitter))
        })
    }
}

#[derive(Debug, Clone, Default)]
struct MessageState {
    text: String,
    outcome: Option<Result<(), AIError>>,
}

/// Handle on the text a turn has accumulated.
#[derive(Debug, Clone)]
pub struct FinalMessage {
    state: watch::Receiver<MessageState>,
}

impl FinalMessage {
    /// Text accumulated so far, finished or not.
    pub fn snapshot(&self) -> String {
        self.state.borrow().text.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().outcome.is_some()
    }

    /// Resolves once the turn is over with its full text, or with the error
    /// that ended it.
    pub async fn wait(&self) -> Result<String, AIError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| s.outcome.is_some())
            .await
            .map_err(|_| AIError::TurnAbandoned)?;

        match &state.outcome {
            Some(Err(e)) => Err(e.clone()),
            _ => Ok(state.text.clone()),
        }
    }
}

struct Pending {
    setup: Setup,
    events: mpsc::UnboundedSender<EmitterEvent>,
}

/// The single-shot driving half of a turn.
pub struct Turn {
    pending: Mutex<Option<Pending>>,
    message: watch::Sender<MessageState>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Turn")
            .field("started", &self.pending.lock().is_none())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Turn {
    pub fn message(&self) -> FinalMessage {
        FinalMessage {
            state: self.message.subscribe(),
        }
    }

    /// Open the stream and drain it to completion.
    ///
    /// Returns the accumulated text. Fails with
    /// [`AIError::TurnAlreadyStarted`] on any call after the first.
    pub async fn start(&self) -> Result<String, AIError> {
        let Pending { setup, events } = self
            .pending
            .lock()
            .take()
            .ok_or(AIError::TurnAlreadyStarted)?;

        let result = self.drain(setup, &events).await;

        match &result {
            Ok(text) => {
                debug!(chars = text.len(), "turn complete");
                let _ = events.send(EmitterEvent::Done(text.clone()));
            }
            Err(e) => debug!(error = %e, "turn failed"),
        }

        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.message.send_modify(|s| s.outcome = Some(outcome));

        result
    }

    async fn drain(
        &self,
        setup: Setup,
        events: &mpsc::UnboundedSender<EmitterEvent>,
    ) -> Result<String, AIError> {
        let mut stream = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(AIError::Cancelled),
            stream = setup => stream?,
        };

        let mut text = String::new();

        loop {
            let item = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(AIError::Cancelled),
                item = stream.next() => item,
            };

            let Some(item) = item else { break };

            match item {
                Ok(Parsed::Done) => break,
                Ok(Parsed::Continue) => continue,
                Ok(Parsed::Event(event)) => {
                    text.push_str(event.text());
                    self.message.send_modify(|s| s.text.push_str(event.text()));
                    let _ = events.send(EmitterEvent::Data(event));
                }
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "skipping payload");
                    let _ = events.send(EmitterEvent::Error(e));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(text)
    }
}

/// A freshly created turn and its observer.
#[derive(Debug)]
pub struct ConversationResult {
    pub emitter: ConversationEmitter,
    pub turn: Turn,
}

impl ConversationResult {
    /// Start the turn while feeding every event to `on_event`.
    pub async fn run<F>(self, mut on_event: F) -> Result<String, AIError>
    where
        F: FnMut(&EmitterEvent),
    {
        let Self { mut emitter, turn } = self;

        let observe = async {
            while let Some(event) = emitter.next().await {
                on_event(&event);
            }
        };

        let (result, ()) = tokio::join!(turn.start(), observe);
        result
    }
}

/// Pair a lazily-opened payload stream with the normalizer for its vendor.
///
/// No I/O happens until [`Turn::start`] is called.
pub fn create_conversation<T, F, S, P>(
    setup: F,
    parse: P,
    cancel: CancellationToken,
) -> ConversationResult
where
    T: Send + 'static,
    F: Future<Output = Result<S, AIError>> + Send + 'static,
    S: Stream<Item = Result<T, AIError>> + Send + 'static,
    P: Fn(T) -> Result<Parsed, AIError> + Send + Sync + 'static,
{
    let setup = async move {
        let stream = setup.await?;
        Ok(stream.map(move |item| item.and_then(&parse)).boxed())
    }
    .boxed();

    let (tx, rx) = mpsc::unbounded_channel();
    let (message, _) = watch::channel(MessageState::default());

    ConversationResult {
        emitter: ConversationEmitter { events: rx },
        turn: Turn {
            pending: Mutex::new(Some(Pending { setup, events: tx })),
            message,
            cancel,
        },
    }
}
