//! Incremental reader for `data:`-framed event streams.
//!
//! Bytes are buffered until a full `\n`-terminated line is available, so both
//! lines and multi-byte characters may be split across network chunks.

use std::fmt::Display;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use super::error::AIError;

/// Per-vendor line conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub prefix: &'static str,
    /// A payload equal to this token ends the stream without error.
    pub terminal: Option<&'static str>,
}

pub const OPENAI_FRAMING: Framing = Framing {
    prefix: "data:",
    terminal: Some("[DONE]"),
};

pub const ANTHROPIC_FRAMING: Framing = Framing {
    prefix: "data:",
    terminal: None,
};

/// Other SSE fields carry no payload.
const IGNORED_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Payload(&'a str),
    Skip,
    Terminal,
}

impl Framing {
    pub fn classify<'a>(&self, raw: &'a str) -> Line<'a> {
        let mut line = raw.trim();

        if line.is_empty() || line.starts_with(':') {
            return Line::Skip;
        }
        if IGNORED_FIELDS.iter().any(|field| line.starts_with(field)) {
            return Line::Skip;
        }

        while let Some(rest) = line.strip_prefix(self.prefix) {
            line = rest.trim_start();
        }

        if line.is_empty() {
            Line::Skip
        } else if self.terminal == Some(line) {
            Line::Terminal
        } else {
            Line::Payload(line)
        }
    }
}

/// Byte buffer that hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    pub fn next_line(&mut self) -> Option<Result<String, AIError>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(decode(line))
    }

    /// Whatever is left once the source has ended.
    pub fn take_rest(&mut self) -> Option<Result<String, AIError>> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(decode(std::mem::take(&mut self.buffer)))
    }
}

fn decode(line: Vec<u8>) -> Result<String, AIError> {
    String::from_utf8(line).map_err(|e| AIError::MalformedPayload(format!("invalid UTF-8: {e}")))
}

fn preview(line: &str) -> String {
    line.chars().take(200).collect()
}

/// Lazily yields one deserialized payload per data line.
///
/// Malformed lines come out as recoverable `Err` items and iteration goes
/// on. A failing byte source yields one fatal `Err` and ends the stream.
pub struct SseStream<T> {
    inner: BoxStream<'static, Result<Bytes, AIError>>,
    framing: Framing,
    lines: LineBuffer,
    source_done: bool,
    finished: bool,
    _payload: PhantomData<fn() -> T>,
}

impl<T> SseStream<T> {
    pub fn new<S, E>(bytes: S, framing: Framing) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        let inner = bytes
            .map(|chunk| chunk.map_err(|e| AIError::StreamInterrupted(e.to_string())))
            .boxed();

        Self {
            inner,
            framing,
            lines: LineBuffer::default(),
            source_done: false,
            finished: false,
            _payload: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> SseStream<T> {
    /// `None` means "nothing to yield for this line".
    fn handle_line(&mut self, line: Result<String, AIError>) -> Option<Result<T, AIError>> {
        let line = match line {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };

        match self.framing.classify(&line) {
            Line::Skip => None,
            Line::Terminal => {
                tracing::trace!("terminal line received");
                self.finished = true;
                None
            }
            Line::Payload(data) => Some(serde_json::from_str(data).map_err(|e| {
                AIError::MalformedPayload(format!("{e} - line: {}", preview(data)))
            })),
        }
    }
}

impl<T: DeserializeOwned> Stream for SseStream<T> {
    type Item = Result<T, AIError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            while let Some(line) = this.lines.next_line() {
                if let Some(item) = this.handle_line(line) {
                    return Poll::Ready(Some(item));
                }
                if this.finished {
                    return Poll::Ready(None);
                }
            }

            if this.source_done {
                this.finished = true;
                let item = this.lines.take_rest().and_then(|rest| this.handle_line(rest));
                return Poll::Ready(item);
            }

            match futures::ready!(this.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.lines.push(&chunk),
                Some(Err(e)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => this.source_done = true,
            }
        }
    }
}
