//! Server-Sent-Events decoding of agent responses.
//!
//! Bytes flow through three layers:
//! [`LineBuffer`] turns chunks into lines, [`decode_line`] advances the
//! per-call [`DecoderState`] and yields frames, and [`ResponseAggregator`]
//! folds classified [`StreamEvent`]s into an [`AgentResult`].

pub mod aggregate;
pub mod event;
pub mod extract;
pub mod frame;
pub mod lines;
pub mod warning;

pub use aggregate::{ProgressCallback, ResponseAggregator};
pub use event::{EventKind, StreamEvent};
pub use frame::{decode_line, DecoderState, LineOutcome};
pub use lines::LineBuffer;
pub use warning::DecodeWarning;

use crate::types::AgentResult;

/// Whether the decoder wants more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// Incremental decoder for one response body.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    state: DecoderState,
    aggregator: ResponseAggregator,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: ProgressCallback) -> Self {
        Self {
            aggregator: ResponseAggregator::with_progress(progress),
            ..Self::default()
        }
    }

    /// Feed a body chunk. Returns [`Flow::Done`] once `[DONE]` was seen.
    pub fn feed(&mut self, chunk: &[u8]) -> Flow {
        for line in self.lines.push(chunk) {
            if self.feed_line(&line) == Flow::Done {
                return Flow::Done;
            }
        }
        self.flow()
    }

    /// Feed one complete line.
    pub fn feed_line(&mut self, line: &str) -> Flow {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = decode_line(state, line);
        self.state = next;

        match outcome {
            LineOutcome::Frame { event, payload } => {
                self.aggregator.apply_frame(event.as_deref(), payload)
            }
            LineOutcome::Malformed { event, preview } => self
                .aggregator
                .record_warning(DecodeWarning::MalformedFrame { event, preview }),
            LineOutcome::Done => self.aggregator.apply(StreamEvent::Done),
            LineOutcome::Ignored => {}
        }
        self.flow()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// The result accumulated so far.
    pub fn partial(&self) -> &AgentResult {
        self.aggregator.result()
    }

    /// End of body: flush an unterminated last line and build the result.
    pub fn finish(mut self) -> AgentResult {
        if let Some(tail) = self.lines.finish() {
            self.feed_line(&tail);
        }
        self.aggregator.finish()
    }

    fn flow(&self) -> Flow {
        if self.is_finished() {
            Flow::Done
        } else {
            Flow::Continue
        }
    }
}

/// Decode a complete buffered body.
pub fn decode_str(body: &str) -> AgentResult {
    let mut decoder = StreamDecoder::new();
    decoder.feed(body.as_bytes());
    decoder.finish()
}
