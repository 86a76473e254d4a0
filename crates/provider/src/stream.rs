//! Upstream SSE body → downstream event stream.
//!
//! The resulting stream always starts with `ping` and always ends with either
//! `done` or an `error` event. Dropping it drops the upstream body.

use crate::keepalive::{KeepaliveReader, ReadEvent};
use chatgate_translate::{LineDecoder, ProtocolTranslator};
use chatgate_types::{DownstreamEvent, traits::ByteStream};
use futures_core::Stream;
use futures_util::stream;
use std::{collections::VecDeque, pin::Pin, time::Duration};

/// A pinned, sendable stream of downstream events.
pub type EventStream = Pin<Box<dyn Stream<Item = DownstreamEvent> + Send>>;

/// `errorType` of the event emitted when the upstream body stops early.
pub const STREAM_ERROR: &str = "stream_error";

struct Pipeline {
    reader: KeepaliveReader,
    decoder: LineDecoder,
    translator: ProtocolTranslator,
    queue: VecDeque<DownstreamEvent>,
    started: bool,
    closed: bool,
}

impl Pipeline {
    fn feed(&mut self, line: &str) {
        if let Some(event) = self.translator.feed_line(line) {
            self.queue.push_back(event);
        }
    }
}

/// Translate a raw Messages API event stream, interleaving a `ping` whenever
/// the upstream stays silent for `heartbeat`.
#[must_use]
pub fn downstream_events(body: ByteStream, heartbeat: Duration) -> EventStream {
    let pipeline = Pipeline {
        reader: KeepaliveReader::new(body, heartbeat),
        decoder: LineDecoder::new(),
        translator: ProtocolTranslator::new(),
        queue: VecDeque::new(),
        started: false,
        closed: false,
    };

    Box::pin(stream::unfold(pipeline, |mut p| async move {
        loop {
            if let Some(event) = p.queue.pop_front() {
                return Some((event, p));
            }
            if p.closed {
                return None;
            }
            if !p.started {
                p.started = true;
                return Some((DownstreamEvent::Ping, p));
            }

            match p.reader.next_event().await {
                ReadEvent::Data(bytes) => {
                    for line in p.decoder.push(&bytes) {
                        p.feed(&line);
                    }
                    if p.translator.is_finished() {
                        tracing::debug!("upstream message complete");
                        p.closed = true;
                    }
                }
                ReadEvent::Heartbeat => return Some((DownstreamEvent::Ping, p)),
                ReadEvent::End(err) => {
                    if let Some(line) = p.decoder.finish() {
                        p.feed(&line);
                    }
                    if !p.translator.is_finished() {
                        match &err {
                            Some(e) => tracing::warn!(error = %e, "upstream read failed"),
                            None => tracing::warn!("upstream ended before message_stop"),
                        }
                        p.queue.push_back(DownstreamEvent::error(
                            "Upstream stream ended unexpectedly",
                            STREAM_ERROR,
                        ));
                    }
                    p.closed = true;
                }
            }
        }
    }))
}
