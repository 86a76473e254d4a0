//! Heartbeats for long-lived upstream reads.
//!
//! Exactly one read against the upstream body is outstanding at a time. Each
//! call races that read against a fixed interval; when the interval wins the
//! caller gets a [`ReadEvent::Heartbeat`] and the same read stays pending for
//! the next call. A second read is never started while one is in flight.
//!
//! The pending read lives in the reader, not in the `next_event` future, so
//! dropping a `next_event` call does not lose it.

use bytes::Bytes;
use chatgate_types::{GatewayError, traits::ByteStream};
use futures_util::{StreamExt as _, stream::StreamFuture};
use std::time::Duration;

/// One outcome of [`KeepaliveReader::next_event`].
#[derive(Debug)]
pub enum ReadEvent {
    Data(Bytes),
    Heartbeat,
    /// The body ended; carries the read error if it failed.
    End(Option<GatewayError>),
}

enum ReadState {
    /// No read outstanding; the next call starts one.
    Idle(ByteStream),
    Reading(StreamFuture<ByteStream>),
    /// The body ended or failed. The stream has been dropped.
    Closed,
}

pub struct KeepaliveReader {
    state: ReadState,
    interval: Duration,
}

impl KeepaliveReader {
    #[must_use]
    pub fn new(body: ByteStream, interval: Duration) -> Self {
        Self {
            state: ReadState::Idle(body),
            interval,
        }
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        matches!(self.state, ReadState::Closed)
    }

    /// Wait for the next chunk, emitting a heartbeat each time the interval
    /// elapses first.
    pub async fn next_event(&mut self) -> ReadEvent {
        self.state = match std::mem::replace(&mut self.state, ReadState::Closed) {
            ReadState::Idle(body) => ReadState::Reading(body.into_future()),
            other => other,
        };
        let ReadState::Reading(read) = &mut self.state else {
            return ReadEvent::End(None);
        };

        let (item, body) = tokio::select! {
            biased;
            done = read => done,
            () = tokio::time::sleep(self.interval) => return ReadEvent::Heartbeat,
        };

        match item {
            Some(Ok(bytes)) => {
                self.state = ReadState::Idle(body);
                ReadEvent::Data(bytes)
            }
            Some(Err(e)) => {
                self.state = ReadState::Closed;
                ReadEvent::End(Some(e))
            }
            None => {
                self.state = ReadState::Closed;
                ReadEvent::End(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_types::traits::Result;
    use futures_util::stream;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Source whose items arrive after the given delays; counts how many reads
    /// were started.
    fn delayed_source(delays: Vec<u64>, reads: Arc<AtomicUsize>) -> ByteStream {
        Box::pin(stream::unfold(0usize, move |i| {
            let reads = reads.clone();
            let delay = delays.get(i).copied();
            async move {
                reads.fetch_add(1, Ordering::SeqCst);
                let secs = delay?;
                tokio::time::sleep(Duration::from_secs(secs)).await;
                let item: Result<Bytes> = Ok(Bytes::from(format!("chunk-{i}")));
                Some((item, i + 1))
            }
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_upstream_heartbeats_then_single_read() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut reader =
            KeepaliveReader::new(delayed_source(vec![5], reads.clone()), Duration::from_secs(2));

        let mut heartbeats = 0;
        let data = loop {
            match reader.next_event().await {
                ReadEvent::Heartbeat => heartbeats += 1,
                ReadEvent::Data(b) => break b,
                ReadEvent::End(e) => panic!("unexpected end: {e:?}"),
            }
        };
        assert!(heartbeats >= 2, "got {heartbeats} heartbeats");
        assert_eq!(data, Bytes::from("chunk-0"));
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        assert!(matches!(reader.next_event().await, ReadEvent::End(None)));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert!(reader.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_upstream_no_heartbeat() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut reader =
            KeepaliveReader::new(delayed_source(vec![0, 1], reads.clone()), Duration::from_secs(2));

        assert!(matches!(reader.next_event().await, ReadEvent::Data(b) if b == "chunk-0"));
        assert!(matches!(reader.next_event().await, ReadEvent::Data(b) if b == "chunk-1"));
        assert!(matches!(reader.next_event().await, ReadEvent::End(None)));
        assert_eq!(reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_ends_with_error() {
        let body: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Err(GatewayError::Http("connection reset".into())),
            Ok(Bytes::from_static(b"never")),
        ]));
        let mut reader = KeepaliveReader::new(body, Duration::from_secs(2));

        assert!(matches!(reader.next_event().await, ReadEvent::Data(_)));
        assert!(matches!(
            reader.next_event().await,
            ReadEvent::End(Some(GatewayError::Http(_)))
        ));
        // the failed body is gone; nothing more is read from it
        assert!(matches!(reader.next_event().await, ReadEvent::End(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_keeps_pending_read() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut reader =
            KeepaliveReader::new(delayed_source(vec![3], reads.clone()), Duration::from_secs(10));

        // abandon the first wait before anything happens
        let _ = tokio::time::timeout(Duration::from_secs(1), reader.next_event()).await;
        assert!(matches!(reader.next_event().await, ReadEvent::Data(_)));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }
}
