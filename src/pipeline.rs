//! Tee-verify pipeline for inbound webhook bodies.
//!
//! A request body must be hashed for signature verification and decoded as
//! JSON from a single pass over the transport stream. [`verify_stream`] wraps
//! the body so every chunk the consumer reads is also fed, in order, to a
//! spawned task running the HMAC computation. The task finalizes once the
//! feed closes (end of stream, [`TeeBody::close`], or drop) and reports its
//! verdict through the [`VerifyHandle`] handshake.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use hmac::Mac;
use tokio::sync::{mpsc, oneshot};

use crate::error::{LineBotError, Result};
use crate::signature;

enum FeedItem {
    Chunk(Bytes),
    Failed(String),
}

/// Starts the verification task and returns the teeing body wrapper plus the
/// handle used to retrieve the verdict.
///
/// The feed channel is unbounded so the consumer's reads are never delayed by
/// the hashing task; the task drains continuously, so the channel holds at
/// most the chunks produced since its last wakeup.
pub fn verify_stream<S, E>(body: S, secret: &str, expected: &str) -> (TeeBody<S>, VerifyHandle)
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    let (feed_tx, mut feed_rx) = mpsc::unbounded_channel::<FeedItem>();
    let (done_tx, done_rx) = oneshot::channel::<Result<bool>>();

    let secret = secret.to_string();
    let expected = expected.to_string();
    tokio::spawn(async move {
        let mut mac = signature::mac_for(&secret);
        let mut failure: Option<String> = None;
        while let Some(item) = feed_rx.recv().await {
            match item {
                FeedItem::Chunk(chunk) => mac.update(&chunk),
                FeedItem::Failed(reason) => {
                    failure = Some(reason);
                    break;
                }
            }
        }
        let outcome = match failure {
            Some(reason) => Err(LineBotError::Runtime(reason)),
            None => Ok(signature::digest_matches(
                &signature::encode_digest(mac),
                &expected,
            )),
        };
        let _ = done_tx.send(outcome);
    });

    let tee = TeeBody {
        inner: body,
        feed: Some(feed_tx),
    };
    (tee, VerifyHandle { done: done_rx })
}

/// Readable wrapper around the request body. Every chunk it yields has
/// already been forwarded to the verification task; dropping it (or reaching
/// end of stream) closes the feed and lets the task finalize.
pub struct TeeBody<S> {
    inner: S,
    feed: Option<mpsc::UnboundedSender<FeedItem>>,
}

impl<S, E> Stream for TeeBody<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = std::result::Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(feed) = &this.feed {
                    let _ = feed.send(FeedItem::Chunk(chunk.clone()));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                // The verifier must observe the same truncation the consumer
                // sees, so the failure is forwarded before the feed closes.
                if let Some(feed) = this.feed.take() {
                    let _ = feed.send(FeedItem::Failed(err.to_string()));
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.feed = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> TeeBody<S> {
    /// Closes the feed early. Only needed by consumers that stop reading
    /// before end of stream; the verdict then covers the bytes read so far.
    pub fn close(&mut self) {
        self.feed = None;
    }
}

impl<S, E> TeeBody<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    /// Reads the body to exhaustion and returns the buffered bytes.
    ///
    /// Consuming `self` closes the feed before returning, which makes a
    /// subsequent [`VerifyHandle::wait`] safe: the verification task is
    /// guaranteed to observe end of stream.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.next().await {
            let chunk = chunk.map_err(|e| LineBotError::Runtime(e.to_string()))?;
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }
}

/// Completion handshake for the verification task. The outcome resolves
/// exactly once, when the task has observed end of feed (or a forwarded
/// stream failure).
pub struct VerifyHandle {
    done: oneshot::Receiver<Result<bool>>,
}

impl VerifyHandle {
    /// Blocking mode: suspends until the verification task reports.
    ///
    /// The body must have been read to exhaustion and closed first (for
    /// example via [`TeeBody::collect`]); waiting while the feed is still
    /// open suspends until whoever holds the body drops it. Being a plain
    /// future, the call composes with `tokio::time::timeout` when a deadline
    /// is wanted.
    pub async fn wait(self) -> Result<bool> {
        match self.done.await {
            Ok(outcome) => outcome,
            Err(_) => Err(LineBotError::Internal(
                "verification task exited without reporting".to_string(),
            )),
        }
    }

    /// Non-blocking mode: returns `Err(NotReady)` immediately when the
    /// verdict has not resolved yet.
    pub fn try_wait(&mut self) -> Result<bool> {
        match self.done.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => Err(LineBotError::NotReady),
            Err(oneshot::error::TryRecvError::Closed) => Err(LineBotError::Internal(
                "verification task exited without reporting".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;
    use std::time::Duration;

    const SECRET: &str = "789012";

    fn chunked(
        body: &[u8],
        sizes: &[usize],
    ) -> Vec<std::result::Result<Bytes, Infallible>> {
        let mut chunks = Vec::new();
        let mut rest = body;
        let mut i = 0;
        while !rest.is_empty() {
            let n = sizes[i % sizes.len()].min(rest.len()).max(1);
            chunks.push(Ok(Bytes::copy_from_slice(&rest[..n])));
            rest = &rest[n..];
            i += 1;
        }
        chunks
    }

    #[tokio::test]
    async fn tee_preserves_bytes_for_any_chunking() {
        let body = br#"{"result":[{"eventType":"x","content":{}}]}"#;
        let digest = crate::signature::sign(SECRET, body);
        for sizes in [&[1usize][..], &[2, 3][..], &[7, 1, 64][..], &[1024][..]] {
            let stream = stream::iter(chunked(body, sizes));
            let (tee, handle) = verify_stream(stream, SECRET, &digest);
            let collected = tee.collect().await.unwrap();
            assert_eq!(collected, body);
            assert!(handle.wait().await.unwrap());
        }
    }

    #[tokio::test]
    async fn mismatched_digest_reports_false() {
        let body = b"payload bytes";
        let stream = stream::iter(chunked(body, &[4]));
        let (tee, handle) = verify_stream(stream, SECRET, "not-the-digest");
        tee.collect().await.unwrap();
        assert!(!handle.wait().await.unwrap());
    }

    #[tokio::test]
    async fn try_wait_is_not_ready_before_close() {
        let body = b"0123456789";
        let digest = crate::signature::sign(SECRET, body);
        let stream = stream::iter(chunked(body, &[2]));
        let (mut tee, mut handle) = verify_stream(stream, SECRET, &digest);

        // One chunk read, feed still open: polling must not suspend.
        let first = tee.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"01");
        assert!(matches!(handle.try_wait(), Err(LineBotError::NotReady)));

        let rest = tee.collect().await.unwrap();
        assert_eq!(rest, b"23456789");
        assert!(handle.wait().await.unwrap());
    }

    #[tokio::test]
    async fn wait_suspends_until_body_is_closed() {
        let body = b"blocking handshake";
        let digest = crate::signature::sign(SECRET, body);
        let stream = stream::iter(chunked(body, &[5]));
        let (tee, handle) = verify_stream(stream, SECRET, &digest);

        let waiter = tokio::spawn(handle.wait());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let collected = tee.collect().await.unwrap();
        assert_eq!(collected, body);
        assert!(waiter.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn try_wait_returns_verdict_after_resolution() {
        let body = b"poll me";
        let digest = crate::signature::sign(SECRET, body);
        let stream = stream::iter(chunked(body, &[3]));
        let (tee, mut handle) = verify_stream(stream, SECRET, &digest);
        tee.collect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.try_wait().unwrap());
    }

    #[tokio::test]
    async fn stream_error_surfaces_through_both_paths() {
        let chunks: Vec<std::result::Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err("connection reset".to_string()),
        ];
        let (tee, handle) = verify_stream(stream::iter(chunks), SECRET, "irrelevant");
        let read_err = tee.collect().await.unwrap_err();
        assert!(read_err.to_string().contains("connection reset"));
        let verify_err = handle.wait().await.unwrap_err();
        assert!(verify_err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn dropping_unread_body_verifies_empty_input() {
        let digest = crate::signature::sign(SECRET, b"");
        let stream = stream::iter(chunked(b"never read", &[4]));
        let (tee, handle) = verify_stream(stream, SECRET, &digest);
        drop(tee);
        assert!(handle.wait().await.unwrap());
    }
}
