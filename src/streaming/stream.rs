//! Streaming call executor
//!
//! Turns one HTTP response body into a lazy sequence of decoded objects,
//! one per NDJSON line:
//!
//! ```text
//! Idle --poll--> Connecting --200--> Receiving --eof--> Completed
//!                    |                  |  ^
//!                    | !200             |  | chunk appended / line decoded
//!                    v                  v  |
//!             ReadingErrorBody --> Failed  +
//!
//! any non-terminal state --cancel--> Cancelled
//! ```
//!
//! The request is only issued on the first poll. Lines are decoded one per
//! poll, and more bytes are only read once no complete line is buffered.

use crate::errors::{bad_server_response, ClientError, Result};
use crate::streaming::parser::{decode_line, LineBuffer};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, FusedStream};
use futures_util::{FutureExt, Stream, StreamExt};
use reqwest::{Client, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Execution state of one streaming call
enum StreamState {
    /// Built but not yet sent
    Idle { http: Client, request: Request },

    /// Waiting for response headers
    Connecting(BoxFuture<'static, reqwest::Result<Response>>),

    /// Non-200 status; reading a capped body snippet for the error
    ReadingErrorBody(BoxFuture<'static, ClientError>),

    /// Consuming body chunks
    Receiving(BoxStream<'static, reqwest::Result<Bytes>>),

    Completed,
    Failed,
    Cancelled { reported: bool },
}

impl StreamState {
    fn name(&self) -> &'static str {
        match self {
            StreamState::Idle { .. } => "idle",
            StreamState::Connecting(_) => "connecting",
            StreamState::ReadingErrorBody(_) => "reading_error_body",
            StreamState::Receiving(_) => "receiving",
            StreamState::Completed => "completed",
            StreamState::Failed => "failed",
            StreamState::Cancelled { .. } => "cancelled",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled { .. }
        )
    }
}

/// Cloneable handle that cancels a stream from anywhere
///
/// `cancel()` signals the token and wakes the stream's task. The response is
/// dropped, closing the connection, when that task next polls the stream or
/// drops it; a task already awaiting `next()` is woken and does so at once.
/// Use [`NdjsonStream::cancel`] from the owning task to release the
/// transport synchronously.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Request cancellation; the transport is released on the stream's next poll or drop
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Lazy, cancelable sequence of objects decoded from an NDJSON body
///
/// Yields `Ok(item)` per line in arrival order. Ends with `None` on clean
/// completion, or with exactly one `Err` on failure or cancellation.
/// A trailing line without a newline terminator is discarded.
pub struct NdjsonStream<T> {
    state: StreamState,
    buffer: LineBuffer,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NdjsonStream<T> {
    /// Stream for a request that has not been sent yet
    pub(crate) fn new(http: Client, request: Request) -> Self {
        Self::with_state(StreamState::Idle { http, request })
    }

    /// Stream over an already-open byte source
    #[cfg(test)]
    pub(crate) fn from_byte_stream<S>(bytes: S) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self::with_state(StreamState::Receiving(bytes.boxed()))
    }

    fn with_state(state: StreamState) -> Self {
        let token = CancellationToken::new();
        let cancelled = Box::pin(token.clone().cancelled_owned());
        Self {
            state,
            buffer: LineBuffer::new(),
            token,
            cancelled,
            _item: PhantomData,
        }
    }
}

impl<T> NdjsonStream<T> {
    /// Handle for cancelling this stream from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// Cancel now, dropping the in-flight transport operation immediately
    pub fn cancel(&mut self) {
        self.token.cancel();
        if !self.state.is_terminal() {
            self.enter_cancelled();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, StreamState::Cancelled { .. })
    }

    /// True once the request has been sent
    pub fn is_started(&self) -> bool {
        !matches!(self.state, StreamState::Idle { .. })
    }

    /// Idle -> Connecting: send the request
    fn start(&mut self) {
        self.state = match std::mem::replace(&mut self.state, StreamState::Failed) {
            StreamState::Idle { http, request } => {
                tracing::debug!(method = %request.method(), url = %request.url(), "issuing streaming request");
                StreamState::Connecting(http.execute(request).boxed())
            }
            other => other,
        };
    }

    fn enter_cancelled(&mut self) {
        tracing::debug!(state = self.state.name(), "NDJSON stream cancelled");
        // Dropping the previous state drops the response and aborts the transfer
        self.state = StreamState::Cancelled { reported: false };
        self.buffer.clear();
    }

    fn fail(&mut self, err: ClientError) -> Poll<Option<Result<T>>> {
        tracing::debug!(error = %err, "NDJSON stream failed");
        self.state = StreamState::Failed;
        self.buffer.clear();
        Poll::Ready(Some(Err(err)))
    }
}

impl<T: DeserializeOwned> Stream for NdjsonStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if !this.state.is_terminal() && this.cancelled.as_mut().poll(cx).is_ready() {
                this.enter_cancelled();
            }

            match &mut this.state {
                StreamState::Idle { .. } => this.start(),

                StreamState::Connecting(pending) => match pending.poll_unpin(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => return this.fail(ClientError::TransportError(e)),
                    Poll::Ready(Ok(response)) => {
                        let status = response.status();
                        if status == StatusCode::OK {
                            this.state = StreamState::Receiving(response.bytes_stream().boxed());
                        } else {
                            tracing::warn!(%status, url = %response.url(), "unexpected status on streaming call");
                            this.state =
                                StreamState::ReadingErrorBody(bad_server_response(response).boxed());
                        }
                    }
                },

                StreamState::ReadingErrorBody(pending) => match pending.poll_unpin(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(err) => return this.fail(err),
                },

                StreamState::Receiving(body) => {
                    // Drain buffered lines before reading more bytes
                    if let Some(line) = this.buffer.next_line() {
                        let len = line.len();
                        match decode_line::<T>(line) {
                            Ok(item) => {
                                tracing::trace!(bytes = len, "decoded NDJSON line");
                                return Poll::Ready(Some(Ok(item)));
                            }
                            Err(err) => return this.fail(err),
                        }
                    }

                    match body.poll_next_unpin(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(chunk))) => this.buffer.push(&chunk),
                        Poll::Ready(Some(Err(e))) => {
                            return this.fail(ClientError::TransportError(e));
                        }
                        Poll::Ready(None) => {
                            if !this.buffer.is_empty() {
                                tracing::debug!(
                                    bytes = this.buffer.len(),
                                    "discarding unterminated trailing line"
                                );
                            }
                            this.buffer.clear();
                            this.state = StreamState::Completed;
                            tracing::debug!("NDJSON stream completed");
                            return Poll::Ready(None);
                        }
                    }
                }

                StreamState::Cancelled { reported } => {
                    if *reported {
                        return Poll::Ready(None);
                    }
                    *reported = true;
                    return Poll::Ready(Some(Err(ClientError::Cancelled)));
                }

                StreamState::Completed | StreamState::Failed => return Poll::Ready(None),
            }
        }
    }
}

impl<T: DeserializeOwned> FusedStream for NdjsonStream<T> {
    fn is_terminated(&self) -> bool {
        match self.state {
            StreamState::Completed | StreamState::Failed => true,
            StreamState::Cancelled { reported } => reported,
            _ => false,
        }
    }
}

impl<T> Drop for NdjsonStream<T> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.token.cancel();
            tracing::debug!(state = self.state.name(), "NDJSON stream dropped before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_test::block_on;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Progress {
        status: String,
    }

    const BODY: &str = "{\"status\":\"pulling manifest\"}\n\
                        {\"status\":\"downloading\"}\n\
                        {\"status\":\"verifying\"}\n\
                        {\"status\":\"success\"}\n";

    fn from_chunks(chunks: Vec<Vec<u8>>) -> NdjsonStream<Progress> {
        let chunks = chunks.into_iter().map(|c| Ok::<_, reqwest::Error>(Bytes::from(c)));
        NdjsonStream::from_byte_stream(stream::iter(chunks))
    }

    fn collect(mut s: NdjsonStream<Progress>) -> Vec<Result<Progress>> {
        block_on(async {
            let mut out = Vec::new();
            while let Some(item) = s.next().await {
                out.push(item);
            }
            out
        })
    }

    fn statuses(items: Vec<Result<Progress>>) -> Vec<String> {
        items.into_iter().map(|r| r.unwrap().status).collect()
    }

    fn expected() -> Vec<String> {
        ["pulling manifest", "downloading", "verifying", "success"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_whole_body_in_one_chunk() {
        let items = collect(from_chunks(vec![BODY.as_bytes().to_vec()]));
        assert_eq!(statuses(items), expected());
    }

    #[test]
    fn test_one_byte_chunks() {
        let chunks = BODY.bytes().map(|b| vec![b]).collect();
        assert_eq!(statuses(collect(from_chunks(chunks))), expected());
    }

    #[test]
    fn test_every_two_way_split() {
        let bytes = BODY.as_bytes();
        for split in 0..=bytes.len() {
            let chunks = vec![bytes[..split].to_vec(), bytes[split..].to_vec()];
            assert_eq!(
                statuses(collect(from_chunks(chunks))),
                expected(),
                "split at {}",
                split
            );
        }
    }

    #[test]
    fn test_fixed_size_chunks() {
        let bytes = BODY.as_bytes();
        for size in [2, 3, 7, 13, 29] {
            let chunks = bytes.chunks(size).map(|c| c.to_vec()).collect();
            assert_eq!(statuses(collect(from_chunks(chunks))), expected(), "chunk size {}", size);
        }
    }

    #[test]
    fn test_empty_chunks_are_harmless() {
        let chunks = vec![
            Vec::new(),
            b"{\"status\":\"a\"}".to_vec(),
            Vec::new(),
            b"\n".to_vec(),
            Vec::new(),
        ];
        let items = collect(from_chunks(chunks));
        assert_eq!(statuses(items), vec!["a".to_string()]);
    }

    #[test]
    fn test_trailing_partial_line_dropped() {
        let chunks = vec![b"{\"status\":\"a\"}\n{\"status\":\"b\"}".to_vec()];
        let items = collect(from_chunks(chunks));
        assert_eq!(statuses(items), vec!["a".to_string()]);
    }

    #[test]
    fn test_empty_body_completes() {
        let items = collect(from_chunks(vec![]));
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_line_stops_stream() {
        // The third line is complete and buffered but must never be emitted
        let chunks = vec![b"{\"status\":\"a\"}\n{\"status\":5}\n{\"status\":\"c\"}\n".to_vec()];
        let mut items = collect(from_chunks(chunks));

        assert_eq!(items.len(), 2);
        assert!(matches!(items.pop(), Some(Err(ClientError::DecodeError(_)))));
        assert_eq!(items.pop().unwrap().unwrap().status, "a");
    }

    #[test]
    fn test_blank_line_is_decode_error() {
        let chunks = vec![b"{\"status\":\"a\"}\n\n{\"status\":\"b\"}\n".to_vec()];
        let items = collect(from_chunks(chunks));

        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(ClientError::DecodeError(_))));
    }

    #[test]
    fn test_cancel_after_items() {
        let mut s = from_chunks(vec![BODY.as_bytes().to_vec()]);

        block_on(async {
            assert_eq!(s.next().await.unwrap().unwrap().status, "pulling manifest");
            s.cancel();
            assert!(s.is_cancelled());
            assert!(matches!(s.next().await, Some(Err(ClientError::Cancelled))));
            assert!(s.next().await.is_none());
            assert!(s.is_terminated());
        });
    }

    #[test]
    fn test_cancel_handle_from_elsewhere() {
        let mut s = from_chunks(vec![BODY.as_bytes().to_vec()]);
        let handle = s.cancel_handle();

        block_on(async {
            assert!(s.next().await.unwrap().is_ok());
            assert!(s.next().await.unwrap().is_ok());
            handle.cancel();
            assert!(handle.is_cancelled());
            assert!(matches!(s.next().await, Some(Err(ClientError::Cancelled))));
            assert!(s.next().await.is_none());
        });
    }

    #[test]
    fn test_cancel_stops_reading_transport() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let chunks = BODY
            .lines()
            .map(|l| format!("{}\n", l).into_bytes())
            .collect::<Vec<_>>();
        let source = stream::iter(chunks).map(move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, reqwest::Error>(Bytes::from(c))
        });
        let mut s: NdjsonStream<Progress> = NdjsonStream::from_byte_stream(source);

        block_on(async {
            assert!(s.next().await.unwrap().is_ok());
            s.cancel();
            assert!(matches!(s.next().await, Some(Err(ClientError::Cancelled))));
            assert!(s.next().await.is_none());
        });
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_after_completion_is_noop() {
        let mut s = from_chunks(vec![b"{\"status\":\"a\"}\n".to_vec()]);

        block_on(async {
            assert!(s.next().await.unwrap().is_ok());
            assert!(s.next().await.is_none());
            s.cancel();
            assert!(!s.is_cancelled());
            assert!(s.next().await.is_none());
        });
    }
}
