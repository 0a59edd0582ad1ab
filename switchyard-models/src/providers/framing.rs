//! Line framing for streamed response bodies.
//!
//! Both SSE and NDJSON bodies are line oriented. [`decode`] splits an
//! arbitrary byte stream into lines and feeds each line to a wire-specific
//! [`Decoder`], yielding the chunks it produces. The body is pulled only as
//! chunks are requested, so nothing is buffered beyond one partial line.

use std::collections::VecDeque;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use memchr::memchr;
use tokio_stream::Stream;

use super::{ChatStream, Chunk};
use crate::{Error, Result};

/// Translates the lines of one wire protocol into chunks.
pub(crate) trait Decoder: Send + 'static {
    /// Decode one line (without its terminator).
    fn line(&mut self, line: &str) -> Result<Vec<Chunk>>;

    /// Whether the protocol has signalled its end; no more lines are read.
    fn is_done(&self) -> bool;

    /// Called once when the body ends before [`is_done`](Decoder::is_done).
    fn end_of_body(&mut self) -> Option<Chunk> {
        None
    }
}

struct Framer<D> {
    body: BoxStream<'static, Result<Vec<u8>>>,
    buffer: Vec<u8>,
    pending: VecDeque<Chunk>,
    decoder: D,
    body_done: bool,
    finished: bool,
}

impl<D: Decoder> Framer<D> {
    fn feed(&mut self, raw: &[u8]) -> Result<()> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::UpstreamProtocol(format!("invalid UTF-8 in stream: {e}")))?;
        self.pending.extend(self.decoder.line(line)?);
        Ok(())
    }
}

/// Decode a byte stream into chunks using `decoder`.
///
/// Errors from the body or the decoder are yielded once and end the stream.
pub(crate) fn decode<S, B, E, D>(body: S, decoder: D) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Into<Error>,
    D: Decoder,
{
    let body = body
        .map(|item| item.map(|bytes| bytes.as_ref().to_vec()).map_err(Into::into))
        .boxed();

    let framer = Framer {
        body,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        decoder,
        body_done: false,
        finished: false,
    };

    Box::pin(stream::unfold(framer, |mut st| async move {
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                return Some((Ok(chunk), st));
            }
            if st.finished {
                return None;
            }
            if st.decoder.is_done() {
                st.finished = true;
                continue;
            }

            if let Some(pos) = memchr(b'\n', &st.buffer) {
                let raw: Vec<u8> = st.buffer.drain(..=pos).collect();
                if let Err(e) = st.feed(&raw[..pos]) {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                continue;
            }

            if st.body_done {
                if !st.buffer.is_empty() {
                    let raw = std::mem::take(&mut st.buffer);
                    if let Err(e) = st.feed(&raw) {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                    continue;
                }
                st.finished = true;
                if let Some(chunk) = st.decoder.end_of_body() {
                    st.pending.push_back(chunk);
                }
                continue;
            }

            match st.body.next().await {
                Some(Ok(bytes)) => st.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => st.body_done = true,
            }
        }
    }))
}
