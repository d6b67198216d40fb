//! Incremental decoder for `data:`-framed chat-completion streams.
//!
//! [`FrameDecoder`] buffers raw bytes across reads and only parses complete
//! lines. Lines are split on the `\n` byte, which never occurs inside a
//! multi-byte UTF-8 sequence, so a read boundary that cuts a code point or a
//! frame in half is harmless. [`decode_frames`] lifts the decoder over an
//! async byte stream.

use futures::{Stream, StreamExt};
use serde::Deserialize;

const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Stateful line-buffering decoder. Feed it reads with [`push`](Self::push).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    skipped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one read and return the deltas carried by every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        // Everything after the last newline is an incomplete line and stays buffered.
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    /// Number of malformed frames skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes of the incomplete trailing line still held back.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<String> {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line,
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, frame_len = line.len(), "skipping frame with invalid UTF-8");
                return None;
            }
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        let data = line.strip_prefix(DATA_MARKER)?;
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data.is_empty() || data == DONE_SENTINEL {
            return None;
        }

        match serde_json::from_str::<ChunkPayload>(data) {
            Ok(payload) => payload
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content)
                .filter(|text| !text.is_empty()),
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, frame_len = data.len(), "skipping malformed frame");
                None
            }
        }
    }
}

/// Decode a byte stream into text deltas.
///
/// Deltas come out in arrival order. A transport error is forwarded once and
/// ends the stream. An incomplete trailing line at end of input is dropped.
pub fn decode_frames<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    bytes
        .scan((FrameDecoder::new(), false), |(decoder, failed), read| {
            if *failed {
                return futures::future::ready(None);
            }
            let items: Vec<Result<String, E>> = match read {
                Ok(chunk) => decoder.push(chunk.as_ref()).into_iter().map(Ok).collect(),
                Err(e) => {
                    *failed = true;
                    vec![Err(e)]
                }
            };
            futures::future::ready(Some(items))
        })
        .flat_map(futures::stream::iter)
}
