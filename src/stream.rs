//! Incremental event stream framing.
//!
//! Each event travels as one server-sent event: `data: <json>` followed by a
//! blank line. The server side turns an `mpsc` channel of [`StreamEvent`]s
//! into an axum [`Sse`] response; the client side feeds raw body chunks into
//! a [`FrameDecoder`], which carries partial lines over between chunks.

use crate::error::{ReadmeError, Result};
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Progress of a streaming generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StreamEvent {
    /// The repository is being fetched
    Analyzing {
        /// Human-readable progress text
        message: String,
    },
    /// Files are fetched and the model has been asked for a README
    Processing {
        /// Human-readable progress text
        message: String,
    },
    /// Generation finished
    Complete {
        /// Generated README markdown
        readme: String,
        /// Repository name as reported by the hosting API
        #[serde(rename = "repoName")]
        repo_name: String,
    },
    /// Generation failed
    Error {
        /// User-facing failure text
        error: String,
    },
}

impl StreamEvent {
    /// Event sent before the repository is fetched
    pub fn analyzing() -> Self {
        Self::Analyzing {
            message: "Analyzing repository...".to_string(),
        }
    }

    /// Event sent once `file_count` files have been fetched
    pub fn processing(file_count: usize) -> Self {
        Self::Processing {
            message: format!("Found {} files, generating README...", file_count),
        }
    }

    /// Terminal failure event for `error`
    pub fn failed(error: &ReadmeError) -> Self {
        Self::Error {
            error: error.user_message(),
        }
    }

    /// Status label carried on the wire
    pub fn status(&self) -> &'static str {
        match self {
            Self::Analyzing { .. } => "analyzing",
            Self::Processing { .. } => "processing",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Serializes one event as a `data:` frame
pub fn to_sse_event(event: &StreamEvent) -> std::result::Result<Event, axum::Error> {
    Event::default().json_data(event)
}

/// Streams every event sent on `receiver`, ending once all senders are dropped
pub fn sse_response(
    receiver: mpsc::Receiver<StreamEvent>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    Sse::new(ReceiverStream::new(receiver).map(|event| to_sse_event(&event)))
}

/// Incremental decoder for frames arriving in arbitrary chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_line(&line[..newline]) {
                events.push(event);
            }
        }
        events
    }

    /// Decodes whatever remains once the body has ended
    pub fn finish(&mut self) -> Option<Result<StreamEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<StreamEvent>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => return Some(Err(ReadmeError::Message(format!("Invalid event frame: {}", e)))),
    };

    let payload = text.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    Some(serde_json::from_str(payload).map_err(ReadmeError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use pretty_assertions::assert_eq;

    /// Sends `events` through the server-side stream and returns the body bytes
    async fn encode_all(events: &[StreamEvent]) -> Vec<u8> {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.send(event.clone()).await.expect("send");
        }
        drop(tx);

        let response = sse_response(rx).into_response();
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    fn decode_all(decoder: &mut FrameDecoder, chunk: &[u8]) -> Vec<StreamEvent> {
        decoder
            .push(chunk)
            .into_iter()
            .map(|event| event.expect("valid frame"))
            .collect()
    }

    #[tokio::test]
    async fn test_wire_format() {
        let body = encode_all(&[
            StreamEvent::analyzing(),
            StreamEvent::Complete {
                readme: "# W".into(),
                repo_name: "widget".into(),
            },
            StreamEvent::Error { error: "boom".into() },
        ])
        .await;

        assert_eq!(
            String::from_utf8(body).expect("utf-8"),
            concat!(
                "data: {\"status\":\"analyzing\",\"message\":\"Analyzing repository...\"}\n\n",
                "data: {\"status\":\"complete\",\"readme\":\"# W\",\"repoName\":\"widget\"}\n\n",
                "data: {\"status\":\"error\",\"error\":\"boom\"}\n\n",
            )
        );
    }

    #[tokio::test]
    async fn test_response_headers() {
        let (_tx, rx) = mpsc::channel(1);
        let response = sse_response(rx).into_response();

        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["cache-control"], "no-cache");
    }

    #[test]
    fn test_processing_message_mentions_count() {
        assert_eq!(
            StreamEvent::processing(1),
            StreamEvent::Processing {
                message: "Found 1 files, generating README...".into()
            }
        );
    }

    #[tokio::test]
    async fn test_decoder_carries_partial_frames() {
        let events = vec![
            StreamEvent::analyzing(),
            StreamEvent::processing(3),
            StreamEvent::Complete {
                readme: "# Über\nline two".into(),
                repo_name: "widget".into(),
            },
        ];
        let bytes = encode_all(&events).await;

        // Split at every 7 bytes, which also cuts through the multi-byte 'Ü'.
        let mut decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        for chunk in bytes.chunks(7) {
            decoded.extend(decode_all(&mut decoder, chunk));
        }

        assert_eq!(decoded, events);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_decoder_ignores_non_data_lines() {
        let mut decoder = FrameDecoder::new();
        let decoded = decode_all(
            &mut decoder,
            b": keep-alive\r\nevent: progress\r\ndata:{\"status\":\"error\",\"error\":\"x\"}\r\n\r\n",
        );
        assert_eq!(decoded, vec![StreamEvent::Error { error: "x".into() }]);
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"status\":\"error\",\"error\":\"late\"}").is_empty());

        let event = decoder.finish().expect("frame").expect("valid");
        assert_eq!(event, StreamEvent::Error { error: "late".into() });
    }

    #[test]
    fn test_malformed_payload_is_reported() {
        let mut decoder = FrameDecoder::new();
        let results = decoder.push(b"data: {not json}\n\n");
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ReadmeError::Json(_))));
    }

    #[test]
    fn test_terminal_events() {
        assert!(!StreamEvent::analyzing().is_terminal());
        assert!(!StreamEvent::processing(0).is_terminal());
        assert!(StreamEvent::Error { error: String::new() }.is_terminal());
        assert_eq!(StreamEvent::failed(&ReadmeError::RepositoryNotFound).status(), "error");
    }
}
