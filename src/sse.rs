//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a chat-completions response into
//! a stream of [`ChatCompletionChunk`]s.  Each event is a `data:` line holding
//! one JSON chunk; the literal `data: [DONE]` ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS};
use crate::types::ChatCompletionChunk;
use crate::{Error, Result};

/// What a single SSE event turned out to hold.
#[derive(Debug)]
enum SseEvent {
    Chunk(Result<ChatCompletionChunk>),
    Failed(Error),
    Done,
    Skip,
}

struct SseState<S> {
    stream: S,
    pending: Vec<u8>,
    buffer: String,
    done: bool,
}

/// Process a stream of bytes into a stream of completion chunks.
///
/// Bytes are buffered until a full event (terminated by a blank line) is
/// available, so events and multi-byte characters may be split across network
/// reads arbitrarily.  Comment lines and events without data are skipped.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result.map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        stream,
        pending: Vec::new(),
        buffer: String::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            // First check if we have a complete event in the buffer
            while let Some((event, remaining)) = extract_event(&state.buffer) {
                state.buffer = remaining;
                match event {
                    SseEvent::Chunk(chunk) => {
                        match &chunk {
                            Ok(_) => STREAM_CHUNKS.click(),
                            Err(_) => STREAM_ERRORS.click(),
                        }
                        return Some((chunk, state));
                    }
                    SseEvent::Failed(err) => {
                        STREAM_ERRORS.click();
                        state.done = true;
                        return Some((Err(err), state));
                    }
                    SseEvent::Done => {
                        state.done = true;
                        return None;
                    }
                    SseEvent::Skip => {}
                }
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    if let Err(err) = push_utf8(&mut state.pending, &mut state.buffer, &bytes) {
                        STREAM_ERRORS.click();
                        state.done = true;
                        return Some((Err(err), state));
                    }
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    // End of stream without [DONE]; flush a trailing event if any.
                    state.done = true;
                    if !state.buffer.trim().is_empty() {
                        let tail = std::mem::take(&mut state.buffer) + "\n\n";
                        match extract_event(&tail) {
                            Some((SseEvent::Chunk(chunk), _)) => return Some((chunk, state)),
                            Some((SseEvent::Failed(err), _)) => {
                                STREAM_ERRORS.click();
                                return Some((Err(err), state));
                            }
                            _ => {}
                        }
                    }
                    return None;
                }
            }
        }
    })
}

/// Append `bytes` to `buffer`, carrying an incomplete trailing UTF-8 sequence
/// over in `pending`.  Line endings are normalized to `\n`.
fn push_utf8(pending: &mut Vec<u8>, buffer: &mut String, bytes: &[u8]) -> Result<()> {
    pending.extend_from_slice(bytes);
    let valid_up_to = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => {
            return Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            ));
        }
    };
    let rest = pending.split_off(valid_up_to);
    let text = String::from_utf8(std::mem::replace(pending, rest)).map_err(|e| {
        Error::encoding(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e)))
    })?;
    buffer.push_str(&text.replace("\r\n", "\n"));
    Ok(())
}

/// Extract a complete SSE event from a buffer string.
fn extract_event(buffer: &str) -> Option<(SseEvent, String)> {
    // Simple SSE parsing - each event is delimited by double newlines
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    // Multiple data lines are joined with newlines; comments are ignored.
    let mut data: Option<String> = None;
    for line in event_text.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    let event = match data.as_deref().map(str::trim) {
        None | Some("") => SseEvent::Skip,
        Some("[DONE]") => SseEvent::Done,
        Some(json_str) => parse_data(json_str),
    };
    Some((event, rest))
}

/// Interpret the data of one event as either a chunk or an error report.
fn parse_data(json_str: &str) -> SseEvent {
    let parse_error = |e: serde_json::Error| {
        SseEvent::Chunk(Err(Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )))
    };
    let value = match serde_json::from_str::<serde_json::Value>(json_str) {
        Ok(value) => value,
        Err(e) => return parse_error(e),
    };
    match value.get("error") {
        Some(error) if !error.is_null() => SseEvent::Failed(stream_failure(error)),
        _ => match serde_json::from_value::<ChatCompletionChunk>(value) {
            Ok(chunk) => SseEvent::Chunk(Ok(chunk)),
            Err(e) => parse_error(e),
        },
    }
}

/// Build the error for an `{"error": ...}` payload sent mid-stream.
fn stream_failure(error: &serde_json::Value) -> Error {
    let message = error
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))
        .unwrap_or_else(|| error.to_string());
    let message = match error.get("type").and_then(serde_json::Value::as_str) {
        Some(error_type) => format!("Model stream failed ({error_type}): {message}"),
        None => format!("Model stream failed: {message}"),
    };
    Error::streaming(message, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect_texts(chunks: Vec<&'static [u8]>) -> Vec<Result<Option<String>>> {
        process_sse(byte_stream(chunks))
            .map(|chunk| chunk.map(|c| c.text().map(str::to_string)))
            .collect()
            .await
    }

    #[tokio::test]
    async fn parse_content_events() {
        let texts = collect_texts(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"hel\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        ])
        .await;
        let texts: Vec<_> = texts.into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(texts, vec![Some("hel".to_string()), Some("lo".to_string())]);
    }

    #[tokio::test]
    async fn done_ends_the_stream() {
        let texts = collect_texts(vec![
            b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        ])
        .await;
        assert!(texts.is_empty());
    }

    #[tokio::test]
    async fn handle_split_event() {
        let texts = collect_texts(vec![
            b"data: {\"choices\":[{\"de",
            b"lta\":{\"content\":\"x\"}}]}\n",
            b"\n",
        ])
        .await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn handle_split_multibyte_character() {
        // "é" is 0xC3 0xA9; split it across two reads.
        let texts = collect_texts(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"\xC3",
            b"\xA9\"}}]}\n\n",
        ])
        .await;
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("é"));
    }

    #[tokio::test]
    async fn comments_and_crlf_are_tolerated() {
        let texts = collect_texts(vec![
            b": keep-alive\r\n\r\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n",
        ])
        .await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let texts = collect_texts(vec![b"data: not json\n\n"]).await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].is_err());
    }

    #[tokio::test]
    async fn error_event_fails_the_stream() {
        let texts = collect_texts(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n",
            b"data: {\"error\":{\"message\":\"The server had an error\",\"type\":\"server_error\"}}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"tial\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("par"));
        let err = texts[1].as_ref().unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
        let message = err.to_string();
        assert!(message.contains("server_error"), "{message}");
        assert!(message.contains("The server had an error"), "{message}");
    }

    #[tokio::test]
    async fn bare_error_string_fails_the_stream() {
        let texts = collect_texts(vec![b"data: {\"error\":\"overloaded\"}"]).await;
        assert_eq!(texts.len(), 1);
        let err = texts[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn null_error_is_an_ordinary_chunk() {
        let texts = collect_texts(vec![
            b"data: {\"error\":null,\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
        ])
        .await;
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn null_delta_does_not_fail_the_stream() {
        let texts = collect_texts(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"done\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":null,\"finish_reason\":\"stop\"}]}\n\n",
            b"data: [DONE]\n\n",
        ])
        .await;
        let texts: Vec<_> = texts.into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(texts, vec![Some("done".to_string()), None]);
    }

    #[tokio::test]
    async fn trailing_event_without_terminator() {
        let texts = collect_texts(vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"])
            .await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].as_ref().unwrap().as_deref(), Some("end"));
    }
}
