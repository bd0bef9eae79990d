//! Logging trait for model client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request sent through the [`OpenAi`](crate::OpenAi) client and every
//! chunk streamed back, plus [`JsonlLogger`], which appends them to a file as
//! JSON lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, Result};
use crate::types::{ChatCompletionChunk, ChatRequest};

/// A trait for logging model client operations.
///
/// Implement this trait to capture all traffic with the model endpoint.
/// Loggers must never fail the session; implementations swallow their own
/// I/O errors.
pub trait ClientLogger: Send + Sync {
    /// Log a request right before it is sent.
    fn log_request(&self, request: &ChatRequest<'_>);

    /// Log an individual streamed chunk.
    fn log_chunk(&self, chunk: &ChatCompletionChunk);

    /// Log a failed request or a failure in the middle of a stream.
    fn log_error(&self, error: &Error);
}

/// Appends one JSON object per event to a file.
///
/// Each line looks like `{"event": "request", "body": {...}}`,
/// `{"event": "chunk", "body": {...}}` or `{"event": "error", "message": "..."}`.
pub struct JsonlLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlLogger {
    /// Open (or create) `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open client log", err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn append(&self, value: serde_json::Value) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if serde_json::to_writer(&mut *writer, &value).is_ok() {
            let _ = writer.write_all(b"\n");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for JsonlLogger {
    fn log_request(&self, request: &ChatRequest<'_>) {
        self.append(json!({"event": "request", "body": request}));
    }

    fn log_chunk(&self, chunk: &ChatCompletionChunk) {
        self.append(json!({"event": "chunk", "body": chunk}));
    }

    fn log_error(&self, error: &Error) {
        self.append(json!({"event": "error", "message": error.to_string()}));
    }
}
