//! Newline-delimited JSON over stdio.
//!
//! Stdout carries outbound sacrifice messages and request responses; stdin
//! carries inbound requests. Logs go to stderr.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use rook_sentinel::{respond, InboundRequest, Notifier, OutboundMessage, Page, SentinelError, SentinelResult};

use crate::error::{HostError, HostResult};

/// Parse a single line as an inbound request.
pub fn parse_request(line: &str) -> HostResult<InboundRequest> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(HostError::InvalidRequest("Empty message".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| HostError::InvalidRequest(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message<T: Serialize>(value: &T) -> HostResult<String> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    Ok(json)
}

/// Shared line-oriented JSON writer.
#[derive(Clone)]
pub struct JsonLineSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl JsonLineSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Write one framed value and flush.
    pub fn send<T: Serialize>(&self, value: &T) -> HostResult<()> {
        let framed = frame_message(value)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| HostError::Io(std::io::Error::other("output lock poisoned")))?;
        out.write_all(framed.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl Notifier for JsonLineSink {
    fn notify(&self, message: &OutboundMessage) -> SentinelResult<()> {
        self.send(message)
            .map_err(|e| SentinelError::Notify(e.to_string()))
    }
}

/// Answer inbound requests until the reader hits EOF.
pub async fn serve_requests<R>(reader: R, page: Arc<dyn Page>, sink: JsonLineSink) -> HostResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    tracing::debug!("Request channel open");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_request(&line) {
            Ok(request) => {
                let response = respond(&*page, &request);
                sink.send(&response)?;
            }
            Err(e) => {
                tracing::warn!("Ignoring request: {e}");
                sink.send(&serde_json::json!({ "error": e.to_string() }))?;
            }
        }
    }

    tracing::debug!("EOF on request channel");
    Ok(())
}
