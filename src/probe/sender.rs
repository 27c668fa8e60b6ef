//! Streaming HTTP sender for connectivity tests
//!
//! Sends one [`TestRequest`] and decides whether the upstream began a
//! response stream. Only the start of the stream is read; the response is
//! dropped as soon as the configured [`StreamCriterion`] is met, which closes
//! the connection.

use crate::probe::payload::TestPayload;
use crate::probe::redact::truncate_utf8;
use crate::probe::transport::Transport;
use crate::probe::{ProbeError, UpstreamAuth};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the completion endpoint relative to an account's base URL
pub const MESSAGES_PATH: &str = "/v1/messages";

/// What counts as "the stream started"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamCriterion {
    /// Any non-empty body chunk after a 2xx status
    FirstByte,
    /// The first complete server-sent event, which must not be an `error` event
    #[default]
    FirstEvent,
}

/// Fully assembled, single-use description of one test call
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub base_url: String,
    pub payload: TestPayload,
    pub auth: UpstreamAuth,
    pub transport: Transport,
    pub user_agent: String,
}

impl TestRequest {
    pub fn completion_url(&self) -> String {
        messages_url(&self.base_url)
    }
}

/// Completion endpoint for an account base URL
///
/// Base URLs that already point at the endpoint are used unchanged.
pub fn messages_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(MESSAGES_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, MESSAGES_PATH)
    }
}

/// Evidence that the upstream started streaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStart {
    FirstByte { bytes: usize },
    FirstEvent { event: String },
}

/// Performs the network attempt of a connectivity test
#[async_trait]
pub trait StreamSender: Send + Sync {
    async fn send(&self, request: TestRequest) -> Result<StreamStart, ProbeError>;
}

/// Tunables for [`HttpStreamSender`]
#[derive(Debug, Clone)]
pub struct SenderSettings {
    /// Bound on connect plus first stream signal
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub criterion: StreamCriterion,
    pub max_first_event_bytes: usize,
    pub max_error_body_bytes: usize,
    pub anthropic_version: String,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            criterion: StreamCriterion::FirstEvent,
            max_first_event_bytes: 64 * 1024,
            max_error_body_bytes: 2048,
            anthropic_version: "2023-06-01".to_string(),
        }
    }
}

/// `reqwest`-based sender
///
/// Builds a fresh client per request for the resolved transport, so proxy
/// settings never bleed between accounts and every connection is released
/// when the attempt ends.
#[derive(Debug, Clone, Default)]
pub struct HttpStreamSender {
    settings: SenderSettings,
}

impl HttpStreamSender {
    pub fn new(settings: SenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SenderSettings {
        &self.settings
    }

    async fn open_stream(&self, request: &TestRequest) -> Result<reqwest::Response, ProbeError> {
        let client = request
            .transport
            .client_builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|e| ProbeError::UpstreamConnect(describe_error(&e)))?;

        let (auth_name, auth_value) = request.auth.header()?;
        let url = request.completion_url();

        tracing::debug!(
            url = %url,
            transport = request.transport.label(),
            auth_scheme = request.auth.scheme().as_str(),
            "Sending connectivity test request"
        );

        client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .header(USER_AGENT, request.user_agent.as_str())
            .header("anthropic-version", self.settings.anthropic_version.as_str())
            .header(auth_name, auth_value)
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| self.classify_send_error(&e))
    }

    fn timed_out(&self) -> ProbeError {
        ProbeError::UpstreamTimeout {
            timeout_ms: self.settings.timeout.as_millis() as u64,
        }
    }

    fn classify_send_error(&self, err: &reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::UpstreamTimeout {
                timeout_ms: self.settings.connect_timeout.as_millis() as u64,
            }
        } else {
            ProbeError::UpstreamConnect(describe_error(err))
        }
    }
}

#[async_trait]
impl StreamSender for HttpStreamSender {
    async fn send(&self, request: TestRequest) -> Result<StreamStart, ProbeError> {
        let deadline = tokio::time::Instant::now() + self.settings.timeout;

        let response = tokio::time::timeout_at(deadline, self.open_stream(&request))
            .await
            .map_err(|_| self.timed_out())??;

        let status = response.status();
        if !status.is_success() {
            // The status is already known, so a stalled body only loses the excerpt.
            let body = tokio::time::timeout_at(
                deadline,
                read_error_body(response, self.settings.max_error_body_bytes),
            )
            .await
            .unwrap_or_default();
            return Err(status_error(status, body));
        }

        let started = match self.settings.criterion {
            StreamCriterion::FirstByte => {
                tokio::time::timeout_at(deadline, await_first_byte(response)).await
            }
            StreamCriterion::FirstEvent => {
                tokio::time::timeout_at(
                    deadline,
                    await_first_event(response, self.settings.max_first_event_bytes),
                )
                .await
            }
        };
        started.map_err(|_| self.timed_out())?
    }
}

fn status_error(status: StatusCode, body: String) -> ProbeError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ProbeError::UpstreamAuth { status, body }
    } else {
        ProbeError::UpstreamStatus { status, body }
    }
}

/// Read at most `max_bytes` of an error response body
async fn read_error_body(response: reqwest::Response, max_bytes: usize) -> String {
    let mut stream = response.bytes_stream();
    let mut collected: Vec<u8> = Vec::new();
    while collected.len() < max_bytes {
        match stream.next().await {
            Some(Ok(chunk)) => collected.extend_from_slice(&chunk),
            Some(Err(_)) | None => break,
        }
    }
    let text = String::from_utf8_lossy(&collected);
    truncate_utf8(text.trim(), max_bytes).to_string()
}

async fn await_first_byte(response: reqwest::Response) -> Result<StreamStart, ProbeError> {
    let mut stream = response.bytes_stream();
    loop {
        match stream.next().await {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => return Ok(StreamStart::FirstByte { bytes: chunk.len() }),
            Some(Err(e)) => return Err(ProbeError::MalformedStream(describe_error(&e))),
            None => {
                return Err(ProbeError::MalformedStream(
                    "upstream closed the stream before sending any data".to_string(),
                ));
            }
        }
    }
}

async fn await_first_event(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<StreamStart, ProbeError> {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    loop {
        match stream.next().await {
            Some(Ok(chunk)) => {
                buffer.extend_from_slice(&chunk);
                if let Some(event) = first_sse_event(&buffer) {
                    return judge_first_event(event);
                }
                if buffer.len() > max_bytes {
                    return Err(ProbeError::MalformedStream(format!(
                        "no complete event within the first {} bytes",
                        max_bytes
                    )));
                }
            }
            Some(Err(e)) => return Err(ProbeError::MalformedStream(describe_error(&e))),
            None => {
                return Err(ProbeError::MalformedStream(
                    "upstream closed the stream before the first event".to_string(),
                ));
            }
        }
    }
}

/// One parsed server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Parse the first dispatchable event from a partial SSE buffer
///
/// Returns `None` until a blank line terminates a block carrying an `event:`
/// or `data:` field. Comment-only blocks (keep-alives) are skipped.
pub fn first_sse_event(buffer: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(buffer).replace("\r\n", "\n");
    let mut rest = text.as_str();

    while let Some(end) = rest.find("\n\n") {
        let block = &rest[..end];
        rest = &rest[end + 2..];

        let mut event = None;
        let mut data_lines: Vec<&str> = Vec::new();
        for line in block.lines() {
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => {}
            }
        }

        if event.is_some() || !data_lines.is_empty() {
            return Some(SseEvent {
                event,
                data: data_lines.join("\n"),
            });
        }
    }
    None
}

fn judge_first_event(event: SseEvent) -> Result<StreamStart, ProbeError> {
    let data: Option<serde_json::Value> = serde_json::from_str(&event.data).ok();
    let data_type = data
        .as_ref()
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let is_error = event.event.as_deref() == Some("error") || data_type.as_deref() == Some("error");
    if is_error {
        let message = data
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| truncate_utf8(&event.data, 512).to_string());
        return Err(ProbeError::StreamError(message));
    }

    let name = event
        .event
        .or(data_type)
        .unwrap_or_else(|| "message".to_string());
    Ok(StreamStart::FirstEvent { event: name })
}

/// Render an error with its source chain
fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
