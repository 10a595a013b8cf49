//! Streaming chat completion client.
//!
//! The request runs on a spawned task that parses the SSE body line by line
//! and forwards events over an unbounded channel. The channel has a single
//! producer, so fragments arrive at the consumer in emission order.

use futures_util::StreamExt;
use memchr::memchr;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::utils::url::chat_completions_url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// One text fragment of the response, in arrival order.
    Fragment(String),
    /// The remote call failed; the turn must be aborted.
    Error(String),
    /// The stream finished normally.
    Done,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Spawns streaming requests and hands their events to the channel returned
/// by [`ChatStreamService::new`].
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            run_stream(params, tx).await;
        });
    }
}

async fn run_stream(params: StreamParams, tx: mpsc::UnboundedSender<StreamEvent>) {
    let StreamParams {
        client,
        base_url,
        api_key,
        model,
        messages,
    } = params;

    let request = ChatRequest {
        model,
        messages,
        stream: true,
    };
    let url = chat_completions_url(&base_url);
    debug!(%url, model = %request.model, "starting chat completion stream");

    let response = match client
        .post(url)
        .bearer_auth(&api_key)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error(format!("request failed: {e}")));
            let _ = tx.send(StreamEvent::Done);
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        debug!(%status, %body, "chat completion request rejected");
        let _ = tx.send(StreamEvent::Error(format_api_error(&body, Some(status))));
        let _ = tx.send(StreamEvent::Done);
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(format!("stream interrupted: {e}")));
                let _ = tx.send(StreamEvent::Done);
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => line.trim().to_string(),
                Err(e) => {
                    warn!("invalid UTF-8 in stream: {e}");
                    buffer.drain(..=newline_pos);
                    continue;
                }
            };
            let finished = handle_sse_line(&line, &tx);
            buffer.drain(..=newline_pos);
            if finished {
                return;
            }
        }
    }

    let _ = tx.send(StreamEvent::Done);
}

fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Handles one SSE line. Returns `true` once the stream is finished, either
/// by the `[DONE]` marker or by an in-stream error payload.
fn handle_sse_line(line: &str, tx: &mpsc::UnboundedSender<StreamEvent>) -> bool {
    let Some(payload) = data_payload(line) else {
        return false;
    };

    if payload == "[DONE]" {
        let _ = tx.send(StreamEvent::Done);
        return true;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(content) = response
                .choices
                .first()
                .and_then(|choice| choice.delta.content.as_ref())
            {
                let _ = tx.send(StreamEvent::Fragment(content.clone()));
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }
            debug!(%payload, "unparseable stream payload");
            let _ = tx.send(StreamEvent::Error(format_api_error(payload, None)));
            let _ = tx.send(StreamEvent::Done);
            true
        }
    }
}

/// Condenses an API error body into a single displayable line.
fn format_api_error(body: &str, status: Option<StatusCode>) -> String {
    let summary = serde_json::from_str::<serde_json::Value>(body.trim())
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .unwrap_or_else(|| condense(body));

    match status {
        Some(status) => format!("API error ({status}): {summary}"),
        None => format!("API error: {summary}"),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .map(|text| condense(&text))
        .filter(|text| !text.is_empty())
}

fn condense(text: &str) -> String {
    const MAX_LEN: usize = 200;

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty>".to_string();
    }
    if collapsed.chars().count() > MAX_LEN {
        let truncated: String = collapsed.chars().take(MAX_LEN).collect();
        format!("{truncated}…")
    } else {
        collapsed
    }
}
