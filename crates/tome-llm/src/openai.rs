//! OpenAI-compatible chat-completions client.
//!
//! Supports both single-shot completion and SSE streaming. Streamed
//! responses arrive as `data:` lines; each delta becomes a
//! `StreamFragment::Text` and the `[DONE]` marker becomes
//! `StreamFragment::End`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use tome_core::types::{Message, StreamFragment};

use crate::error::LlmError;
use crate::generator::{FragmentStream, Generator};

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiGenerator {
    /// Create a new client.
    ///
    /// `base_url` is the API root without a trailing slash, e.g.
    /// `https://api.openai.com/v1`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
            stream,
        };

        debug!(model = %self.model, messages = messages.len(), stream, "Chat completion request");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Network(format!("cannot connect to {}", self.base_url))
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Body may describe the failure; the request payload is never
            // echoed into the error.
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(body),
                429 => LlmError::RateLimited,
                code => LlmError::Api {
                    status: code,
                    message: body,
                },
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self.send(messages, false).await?;
        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        data.get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::Parse("no message content in response".to_string()))
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, LlmError> {
        let response = self.send(messages, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<StreamFragment, LlmError>>(32);
        let mut bytes = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Network(e.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    match parse_sse_line(line.trim_end()) {
                        None => {}
                        Some(Ok(SseEvent::Delta(text))) => {
                            if tx.send(Ok(StreamFragment::Text(text))).await.is_err() {
                                // Receiver dropped mid-stream (cancellation).
                                return;
                            }
                        }
                        Some(Ok(SseEvent::Done)) => {
                            let _ = tx.send(Ok(StreamFragment::End)).await;
                            return;
                        }
                        Some(Err(e)) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }
            // Upstream closed without [DONE]; the consumer sees exhaustion
            // without a terminal sentinel and applies its own policy.
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// One parsed server-sent event from the completions stream.
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    /// A content delta; may be empty when the chunk carried no text.
    Delta(String),
    /// The `[DONE]` marker.
    Done,
}

/// Parse a single SSE line. Non-`data:` lines (blanks, comments, event
/// names) are ignored.
fn parse_sse_line(line: &str) -> Option<Result<SseEvent, LlmError>> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(Ok(SseEvent::Done));
    }
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return Some(Err(LlmError::Parse(e.to_string()))),
    };
    let delta = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();
    Some(Ok(SseEvent::Delta(delta)))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}
