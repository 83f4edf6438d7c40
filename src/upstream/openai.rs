//! reqwest client for OpenAI-compatible chat completion APIs (OpenRouter by default).

use std::fmt::Display;
use std::pin::pin;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::{future, stream, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::upstream::{
    ChatCompletionChunk, CompletionProvider, CompletionRequest, CompletionResponse, TextStream,
    UpstreamError, DONE_SENTINEL,
};

/// Buffered fragments between the upstream reader and the response body.
const STREAM_CHANNEL_CAPACITY: usize = 32;

const HTTP_REFERER: HeaderName = HeaderName::from_static("http-referer");
const X_TITLE: HeaderName = HeaderName::from_static("x-title");

/// Client for a single OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiCompatClient {
    /// Build a client with the provider headers baked in.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HTTP_REFERER,
            HeaderValue::from_str(&config.referer)
                .map_err(|_| UpstreamError::InvalidHeader("HTTP-Referer"))?,
        );
        headers.insert(
            X_TITLE,
            HeaderValue::from_str(&config.title)
                .map_err(|_| UpstreamError::InvalidHeader("X-Title"))?,
        );
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| UpstreamError::InvalidHeader("Authorization"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// POST the request, turning non-2xx statuses into errors.
    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response, UpstreamError> {
        let response = self.client.post(self.endpoint()).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatClient {
    async fn complete(&self, mut request: CompletionRequest) -> Result<String, UpstreamError> {
        request.stream = false;
        debug!(model = request.model, structured = request.response_format.is_some(), "Completion request");

        let body = self.send(&request).await?.bytes().await?;
        let response: CompletionResponse = serde_json::from_slice(&body)?;

        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or(UpstreamError::EmptyCompletion)?
            .message;
        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(UpstreamError::Refusal(refusal));
        }
        message.content.ok_or(UpstreamError::EmptyCompletion)
    }

    async fn stream_chat(&self, mut request: CompletionRequest) -> Result<TextStream, UpstreamError> {
        request.stream = true;
        debug!(model = request.model, messages = request.messages.len(), "Streaming request");

        let response = self.send(&request).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(forward_deltas(response.bytes_stream(), tx));
        Ok(rx)
    }
}

/// Decode an SSE body and send each non-empty content delta to `tx`.
///
/// Stops at `[DONE]`, at the first transport or framing error, at an in-band
/// error object, or when the receiver is dropped.
pub async fn forward_deltas<S, E>(body: S, tx: mpsc::Sender<String>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    // The trailing blank line dispatches a final event the provider did not terminate.
    let body = body.chain(stream::once(future::ready(Ok(Bytes::from_static(b"\n\n")))));
    let mut events = pin!(body.eventsource());
    let mut forwarded = 0usize;

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(forwarded, "Upstream stream failed: {e}");
                break;
            }
        };

        if event.data.trim() == DONE_SENTINEL {
            break;
        }
        let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(&event.data) else {
            continue;
        };
        if let Some(error) = chunk.error {
            warn!(forwarded, %error, "Upstream reported an error mid-stream");
            break;
        }

        let content = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty());
        if let Some(text) = content {
            if tx.send(text).await.is_err() {
                debug!(forwarded, "Caller disconnected, dropping upstream stream");
                break;
            }
            forwarded += 1;
        }
    }

    debug!(forwarded, "Upstream stream closed");
}
