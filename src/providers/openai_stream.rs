//! Streaming backend for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Sends the prompt with `"stream": true` and turns the server-sent event
//! body into text fragments, one per `choices[0].delta.content`, until
//! `data: [DONE]`.

use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};

use super::{CompletionBackend, ProviderError, TextStream};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// How long to wait for the response headers.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiStreamBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiStreamBackend {
    /// `timeout` bounds the whole request, body included.
    pub fn new(
        base_url: Option<&str>,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create HTTP client: {e}")))?;
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        Ok(Self {
            http,
            endpoint: format!("{base}/chat/completions"),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiStreamBackend {
    fn name(&self) -> &str {
        "openai-stream"
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let body = json!({
            "model": self.model,
            "stream": true,
            "temperature": 0.0,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::ApiError(format!("request timed out: {e}"))
            } else if e.is_connect() {
                ProviderError::ApiError(format!("connection error: {e}"))
            } else {
                ProviderError::ApiError(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!("HTTP {status}: {}", text.trim())));
        }

        tracing::debug!(endpoint = %self.endpoint, "response stream opened");
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(sse_fragments(bytes))
    }
}

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental server-sent event decoder.
///
/// Consecutive `data:` lines form one event, terminated by a blank line.
/// Comments and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes; returns every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            self.accept_line(line, &mut events);
        }

        events
    }

    /// Flush whatever is left when the body ends.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            self.accept_line(&line, &mut events);
        }
        self.flush(&mut events);
        events
    }

    fn accept_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        } else if line.is_empty() {
            self.flush(events);
        }
    }

    fn flush(&mut self, events: &mut Vec<SseEvent>) {
        if self.data.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.data);
        if data.trim() == "[DONE]" {
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(data));
        }
    }
}

/// Extract the text delta from one chunk payload.
///
/// An `error` payload fails the stream; unparseable or empty chunks are
/// skipped.
pub fn fragment_from_data(data: &str) -> Result<Option<String>, ProviderError> {
    let value: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable stream chunk");
            return Ok(None);
        }
    };

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Stream(message));
    }

    Ok(value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

struct SseState<E> {
    body: BoxStream<'static, Result<Vec<u8>, E>>,
    decoder: SseDecoder,
    queued: VecDeque<Result<String, ProviderError>>,
    done: bool,
}

impl<E> SseState<E> {
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            if self.done {
                return;
            }
            match event {
                SseEvent::Done => self.done = true,
                SseEvent::Data(data) => match fragment_from_data(&data) {
                    Ok(Some(text)) => self.queued.push_back(Ok(text)),
                    Ok(None) => {}
                    Err(e) => self.queued.push_back(Err(e)),
                },
            }
        }
    }
}

/// Turn a raw SSE body into a [`TextStream`].
///
/// The stream ends at `[DONE]`, at the end of the body, or right after
/// the first error.
pub fn sse_fragments<S, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<Vec<u8>, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queued.pop_front() {
                if item.is_err() {
                    st.done = true;
                    st.queued.clear();
                }
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let events = st.decoder.push(&bytes);
                    st.enqueue(events);
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((
                        Err(ProviderError::Stream(format!("response body error: {e}"))),
                        st,
                    ));
                }
                None => {
                    let events = st.decoder.finish();
                    st.enqueue(events);
                    st.done = true;
                }
            }
        }
    })
    .boxed()
}
