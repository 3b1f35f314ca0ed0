//! Ollama backend speaking the native `/api/chat` protocol.
//!
//! One-shot replies are a single JSON object. Streamed replies are
//! newline-delimited JSON, one chunk per line, the last one carrying
//! `"done": true`.

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    BackendError, BackendFuture, BoxedChunkStream, ChatBackend, ChatRequest, ChatResponse,
    OllamaConfig,
};

const ERROR_BODY_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| BackendError::other(format!("failed to build http client: {err}")))?;

        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    pub fn from_env() -> Result<Self, BackendError> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Names of the models installed on the server, sorted.
    pub async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.config.endpoint("api/tags"))
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        let parsed = response
            .json::<OllamaTagsResponse>()
            .await
            .map_err(|err| BackendError::decode(err.to_string()))?;

        let mut names = parsed
            .models
            .into_iter()
            .map(|model| model.name)
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    fn prepare(&self, mut request: ChatRequest, stream: bool) -> Result<ChatRequest, BackendError> {
        request.validate()?;
        request.stream = stream;
        if request.keep_alive.is_none() {
            request.keep_alive = self.config.keep_alive.clone();
        }
        Ok(request)
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<Response, BackendError> {
        let response = self
            .client
            .post(self.config.endpoint("api/chat"))
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(parse_error(response).await);
        }

        Ok(response)
    }
}

impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<ChatResponse, BackendError>> {
        Box::pin(async move {
            let request = self.prepare(request, false)?;
            let response = self.post_chat(&request).await?;
            let raw = response
                .json::<Value>()
                .await
                .map_err(|err| BackendError::decode(err.to_string()))?;

            reject_inline_error(&raw)?;
            Ok(ChatResponse::from_value(raw))
        })
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> BackendFuture<'a, Result<BoxedChunkStream<'a>, BackendError>> {
        Box::pin(async move {
            let request = self.prepare(request, true)?;
            let response = self.post_chat(&request).await?;

            let stream = try_stream! {
                let mut bytes = response.bytes_stream();
                let mut lines = LineBuffer::default();

                while let Some(item) = bytes.next().await {
                    let bytes = item.map_err(|err| BackendError::transport(err.to_string()))?;
                    lines.extend(&bytes);

                    while let Some(line) = lines.next_line() {
                        if let Some(chunk) = parse_line(&line)? {
                            yield chunk;
                        }
                    }
                }

                if let Some(chunk) = parse_line(&lines.finish())? {
                    yield chunk;
                }
            };

            Ok(Box::pin(stream) as BoxedChunkStream<'a>)
        })
    }
}

/// Newline-delimited framing over raw bytes. Lines are only decoded once
/// complete, so a multi-byte character split across network reads survives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let newline_index = self.pending.iter().position(|byte| *byte == b'\n')?;
        Some(self.pending.drain(..=newline_index).collect())
    }

    fn finish(self) -> Vec<u8> {
        self.pending
    }
}

fn parse_line(line: &[u8]) -> Result<Option<ChatResponse>, BackendError> {
    let line = std::str::from_utf8(line)
        .map_err(|err| BackendError::decode(format!("invalid utf-8 in stream chunk: {err}")))?
        .trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw = serde_json::from_str::<Value>(line)
        .map_err(|err| BackendError::decode(format!("invalid stream chunk: {err}")))?;
    reject_inline_error(&raw)?;
    Ok(Some(ChatResponse::from_value(raw)))
}

/// Ollama reports some failures, including mid-stream ones, as a 200 body of
/// `{"error": "..."}`.
fn reject_inline_error(raw: &Value) -> Result<(), BackendError> {
    match raw.get("error").and_then(Value::as_str) {
        Some(message) => Err(BackendError::other(message)),
        None => Ok(()),
    }
}

fn map_send_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::timeout(err.to_string())
    } else if err.is_connect() {
        BackendError::unavailable(err.to_string())
    } else {
        BackendError::transport(err.to_string())
    }
}

async fn parse_error(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            format!("ollama request failed with status {status}")
        } else {
            truncate(body.trim(), ERROR_BODY_LIMIT)
        }
    });

    let error = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::invalid_request(message)
        }
        StatusCode::NOT_FOUND => BackendError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::timeout(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            BackendError::unavailable(message)
        }
        _ if status.is_server_error() => BackendError::transport(message),
        _ => BackendError::other(message),
    };

    error.with_status(status.as_u16())
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    parsed
        .get("error")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn truncate(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let mut end = max;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let mut output = input[..end].to_string();
    output.push_str("...");
    output
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
}
