pub mod gemini;

use async_trait::async_trait;
use futures::{ Stream, StreamExt };
use log::{ debug, warn };
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use self::gemini::GeminiChatClient;
use super::LlmConfig;
use crate::errors::UpstreamError;
use crate::models::chat::ChatMessage;

const UPSTREAM_CHANNEL_CAPACITY: usize = 32;
const ERROR_BODY_LIMIT: usize = 512;

pub type UpstreamStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

/// Provider-neutral description of one streamed chat turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_instruction: Arc<str>,
    pub history: Vec<ChatMessage>,
    pub prompt: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens one streaming session. An `Err` here means nothing was streamed;
    /// errors after that arrive as items of the returned stream.
    async fn stream_chat(&self, request: ChatRequest) -> Result<UpstreamStream, UpstreamError>;

    fn model(&self) -> &str;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, UpstreamError> {
    let client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(client))
}

/// Splits a byte stream into lines. Lines can straddle transport chunks, so
/// anything after the last newline is kept until more bytes arrive.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

/// Parses one line of the upstream body. `Ok(None)` skips the line.
pub type LineParser = fn(&str) -> Result<Option<String>, UpstreamError>;

/// POSTs `payload` and streams the parsed response lines back through a
/// bounded channel. The status is checked before returning, so a rejected
/// request never yields a stream.
pub async fn http_stream_generate(
    http: &reqwest::Client,
    url: Url,
    payload: impl Serialize,
    line_parser: LineParser,
    headers: Vec<(&'static str, String)>
) -> Result<UpstreamStream, UpstreamError> {
    let mut req = http.post(url).json(&payload);
    for (name, value) in headers {
        req = req.header(name, value);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(UpstreamError::Status { status: status.as_u16(), body });
    }

    let (tx, rx) = mpsc::channel(UPSTREAM_CHANNEL_CAPACITY);
    let mut bytes = Box::pin(resp.bytes_stream());

    tokio::spawn(async move {
        let mut lines = LineBuffer::default();
        loop {
            let chunk = tokio::select! {
                _ = tx.closed() => {
                    debug!("Upstream consumer went away; closing response");
                    return;
                }
                chunk = bytes.next() => chunk,
            };
            match chunk {
                Some(Ok(buf)) => {
                    for line in lines.push(&buf) {
                        if !forward_line(&tx, &line, line_parser).await {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("Upstream body read failed: {}", e);
                    let _ = tx.send(Err(UpstreamError::from(e))).await;
                    return;
                }
                None => {
                    if let Some(line) = lines.finish() {
                        forward_line(&tx, &line, line_parser).await;
                    }
                    return;
                }
            }
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

async fn forward_line(
    tx: &mpsc::Sender<Result<String, UpstreamError>>,
    line: &str,
    line_parser: LineParser
) -> bool {
    match line_parser(line) {
        Ok(Some(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}
