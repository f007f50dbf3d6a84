//! The chat relay: validates a conversation, opens one upstream streaming
//! session and forwards its text fragments to the caller as they arrive.
//!
//! The first non-empty fragment is awaited before [`ChatRelay::relay`]
//! returns, so a caller can still answer with a clean error status when the
//! provider fails up front. After that, failures travel inside the stream.

use futures::{ Stream, StreamExt };
use log::{ debug, error, info, warn };
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{ sleep_until, timeout_at, Instant };
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::errors::{ RelayError, UpstreamError };
use crate::llm::chat::{ ChatClient, ChatRequest, UpstreamStream };
use crate::models::chat::{ Conversation, Role };

const RELAY_CHANNEL_CAPACITY: usize = 32;

pub type RelayStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

#[derive(Clone)]
pub struct ChatRelay {
    client: Arc<dyn ChatClient>,
    system_instruction: Arc<str>,
    max_duration: Duration,
}

impl ChatRelay {
    pub fn new(client: Arc<dyn ChatClient>, system_instruction: Arc<str>, max_duration: Duration) -> Self {
        Self { client, system_instruction, max_duration }
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Splits the conversation into history and prompt. The last message
    /// must come from the user.
    pub fn prepare(&self, conversation: Conversation) -> Result<ChatRequest, RelayError> {
        let mut messages = conversation.messages;
        let last = messages
            .pop()
            .ok_or_else(|| RelayError::Validation("messages must not be empty".into()))?;
        if last.role != Role::User {
            return Err(RelayError::Validation("the last message must have role 'user'".into()));
        }
        Ok(ChatRequest {
            system_instruction: self.system_instruction.clone(),
            history: messages,
            prompt: last.content,
        })
    }

    /// Relays one conversation. The returned stream is finite and yields at
    /// most one error, after which it ends.
    pub async fn relay(&self, conversation: Conversation) -> Result<RelayStream, RelayError> {
        let request = self.prepare(conversation)?;
        let request_id = Uuid::new_v4();
        let deadline = Instant::now() + self.max_duration;
        info!(
            "[{}] relaying chat: model={} history_len={} prompt_len={}",
            request_id,
            self.client.model(),
            request.history.len(),
            request.prompt.len()
        );

        let mut upstream = match timeout_at(deadline, self.client.stream_chat(request)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!("[{}] upstream call failed: {}", request_id, e);
                return Err(e.into());
            }
            Err(_) => {
                error!("[{}] upstream call timed out after {:?}", request_id, self.max_duration);
                return Err(UpstreamError::Timeout(self.max_duration).into());
            }
        };

        let first = match next_fragment(&mut upstream, deadline, self.max_duration).await {
            Ok(first) => first,
            Err(e) => {
                error!("[{}] upstream failed before first fragment: {}", request_id, e);
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        let failure_tx = tx.clone();
        let max_duration = self.max_duration;
        let handle = tokio::spawn(forward(request_id, upstream, first, tx, deadline, max_duration));
        // A panicking forwarder would otherwise end the body as if complete.
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!("[{}] relay task failed: {}", request_id, e);
                let _ = failure_tx.send(Err(RelayError::Internal(format!("relay task failed: {}", e)))).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Waits for the next non-empty fragment. `Ok(None)` means the upstream
/// finished normally.
async fn next_fragment(
    upstream: &mut UpstreamStream,
    deadline: Instant,
    max_duration: Duration
) -> Result<Option<String>, UpstreamError> {
    loop {
        // timeout_at polls the inner future first, so an expired deadline
        // would still let already-buffered items through.
        if Instant::now() >= deadline {
            return Err(UpstreamError::Timeout(max_duration));
        }
        match timeout_at(deadline, upstream.next()).await {
            Err(_) => return Err(UpstreamError::Timeout(max_duration)),
            Ok(None) => return Ok(None),
            Ok(Some(Err(e))) => return Err(e),
            Ok(Some(Ok(text))) if text.is_empty() => continue,
            Ok(Some(Ok(text))) => return Ok(Some(text)),
        }
    }
}

/// Owns the upstream stream until completion, failure, deadline or consumer
/// disconnect. Both the chunk wait and the hand-off to a slow consumer are
/// bounded by `deadline`; the upstream is dropped before the error is queued.
async fn forward(
    request_id: Uuid,
    mut upstream: UpstreamStream,
    first: Option<String>,
    tx: mpsc::Sender<Result<String, RelayError>>,
    deadline: Instant,
    max_duration: Duration
) {
    let mut fragments = 0usize;
    let mut pending = first;

    let failure = loop {
        let Some(text) = pending.take() else {
            info!("[{}] relay finished after {} fragments", request_id, fragments);
            return;
        };
        if Instant::now() >= deadline {
            break UpstreamError::Timeout(max_duration);
        }
        let sent = tokio::select! {
            _ = sleep_until(deadline) => None,
            sent = tx.send(Ok(text)) => Some(sent),
        };
        match sent {
            None => break UpstreamError::Timeout(max_duration),
            Some(Err(_)) => {
                warn!("[{}] client disconnected after {} fragments", request_id, fragments);
                return;
            }
            Some(Ok(())) => {}
        }
        fragments += 1;
        debug!("[{}] forwarded fragment {}", request_id, fragments);

        let next = tokio::select! {
            _ = tx.closed() => {
                warn!("[{}] client disconnected after {} fragments", request_id, fragments);
                return;
            }
            next = next_fragment(&mut upstream, deadline, max_duration) => next,
        };
        match next {
            Ok(next) => {
                pending = next;
            }
            Err(e) => break e,
        }
    };

    drop(upstream);
    error!("[{}] stream aborted after {} fragments: {}", request_id, fragments, failure);
    let _ = tx.send(Err(failure.into())).await;
}
