use std::time::Duration;

/// Failures talking to the generative-language provider.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream reported an error: {0}")]
    Provider(String),
    #[error("malformed upstream payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("upstream did not finish within {0:?}")]
    Timeout(Duration),
}

/// Everything that can go wrong while relaying one conversation.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid conversation: {0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Start-up failures. These never reach a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CHAT_API_KEY is empty; a provider credential is required")]
    MissingApiKey,
    #[error("invalid chat base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("max duration must be greater than zero")]
    ZeroDuration,
    #[error("rate limit must be greater than zero")]
    ZeroRateLimit,
    #[error(transparent)]
    Prompt(#[from] crate::config::prompt::PromptError),
    #[error("{0}")]
    Tls(String),
}
