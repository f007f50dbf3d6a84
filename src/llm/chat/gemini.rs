use async_trait::async_trait;
use log::info;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatClient, ChatRequest, UpstreamStream, http_stream_generate };
use crate::errors::UpstreamError;
use crate::llm::LlmConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamRequest {
    system_instruction: GeminiInstruction,
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Debug)]
struct GeminiInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug)]
struct GeminiPart {
    text: String,
}

impl GeminiStreamRequest {
    fn from_chat_request(request: ChatRequest) -> Self {
        let mut contents: Vec<GeminiContent> = request.history
            .into_iter()
            .map(|msg| GeminiContent {
                role: msg.role.provider_role(),
                parts: vec![GeminiPart { text: msg.content }],
            })
            .collect();
        contents.push(GeminiContent {
            role: "user",
            parts: vec![GeminiPart { text: request.prompt }],
        });

        Self {
            system_instruction: GeminiInstruction {
                parts: vec![GeminiPart { text: request.system_instruction.to_string() }],
            },
            contents,
        }
    }
}

#[derive(Deserialize)]
struct GoogleChunk {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    error: Option<GoogleError>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Parses one server-sent-event line from `streamGenerateContent?alt=sse`.
/// Only `data:` lines carry payload; blank lines, comments and other SSE
/// fields are skipped.
fn parse_gemini_line(line: &str) -> Result<Option<String>, UpstreamError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: GoogleChunk = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(UpstreamError::Provider(format!("{} {}", err.code, err.message)));
    }

    let text: String = chunk.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: Url,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String, base_url: Url) -> Result<Self, UpstreamError> {
        let http = HttpClient::builder().build()?;
        Ok(Self { http, api_key, model, base_url })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, UpstreamError> {
        Self::new(
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone()
        )
    }

    fn stream_url(&self) -> Result<Url, UpstreamError> {
        let raw = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.as_str().trim_end_matches('/'),
            self.model
        );
        Url::parse(&raw).map_err(|e| UpstreamError::Provider(format!("bad stream URL {}: {}", raw, e)))
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<UpstreamStream, UpstreamError> {
        let url = self.stream_url()?;
        info!(
            "GeminiChatClient::stream_chat() → model={} history_len={} url={}",
            self.model,
            request.history.len(),
            url
        );

        let payload = GeminiStreamRequest::from_chat_request(request);
        let headers = vec![(API_KEY_HEADER, self.api_key.clone())];

        http_stream_generate(&self.http, url, payload, parse_gemini_line, headers).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::ChatMessage;
    use std::sync::Arc;

    #[test]
    fn test_parse_concatenates_parts() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"CNC-001 "},{"text":"is hot"}],"role":"model"}}]}"#;
        assert_eq!(parse_gemini_line(line).unwrap(), Some("CNC-001 is hot".to_string()));
    }

    #[test]
    fn test_parse_skips_non_data_lines() {
        assert_eq!(parse_gemini_line("").unwrap(), None);
        assert_eq!(parse_gemini_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_gemini_line("event: message").unwrap(), None);
        assert_eq!(parse_gemini_line("data: ").unwrap(), None);
    }

    #[test]
    fn test_parse_skips_chunks_without_text() {
        let line = r#"data: {"candidates":[{"content":{"parts":[],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":12}}"#;
        assert_eq!(parse_gemini_line(line).unwrap(), None);
        let blocked = r#"data: {"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(parse_gemini_line(blocked).unwrap(), None);
    }

    #[test]
    fn test_parse_surfaces_provider_errors() {
        let line = r#"data: {"error":{"code":503,"message":"model overloaded","status":"UNAVAILABLE"}}"#;
        match parse_gemini_line(line) {
            Err(UpstreamError::Provider(msg)) => assert!(msg.contains("model overloaded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_garbled_json() {
        assert!(matches!(parse_gemini_line("data: {not json"), Err(UpstreamError::Payload(_))));
    }

    #[test]
    fn test_request_body_maps_roles_and_appends_prompt() {
        let request = ChatRequest {
            system_instruction: Arc::from("Be concise."),
            history: vec![
                ChatMessage::user("Why is CNC-001 overheating?"),
                ChatMessage::assistant("Coolant flow is low.")
            ],
            prompt: "What next?".to_string(),
        };
        let body = serde_json::to_value(GeminiStreamRequest::from_chat_request(request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "Be concise." }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "Why is CNC-001 overheating?" }] },
                    { "role": "model", "parts": [{ "text": "Coolant flow is low." }] },
                    { "role": "user", "parts": [{ "text": "What next?" }] }
                ]
            })
        );
    }

    #[test]
    fn test_stream_url_keeps_base_path_and_hides_key() {
        let client = GeminiChatClient::new(
            "secret".into(),
            "gemini-2.0-flash-exp".into(),
            Url::parse("https://generativelanguage.googleapis.com/v1beta/").unwrap()
        ).unwrap();
        let url = client.stream_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:streamGenerateContent?alt=sse"
        );
        assert!(!url.as_str().contains("secret"));
    }
}
