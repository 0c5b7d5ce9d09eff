use crate::config::OllamaSettings;
use crate::core::SemanticOracle;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the Ollama chat API
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Unauthorized: invalid or missing API key")]
    Unauthorized,

    #[error("API returned error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Ollama chat API client
///
/// Talks to either a local Ollama server or Ollama Cloud (bearer token).
/// Transient failures (429, 5xx, network errors, timeouts) are retried with
/// exponential backoff; 401 is never retried.
pub struct OllamaClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    initial_backoff: Duration,
    client: Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, OllamaError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            client,
        })
    }

    pub fn from_settings(settings: &OllamaSettings) -> Result<Self, OllamaError> {
        Ok(Self::new(
            settings.api_url().to_string(),
            settings.api_key.clone(),
            settings.model.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?
        .with_retry_policy(settings.max_retries, Duration::from_millis(settings.initial_backoff_ms)))
    }

    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user exchange and return the assistant's reply
    pub async fn chat(&self, prompt: &str, system_prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/chat", self.base_url.trim_end_matches('/'));
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let mut backoff = self.initial_backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatResponse = response
                            .json()
                            .await
                            .map_err(|e| OllamaError::InvalidResponse(e.to_string()))?;
                        return parsed
                            .message
                            .map(|m| m.content.trim().to_string())
                            .ok_or_else(|| OllamaError::InvalidResponse("Missing message field".into()));
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        tracing::error!("Ollama rejected the API key");
                        return Err(OllamaError::Unauthorized);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if !is_transient(status) {
                        return Err(OllamaError::ApiError {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    last_error = format!("status {}", status.as_u16());
                }
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                    last_error = e.to_string();
                }
                Err(e) => return Err(OllamaError::RequestError(e)),
            }

            if attempt < self.max_retries {
                tracing::warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %last_error,
                    "Transient Ollama failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(OllamaError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl SemanticOracle for OllamaClient {
    async fn ask(&self, prompt: &str, system_prompt: &str) -> String {
        match self.chat(prompt, system_prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Ollama call failed, treating as empty reply: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server, api_key: Option<&str>) -> OllamaClient {
        OllamaClient::new(
            format!("{}/api", server.url()),
            api_key.map(str::to_string),
            "test-model".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_policy(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_chat_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "sistema"},
                    {"role": "user", "content": "hola"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": {"role": "assistant", "content": " {\"property_ids\": [1]}\n"}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("secret"));
        let reply = client.chat("hola", "sistema").await.unwrap();

        assert_eq!(reply, r#"{"property_ids": [1]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.chat("hola", "sistema").await;

        assert!(matches!(result, Err(OllamaError::RetriesExhausted { attempts: 3, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, Some("wrong"));
        let result = client.chat("hola", "sistema").await;

        assert!(matches!(result, Err(OllamaError::Unauthorized)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body("model not found")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.chat("hola", "sistema").await;

        assert!(matches!(result, Err(OllamaError::ApiError { status: 404, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_oracle_swallows_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server, None);
        assert_eq!(client.ask("hola", "sistema").await, "");
    }

    #[tokio::test]
    async fn test_missing_message_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"done": true}"#)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.chat("hola", "").await;

        assert!(matches!(result, Err(OllamaError::InvalidResponse(_))));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let client = OllamaClient::new(
            "http://localhost:11434/api".to_string(),
            Some("  ".to_string()),
            "m".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(client.api_key.is_none());
        assert_eq!(client.model(), "m");
    }
}
