//! OpenAI-compatible chat-completions client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::CompletionError;
use super::trait_def::CompletionService;
use super::types::CompletionRequest;

/// Calls `POST {base_url}/chat/completions` with one system message.
#[derive(Clone)]
pub struct HttpCompletionClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    /// Where the key was expected to come from, for error messages.
    key_source: String,
    timeout: Duration,
}

impl fmt::Debug for HttpCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCompletionClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpCompletionClient {
    /// Build a client. A missing `api_key` is reported on the first call as
    /// [`CompletionError::MissingApiKey`] naming `key_source`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        key_source: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            key_source: key_source.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::MissingApiKey(self.key_source.clone()))?;

        let body = ChatRequest {
            model: &request.model,
            messages: [ChatMessage {
                role: "system",
                content: &request.system_prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("response has no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".into(),
            system_prompt: "Build a plan".into(),
            temperature: 0.2,
            max_tokens: 256,
        }
    }

    fn client(url: String, key: Option<&str>) -> HttpCompletionClient {
        HttpCompletionClient::new(url, key.map(str::to_string), "TEST_KEY", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "messages": [{"role": "system", "content": "Build a plan"}],
                "max_tokens": 256
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "{\"plan\": []}"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let text = client(server.url(), Some("secret"))
            .complete(&request())
            .await
            .unwrap();
        assert_eq!(text, "{\"plan\": []}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client(format!("{}/", server.url()), Some("k"))
            .complete(&request())
            .await
            .unwrap_err();
        match &err {
            CompletionError::Http { status, body } => {
                assert_eq!(*status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("expected http error, got {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client(server.url(), Some("k"))
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let err = client(server.url(), None).complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey(ref name) if name == "TEST_KEY"));
        mock.assert_async().await;
    }
}
