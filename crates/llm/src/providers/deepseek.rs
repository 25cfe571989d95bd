//! DeepSeek provider (OpenAI-compatible chat completions).

use crate::client::{error_body, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// DeepSeek chat client authenticated with a bearer API key.
pub struct DeepSeekClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl DeepSeekClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_DEEPSEEK_URL, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn to_completion_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);

        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.conversation().into_iter().map(|turn| ChatMessage {
            role: match turn.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Assistant => "assistant".to_string(),
            },
            content: turn.content,
        }));

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, response: ChatCompletionResponse) -> AppResult<LlmResponse> {
        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("DeepSeek API returned no choices".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for DeepSeekClient {
    fn provider_name(&self) -> &str {
        "deepseek"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to DeepSeek");

        let body = self.to_completion_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("DeepSeek API Error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_body(response).await;
            return Err(AppError::Llm(format!(
                "DeepSeek API Error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse DeepSeek response: {}", e)))?;

        self.convert_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatTurn;

    #[test]
    fn test_request_conversion() {
        let client = DeepSeekClient::new("sk-test");
        let request = LlmRequest::new("Why?", "deepseek-chat")
            .with_history(vec![ChatTurn::user("Q"), ChatTurn::assistant("A")])
            .with_max_tokens(64);

        let body = client.to_completion_request(&request);
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(body.max_tokens, Some(64));

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_response_conversion() {
        let body = r#"{
            "model": "deepseek-chat",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Because."}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let response = DeepSeekClient::new("k").convert_response(parsed).unwrap();

        assert_eq!(response.content, "Because.");
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"model":"deepseek-chat","choices":[]}"#).unwrap();
        assert!(DeepSeekClient::new("k").convert_response(parsed).is_err());
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_key() {
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "deepseek-chat",
                "choices": [{"message": {"role": "assistant", "content": "Hi there"}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = format!("{}/v1/chat/completions", server.uri());
        let client = DeepSeekClient::with_endpoint(endpoint, "secret");
        let response = client
            .complete(&LlmRequest::new("Hello", "deepseek-chat"))
            .await
            .unwrap();

        assert_eq!(response.content, "Hi there");
        assert_eq!(response.usage.total_tokens, 5);
    }

    #[tokio::test]
    async fn test_complete_reports_http_status() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let client = DeepSeekClient::with_endpoint(server.uri(), "wrong");
        let err = client
            .complete(&LlmRequest::new("Hello", "deepseek-chat"))
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("401"), "{}", message);
        assert!(message.contains("invalid key"), "{}", message);
    }
}
