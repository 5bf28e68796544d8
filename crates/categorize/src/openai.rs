use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::model::{CompletionBackend, CompletionError, CompletionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Legacy `/completions` endpoint of an OpenAI-compatible API.
pub struct OpenAiCompletion {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(timeout).build()?;
        tracing::info!("Creating OpenAI completion backend");
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "prompt": request.prompt,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }
}

fn completion_text(response: &Value) -> Result<String, CompletionError> {
    response["choices"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CompletionError::MalformedResponse("missing choices[0].text".to_string()))
}

#[async_trait]
impl CompletionBackend for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        tracing::debug!(model = %self.model, max_tokens = request.max_tokens, "Sending completion request");

        let response = self
            .client
            .post(format!("{}/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        let value: Value = response.json().await?;
        completion_text(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenAiCompletion {
        OpenAiCompletion::new("sk-test".into(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn body_carries_model_and_parameters() {
        let b = backend().with_model("my-model");
        let body = b.request_body(&CompletionRequest {
            prompt: "hello".into(),
            max_tokens: 10,
            temperature: 0.5,
        });
        assert_eq!(body["model"], "my-model");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["temperature"], 0.5);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let b = backend().with_base_url("http://localhost:8080/v1/");
        assert_eq!(b.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn completion_text_reads_first_choice() {
        let v = json!({"choices": [{"text": " travel\n"}, {"text": "other"}]});
        assert_eq!(completion_text(&v).unwrap(), " travel\n");
    }

    #[test]
    fn completion_text_missing_is_malformed() {
        let v = json!({"error": {"message": "nope"}});
        assert!(matches!(completion_text(&v), Err(CompletionError::MalformedResponse(_))));
    }

}
