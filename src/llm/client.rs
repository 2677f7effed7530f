use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{ApiError, ScholarError};
use crate::llm::{BatchJob, ChatMessage, ChatRequest, LlmBackend, CHAT_COMPLETIONS_ENDPOINT};

/// Batch jobs are accepted with a single completion window
const COMPLETION_WINDOW: &str = "24h";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

/// Blocking client for an OpenAI-compatible completion API (Groq by default).
///
/// Holds one connection pool and one set of credentials for the lifetime of the
/// process.
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqClient {
    pub fn new(config: &Config) -> Result<Self, ScholarError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ScholarError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn non-2xx responses into `ApiError::Status`, keeping the body for the log
    fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl LlmBackend for GroqClient {
    fn chat_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let request = self.chat_request(prompt);
        let response = self
            .http
            .post(self.url("/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;
        let response = Self::check_status(response)?;

        let body: ChatResponse = response
            .json()
            .map_err(|e| ApiError::Malformed(format!("chat completion body: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ApiError::Malformed("chat completion has no message content".to_string()))
    }

    fn upload_batch_input(&self, jsonl: Vec<u8>) -> Result<String, ApiError> {
        debug!("Uploading batch input file ({} bytes)", jsonl.len());
        let file = Part::bytes(jsonl)
            .file_name("batch_input.jsonl")
            .mime_str("application/jsonl")?;
        let form = Form::new().text("purpose", "batch").part("file", file);

        let response = self
            .http
            .post(self.url("/files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()?;
        let response = Self::check_status(response)?;

        let file: FileObject = response
            .json()
            .map_err(|e| ApiError::Malformed(format!("file upload body: {}", e)))?;
        Ok(file.id)
    }

    fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ApiError> {
        let response = self
            .http
            .post(self.url("/batches"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "input_file_id": input_file_id,
                "endpoint": CHAT_COMPLETIONS_ENDPOINT,
                "completion_window": COMPLETION_WINDOW,
            }))
            .send()?;
        let response = Self::check_status(response)?;

        response
            .json()
            .map_err(|e| ApiError::Malformed(format!("batch object: {}", e)))
    }

    fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/batches/{}", batch_id)))
            .bearer_auth(&self.api_key)
            .send()?;
        let response = Self::check_status(response)?;

        response
            .json()
            .map_err(|e| ApiError::Malformed(format!("batch object: {}", e)))
    }

    fn file_content(&self, file_id: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/files/{}/content", file_id)))
            .bearer_auth(&self.api_key)
            .send()?;
        let response = Self::check_status(response)?;
        Ok(response.text()?)
    }
}
