pub mod batch;
pub mod client;
pub mod dispatcher;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ApiError;

pub use client::GroqClient;
pub use dispatcher::{render_completion, Completion, DispatchConfig, DispatchInput, DispatchOutput, Dispatcher};

/// Endpoint every batch line targets
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/v1/chat/completions";

/// One message of a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a chat completion request, shared by the synchronous and batch endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Lifecycle state of a remote batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Validating,
    InProgress,
    Finalizing,
    Completed,
    Failed,
    Expired,
    Cancelling,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    /// Whether the job will not change state any more
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Expired | BatchStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Validating => "validating",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Finalizing => "finalizing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Expired => "expired",
            BatchStatus::Cancelling => "cancelling",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a remote batch job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchJob {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub error_file_id: Option<String>,
}

/// The remote operations the dispatcher relies on.
///
/// Implemented by [`GroqClient`] for any OpenAI-compatible endpoint. One
/// instance is created at startup and shared by every dispatch.
pub trait LlmBackend: Send + Sync {
    /// Build the request body for a single prompt
    fn chat_request(&self, prompt: &str) -> ChatRequest;

    /// Run one synchronous completion and return the generated text
    fn complete(&self, prompt: &str) -> Result<String, ApiError>;

    /// Upload a JSON-lines batch input file, returning its file id
    fn upload_batch_input(&self, jsonl: Vec<u8>) -> Result<String, ApiError>;

    /// Create a batch job over a previously uploaded input file
    fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ApiError>;

    /// Fetch the current state of a batch job
    fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, ApiError>;

    /// Download the contents of a file, e.g. a batch output file
    fn file_content(&self, file_id: &str) -> Result<String, ApiError>;
}
