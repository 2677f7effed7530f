#![allow(dead_code)]

use autoscholar::error::ApiError;
use autoscholar::llm::{BatchJob, BatchStatus, ChatMessage, ChatRequest, DispatchConfig, LlmBackend};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

type Responder = Box<dyn Fn(&str, u32) -> Result<String, ApiError> + Send + Sync>;

/// Scripted in-memory backend. `complete` answers through a responder closure
/// that sees the prompt and the attempt number for that prompt.
pub struct FakeBackend {
    responder: Responder,
    delay: Duration,
    attempts: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,

    upload_status: Option<u16>,
    statuses: Mutex<Vec<BatchStatus>>,
    with_output_file: bool,
    batch_output: Mutex<String>,
    uploads: Mutex<Vec<Vec<u8>>>,
    retrieve_calls: AtomicUsize,
}

impl FakeBackend {
    /// Echoes every prompt back as `reply to <prompt>`
    pub fn echo() -> Self {
        Self::with_responder(|prompt, _| Ok(format!("reply to {}", prompt)))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str, u32) -> Result<String, ApiError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            attempts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            upload_status: None,
            statuses: Mutex::new(vec![BatchStatus::Completed]),
            with_output_file: true,
            batch_output: Mutex::new(String::new()),
            uploads: Mutex::new(Vec::new()),
            retrieve_calls: AtomicUsize::new(0),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every batch upload fail with this HTTP status
    pub fn failing_upload(mut self, status: u16) -> Self {
        self.upload_status = Some(status);
        self
    }

    /// Status returned by batch creation, then by each successive status poll.
    /// The last status repeats forever.
    pub fn batch_statuses(self, statuses: Vec<BatchStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses;
        self
    }

    pub fn batch_output(self, output: impl Into<String>) -> Self {
        *self.batch_output.lock().unwrap() = output.into();
        self
    }

    pub fn without_output_file(mut self) -> Self {
        self.with_output_file = false;
        self
    }

    /// Prompts passed to `complete`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    fn job(&self, status: BatchStatus) -> BatchJob {
        BatchJob {
            id: "batch_test".to_string(),
            status,
            output_file_id: if self.with_output_file && status == BatchStatus::Completed {
                Some("file_out".to_string())
            } else {
                None
            },
            error_file_id: None,
        }
    }

    fn next_status(&self) -> BatchStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.remove(0)
        } else {
            statuses[0]
        }
    }
}

impl LlmBackend for FakeBackend {
    fn chat_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: 0.0,
            max_tokens: 16,
        }
    }

    fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().unwrap().push(prompt.to_string());
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(prompt.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let result = (self.responder)(prompt, attempt);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn upload_batch_input(&self, jsonl: Vec<u8>) -> Result<String, ApiError> {
        if let Some(status) = self.upload_status {
            return Err(ApiError::Status {
                status,
                body: "upload refused".to_string(),
            });
        }
        self.uploads.lock().unwrap().push(jsonl);
        Ok("file_in".to_string())
    }

    fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ApiError> {
        assert_eq!(input_file_id, "file_in");
        Ok(self.job(self.next_status()))
    }

    fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, ApiError> {
        assert_eq!(batch_id, "batch_test");
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.job(self.next_status()))
    }

    fn file_content(&self, file_id: &str) -> Result<String, ApiError> {
        assert_eq!(file_id, "file_out");
        Ok(self.batch_output.lock().unwrap().clone())
    }
}

/// One successful line of a batch output file
pub fn output_line(custom_id: &str, content: &str) -> String {
    json!({
        "id": format!("req_{}", custom_id),
        "custom_id": custom_id,
        "response": {
            "status_code": 200,
            "body": {
                "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
            }
        },
        "error": null
    })
    .to_string()
}

/// One failed line of a batch output file
pub fn error_line(custom_id: &str) -> String {
    json!({
        "id": format!("req_{}", custom_id),
        "custom_id": custom_id,
        "response": null,
        "error": {"code": "server_error", "message": "boom"}
    })
    .to_string()
}

/// Dispatch settings that never sleep for long
pub fn fast_config() -> DispatchConfig {
    DispatchConfig {
        max_retries: 3,
        retry_base_delay: Duration::from_millis(1),
        batch_mode: false,
        concurrency: 2,
        poll_interval: Duration::from_millis(1),
        batch_timeout: None,
        batch_fallback: true,
    }
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "internal error".to_string(),
    }
}

/// A one-page PDF showing `lines` in Helvetica, with a correct xref table
pub fn minimal_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n14 TL\n72 720 Td\n");
    for line in lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({}) Tj\nT*\n", escaped));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref_start = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    pdf
}
