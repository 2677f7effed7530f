use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::llm::{ChatRequest, CHAT_COMPLETIONS_ENDPOINT};

/// One line of a batch input file
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequestLine {
    /// Correlation id: the prompt's position in the caller's input
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: ChatRequest,
}

/// One line of a batch output file
#[derive(Debug, Deserialize)]
pub struct BatchOutputLine {
    pub custom_id: String,
    #[serde(default)]
    pub response: Option<BatchLineResponse>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchLineResponse {
    pub status_code: u16,
    #[serde(default)]
    pub body: Value,
}

impl BatchOutputLine {
    /// The generated text, or a description of why this request produced none
    pub fn text(&self) -> Result<String, String> {
        if let Some(error) = &self.error {
            return Err(error.to_string());
        }
        let response = self.response.as_ref().ok_or("no response")?;
        if response.status_code != 200 {
            return Err(format!("status {}: {}", response.status_code, response.body));
        }
        response
            .body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| "response has no message content".to_string())
    }
}

/// Serialize request bodies as JSON lines, tagging each with its index
pub fn encode_requests(bodies: Vec<ChatRequest>) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    for (index, body) in bodies.into_iter().enumerate() {
        let line = BatchRequestLine {
            custom_id: index.to_string(),
            method: "POST".to_string(),
            url: CHAT_COMPLETIONS_ENDPOINT.to_string(),
            body,
        };
        serde_json::to_writer(&mut buffer, &line)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Place each output line's text at the index named by its correlation id.
///
/// The output file may list results in any order. Unknown or duplicate ids are
/// ignored; every index in `0..expected` must end up with a text or the whole
/// batch is reported incomplete.
pub fn demultiplex(job_id: &str, output: &str, expected: usize) -> Result<Vec<String>, DispatchError> {
    let mut slots: Vec<Option<String>> = vec![None; expected];

    for (line_no, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: BatchOutputLine = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!("Batch {}: skipping unparsable output line {}: {}", job_id, line_no + 1, e);
                continue;
            }
        };

        let index = match record.custom_id.parse::<usize>() {
            Ok(index) if index < expected => index,
            _ => {
                warn!("Batch {}: ignoring result with unknown custom_id '{}'", job_id, record.custom_id);
                continue;
            }
        };

        if slots[index].is_some() {
            warn!("Batch {}: duplicate result for request {}, keeping the first", job_id, index);
            continue;
        }

        match record.text() {
            Ok(text) => slots[index] = Some(text),
            Err(reason) => warn!("Batch {}: request {} failed: {}", job_id, index, reason),
        }
    }

    let missing: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(index, _)| index)
        .collect();

    if !missing.is_empty() {
        return Err(DispatchError::BatchResultIncomplete {
            job_id: job_id.to_string(),
            expected,
            missing,
        });
    }

    Ok(slots.into_iter().flatten().collect())
}
