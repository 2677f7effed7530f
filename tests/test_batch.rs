mod common;

use autoscholar::error::DispatchError;
use autoscholar::llm::batch::{demultiplex, encode_requests, BatchOutputLine};
use autoscholar::llm::{ChatMessage, ChatRequest};
use common::{error_line, output_line};

#[test]
fn test_encode_requests_writes_one_line_per_request() {
    let bodies = vec![
        ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("one")],
            temperature: 0.7,
            max_tokens: 100,
        },
        ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("two")],
            temperature: 0.7,
            max_tokens: 100,
        },
    ];

    let encoded = String::from_utf8(encode_requests(bodies).unwrap()).unwrap();
    let lines: Vec<serde_json::Value> = encoded
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert!(encoded.ends_with('\n'));
    assert_eq!(lines[0]["custom_id"], "0");
    assert_eq!(lines[0]["method"], "POST");
    assert_eq!(lines[0]["url"], "/v1/chat/completions");
    assert_eq!(lines[0]["body"]["messages"][0]["role"], "user");
    assert_eq!(lines[1]["custom_id"], "1");
    assert_eq!(lines[1]["body"]["messages"][0]["content"], "two");
}

#[test]
fn test_demultiplex_ignores_noise() {
    let output = [
        output_line("0", "first"),
        output_line("0", "duplicate"),
        "not json at all".to_string(),
        output_line("7", "out of range"),
        output_line("abc", "not an index"),
        String::new(),
        output_line("1", "second"),
    ]
    .join("\n");

    let texts = demultiplex("batch_1", &output, 2).unwrap();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn test_demultiplex_failed_line_leaves_slot_missing() {
    let output = format!("{}\n{}", error_line("0"), output_line("1", "ok"));

    match demultiplex("batch_1", &output, 2) {
        Err(DispatchError::BatchResultIncomplete { job_id, expected, missing }) => {
            assert_eq!(job_id, "batch_1");
            assert_eq!(expected, 2);
            assert_eq!(missing, vec![0]);
        }
        other => panic!("expected BatchResultIncomplete, got {:?}", other),
    }
}

#[test]
fn test_output_line_with_non_200_status() {
    let line: BatchOutputLine = serde_json::from_str(
        r#"{"custom_id":"0","response":{"status_code":429,"body":{"error":"rate limited"}}}"#,
    )
    .unwrap();

    let reason = line.text().unwrap_err();
    assert!(reason.contains("429"));
}

#[test]
fn test_incomplete_error_message_counts_missing() {
    let err = demultiplex("batch_9", "", 3).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Batch job batch_9 returned no result for 3 of 3 requests (missing: [0, 1, 2])"
    );
}
