use autoscholar::document::{discussion_section, extract_pdf_text, find_pdf_files, load_papers};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_extract_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    assert_eq!(extract_pdf_text(&dir.path().join("absent.pdf")), "");
}

#[test]
fn test_extract_garbage_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"this is not a PDF document").unwrap();

    assert_eq!(extract_pdf_text(&path), "");
}

#[test]
fn test_load_papers_skips_unreadable_documents() {
    let dir = tempdir().unwrap();
    let broken = dir.path().join("broken.pdf");
    fs::write(&broken, b"%PDF-1.4 truncated").unwrap();

    assert!(load_papers(&[broken, dir.path().join("absent.pdf")]).is_empty());
}

#[test]
fn test_find_pdf_files_sorted_and_filtered() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b_paper.pdf"), b"").unwrap();
    fs::write(dir.path().join("a_paper.PDF"), b"").unwrap();
    fs::write(dir.path().join("notes.txt"), b"").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c_paper.pdf"), b"").unwrap();

    let names: Vec<String> = find_pdf_files(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["a_paper.PDF", "b_paper.pdf"]);
}

#[test]
fn test_find_pdf_files_missing_directory() {
    let dir = tempdir().unwrap();
    assert!(find_pdf_files(&dir.path().join("nope")).is_err());
}

#[test]
fn test_discussion_section_stops_at_references() {
    let body = "The findings suggest a clear trend. ".repeat(20);
    let text = format!(
        "Introduction\nSome introduction.\n5. Discussion\n{}\nReferences\n[1] A. Author. A paper. 2020.",
        body.trim()
    );

    let section = discussion_section(&text);
    assert!(section.starts_with("5. Discussion"));
    assert!(section.contains("clear trend"));
    assert!(!section.contains("References"));
    assert!(!section.contains("A. Author"));
}

#[test]
fn test_discussion_section_falls_back_to_tail() {
    let text: Vec<String> = (0..10).map(|i| format!("line {}", i)).collect();
    assert_eq!(discussion_section(&text.join("\n")), "line 7\nline 8\nline 9");
}

#[test]
fn test_short_discussion_falls_back_to_tail() {
    let mut lines: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
    lines.push("Conclusion".to_string());
    lines.push("Too short.".to_string());

    assert_eq!(discussion_section(&lines.join("\n")), "line 7\nConclusion\nToo short.");
}

#[test]
fn test_tail_fallback_stops_at_references() {
    let mut lines: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
    lines.push("REFERENCES".to_string());
    lines.push("[1] Cited work".to_string());

    assert_eq!(discussion_section(&lines.join("\n")), "line 7");
}

#[test]
fn test_long_prose_line_is_not_a_header() {
    let prose = format!("Discussion of prior work appears throughout {}", "and more words ".repeat(10));
    let mut lines = vec![prose];
    lines.extend((1..10).map(|i| format!("line {}", i)));

    assert_eq!(discussion_section(&lines.join("\n")), "line 7\nline 8\nline 9");
}
