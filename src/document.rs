use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ScholarError;

// Section headers that open the part of a paper worth comparing against
static DISCUSSION_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\d+\.?\s*)?(?:discussion|conclusions?|implications)\b")
        .expect("Invalid discussion header regex pattern")
});
static REFERENCES_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:references|bibliography|works cited)\s*$")
        .expect("Invalid references header regex pattern")
});

/// Header lines longer than this are prose that happens to mention the keyword
const MAX_HEADER_LEN: usize = 100;
/// A discussion section shorter than this is treated as a false positive
const MIN_DISCUSSION_LEN: usize = 500;

/// A reference paper with its extracted text
#[derive(Debug, Clone)]
pub struct Paper {
    /// File name of the source document
    pub title: String,
    pub text: String,
}

/// Extract plain text from a PDF file.
///
/// Never fails: an unreadable or malformed document yields an empty string, and
/// callers treat emptiness as "no content".
pub fn extract_pdf_text(path: &Path) -> String {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Error reading {}: {}", path.display(), e);
            return String::new();
        }
    };

    // pdf-extract can panic on malformed fonts, so contain it here
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    }));

    match result {
        Ok(Ok(text)) => {
            let text = text.trim().to_string();
            debug!("Extracted {} chars from {}", text.len(), path.display());
            text
        }
        Ok(Err(e)) => {
            warn!("Error extracting text from {}: {}", path.display(), e);
            String::new()
        }
        Err(_) => {
            warn!("PDF extraction panicked for {} (malformed document?)", path.display());
            String::new()
        }
    }
}

/// List the PDF files directly inside `dir`, sorted by file name
pub fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, ScholarError> {
    if !dir.is_dir() {
        return Err(ScholarError::io(
            dir,
            io::Error::new(io::ErrorKind::NotFound, "directory does not exist"),
        ));
    }

    let pdf_files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.path().is_file()
                && entry
                    .path()
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    Ok(pdf_files)
}

/// Extract every PDF in `paths`, skipping documents that yield no text
pub fn load_papers(paths: &[PathBuf]) -> Vec<Paper> {
    let mut papers = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Processing {}/{}: {}", i + 1, paths.len(), title);

        let text = extract_pdf_text(path);
        if text.trim().is_empty() {
            warn!("No text extracted from {}, skipping", title);
            continue;
        }
        papers.push(Paper { title, text });
    }
    papers
}

/// Locate the Discussion/Conclusion part of a paper.
///
/// The section runs from the first short header line naming a discussion,
/// conclusion or implications section up to the references header. When no such
/// header exists, or the section found is implausibly short, the last 30% of the
/// paper (still stopping at the references) is used instead.
pub fn discussion_section(paper_text: &str) -> String {
    let lines: Vec<&str> = paper_text.lines().collect();

    let end_from = |start: usize| -> usize {
        lines[start..]
            .iter()
            .position(|line| REFERENCES_HEADER_REGEX.is_match(line))
            .map(|offset| start + offset)
            .unwrap_or(lines.len())
    };

    let header = lines.iter().position(|line| {
        let trimmed = line.trim();
        trimmed.chars().count() < MAX_HEADER_LEN && DISCUSSION_HEADER_REGEX.is_match(trimmed)
    });

    if let Some(start) = header {
        let section = lines[start..end_from(start)].join("\n");
        let section = section.trim();
        if section.chars().count() >= MIN_DISCUSSION_LEN {
            return section.to_string();
        }
        debug!(
            "Discussion section too short ({} chars), using paper tail",
            section.chars().count()
        );
    }

    let tail_start = lines.len() * 7 / 10;
    lines[tail_start..end_from(tail_start)].join("\n").trim().to_string()
}
