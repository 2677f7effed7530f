use chrono::Local;
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::ScholarError;

/// Line that opens every paper section of a stage file
pub const SECTION_SEPARATOR: &str =
    "================================================================================";

pub const SUMMARIES_PREFIX: &str = "summaries";
pub const REFINED_PREFIX: &str = "refined";
pub const SYNTHESIS_PREFIX: &str = "synthesis";

const TITLE_MARKER: &str = "## ";

/// One paper's entry in a stage file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Whether the body is an inlined failure rather than model output
    pub fn is_error(&self) -> bool {
        self.body.trim_start().starts_with("ERROR:")
    }
}

/// Render sections as a stage file: a header, then one separator-delimited block per paper
pub fn format_sections(heading: &str, sections: &[Section]) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n", heading));
    output.push_str(&format!("Generated: {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
    output.push_str(&format!("Papers: {}\n", sections.len()));

    for section in sections {
        output.push('\n');
        output.push_str(SECTION_SEPARATOR);
        output.push('\n');
        output.push_str(TITLE_MARKER);
        output.push_str(section.title.trim());
        output.push_str("\n\n");
        output.push_str(section.body.trim());
        output.push('\n');
    }

    output
}

/// Parse a stage file back into its sections.
///
/// Only separator lines delimit papers, so bodies may contain markdown headings.
/// Sections with an empty body are dropped.
pub fn parse_sections(content: &str) -> Vec<Section> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in content.lines() {
        if line.trim_end() == SECTION_SEPARATOR {
            blocks.push(Vec::new());
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    // The first block is the file header
    blocks
        .into_iter()
        .skip(1)
        .filter_map(|block| {
            let mut lines = block.into_iter().skip_while(|line| line.trim().is_empty());
            let first = lines.next()?;
            let (title, body_lines): (String, Vec<&str>) = match first.strip_prefix(TITLE_MARKER) {
                Some(title) => (title.trim().to_string(), lines.collect()),
                None => (String::new(), std::iter::once(first).chain(lines).collect()),
            };
            let body = body_lines.join("\n").trim().to_string();
            if body.is_empty() {
                None
            } else {
                Some(Section { title, body })
            }
        })
        .collect()
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.txt`
pub fn timestamped_file_name(prefix: &str) -> String {
    format!("{}_{}.txt", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

/// `<prefix>.txt`
pub fn fixed_file_name(prefix: &str) -> String {
    format!("{}.txt", prefix)
}

fn is_stage_file(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.ends_with(".txt") && (rest.starts_with('_') || rest == ".txt"),
        None => false,
    }
}

/// Find the most recently modified stage file with the given prefix in `dir`
pub fn latest_output(dir: &Path, prefix: &str) -> Result<Option<PathBuf>, ScholarError> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let latest = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && is_stage_file(&entry.file_name().to_string_lossy(), prefix)
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.into_path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path);

    if let Some(path) = &latest {
        debug!("Latest '{}' output is {:?}", prefix, path);
    }
    Ok(latest)
}

/// Read a whole text file
pub fn read_text(path: &Path) -> Result<String, ScholarError> {
    fs::read_to_string(path).map_err(|e| ScholarError::io(path, e))
}

/// Write `content` to `path` through a temporary file in the same directory,
/// so a crashed run never leaves a truncated stage file behind.
pub fn write_atomically(path: &Path, content: &str) -> Result<(), ScholarError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| ScholarError::io(&parent, e))?;

    let mut file = NamedTempFile::new_in(&parent).map_err(|e| ScholarError::io(&parent, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| ScholarError::io(path, e))?;
    file.persist(path).map_err(|e| ScholarError::io(path, e.error))?;

    info!("Output written to {:?}", path);
    Ok(())
}
