use chrono::Local;
use log::info;

use crate::document::discussion_section;
use crate::error::ScholarError;
use crate::llm::{Dispatcher, LlmBackend};
use crate::pipeline::prompts;
use crate::report::Section;

/// Only this much of the main paper's discussion goes into the comparison prompt
pub const MAIN_PAPER_EXCERPT_CHARS: usize = 6000;

/// Output of the final stage
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub analysis: String,
    pub comparison: String,
    pub report: String,
}

/// Third stage: cross-paper analysis, then comparison with the main paper
pub struct Synthesizer<'a, B> {
    dispatcher: &'a Dispatcher<B>,
}

/// `Paper 1: <title>\n<summary>\n` blocks, numbered from one
pub fn format_summaries(summaries: &[Section]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, section)| format!("Paper {}: {}\n{}\n", i + 1, section.title, section.body))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

impl<'a, B: LlmBackend> Synthesizer<'a, B> {
    pub fn new(dispatcher: &'a Dispatcher<B>) -> Self {
        Self { dispatcher }
    }

    /// Run the analysis call and then the comparison call, in that order.
    /// Fails without contacting the API when every refined summary is a failure.
    pub fn synthesize(&self, refined: &[Section], main_paper_text: &str) -> Result<Synthesis, ScholarError> {
        let usable: Vec<Section> = refined.iter().filter(|s| !s.is_error()).cloned().collect();
        if usable.is_empty() {
            return Err(ScholarError::NoUsableSummaries(refined.len()));
        }

        info!("Analyzing convergences and divergences across {} papers", usable.len());
        let analysis = self
            .dispatcher
            .complete(&prompts::analysis_prompt(&format_summaries(&usable)))?;

        let discussion = discussion_section(main_paper_text);
        let excerpt = truncate_chars(&discussion, MAIN_PAPER_EXCERPT_CHARS);

        info!("Comparing the main paper with the reference analysis");
        let comparison = self
            .dispatcher
            .complete(&prompts::comparison_prompt(excerpt, &analysis))?;

        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let report = prompts::final_report(&analysis, &comparison, &generated_at);

        Ok(Synthesis {
            analysis,
            comparison,
            report,
        })
    }
}
