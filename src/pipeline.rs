pub mod prompts;
pub mod refiner;
pub mod summarizer;
pub mod synthesizer;

use crate::llm::{render_completion, Completion};
use crate::report::Section;

pub use refiner::Refiner;
pub use summarizer::Summarizer;
pub use synthesizer::{Synthesis, Synthesizer};

/// A stage's outcome for one paper
#[derive(Debug)]
pub struct PaperResult {
    pub title: String,
    pub result: Completion,
}

impl PaperResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Convert to a stage-file section, inlining a failure as `ERROR: <cause>`
    pub fn into_section(self) -> Section {
        Section::new(self.title, render_completion(self.result))
    }
}
