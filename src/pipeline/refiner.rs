use log::{info, warn};

use crate::error::ScholarError;
use crate::llm::{Dispatcher, LlmBackend};
use crate::pipeline::{prompts, PaperResult};
use crate::report::Section;

/// Second stage: a reviewer pass over each summary
pub struct Refiner<'a, B> {
    dispatcher: &'a Dispatcher<B>,
}

impl<'a, B: LlmBackend> Refiner<'a, B> {
    pub fn new(dispatcher: &'a Dispatcher<B>) -> Self {
        Self { dispatcher }
    }

    /// Refine all summaries in one dispatch. Summaries that recorded a failure
    /// in the previous stage are skipped; if that leaves nothing, no request is made.
    pub fn refine(&self, summaries: &[Section]) -> Result<Vec<PaperResult>, ScholarError> {
        let usable: Vec<&Section> = summaries
            .iter()
            .filter(|section| {
                if section.is_error() {
                    warn!("Skipping '{}': summary stage failed for this paper", section.title);
                    false
                } else {
                    true
                }
            })
            .collect();
        if usable.is_empty() {
            return Err(ScholarError::NoUsableSummaries(summaries.len()));
        }

        let refine_prompts: Vec<String> = usable
            .iter()
            .map(|section| prompts::refine_prompt(&section.body, Some(&section.title)))
            .collect();

        info!("Refining {} summaries", refine_prompts.len());
        let results = self.dispatcher.complete_all(&refine_prompts)?;

        Ok(usable
            .into_iter()
            .zip(results)
            .map(|(section, result)| PaperResult {
                title: section.title.clone(),
                result,
            })
            .collect())
    }
}
