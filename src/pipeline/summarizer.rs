use log::{info, warn};

use crate::chunker::chunk_text;
use crate::document::Paper;
use crate::error::DispatchError;
use crate::llm::{Completion, Dispatcher, LlmBackend};
use crate::pipeline::{prompts, PaperResult};

/// First stage: one summary per reference paper
pub struct Summarizer<'a, B> {
    dispatcher: &'a Dispatcher<B>,
    chunk_size: usize,
}

impl<'a, B: LlmBackend> Summarizer<'a, B> {
    pub fn new(dispatcher: &'a Dispatcher<B>, chunk_size: usize) -> Self {
        Self {
            dispatcher,
            chunk_size,
        }
    }

    /// Summarize every paper, returning results in paper order.
    ///
    /// Papers that fit the chunk budget are sent together as one prompt list.
    /// Longer papers are summarized chunk by chunk and the chunk summaries are
    /// then merged with one more call. A failed batch for the short papers fails
    /// the stage; a long paper whose chunks all fail only fails its own slot.
    pub fn summarize(&self, papers: &[Paper]) -> Result<Vec<PaperResult>, DispatchError> {
        let mut slots: Vec<Option<Completion>> = Vec::with_capacity(papers.len());
        let mut direct_indices = Vec::new();
        let mut direct_prompts = Vec::new();

        for (index, paper) in papers.iter().enumerate() {
            let chunks = chunk_text(&paper.text, self.chunk_size);
            if chunks.len() > 1 {
                slots.push(Some(self.summarize_chunked(paper, &chunks)));
            } else {
                slots.push(None);
                direct_indices.push(index);
                direct_prompts.push(prompts::summary_prompt(&paper.text, Some(&paper.title)));
            }
        }

        if !direct_prompts.is_empty() {
            info!("Summarizing {} papers in one dispatch", direct_prompts.len());
            let results = self.dispatcher.complete_all(&direct_prompts)?;
            for (index, result) in direct_indices.into_iter().zip(results) {
                slots[index] = Some(result);
            }
        }

        Ok(papers
            .iter()
            .zip(slots)
            .filter_map(|(paper, slot)| {
                slot.map(|result| PaperResult {
                    title: paper.title.clone(),
                    result,
                })
            })
            .collect())
    }

    fn summarize_chunked(&self, paper: &Paper, chunks: &[String]) -> Completion {
        info!("{} exceeds the chunk budget, summarizing {} chunks", paper.title, chunks.len());

        let chunk_prompts: Vec<String> = chunks
            .iter()
            .map(|chunk| prompts::summary_prompt(chunk, None))
            .collect();

        let mut summaries = Vec::new();
        let mut first_error = None;
        for result in self.dispatcher.complete_all(&chunk_prompts)? {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if summaries.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        } else if summaries.len() < chunks.len() {
            warn!(
                "{}: {} of {} chunk summaries failed, combining the rest",
                paper.title,
                chunks.len() - summaries.len(),
                chunks.len()
            );
        }

        self.dispatcher.complete(&prompts::combine_prompt(&summaries))
    }
}
