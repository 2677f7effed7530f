use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::document::{extract_pdf_text, find_pdf_files, load_papers};
use crate::error::ScholarError;
use crate::llm::{Dispatcher, GroqClient, LlmBackend};
use crate::pipeline::{PaperResult, Refiner, Summarizer, Synthesizer};
use crate::report::{self, Section, REFINED_PREFIX, SUMMARIES_PREFIX, SYNTHESIS_PREFIX};

/// What a stage produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub output: PathBuf,
    /// Papers written to the output
    pub papers: usize,
    /// Papers whose entry is an inlined failure
    pub failed: usize,
}

/// Output files of a full pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub summaries: StageOutcome,
    pub refined: StageOutcome,
    pub synthesis: StageOutcome,
}

/// Runs pipeline stages against files on disk
pub struct Runner<B> {
    config: Config,
    dispatcher: Dispatcher<B>,
}

impl Runner<GroqClient> {
    /// Build a runner talking to the configured remote API
    pub fn from_config(config: Config) -> Result<Self, ScholarError> {
        let client = GroqClient::new(&config)?;
        info!("Using model {} at {}", client.model(), config.base_url);
        Self::new(config, client)
    }
}

impl<B: LlmBackend> Runner<B> {
    pub fn new(config: Config, backend: B) -> Result<Self, ScholarError> {
        config.validate()?;
        let dispatcher = Dispatcher::new(backend, config.dispatch.clone())?;
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    /// Stage 1: summarize every reference PDF
    pub fn summarize(&self, output: Option<PathBuf>) -> Result<StageOutcome, ScholarError> {
        let references_dir = &self.config.references_dir;
        let pdf_files = find_pdf_files(references_dir)?;
        if pdf_files.is_empty() {
            return Err(ScholarError::NoReferencePapers(references_dir.clone()));
        }
        info!("Found {} reference papers in {:?}", pdf_files.len(), references_dir);

        let papers = load_papers(&pdf_files);
        if papers.is_empty() {
            return Err(ScholarError::NoValidPapers);
        }

        let summarizer = Summarizer::new(&self.dispatcher, self.config.chunk_size);
        let results = summarizer.summarize(&papers)?;

        let output = self.output_path(output, SUMMARIES_PREFIX, true);
        self.write_stage(&output, "Reference Paper Summaries", results)
    }

    /// Stage 2: refine the summaries in `input`, or in the latest summaries file
    pub fn refine(&self, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<StageOutcome, ScholarError> {
        let input = self.resolve_input(input, SUMMARIES_PREFIX)?;
        info!("Using input file: {:?}", input);

        let summaries = report::parse_sections(&report::read_text(&input)?);
        if summaries.is_empty() {
            return Err(ScholarError::EmptyStageInput(input));
        }
        info!("Parsed {} summaries", summaries.len());

        let results = Refiner::new(&self.dispatcher).refine(&summaries)?;

        let output = self.output_path(output, REFINED_PREFIX, true);
        self.write_stage(&output, "Refined Summaries", results)
    }

    /// Stage 3: analyze the refined summaries and compare them with the main paper
    pub fn synthesize(&self, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<StageOutcome, ScholarError> {
        let input = self.resolve_input(input, REFINED_PREFIX)?;
        info!("Using input file: {:?}", input);

        let refined = report::parse_sections(&report::read_text(&input)?);
        if refined.is_empty() {
            return Err(ScholarError::EmptyStageInput(input));
        }

        let main_dir = &self.config.main_paper_dir;
        let main_paper = find_pdf_files(main_dir)?
            .into_iter()
            .next()
            .ok_or_else(|| ScholarError::NoMainPaper(main_dir.clone()))?;
        let main_text = extract_pdf_text(&main_paper);
        if main_text.trim().is_empty() {
            return Err(ScholarError::EmptyMainPaper(main_paper));
        }
        info!("Loaded main paper: {:?}", main_paper);

        let synthesis = Synthesizer::new(&self.dispatcher).synthesize(&refined, &main_text)?;

        let output = self.output_path(output, SYNTHESIS_PREFIX, true);
        report::write_atomically(&output, &synthesis.report)?;

        Ok(StageOutcome {
            output,
            papers: refined.len(),
            failed: refined.iter().filter(|s| s.is_error()).count(),
        })
    }

    /// Run all three stages, each reading the previous stage's output
    pub fn run_full(&self, timestamped: bool) -> Result<PipelineOutcome, ScholarError> {
        let summaries_path = self.output_path(None, SUMMARIES_PREFIX, timestamped);
        let refined_path = self.output_path(None, REFINED_PREFIX, timestamped);
        let synthesis_path = self.output_path(None, SYNTHESIS_PREFIX, timestamped);

        info!("Step 1: summarizing reference papers");
        let summaries = self.summarize(Some(summaries_path.clone()))?;

        info!("Step 2: refining summaries");
        let refined = self.refine(Some(summaries_path), Some(refined_path.clone()))?;

        info!("Step 3: synthesizing and comparing with the main paper");
        let synthesis = self.synthesize(Some(refined_path), Some(synthesis_path))?;

        Ok(PipelineOutcome {
            summaries,
            refined,
            synthesis,
        })
    }

    fn resolve_input(&self, input: Option<PathBuf>, prefix: &str) -> Result<PathBuf, ScholarError> {
        match input {
            Some(path) if path.is_file() => Ok(path),
            Some(path) => Err(ScholarError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "input file not found"),
            )),
            None => report::latest_output(&self.config.output_dir, prefix)?.ok_or_else(|| {
                ScholarError::NoStageOutput {
                    prefix: prefix.to_string(),
                    dir: self.config.output_dir.clone(),
                }
            }),
        }
    }

    fn output_path(&self, output: Option<PathBuf>, prefix: &str, timestamped: bool) -> PathBuf {
        output.unwrap_or_else(|| {
            let name = if timestamped {
                report::timestamped_file_name(prefix)
            } else {
                report::fixed_file_name(prefix)
            };
            self.config.output_dir.join(name)
        })
    }

    fn write_stage(&self, output: &Path, heading: &str, results: Vec<PaperResult>) -> Result<StageOutcome, ScholarError> {
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            warn!("{} of {} papers failed in this stage", failed, results.len());
        }

        let sections: Vec<Section> = results.into_iter().map(PaperResult::into_section).collect();
        report::write_atomically(output, &report::format_sections(heading, &sections))?;

        Ok(StageOutcome {
            output: output.to_path_buf(),
            papers: sections.len(),
            failed,
        })
    }
}
