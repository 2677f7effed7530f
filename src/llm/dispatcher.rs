use backoff::ExponentialBackoffBuilder;
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::{Duration, Instant};

use crate::error::{ApiError, DispatchError};
use crate::llm::batch;
use crate::llm::{BatchJob, BatchStatus, LlmBackend};

/// Upper bound for a single backoff delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Knobs for how prompts reach the remote API
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Total attempts for one completion before giving up
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles after each further failure
    pub retry_base_delay: Duration,
    /// Send prompt lists as one remote batch job instead of parallel calls
    pub batch_mode: bool,
    /// Maximum simultaneous calls on the parallel path
    pub concurrency: usize,
    /// How often a pending batch job is polled
    pub poll_interval: Duration,
    /// Give up on a batch job that is still pending after this long
    pub batch_timeout: Option<Duration>,
    /// Use the parallel path when a batch job cannot be submitted
    pub batch_fallback: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            batch_mode: true,
            concurrency: 4,
            poll_interval: Duration::from_secs(10),
            batch_timeout: None,
            batch_fallback: true,
        }
    }
}

/// Outcome of one prompt in a list dispatch
pub type Completion = Result<String, DispatchError>;

/// Render a completion for persistence, inlining failures as `ERROR: <cause>`
pub fn render_completion(completion: Completion) -> String {
    match completion {
        Ok(text) => text,
        Err(e) => format!("ERROR: {}", e),
    }
}

/// Input to [`Dispatcher::dispatch`]
#[derive(Debug, Clone)]
pub enum DispatchInput {
    One(String),
    Many(Vec<String>),
}

/// Output of [`Dispatcher::dispatch`], shaped like its input
#[derive(Debug)]
pub enum DispatchOutput {
    One(String),
    Many(Vec<Completion>),
}

/// Sends prompts to the completion API.
///
/// A single prompt is one retried call. A list of prompts either becomes one
/// remote batch job whose results are matched back by correlation id, or is
/// fanned out in groups of `concurrency` parallel calls. Either way the result
/// list has one entry per prompt, in input order.
pub struct Dispatcher<B> {
    backend: B,
    config: DispatchConfig,
    pool: ThreadPool,
}

impl<B: LlmBackend> Dispatcher<B> {
    pub fn new(backend: B, config: DispatchConfig) -> Result<Self, DispatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency.max(1))
            .thread_name(|i| format!("dispatch-{}", i))
            .build()?;

        Ok(Self {
            backend,
            config,
            pool,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn dispatch(&self, input: DispatchInput) -> Result<DispatchOutput, DispatchError> {
        match input {
            DispatchInput::One(prompt) => self.complete(&prompt).map(DispatchOutput::One),
            DispatchInput::Many(prompts) => self.complete_all(&prompts).map(DispatchOutput::Many),
        }
    }

    /// Run one completion with retries and exponential backoff
    pub fn complete(&self, prompt: &str) -> Result<String, DispatchError> {
        self.with_retries("Completion", || self.backend.complete(prompt))
    }

    /// Complete a list of prompts, returning one result per prompt in input order.
    ///
    /// In batch mode any batch failure fails the whole list. On the parallel path
    /// failures stay confined to their own slot.
    pub fn complete_all(&self, prompts: &[String]) -> Result<Vec<Completion>, DispatchError> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        if !self.config.batch_mode {
            return Ok(self.complete_concurrently(prompts));
        }

        let job = match self.submit_batch(prompts) {
            Ok(job) => job,
            Err(e) if self.config.batch_fallback => {
                warn!("Batch submission failed ({}), falling back to parallel requests", e);
                return Ok(self.complete_concurrently(prompts));
            }
            Err(e) => return Err(e),
        };

        let texts = self.collect_batch(job, prompts.len())?;
        Ok(texts.into_iter().map(Ok).collect())
    }

    /// Complete a list of prompts as a single remote batch job, without fallback
    pub fn run_batch(&self, prompts: &[String]) -> Result<Vec<String>, DispatchError> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        let job = self.submit_batch(prompts)?;
        self.collect_batch(job, prompts.len())
    }

    /// Complete prompts in sequential groups of at most `concurrency` parallel calls.
    ///
    /// A group must finish before the next one starts. Each prompt's result is
    /// written to its own slot; a failure never affects its siblings.
    pub fn complete_concurrently(&self, prompts: &[String]) -> Vec<Completion> {
        let group_size = self.config.concurrency.max(1);
        let group_count = (prompts.len() + group_size - 1) / group_size;
        let mut results = Vec::with_capacity(prompts.len());

        for (group_no, group) in prompts.chunks(group_size).enumerate() {
            debug!("Dispatching group {}/{} ({} requests)", group_no + 1, group_count, group.len());
            let offset = group_no * group_size;

            let group_results: Vec<Completion> = self.pool.install(|| {
                group
                    .par_iter()
                    .enumerate()
                    .map(|(i, prompt)| {
                        let result = self.complete(prompt);
                        if let Err(e) = &result {
                            warn!("Request {} failed: {}", offset + i, e);
                        }
                        result
                    })
                    .collect()
            });
            results.extend(group_results);
        }

        results
    }

    /// Encode, upload and create the batch job
    fn submit_batch(&self, prompts: &[String]) -> Result<BatchJob, DispatchError> {
        let bodies = prompts.iter().map(|p| self.backend.chat_request(p)).collect();
        let jsonl = batch::encode_requests(bodies)?;

        let file_id = self.with_retries("Batch upload", || {
            self.backend.upload_batch_input(jsonl.clone())
        })?;
        let job = self.with_retries("Batch creation", || self.backend.create_batch(&file_id))?;

        info!("Submitted batch job {} with {} requests", job.id, prompts.len());
        Ok(job)
    }

    /// Wait for a submitted job and demultiplex its output
    fn collect_batch(&self, job: BatchJob, expected: usize) -> Result<Vec<String>, DispatchError> {
        let job = self.wait_for_batch(job)?;
        if job.status != BatchStatus::Completed {
            return Err(DispatchError::BatchJobFailed {
                job_id: job.id,
                status: job.status,
            });
        }

        let output_file_id = match &job.output_file_id {
            Some(id) => id,
            None => {
                return Err(DispatchError::BatchResultIncomplete {
                    job_id: job.id.clone(),
                    expected,
                    missing: (0..expected).collect(),
                })
            }
        };

        let output = self.with_retries("Batch output download", || {
            self.backend.file_content(output_file_id)
        })?;
        let texts = batch::demultiplex(&job.id, &output, expected)?;

        info!("Batch job {} completed with {} results", job.id, texts.len());
        Ok(texts)
    }

    /// Poll until the job reaches a terminal state or the configured deadline passes
    fn wait_for_batch(&self, mut job: BatchJob) -> Result<BatchJob, DispatchError> {
        let started = Instant::now();

        while !job.status.is_terminal() {
            let mut wait = self.config.poll_interval;
            if let Some(limit) = self.config.batch_timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(DispatchError::BatchJobTimeout {
                        job_id: job.id,
                        status: job.status,
                        waited_secs: elapsed.as_secs(),
                    });
                }
                // Never sleep past the deadline
                wait = wait.min(limit - elapsed);
            }

            debug!("Batch job {} is {}, polling again in {:?}", job.id, job.status, wait);
            std::thread::sleep(wait);

            let job_id = job.id.clone();
            job = self.with_retries("Batch status", || self.backend.retrieve_batch(&job_id))?;
        }

        Ok(job)
    }

    /// Retry `op` on transient errors with doubling delays, up to `max_retries` attempts
    fn with_retries<T, F>(&self, what: &str, mut op: F) -> Result<T, DispatchError>
    where
        F: FnMut() -> Result<T, ApiError>,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0u32;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_base_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(MAX_RETRY_DELAY)
            .with_max_elapsed_time(None)
            .build();

        let result = backoff::retry(policy, || {
            attempts += 1;
            op().map_err(|e| {
                if !e.is_transient() {
                    warn!("{} rejected: {}", what, e);
                    backoff::Error::permanent(e)
                } else if attempts >= max_attempts {
                    warn!("{} attempt {}/{} failed: {}", what, attempts, max_attempts, e);
                    backoff::Error::permanent(e)
                } else {
                    warn!("{} attempt {}/{} failed, retrying: {}", what, attempts, max_attempts, e);
                    backoff::Error::transient(e)
                }
            })
        });

        match result {
            Ok(value) => Ok(value),
            Err(backoff::Error::Permanent(e)) | Err(backoff::Error::Transient { err: e, .. }) => {
                if e.is_transient() {
                    Err(DispatchError::Exhausted {
                        attempts,
                        source: e,
                    })
                } else {
                    Err(DispatchError::Rejected(e))
                }
            }
        }
    }
}
