use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use autoscholar::{Config, Runner};

/// Summarize reference papers and compare them with a review paper
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Directory holding the reference PDFs
    #[arg(long, global = true)]
    references_dir: Option<PathBuf>,
    /// Directory holding the main (review) paper PDF
    #[arg(long, global = true)]
    main_dir: Option<PathBuf>,
    /// Directory where stage outputs are written and looked up
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Model name (overrides GROQ_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,
    /// Character budget per summarization prompt
    #[arg(long, global = true)]
    chunk_size: Option<usize>,
    /// Total attempts per request
    #[arg(long, global = true)]
    max_retries: Option<u32>,
    /// Requests in flight at once when not using the batch API
    #[arg(long, global = true)]
    concurrency: Option<usize>,
    /// Send requests individually instead of through the batch API
    #[arg(long, global = true)]
    no_batch: bool,
    /// Do not fall back to individual requests when batch submission fails
    #[arg(long, global = true)]
    no_fallback: bool,
    /// Seconds between batch status checks
    #[arg(long, global = true)]
    poll_interval_secs: Option<u64>,
    /// Give up waiting on a batch job after this many seconds
    #[arg(long, global = true)]
    batch_timeout_secs: Option<u64>,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize every reference paper
    Summarize {
        /// Output file (defaults to a timestamped file in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Refine summaries from the previous stage
    Refine {
        /// Summaries file (defaults to the most recent one)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyze refined summaries and compare with the main paper
    Synthesize {
        /// Refined summaries file (defaults to the most recent one)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run all three stages
    Full {
        /// Write summaries.txt, refined.txt and synthesis.txt instead of timestamped files
        #[arg(long)]
        no_timestamp: bool,
    },
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.references_dir {
            config.references_dir = dir.clone();
        }
        if let Some(dir) = &self.main_dir {
            config.main_paper_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(max_retries) = self.max_retries {
            config.dispatch.max_retries = max_retries;
        }
        if let Some(concurrency) = self.concurrency {
            config.dispatch.concurrency = concurrency;
        }
        if self.no_batch {
            config.dispatch.batch_mode = false;
        }
        if self.no_fallback {
            config.dispatch.batch_fallback = false;
        }
        if let Some(secs) = self.poll_interval_secs {
            config.dispatch.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.batch_timeout_secs {
            config.dispatch.batch_timeout = Some(Duration::from_secs(secs));
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configure logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let mut config = Config::from_env()?;
    args.apply(&mut config);

    let runner = Runner::from_config(config).context("Failed to set up the pipeline")?;

    match args.command {
        Command::Summarize { output } => {
            let outcome = runner.summarize(output)?;
            info!("Summarized {} papers ({} failed)", outcome.papers, outcome.failed);
        }
        Command::Refine { input, output } => {
            let outcome = runner.refine(input, output)?;
            info!("Refined {} summaries ({} failed)", outcome.papers, outcome.failed);
        }
        Command::Synthesize { input, output } => {
            let outcome = runner.synthesize(input, output)?;
            info!("Synthesis report written to {:?}", outcome.output);
        }
        Command::Full { no_timestamp } => {
            let outcome = runner.run_full(!no_timestamp)?;
            info!("Summaries: {:?}", outcome.summaries.output);
            info!("Refined summaries: {:?}", outcome.refined.output);
            info!("Synthesis report: {:?}", outcome.synthesis.output);
        }
    }

    Ok(())
}
