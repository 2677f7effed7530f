pub mod chunker;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use config::Config;
pub use error::{ApiError, DispatchError, ScholarError};
pub use llm::{Dispatcher, GroqClient, LlmBackend};
pub use runner::Runner;
