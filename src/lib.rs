pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod security;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::QueryPipeline;
