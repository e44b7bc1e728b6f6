pub mod agents;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod scraping;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{PipelineError, PlanningError, ScrapingExhaustedError};
pub use pipeline::{PipelineContext, PipelineOrchestrator, PipelineReport};
pub use types::{PriceQuery, Recommendation};
