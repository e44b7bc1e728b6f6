//! 流水线的四个阶段

pub mod analysis;
pub mod planning;
pub mod recommendation;
pub mod scraping;

pub use analysis::AnalysisAgent;
pub use planning::PlanningAgent;
pub use recommendation::RecommendationAgent;
pub use scraping::{ScrapingAgent, ScrapingOutcome};
