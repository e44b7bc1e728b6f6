pub mod analysis;
pub mod pipeline;
pub mod price;
pub mod recommendation;

pub use analysis::{
    AnalysisInput, AnalysisResult, AnalysisSource, BestOffer, DegradationReason,
    PriceStatistics, TrendDirection,
};
pub use pipeline::{PipelineRun, PipelineState, StageName, StageRecord, StageStatus};
pub use price::{
    CanonicalPriceRecord, Currency, PriceQuery, RawPayload, RawScrapeResult, RecordError,
    ScrapeErrorKind, ScrapeTarget, TargetOutcome, TargetStatus,
};
pub use recommendation::{Action, PriceBand, Recommendation};

#[cfg(test)]
mod tests;
