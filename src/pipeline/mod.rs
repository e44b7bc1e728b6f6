//! 流水线编排与同步桥接

pub mod bridge;
pub mod context;
pub mod orchestrator;
pub mod timing;

pub use bridge::AsyncBridge;
pub use context::PipelineContext;
pub use orchestrator::{PipelineOrchestrator, PipelineReport};
pub use timing::StageClock;
