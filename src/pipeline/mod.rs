// src/pipeline/mod.rs

pub mod metrics;
pub mod orchestrator;

pub use metrics::RunMetrics;
pub use orchestrator::VideoAnalyzer;
