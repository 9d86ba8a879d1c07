//! Orchestration layer: the event-driven estimation pipeline
//! (depends on core, sensors, estimator).

mod pipeline;

pub use pipeline::{EstimatorPipeline, PipelineConfig, PoseEstimate};
