//! Error types for the estimation pipeline.
//!
//! All variants are local-recoverable: the pipeline logs the failure, skips
//! the affected step, and keeps serving the most recent valid estimate.

/// Result type alias
pub type Result<T> = std::result::Result<T, EstimatorError>;

/// Estimation error types
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// Non-positive elapsed time between encoder synchronizations.
    /// The affected cycle is skipped; the next synchronization retries.
    #[error("invalid integration interval: {delta_t} s")]
    InvalidInterval {
        /// The rejected interval in seconds
        delta_t: f32,
    },

    /// Innovation covariance too close to zero to invert. The update is
    /// skipped and the predicted state retained.
    #[error("singular innovation covariance: {s}")]
    SingularInnovationCovariance {
        /// The degenerate innovation covariance value
        s: f32,
    },

    /// Predict or update requested before the first reset seeded the state.
    #[error("filter not ready: no reference pose observed yet")]
    NotReady,
}
