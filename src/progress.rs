//! Progress reporting hooks
//!
//! Stage reporting is separated from the orchestrator so an embedding
//! frontend can surface its own progress UI without the pipeline knowing
//! about it.

use crate::pipeline::RequestState;

/// Receiver for per-request stage transitions
///
/// Implementations must be cheap; reports are delivered synchronously from
/// the pipeline between stages.
pub trait ProgressReporter: Send + Sync {
    /// Called on every state transition of a composite request
    fn report_stage(&self, request_id: u64, state: RequestState);
}

/// Reporter that discards all progress events
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_stage(&self, _request_id: u64, _state: RequestState) {}
}

/// Reporter that forwards stage transitions to the `log` facade
#[derive(Debug, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report_stage(&self, request_id: u64, state: RequestState) {
        log::info!("request {}: {}", request_id, state.description());
    }
}
