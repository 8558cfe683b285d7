use crate::state::{PlanState, StageUpdate};
use async_trait::async_trait;
use trellis_core::Result;

/// One step of the planning pipeline.
///
/// Stages read the shared state and return a partial update; the pipeline
/// owns the merge, so a stage can never clobber fields it did not produce.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &PlanState) -> Result<StageUpdate>;
}
