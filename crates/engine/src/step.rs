//! The contract every pipeline step implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::state::BuildState;

/// What the runner should do after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    /// Proceed to the next step.
    Continue,
    /// Stop the run; the step has recorded why in [`BuildState::error`].
    Halt,
}

/// One stage of the build pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name used in logs and events.
    fn name(&self) -> &str;

    /// Perform the step's work against the shared state.
    async fn run(&self, cancel: &CancellationToken, state: &mut BuildState) -> StepAction;

    /// Undo whatever `run` created. Called once per started step, in reverse
    /// order, after the run ends for any reason.
    async fn cleanup(&self, _state: &mut BuildState) {}
}
