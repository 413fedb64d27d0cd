//! Sequential pipeline runner.
//!
//! Steps run one after another against a single [`BuildState`]. The run ends
//! when every step has continued, when a step halts, or when the cancellation
//! token fires between steps. Whatever the outcome, each started step is then
//! cleaned up in reverse order. Lifecycle events can be streamed to an
//! observer over a Tokio channel.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    state::BuildState,
    step::{Step, StepAction},
};

/// Final status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    /// Every step continued.
    Succeeded,
    /// A step halted the run.
    Halted,
    /// The cancellation token fired before the run finished.
    Cancelled,
}

/// Lifecycle events emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        at: DateTime<Utc>,
        step_count: usize,
    },
    StepStarted {
        index: usize,
        step: String,
        started_at: DateTime<Utc>,
    },
    StepFinished {
        index: usize,
        step: String,
        action: StepAction,
        duration_ms: u64,
    },
    CleanupStarted {
        step: String,
    },
    RunCompleted {
        status: PipelineStatus,
        finished_at: DateTime<Utc>,
    },
}

/// Runs an ordered list of steps.
pub struct PipelineRunner {
    steps: Vec<Box<dyn Step>>,
    event_tx: Option<UnboundedSender<PipelineEvent>>,
}

impl PipelineRunner {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps, event_tx: None }
    }

    /// Stream lifecycle events to `event_tx`. A dropped receiver is ignored.
    pub fn with_event_sender(mut self, event_tx: UnboundedSender<PipelineEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Names of the configured steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step, then clean up the started ones in reverse order.
    ///
    /// The token is checked between steps only; a step already running is
    /// left to finish.
    pub async fn run(&self, state: &mut BuildState, cancel: &CancellationToken) -> PipelineStatus {
        info!(step_count = self.steps.len(), "pipeline run started");
        self.emit(PipelineEvent::RunStarted {
            at: Utc::now(),
            step_count: self.steps.len(),
        });

        let mut started = 0;
        let mut status = PipelineStatus::Succeeded;

        for (index, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                status = PipelineStatus::Cancelled;
                break;
            }

            debug!(index, step = step.name(), "step started");
            self.emit(PipelineEvent::StepStarted {
                index,
                step: step.name().to_string(),
                started_at: Utc::now(),
            });
            started = index + 1;

            let started_at = Instant::now();
            let action = step.run(cancel, state).await;
            let duration_ms = started_at.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

            self.emit(PipelineEvent::StepFinished {
                index,
                step: step.name().to_string(),
                action,
                duration_ms,
            });

            if action == StepAction::Halt {
                warn!(index, step = step.name(), duration_ms, "step halted the pipeline");
                status = PipelineStatus::Halted;
                break;
            }
            debug!(index, step = step.name(), duration_ms, "step finished");

            if cancel.is_cancelled() {
                status = PipelineStatus::Cancelled;
                break;
            }
        }

        for step in self.steps[..started].iter().rev() {
            debug!(step = step.name(), "cleaning up step");
            self.emit(PipelineEvent::CleanupStarted {
                step: step.name().to_string(),
            });
            step.cleanup(state).await;
        }

        info!(?status, "pipeline run completed");
        self.emit(PipelineEvent::RunCompleted {
            status,
            finished_at: Utc::now(),
        });
        status
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(event_tx) = &self.event_tx {
            let _ = event_tx.send(event);
        }
    }
}
