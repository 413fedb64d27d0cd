//! # vpcimage engine
//!
//! Step-based pipeline execution for the image build, plus the pre-flight
//! input verification step that runs before any billable resource exists.
//!
//! ## Architecture
//!
//! - **`state`**: the typed [`BuildState`] shared by every step of a run
//! - **`ui`**: the user-facing output sink ([`Ui`], [`ConsoleUi`], [`RecordingUi`])
//! - **`step`**: the [`Step`] contract and the [`StepAction`] it returns
//! - **`runner`**: [`PipelineRunner`], which runs steps in order and unwinds
//!   them through `cleanup` in reverse
//! - **`steps`**: concrete steps, currently [`VerifyInputStep`]
//! - **`config`**: loading a [`BuildConfig`](vpcimage_types::BuildConfig) from disk
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vpcimage_engine::{BuildState, CloudClients, ConsoleUi, PipelineRunner, VerifyInputStep, load_build_config};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = load_build_config("build.yaml")?;
//! config.validate()?;
//! let clients = CloudClients::from_config(&config)?;
//! let mut state = BuildState::new(config, clients, Arc::new(ConsoleUi));
//!
//! let runner = PipelineRunner::new(vec![Box::new(VerifyInputStep)]);
//! let status = runner.run(&mut state, &CancellationToken::new()).await;
//! println!("pipeline finished: {status:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod runner;
pub mod state;
pub mod step;
pub mod steps;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use config::{API_KEY_ENV_VARS, apply_environment_overrides, load_build_config, parse_build_config};
pub use runner::{PipelineEvent, PipelineRunner, PipelineStatus};
pub use state::{BuildState, CloudClients};
pub use step::{Step, StepAction};
pub use steps::verify_input::{ValidationErrorKind, VerifiedInputs, VerifyInputError, VerifyInputStep, verify_inputs};
pub use ui::{ConsoleUi, RecordingUi, Ui, UiLevel, UiLine};
