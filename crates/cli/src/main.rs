use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vpcimage_engine::{
    BuildState, CloudClients, ConsoleUi, PipelineEvent, PipelineRunner, PipelineStatus, VerifyInputStep, load_build_config,
};

/// Build custom VPC images.
#[derive(Debug, Parser)]
#[command(name = "vpcimage", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that every configured cloud reference is usable before building.
    Verify(VerifyArgs),
}

#[derive(Debug, clap::Args)]
struct VerifyArgs {
    /// Build configuration file (YAML or JSON).
    #[arg(short, long)]
    config: PathBuf,
    /// Override the configured region.
    #[arg(long)]
    region: Option<String>,
    /// Override the configured target image name.
    #[arg(long)]
    image_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Verify(args) => run_verify(args).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_verify(args: VerifyArgs) -> Result<ExitCode> {
    let mut config = load_build_config(&args.config)?;
    if let Some(region) = args.region {
        config.region = region;
    }
    if let Some(image_name) = args.image_name {
        config.image_name = image_name;
    }
    config
        .validate()
        .with_context(|| format!("check {}", args.config.display()))?;

    let clients = CloudClients::from_config(&config).context("create cloud clients")?;
    let mut state = BuildState::new(config, clients, Arc::new(ConsoleUi));

    let (event_tx, event_rx) = unbounded_channel();
    let events = tokio::spawn(log_events(event_rx));
    let runner = PipelineRunner::new(vec![Box::new(VerifyInputStep)]).with_event_sender(event_tx);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            interrupt.cancel();
        }
    });

    info!(steps = ?runner.step_names(), "running build pipeline");
    let status = runner.run(&mut state, &cancel).await;
    drop(runner);
    let _ = events.await;

    match status {
        PipelineStatus::Succeeded => {
            if let Some(vpc_id) = &state.security_group_vpc {
                info!(vpc_id = %vpc_id, "security group VPC verified");
            }
            state.ui.say("All inputs verified.");
            Ok(ExitCode::SUCCESS)
        }
        PipelineStatus::Halted | PipelineStatus::Cancelled => Ok(ExitCode::FAILURE),
    }
}

async fn log_events(mut event_rx: UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            PipelineEvent::StepFinished {
                step,
                action,
                duration_ms,
                ..
            } => debug!(step = %step, ?action, duration_ms, "step finished"),
            PipelineEvent::RunCompleted { status, finished_at } => {
                debug!(?status, finished_at = %finished_at, "pipeline completed")
            }
            other => debug!(event = ?other, "pipeline event"),
        }
    }
}
