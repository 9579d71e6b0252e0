mod config;

use agentic_builtins::register_builtins;
use agentic_core::{CancellationToken, Payload};
use agentic_orchestrator::{
    create_vm_workflow, AgentRegistry, Orchestrator, VmWorkflowConfig, Workflow, WorkflowResult,
};
use clap::{Parser, Subcommand};
use config::{load_document, AgenticConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentic", about = "Agentic — task scheduling and workflow orchestration")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentic.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered connectors
    Connectors,
    /// Run one task through the scheduler and print its final state
    Submit {
        /// Task category (container, kubernetes, nix, echo, ...)
        category: String,
        /// Task payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
        /// Worker count (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Run a workflow definition (JSON or TOML)
    Workflow {
        file: PathBuf,
    },
    /// Build a VM provisioning workflow from a config file and run it.
    ///
    /// No built-in connector handles `vm` steps, so a config with
    /// `use_proxmox = true` only runs with an externally registered VM agent.
    Provision {
        file: PathBuf,
        /// Print the generated workflow without running it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Results go to stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AgenticConfig::load(&cli.config)?;
    config.connectors.apply_env_overrides();

    let registry = Arc::new(AgentRegistry::new());
    register_builtins(&registry, &config.connectors);
    let orchestrator = Orchestrator::new(registry);

    match cli.command {
        Commands::Connectors => {
            print_json(&orchestrator.list_connectors())?;
        }
        Commands::Submit {
            category,
            payload,
            workers,
        } => {
            let payload = parse_payload(payload.as_deref())?;
            let workers = workers.unwrap_or(config.scheduler.workers).max(1);

            let scheduler = orchestrator.scheduler(config.scheduler.queue_capacity);
            scheduler.run(workers);
            let handle = scheduler.submit(category, payload).await?;

            let task = tokio::select! {
                task = handle.wait() => task,
                _ = tokio::signal::ctrl_c() => {
                    warn!(task_id = %handle.id(), "Interrupted, stopping scheduler");
                    scheduler.stop().await;
                    handle.snapshot()
                }
            };
            scheduler.stop().await;

            print_json(&task)?;
            if let Some(error) = task.result.as_ref().and_then(|r| r.error.as_deref()) {
                anyhow::bail!("task {} ({}) failed: {}", task.id, task.status, error);
            }
        }
        Commands::Workflow { file } => {
            let workflow = Workflow::from_file(&file)?;
            let result = run_workflow(&orchestrator, &workflow).await;
            finish_workflow(&result)?;
        }
        Commands::Provision { file, dry_run } => {
            let vm_config: VmWorkflowConfig = load_document(&file)?;
            let workflow = create_vm_workflow(&vm_config);
            if dry_run {
                print_json(&workflow)?;
            } else {
                let result = run_workflow(&orchestrator, &workflow).await;
                finish_workflow(&result)?;
            }
        }
    }

    Ok(())
}

/// Run a workflow, cancelling in-flight steps on Ctrl-C.
async fn run_workflow(orchestrator: &Orchestrator, workflow: &Workflow) -> WorkflowResult {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling workflow");
            on_interrupt.cancel();
        }
    });

    info!(workflow_id = %workflow.id, steps = workflow.steps.len(), "Running workflow");
    let result = orchestrator
        .run_workflow_with_cancel(workflow, cancel)
        .await;
    watcher.abort();
    result
}

fn finish_workflow(result: &WorkflowResult) -> anyhow::Result<()> {
    print_json(result)?;
    if !result.is_completed() {
        anyhow::bail!(
            "workflow '{}' failed: {}",
            result.workflow_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn parse_payload(raw: Option<&str>) -> anyhow::Result<Payload> {
    let Some(raw) = raw else {
        return Ok(Payload::new());
    };
    match serde_json::from_str(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("payload must be a JSON object, got {other}"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
