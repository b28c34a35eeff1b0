//! Command-line interface for regdraft.
//!
//! Provides commands for running generation jobs, inspecting stored jobs,
//! and checking redaction, validation and model connectivity by hand.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use uuid::Uuid;

use crate::adapters::OllamaTransport;
use crate::config;
use crate::core::{
    contract_for, redact, redaction_counts, FileJobStore, GenerationClient, JobOrchestrator,
    JobRepository, SchemaValidator,
};
use crate::domain::{GenerationTask, JobKind, JobStatus, Requester};

/// regdraft - Compliance draft generation over a local model
#[derive(Parser, Debug)]
#[command(name = "regdraft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a generation job
    Run {
        /// Job kind (incident-draft, communication-pack, questionnaire-answers)
        kind: JobKind,

        /// Facts file as JSON (reads from stdin if not provided)
        #[arg(short, long)]
        facts: Option<PathBuf>,

        /// Owning tenant
        #[arg(short, long, env = "REGDRAFT_TENANT")]
        tenant: String,

        /// Requesting user
        #[arg(short, long, env = "REGDRAFT_USER")]
        user: String,
    },

    /// Show a job and its artifacts
    Show {
        /// Job ID (UUID)
        job_id: String,
    },

    /// List recent jobs
    Jobs {
        /// Maximum number of jobs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Redact text and print the result
    Redact {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Validate a JSON document against a job kind's schema
    Validate {
        /// Job kind
        kind: JobKind,

        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the published JSON Schema for a job kind
    Schema {
        /// Job kind
        kind: JobKind,
    },

    /// Check the model server is reachable
    Health,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                kind,
                facts,
                tenant,
                user,
            } => run_job(kind, facts, Requester::new(tenant, user)).await,
            Commands::Show { job_id } => show_job(&job_id).await,
            Commands::Jobs { limit } => list_jobs(limit).await,
            Commands::Redact { input } => redact_input(input),
            Commands::Validate { kind, input } => validate_input(kind, input),
            Commands::Schema { kind } => {
                println!("{}", contract_for(kind).schema);
                Ok(())
            }
            Commands::Health => health().await,
            Commands::Config => show_config(),
        }
    }
}

/// Read from a file, or from stdin when it is piped
fn read_input(path: Option<PathBuf>, what: &str) -> Result<String> {
    let input = if let Some(path) = path {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} file: {}", what, path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No {} provided. Pass a file or pipe to stdin", what);
    };

    if input.trim().is_empty() {
        anyhow::bail!("{} is empty", what);
    }

    Ok(input)
}

/// Build a generation client from the resolved configuration
fn build_client() -> Result<GenerationClient> {
    let cfg = config::config()?;
    let transport = OllamaTransport::new(cfg.model.endpoint.clone());
    Ok(GenerationClient::new(
        Arc::new(transport),
        cfg.client_settings(),
    ))
}

/// Build an orchestrator wired to the configured model and store
async fn build_orchestrator() -> Result<JobOrchestrator> {
    let cfg = config::config()?;
    let store = FileJobStore::open_default().await?;

    Ok(JobOrchestrator::new(
        Arc::new(build_client()?),
        Arc::new(store),
        Arc::new(SchemaValidator::new()),
    )
    .with_max_attempts(cfg.max_attempts))
}

/// Run a generation job and print its artifact
async fn run_job(kind: JobKind, facts_file: Option<PathBuf>, requester: Requester) -> Result<()> {
    let raw = read_input(facts_file, "facts")?;
    let facts: Value = serde_json::from_str(&raw).context("Facts must be a JSON document")?;
    if !facts.is_object() {
        anyhow::bail!("Facts must be a JSON object");
    }

    let orchestrator = build_orchestrator().await?;
    let task = GenerationTask::new(kind, facts, requester);
    let job = orchestrator.run_job(&task).await?;
    let (_, artifacts) = orchestrator.get_job(job.id).await?;

    for artifact in &artifacts {
        match artifact.json() {
            Ok(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
            Err(_) => println!("{}", artifact.content),
        }
    }

    match job.status {
        JobStatus::Completed => {
            eprintln!(
                "\n[Job {} completed after {} attempt(s)]",
                job.id, job.attempts
            );
        }
        JobStatus::Failed => {
            eprintln!(
                "\n[Job {} failed: {}]",
                job.id,
                job.error.as_deref().unwrap_or("unknown error")
            );
            eprintln!("[Artifact produced by the fallback template; review before use]");
        }
        other => {
            eprintln!("\n[Job {} in status: {:?}]", job.id, other);
        }
    }

    Ok(())
}

/// Show a job and its artifacts
async fn show_job(job_id_str: &str) -> Result<()> {
    let job_id =
        Uuid::parse_str(job_id_str).with_context(|| format!("Invalid job ID: {}", job_id_str))?;

    let store = FileJobStore::open_default().await?;
    let job = store
        .find_job(job_id)
        .await?
        .with_context(|| format!("Job {} not found", job_id))?;
    let artifacts = store.find_artifacts_by_job(job_id).await?;

    println!("Job ID: {}", job.id);
    println!("Kind: {}", job.kind);
    println!("Tenant: {}", job.tenant_id);
    println!("Requested by: {}", job.requested_by);
    println!("Status: {:?}", job.status);
    println!("Model: {}", job.model);
    println!("Attempts: {}", job.attempts);
    println!("Created: {}", job.created_at);
    if let Some(completed) = job.completed_at {
        println!("Completed: {}", completed);
    }
    println!("Input hash: {}", job.input_hash);
    if let Some(ref output_hash) = job.output_hash {
        println!("Output hash: {}", output_hash);
    }
    if let Some(ref error) = job.error {
        println!("Error: {}", error);
    }

    println!("\nArtifacts:");
    for artifact in &artifacts {
        println!(
            "  {} {}{}",
            artifact.id,
            artifact.kind,
            if artifact.fallback { " (fallback)" } else { "" }
        );
        println!("{}", artifact.content);
    }

    Ok(())
}

/// List recent jobs
async fn list_jobs(limit: usize) -> Result<()> {
    let store = FileJobStore::open_default().await?;
    let jobs = store.list_jobs(limit).await?;

    if jobs.is_empty() {
        println!("No jobs found");
        return Ok(());
    }

    println!(
        "{:<38} {:<22} {:<10} {:<16} {:<8}",
        "JOB ID", "KIND", "STATUS", "TENANT", "ATTEMPTS"
    );
    println!("{}", "-".repeat(98));

    for job in jobs {
        let status = match job.status {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        println!(
            "{:<38} {:<22} {:<10} {:<16} {:<8}",
            job.id, job.kind, status, job.tenant_id, job.attempts
        );
    }

    Ok(())
}

/// Redact input and print the result, with per-rule counts on stderr
fn redact_input(input: Option<PathBuf>) -> Result<()> {
    let text = read_input(input, "input")?;

    for (rule, count) in redaction_counts(&text) {
        if count > 0 {
            eprintln!("[{}: {}]", rule, count);
        }
    }

    print!("{}", redact(&text));
    Ok(())
}

/// Validate a JSON document against a kind's schema
fn validate_input(kind: JobKind, input: Option<PathBuf>) -> Result<()> {
    let text = read_input(input, "input")?;
    let outcome = SchemaValidator::new().validate(&text, kind);

    if outcome.valid {
        println!("valid");
        Ok(())
    } else {
        println!("invalid: {}", outcome.errors);
        std::process::exit(1);
    }
}

/// Check connectivity to the configured model server
async fn health() -> Result<()> {
    let client = build_client()?;
    let endpoint = &config::config()?.model.endpoint;

    match client.health_check().await {
        Ok(()) => {
            println!("{} at {} is reachable", client.transport_name(), endpoint);
            Ok(())
        }
        Err(e) => anyhow::bail!("{} at {} is unreachable: {}", client.transport_name(), endpoint, e),
    }
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("regdraft configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home: {}", cfg.home.display());
    println!("  Jobs: {}", cfg.jobs_dir().display());
    println!();
    println!("Model:");
    println!("  Endpoint:       {}", cfg.model.endpoint);
    println!("  Model:          {}", cfg.model.model);
    println!("  Temperature:    {}", cfg.model.params.temperature);
    println!("  Top p:          {}", cfg.model.params.top_p);
    println!("  Context window: {}", cfg.model.params.context_window);
    println!("  Timeout:        {}s", cfg.model.timeout_seconds);
    println!();
    println!("Transport retry:");
    println!("  Max attempts:   {}", cfg.transport_retry.max_attempts);
    println!("  Initial delay:  {}ms", cfg.transport_retry.initial_delay_ms);
    println!("  Max delay:      {}ms", cfg.transport_retry.max_delay_ms);
    println!("  Multiplier:     {}", cfg.transport_retry.backoff_multiplier);
    println!();
    println!("Generation:");
    println!("  Max attempts:   {}", cfg.max_attempts);

    Ok(())
}
