use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use devflow_core::ReviewState;
use events::{EventBus, EventEnvelope};
use orchestrator::{
    ConversationOrchestrator, FileStateStore, ProceedToPhaseRequest, ProjectConfig,
    StartDevelopmentRequest, TaskBackendSetting, WhatsNextRequest, TASK_BACKEND_ENV,
};
use plugins::EventPublisherPlugin;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BRANCH: &str = "main";

#[derive(Parser)]
#[command(name = "devflow")]
#[command(about = "Phase-driven development conversations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Git branch (defaults to the checked-out branch)
    #[arg(long, global = true)]
    branch: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .devflow/config.json
    Init {
        #[arg(long, default_value = "markdown")]
        backend: String,
    },
    /// Start a conversation on a workflow
    Start {
        workflow: String,

        #[arg(long)]
        require_reviews: bool,
    },
    /// Move to another phase
    Proceed {
        phase: String,

        #[arg(long)]
        reason: Option<String>,

        #[arg(long)]
        trigger: Option<String>,

        /// not-required, pending or performed
        #[arg(long, default_value = "not-required")]
        review_state: String,
    },
    /// Instructions for the current phase
    WhatsNext {
        #[arg(long)]
        context: Option<String>,

        #[arg(long)]
        user_input: Option<String>,
    },
    /// Delete conversation state and the plan file
    Reset {
        #[arg(long)]
        confirm: bool,

        #[arg(long)]
        reason: Option<String>,
    },
    /// List available workflows
    Workflows,
    /// Validate a workflow definition file
    Validate { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let project = match cli.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { backend } => init_project(&project, &backend).await,
        Commands::Validate { file } => validate(&file).await,
        Commands::Start {
            workflow,
            require_reviews,
        } => {
            let app = App::open(&project, cli.branch).await?;
            let mut request = StartDevelopmentRequest::new(workflow);
            if require_reviews {
                request = request.with_required_reviews(true);
            }
            let result = app.orchestrator.start_development(request).await?;
            app.finish(&result)
        }
        Commands::Proceed {
            phase,
            reason,
            trigger,
            review_state,
        } => {
            let Some(review_state) = ReviewState::parse(&review_state) else {
                bail!("unknown review state `{review_state}`");
            };
            let app = App::open(&project, cli.branch).await?;
            let mut request = ProceedToPhaseRequest::new(phase).with_review_state(review_state);
            if let Some(reason) = reason {
                request = request.with_reason(reason);
            }
            if let Some(trigger) = trigger {
                request = request.with_trigger(trigger);
            }
            let result = app.orchestrator.proceed_to_phase(request).await?;
            app.finish(&result)
        }
        Commands::WhatsNext {
            context,
            user_input,
        } => {
            let app = App::open(&project, cli.branch).await?;
            let request = WhatsNextRequest {
                context,
                user_input,
                conversation_summary: None,
            };
            let result = app.orchestrator.whats_next(request).await?;
            app.finish(&result)
        }
        Commands::Reset { confirm, reason } => {
            let app = App::open(&project, cli.branch).await?;
            let result = app
                .orchestrator
                .reset_development(confirm, reason.as_deref())
                .await?;
            app.finish(&result)
        }
        Commands::Workflows => {
            let app = App::open(&project, cli.branch).await?;
            let result = app.orchestrator.list_workflows().await?;
            app.finish(&result)
        }
    }
}

/// An orchestrator for one project and branch, plus a tap on its lifecycle events.
struct App {
    orchestrator: ConversationOrchestrator,
    events: broadcast::Receiver<EventEnvelope>,
}

impl App {
    async fn open(project: &Path, branch: Option<String>) -> Result<Self> {
        let branch = match branch {
            Some(branch) => branch,
            None => detect_branch(project).await,
        };
        let config = ProjectConfig::read(project)
            .await
            .with_backend_override(std::env::var(TASK_BACKEND_ENV).ok().as_deref());
        let beads_available = which::which("bd").is_ok();
        tracing::debug!(beads_available, branch = %branch, "Opening conversation");

        let bus = EventBus::new();
        let events = bus.subscribe();
        let orchestrator = ConversationOrchestrator::from_config(
            project,
            branch,
            Arc::new(FileStateStore::new(project)),
            &config,
            beads_available,
        )?
        .with_plugin(Arc::new(EventPublisherPlugin::new(bus)));

        Ok(Self {
            orchestrator,
            events,
        })
    }

    fn finish<T: Serialize>(mut self, result: &T) -> Result<()> {
        while let Ok(envelope) = self.events.try_recv() {
            tracing::info!(
                event_id = %envelope.id,
                conversation_id = envelope.event.conversation_id(),
                "Published {:?}",
                envelope.event
            );
        }
        print_json(result)
    }
}

async fn init_project(project: &Path, backend: &str) -> Result<()> {
    let Some(task_backend) = TaskBackendSetting::parse(backend) else {
        bail!("unknown task backend `{backend}` (expected auto, markdown or beads)");
    };
    let config = ProjectConfig {
        task_backend,
        ..ProjectConfig::default()
    };
    config
        .write(project)
        .await
        .context("Failed to write project config")?;
    print_json(&config)
}

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    name: String,
    initial_state: String,
    phases: Vec<String>,
}

async fn validate(file: &Path) -> Result<()> {
    let definition = workflow::load_from_file(file)
        .await
        .with_context(|| format!("Invalid workflow {}", file.display()))?;
    print_json(&ValidationReport {
        valid: true,
        phases: definition.phases().into_iter().map(str::to_string).collect(),
        name: definition.name,
        initial_state: definition.initial_state,
    })
}

/// Current branch from `.git/HEAD`; detached heads and non-repositories use `main`.
async fn detect_branch(project: &Path) -> String {
    match tokio::fs::read_to_string(project.join(".git/HEAD")).await {
        Ok(head) => parse_head(&head).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        Err(e) => {
            tracing::debug!("No git HEAD found ({}), using {}", e, DEFAULT_BRANCH);
            DEFAULT_BRANCH.to_string()
        }
    }
}

fn parse_head(head: &str) -> Option<String> {
    head.trim()
        .strip_prefix("ref: refs/heads/")
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "devflow=info,orchestrator=info,workflow=info,plugins=info".into()
            }),
        )
        .init();
}
