//! Mailferry - mailbox migration readiness validation and batch submission

mod output;
mod prompt;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailferry_core::application::{
    shutdown_channel, MigrationRun, RetryOptions, RunConfig, SessionManager, SourceFactory,
    SubmissionStrategy,
};
use mailferry_core::domain::ValidationDepth;
use mailferry_core::port::time_provider::SystemTimeProvider;
use mailferry_core::AppError;
use mailferry_infra_file::{CsvIdentitySource, FileArtifactStore, FileRunStateStore};
use mailferry_infra_remote::{HttpDirectoryGateway, RemoteConfig};

use crate::prompt::TerminalPrompt;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_depth(s: &str) -> Result<ValidationDepth, String> {
    ValidationDepth::from_str(s)
}

#[derive(Parser)]
#[command(name = "mailferry")]
#[command(about = "Validate mailbox readiness and submit a managed migration batch", long_about = None)]
#[command(version)]
struct Cli {
    /// CSV file with the mailboxes to migrate
    #[arg(long)]
    input: PathBuf,

    /// Name of the migration batch to create
    #[arg(long)]
    batch_name: String,

    /// Validation depth
    #[arg(long, default_value = "standard", value_parser = parse_depth)]
    depth: ValidationDepth,

    /// Concurrent validations per window (1-20)
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Mailboxes per validation window
    #[arg(long, default_value_t = 50)]
    window_size: usize,

    /// Validate and report, but stop before batch creation
    #[arg(long)]
    dry_run: bool,

    /// Skip the interactive prompt; include ready and warning mailboxes
    #[arg(long)]
    force: bool,

    /// Resume the previous run from its last checkpoint
    #[arg(long)]
    resume: bool,

    /// Path of the run state document (defaults to <work-dir>/run-state.json)
    #[arg(long)]
    state_path: Option<PathBuf>,

    /// Directory for validation artifacts and the report
    #[arg(long, default_value = "mailferry-work")]
    work_dir: PathBuf,

    /// CSV column holding the mailbox identity
    #[arg(long, default_value = "EmailAddress")]
    identity_column: String,

    /// Submit with per-mailbox bad-item tolerances instead of one bulk batch
    #[arg(long)]
    per_mailbox_tolerance: bool,

    /// Notification address for the migration batch (repeatable)
    #[arg(long = "notify")]
    notification_emails: Vec<String>,

    /// Base URL of the directory service
    #[arg(long, env = "MAILFERRY_BASE_URL")]
    base_url: String,

    /// Tenant the token grant is issued against
    #[arg(long, env = "MAILFERRY_TENANT_ID")]
    tenant_id: String,

    #[arg(long, env = "MAILFERRY_CLIENT_ID")]
    client_id: String,

    #[arg(long, env = "MAILFERRY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Target delivery domain for the migration batch
    #[arg(long, env = "MAILFERRY_TARGET_DOMAIN")]
    target_domain: String,

    /// Migration endpoint name on the remote tenant
    #[arg(long, env = "MAILFERRY_SOURCE_ENDPOINT")]
    source_endpoint: String,
}

fn init_logging() {
    let log_format =
        std::env::var("MAILFERRY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("mailferry=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    info!("Mailferry v{} starting", VERSION);

    // DI wiring: adapters in, core logic behind ports
    let gateway = Arc::new(
        HttpDirectoryGateway::new(RemoteConfig {
            base_url: cli.base_url.clone(),
            tenant_id: cli.tenant_id.clone(),
            client_id: cli.client_id.clone(),
            client_secret: cli.client_secret.clone(),
        })
        .context("Failed to build the directory gateway")?,
    );
    let time_provider = Arc::new(SystemTimeProvider);
    let session = Arc::new(SessionManager::new(gateway.clone(), time_provider.clone()));

    let state_path = cli
        .state_path
        .clone()
        .unwrap_or_else(|| cli.work_dir.join("run-state.json"));
    let state_store = Arc::new(FileRunStateStore::new(state_path));
    let artifacts = Arc::new(FileArtifactStore::new(cli.work_dir.clone()));

    let (shutdown_tx, shutdown_token) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next window boundary");
            shutdown_tx.shutdown();
        }
    });

    let input = cli.input.clone();
    let identity_column = cli.identity_column.clone();
    let source_factory: SourceFactory = Box::new(move || {
        Ok(Box::new(CsvIdentitySource::open(&input, &identity_column)?))
    });

    let config = RunConfig {
        batch_name: cli.batch_name.clone(),
        source_file_path: cli.input.display().to_string(),
        depth: cli.depth,
        window_size: cli.window_size,
        concurrency: cli.concurrency,
        dry_run: cli.dry_run,
        force: cli.force,
        strategy: if cli.per_mailbox_tolerance {
            SubmissionStrategy::PerMailboxTolerance
        } else {
            SubmissionStrategy::Bulk
        },
        source_endpoint: cli.source_endpoint.clone(),
        target_domain: cli.target_domain.clone(),
        notification_emails: cli.notification_emails.clone(),
        complete_after: None,
        start_after: None,
        retry: RetryOptions::transient_only(3, Duration::from_secs(1)),
    };

    let run = MigrationRun::new(
        config,
        gateway,
        session,
        state_store,
        artifacts,
        Arc::new(TerminalPrompt),
        time_provider,
        shutdown_token,
        source_factory,
    );

    match run.execute(cli.resume).await {
        Ok(outcome) => {
            output::print_summary(&outcome);
            if outcome.dry_run {
                println!("{}", "Dry run complete, no batch was created.".green());
            }
            Ok(())
        }
        Err(AppError::Interrupted(detail)) => {
            eprintln!(
                "{}",
                format!(
                    "Run interrupted ({}). Re-run with --resume to continue.",
                    detail
                )
                .yellow()
            );
            std::process::exit(130);
        }
        Err(error) => {
            eprintln!("{}", format!("Run failed: {}", error).red());
            eprintln!("The run state was checkpointed; --resume re-enters the failed stage.");
            std::process::exit(1);
        }
    }
}
