//! reltrack CLI - track foreign-key relationships in a GraphQL engine
//!
//! Usage:
//!   reltrack plan [--json]
//!   reltrack apply [--dry-run]
//!   reltrack track-tables
//!
//! Examples:
//!   reltrack --source bikes --kind mssql plan
//!   reltrack --endpoint http://localhost:8080 apply --dry-run
//!   RUST_LOG=reltrack=debug reltrack apply

use clap::{Parser, Subcommand};
use reltrack::config::{Settings, SettingsError};
use reltrack::inference::{InferenceEngine, InferencePlan};
use reltrack::metadata::{
    apply_plan, introspect, track_untracked_tables, ApplyReport, GraphqlEngineClient, SourceKind,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "reltrack")]
#[command(about = "Track foreign-key relationships in a GraphQL engine")]
#[command(version)]
struct Cli {
    /// Path to a reltrack.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine base URL (overrides the config file)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Data source name (overrides the config file)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Data source kind: mssql or postgres (overrides the config file)
    #[arg(long, global = true)]
    kind: Option<SourceKind>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the relationships that would be created
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the missing relationships
    Apply {
        /// Print the requests instead of submitting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Track every table of the source that is not tracked yet
    TrackTables,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings, SettingsError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    if let Some(endpoint) = &cli.endpoint {
        settings.engine.endpoint = endpoint.clone();
    }
    if let Some(source) = &cli.source {
        settings.source.name = source.clone();
    }
    if let Some(kind) = cli.kind {
        settings.source.kind = kind;
    }
    Ok(settings)
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let settings = load_settings(&cli)?;
    let client = settings.engine_client()?;

    match cli.command {
        Commands::Plan { json } => cmd_plan(&client, &settings, json).await,
        Commands::Apply { dry_run } => cmd_apply(&client, &settings, dry_run).await,
        Commands::TrackTables => cmd_track_tables(&client).await,
    }
}

async fn build_plan(client: &GraphqlEngineClient, settings: &Settings) -> Result<InferencePlan, Box<dyn Error>> {
    let snapshot = introspect(client, client).await?;
    let engine = InferenceEngine::with_config(settings.data_source(), settings.inference.clone());
    Ok(engine.plan(&snapshot))
}

async fn cmd_plan(
    client: &GraphqlEngineClient,
    settings: &Settings,
    json: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let plan = build_plan(client, settings).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    if plan.is_empty() {
        println!("No untracked relationships.");
        return Ok(ExitCode::SUCCESS);
    }

    for table in &plan.tables {
        println!("{}:", table.table);
        for planned in &table.relationships {
            println!(
                "  + {} {} -> {}",
                planned.candidate.kind,
                planned.name(),
                planned.candidate.remote_table
            );
        }
    }
    println!();
    println!("{} relationship(s) on {} table(s)", plan.len(), plan.tables.len());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_apply(
    client: &GraphqlEngineClient,
    settings: &Settings,
    dry_run: bool,
) -> Result<ExitCode, Box<dyn Error>> {
    let plan = build_plan(client, settings).await?;

    if dry_run {
        for planned in plan.relationships() {
            println!("{}", serde_json::to_string(&planned.up)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let report = apply_plan(client, &plan).await;
    Ok(print_report(&report, "created"))
}

async fn cmd_track_tables(client: &GraphqlEngineClient) -> Result<ExitCode, Box<dyn Error>> {
    let snapshot = introspect(client, client).await?;
    let report = track_untracked_tables(client, &snapshot, client.source()).await;
    Ok(print_report(&report, "tracked"))
}

fn print_report(report: &ApplyReport, verb: &str) -> ExitCode {
    for applied in &report.applied {
        println!("{} {} on {}", verb, applied.name, applied.table);
    }
    for failed in &report.failed {
        eprintln!("failed {} on {}: {}", failed.name, failed.table, failed.error);
    }
    println!("{} {}, {} failed", report.applied.len(), verb, report.failed.len());

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
