use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use project_monitor::{
    monitor_metrics, InMemoryProjectRepository, Permission, ProjectAggregate,
    ProjectMonitorConfig, ProjectRepository, ProjectService, TracingAuditSink, WorkflowStatus,
};

#[derive(Parser)]
#[command(name = "project-monitor")]
#[command(about = "Workflow and automated progress tracking for monitored projects")]
#[command(long_about = "Inspect the project approval workflow, evaluate automated progress and \
                       milestone delays for project snapshots, and manage the monitor's configuration.")]
struct Cli {
    /// Configuration file (defaults to ./project-monitor.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the workflow transition table with the roles allowed on each edge
    Transitions,
    /// Recompute automated progress for a JSON project snapshot
    Progress {
        /// Path to a project aggregate serialized as JSON
        snapshot: PathBuf,
        /// Write the recomputed snapshot back to the file
        #[arg(long)]
        write: bool,
    },
    /// Detect overdue milestones in a JSON project snapshot
    Delays {
        /// Path to a project aggregate serialized as JSON
        snapshot: PathBuf,
        /// Assessment date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Write the snapshot with delayed milestones back to the file
        #[arg(long)]
        write: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Save to this path instead of printing
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Create the database and run migrations
    #[cfg(feature = "database")]
    Migrate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ProjectMonitorConfig::load_env_file()?;
    let config = match &cli.config {
        Some(path) => ProjectMonitorConfig::load_from(path)?,
        None => ProjectMonitorConfig::load()?,
    };
    project_monitor::init_telemetry(&config.observability)?;

    let result = match cli.command {
        Commands::Transitions => transitions_command(&config),
        Commands::Progress { snapshot, write } => tokio::runtime::Runtime::new()?
            .block_on(async { progress_command(&config, &snapshot, write).await }),
        Commands::Delays {
            snapshot,
            today,
            write,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            delays_command(&config, &snapshot, today, write).await
        }),
        Commands::Config { output } => config_command(&config, output.as_deref()),
        #[cfg(feature = "database")]
        Commands::Migrate => {
            tokio::runtime::Runtime::new()?.block_on(async { migrate_command(&config).await })
        }
    };

    if config.observability.metrics_enabled {
        monitor_metrics().log_stats();
    }
    result
}

fn transitions_command(config: &ProjectMonitorConfig) -> Result<()> {
    let policy = config.role_policy()?;
    println!("{:<26} {:<26} {:<38} ROLES", "FROM", "TO", "MEANING");
    for edge in WorkflowStatus::edges() {
        let roles: Vec<&str> = policy
            .roles_for(&Permission::Transition(edge))
            .iter()
            .map(|role| role.as_str())
            .collect();
        println!(
            "{:<26} {:<26} {:<38} {}",
            edge.from,
            edge.to,
            edge.label(),
            roles.join(", ")
        );
    }
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<ProjectAggregate> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid snapshot {}", path.display()))
}

fn write_snapshot(path: &Path, aggregate: &ProjectAggregate) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(aggregate)?)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))
}

/// Load a snapshot into a throwaway in-memory service.
async fn snapshot_service(
    config: &ProjectMonitorConfig,
    aggregate: &ProjectAggregate,
) -> Result<ProjectService> {
    let repository = Arc::new(InMemoryProjectRepository::new());
    repository.insert(aggregate, &[]).await?;
    ProjectService::from_config(config, repository, Arc::new(TracingAuditSink))
}

async fn progress_command(config: &ProjectMonitorConfig, path: &Path, write: bool) -> Result<()> {
    let aggregate = read_snapshot(path)?;
    let service = snapshot_service(config, &aggregate).await?;

    let outcome = service.recompute_progress(aggregate.id()).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if write && outcome.written {
        let mut updated = service.project(aggregate.id()).await?;
        updated.version = aggregate.version;
        write_snapshot(path, &updated)?;
    } else if outcome.written {
        eprintln!(
            "Stored progress {}% is stale (computed {}%); rerun with --write to update",
            outcome.previous, outcome.progress
        );
    }
    Ok(())
}

async fn delays_command(
    config: &ProjectMonitorConfig,
    path: &Path,
    today: NaiveDate,
    write: bool,
) -> Result<()> {
    let aggregate = read_snapshot(path)?;
    let service = snapshot_service(config, &aggregate).await?;

    let report = service.refresh_delays(aggregate.id(), today).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if write && !report.newly_delayed.is_empty() {
        let mut updated = service.project(aggregate.id()).await?;
        updated.version = aggregate.version;
        write_snapshot(path, &updated)?;
    }
    Ok(())
}

fn config_command(config: &ProjectMonitorConfig, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            config.save_to_file(path)?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}

#[cfg(feature = "database")]
async fn migrate_command(config: &ProjectMonitorConfig) -> Result<()> {
    use project_monitor::repository::SqliteProjectRepository;

    let database = config
        .database
        .clone()
        .context("No [database] section configured")?;
    let repository = SqliteProjectRepository::connect(&database).await?;
    if !database.auto_migrate {
        repository.migrate().await?;
    }
    println!("Database at {} is up to date", database.url);
    repository.shutdown().await;
    Ok(())
}
