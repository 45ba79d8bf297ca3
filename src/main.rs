// ABOUTME: Command-line entry point for sending, summarizing, inspecting and routing agent messages
// ABOUTME: Initializes logging (stderr plus daily log file), loads .env and config, then runs one command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use switchboard::config::Config;
use switchboard::{paths, Switchboard};
use switchboard_core::{DispatchMeta, DispatchResult, MessageType, Priority};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "switchboard", version, about = "Route messages between coordinated agents")]
struct Cli {
    /// Config file to use instead of the search order
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log every dispatch without delivering anything
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver one message to an agent
    Send {
        agent: String,
        text: String,
        #[arg(long, default_value = "System")]
        from: String,
        #[arg(long, default_value = "normal")]
        priority: Priority,
        #[arg(long = "type", default_value = "system_to_agent")]
        message_type: MessageType,
    },
    /// Ask an agent for a status summary
    Summary {
        agent: String,
        #[arg(long)]
        requested_by: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Read what an agent's window currently shows
    Status { agent: String },
    /// List resolved delivery targets
    Targets,
    /// Route JSON messages read one per line from stdin
    Route,
}

/// Keeps the file writer flushing until main returns.
type LogGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

fn init_logging() -> LogGuard {
    let log_dir = paths::log_dir();
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(&log_dir, "switchboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Log directory {} unavailable: {}", log_dir.display(), e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatch_exit(result: &DispatchResult) -> Result<ExitCode> {
    print_json(result)?;
    Ok(if result.status().is_settled() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    dotenvy::dotenv().ok();
    let mut config = Config::load_from(cli.config.as_deref()).context("Failed to load config")?;
    if cli.dry_run {
        config.gateway.dry_run = true;
    }
    tracing::debug!(config = ?config, "Configuration loaded");

    let switchboard = Switchboard::build(config)?;
    let gateway = switchboard.gateway();

    match cli.command {
        Commands::Send {
            agent,
            text,
            from,
            priority,
            message_type,
        } => {
            let meta = DispatchMeta::from_sender(from)
                .with_priority(priority)
                .with_type(message_type);
            dispatch_exit(&gateway.send(&agent, &text, meta).await)
        }
        Commands::Summary {
            agent,
            requested_by,
            context,
        } => dispatch_exit(
            &gateway
                .request_agent_summary(&agent, &requested_by, context.as_deref())
                .await,
        ),
        Commands::Status { agent } => {
            let status = gateway.get_agent_status(&agent).await;
            print_json(&status)?;
            Ok(if status["status"] == "error" {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Targets => {
            let coordinates = gateway.coordinates();
            if coordinates.is_default() {
                tracing::warn!("No coordinate file loaded, showing the default roster");
            }
            print_json(coordinates.targets())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Route => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let summary = switchboard
                .route_lines(stdin, tokio::io::stdout())
                .await?;
            tracing::info!(
                queued = summary.queued,
                rejected = summary.rejected,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Routing finished"
            );
            Ok(if summary.rejected + summary.failed + summary.dropped == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
