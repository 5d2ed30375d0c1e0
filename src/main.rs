use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tendril::config::AppConfig;
use tendril::prediction::extract::extract_id_and_status;
use tendril::server::{create_router, AppState};
use tendril::shutdown::{graceful_shutdown, wait_for_shutdown};
use tendril::workflow::responder::LineResponder;
use tendril::workflow::resume::drive_clarifications;
use tendril::workflow::RunState;

#[derive(Parser)]
#[command(
    name = "tendril",
    about = "Drives LLM plan runs with human-in-the-loop clarifications and generation-job polling"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Execute one plan interactively, answering clarifications on stdin
    Run {
        /// Natural-language prompt for the plan
        #[arg(short, long)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Run { prompt } => run_once(config, prompt).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Tendril server"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    // Report what the process is abandoning
    graceful_shutdown(&state).await;

    Ok(())
}

async fn run_once(config: AppConfig, prompt: String) -> anyhow::Result<()> {
    let state = AppState::new(config.clone())?;
    let engine = Arc::clone(&state.engine);
    let max_cycles = config.clarify.max_cycles;

    // The engine call and the stdin clarification loop both block, so the
    // whole interactive phase runs off the async runtime.
    let run = tokio::task::spawn_blocking(move || -> tendril::error::Result<_> {
        let run = engine.run_plan(&prompt, &serde_json::Value::Null)?;
        let mut responder = LineResponder::stdin();
        drive_clarifications(engine.as_ref(), run, &mut responder, max_cycles)
    })
    .await??;

    match run.state {
        RunState::Complete => {
            let handle = run
                .final_output
                .as_ref()
                .map(extract_id_and_status)
                .and_then(|s| s.into_handle());

            match handle {
                Some(handle) => {
                    println!("Job {} submitted ({}), waiting for it to finish...", handle.id, handle.status);
                    let result = state.poller.poll(state.fetcher.as_ref(), &handle.id).await?;
                    if result.output.is_empty() {
                        println!("Job succeeded but returned no artifacts");
                    }
                    for url in &result.output {
                        println!("{url}");
                    }
                }
                None => {
                    if let Some(final_output) = &run.final_output {
                        println!("{final_output}");
                    } else {
                        println!("Run complete with no final output");
                    }
                }
            }
            Ok(())
        }
        RunState::Failed => anyhow::bail!("plan run {} failed", run.id),
        RunState::NeedsClarification => anyhow::bail!(
            "gave up on run {} after {max_cycles} clarification cycles",
            run.id
        ),
        RunState::InProgress => anyhow::bail!("engine returned run {} still in progress", run.id),
    }
}
