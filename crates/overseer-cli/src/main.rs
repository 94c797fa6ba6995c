//! `overseer` binary: runs the orchestrator with its HTTP gateway, or a
//! single agent operation from the command line.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::OverseerConfig;
use overseer_core::Params;
use overseer_gateway::{AuthConfig, GatewayServer};
use overseer_orchestrator::{
    CommandExecutor, DecisionMakerAgent, Orchestrator, ProcessAutomatorAgent, SelfHealerAgent,
    SysinfoTelemetry,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "overseer", about = "Overseer: autonomous task orchestrator", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "overseer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring and processing loops and the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Make a decision for a JSON context, e.g. '{"performance_issue": true}'
    Decide {
        context: String,
    },
    /// Run an automation template with the configured actions
    Automate {
        process_type: String,
        /// JSON object passed to every step
        #[arg(long)]
        params: Option<String>,
    },
    /// Diagnose symptoms and run the healing plan
    Heal {
        #[arg(required = true)]
        symptoms: Vec<String>,
        /// Identifier reported back in the healing report
        #[arg(long)]
        id: Option<String>,
    },
    /// List automation templates and their steps
    Templates,
}

fn parse_object(text: &str, what: &str) -> anyhow::Result<Params> {
    serde_json::from_str(text).with_context(|| format!("{what} must be a JSON object"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = OverseerConfig::load(&cli.config).await?;
    let executor = Arc::new(CommandExecutor::new(config.actions.clone()));

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            if executor.actions().is_empty() {
                warn!("No [actions] configured; every automation step and healing strategy will fail");
            }

            let telemetry = Arc::new(SysinfoTelemetry::new());
            let orchestrator = Arc::new(Orchestrator::new(
                config.orchestrator,
                executor.clone(),
                executor,
                telemetry,
            )?);

            let auth = AuthConfig::new(config.server.api_keys);
            if auth.is_enabled() {
                info!(keys = auth.api_keys.len(), "API key auth enabled");
            }

            let loops = orchestrator.start();
            let app = GatewayServer::build(orchestrator.clone(), auth);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!(addr = %addr, "Overseer gateway listening");

            let shutdown = orchestrator.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    shutdown.shutdown();
                })
                .await?;

            orchestrator.shutdown();
            loops.join().await;
            info!("Overseer stopped");
        }
        Commands::Decide { context } => {
            let context = parse_object(&context, "context")?;
            let agent = DecisionMakerAgent::new(config.orchestrator.decision_history_capacity);
            print_json(&agent.make_decision(&context)?)?;
        }
        Commands::Automate {
            process_type,
            params,
        } => {
            let params = match params {
                Some(text) => parse_object(&text, "--params")?,
                None => Params::new(),
            };
            let agent = ProcessAutomatorAgent::new(executor);
            let outcome = agent.execute_automation(&process_type, &params).await?;
            print_json(&outcome)?;
            if let Some(error) = outcome.error {
                anyhow::bail!("automation '{process_type}' failed: {error}");
            }
        }
        Commands::Heal { symptoms, id } => {
            let mut issue = Params::new();
            issue.insert("symptoms".to_string(), symptoms.into());
            if let Some(id) = id {
                issue.insert("id".to_string(), id.into());
            }
            let agent = SelfHealerAgent::new(executor);
            let report = agent.diagnose_and_heal(&issue).await?;
            print_json(&report)?;
            if let Some(error) = report.healing_result.error {
                anyhow::bail!("healing failed: {error}");
            }
        }
        Commands::Templates => {
            let agent = ProcessAutomatorAgent::new(executor);
            for name in agent.templates() {
                let Some(template) = agent.template(&name) else {
                    continue;
                };
                let steps: Vec<&str> = template.steps.iter().map(|s| s.action.as_str()).collect();
                println!("{name}: {}", steps.join(" -> "));
            }
        }
    }

    Ok(())
}
