use anyhow::Result;
use clap::{Parser, Subcommand};
use draftsmith::app::App;
use draftsmith::config::Config;
use draftsmith::gateway;
use draftsmith::workflow::GenerationRequest;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "draftsmith",
    version,
    about = "Retrieval-grounded document generation backend"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway.
    Serve {
        /// Override the configured bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the configured bind port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one generation workflow and print the report as JSON.
    Generate {
        #[arg(long)]
        doc_type: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long, default_value = "")]
        requirements: String,
        #[arg(long, default_value = "professional")]
        style: String,
        #[arg(long)]
        max_iterations: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for rustls TLS before any client is
    // built.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            let app = App::build(config).await?;
            gateway::run_gateway(&app).await
        }
        Command::Generate {
            doc_type,
            summary,
            requirements,
            style,
            max_iterations,
        } => {
            if summary.trim().is_empty() && requirements.trim().is_empty() {
                anyhow::bail!("either --summary or --requirements must be provided");
            }
            let max_iterations = max_iterations.unwrap_or(config.workflow.max_iterations);
            let app = App::build(config).await?;
            let report = app
                .engine
                .run(GenerationRequest {
                    doc_type,
                    summary,
                    requirements,
                    style,
                    max_iterations: Some(max_iterations),
                    feedback: Vec::new(),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
