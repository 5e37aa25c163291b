use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatops_dispatch::audit::FileAuditLog;
use chatops_dispatch::config::{Config, LogFormat};
use chatops_dispatch::dispatch::{
    Collaborators, DispatchEngine, DispatchRequest, EngineSettings, ProcessExecutor,
};
use chatops_dispatch::gateway::{self, AppState};
use chatops_dispatch::loaders::LoaderRegistry;
use chatops_dispatch::metrics::{Metrics, MetricsSink};
use chatops_dispatch::notify::WebhookNotifier;

#[derive(Parser)]
#[command(name = "chatops-dispatch")]
#[command(about = "Run loader-specific plugins from chat slash commands", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.chatops-dispatch/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format: text or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP dispatcher
    Serve,
    /// List registered loaders
    Loaders,
    /// Print the command a request would run, without running it
    Plan {
        #[arg(long)]
        loader: String,
        #[arg(long)]
        plugin: String,
        /// Plugin parameters as key=value
        params: Vec<String>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(cli.log_format.unwrap_or(config.logging.format));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Loaders => {
            let registry = LoaderRegistry::from_config(&config.loaders)?;
            for loader in registry.descriptors() {
                println!(
                    "{:<10} {:<12} {}",
                    loader.id(),
                    loader.argument_style().to_string(),
                    loader.invocation_tokens().join(" ")
                );
            }
            Ok(())
        }
        Commands::Plan {
            loader,
            plugin,
            params,
        } => {
            let engine = build_engine(&config, Arc::new(Metrics::local()))?;
            let mut request = DispatchRequest::new(&loader, &plugin);
            for param in &params {
                let (key, value) = param
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Parameter '{}' must be key=value", param))?;
                request = request.with_parameter(key, value);
            }
            match engine.plan(&request) {
                Ok(invocation) => {
                    println!("{}", invocation);
                    Ok(())
                }
                Err(e) if e.is_client_error() => {
                    Err(anyhow!("Request would be rejected with 400: {}", e))
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Version => {
            println!("chatops-dispatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn build_engine(config: &Config, metrics: Arc<dyn MetricsSink>) -> anyhow::Result<DispatchEngine> {
    let registry =
        LoaderRegistry::from_config(&config.loaders).context("Invalid loader configuration")?;
    let notifier = WebhookNotifier::new(Duration::from_secs(config.notify.timeout_secs))?;

    Ok(DispatchEngine::new(
        registry,
        EngineSettings::from_config(&config.dispatch),
        Collaborators {
            executor: Arc::new(ProcessExecutor::new()),
            audit: Arc::new(FileAuditLog::new(&config.audit.log_path)),
            metrics,
            notifier: Arc::new(notifier),
        },
    ))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let metrics = Metrics::from_config(&config.metrics).await;
    let collector = config.metrics.expose_endpoint.then(|| metrics.collector());
    let engine = build_engine(&config, Arc::new(metrics))?;

    info!(
        loaders = ?engine.registry().ids(),
        plugin_root = %config.dispatch.plugin_root.display(),
        audit_log = %config.audit.log_path.display(),
        "Starting dispatcher"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    gateway::serve(listener, AppState { engine, collector }, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
