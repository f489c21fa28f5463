use anyhow::Context;
use dockbridge::cli::{Args, ConfigDiscovery, ConfigOverrides, ExecutionMode};
use dockbridge::container::ContainerOrchestrator;
use dockbridge::mcp::{http, stdio};
use dockbridge::{ServerConfig, ToolRegistry, build_server};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout belongs to the stdio transport, so logs always go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dockbridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.mode() {
        ExecutionMode::ServeHttp(overrides) => run_http(&overrides).await,
        ExecutionMode::ServeStdio(overrides) => run_stdio(&overrides).await,
        ExecutionMode::ListTools { json } => list_tools(json),
        ExecutionMode::ShowConfig(overrides) => show_config(&overrides),
    }
}

async fn load_server(
    overrides: &ConfigOverrides,
) -> anyhow::Result<(ServerConfig, dockbridge::McpServer)> {
    let (config, source) =
        ConfigDiscovery::load(overrides).context("Failed to load configuration")?;
    match &source {
        Some(path) => info!("Using configuration from {:?}", path),
        None => info!("Using built-in configuration defaults"),
    }

    let orchestrator =
        ContainerOrchestrator::connect(config.client_config(), config.orchestrator_config())
            .await
            .context("Failed to create Docker client")?;

    match orchestrator.client().ping().await {
        Ok(()) => info!("Connected to Docker daemon"),
        Err(e) => warn!("Docker daemon is not reachable yet: {}", e),
    }
    if let Some(container) = &config.container {
        info!("Default container: {}", container);
    }

    let server = build_server(&config, Arc::new(orchestrator));
    Ok((config, server))
}

async fn run_http(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let (config, server) = load_server(overrides).await?;
    let options = config.http_options()?;
    http::serve(Arc::new(server), options).await?;
    Ok(())
}

async fn run_stdio(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let (_, server) = load_server(overrides).await?;
    stdio::serve(&server).await?;
    Ok(())
}

fn list_tools(json: bool) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_default_tools();

    if json {
        let listing = serde_json::json!({ "tools": registry.descriptors() });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let width = registry.iter().map(|t| t.name().len()).max().unwrap_or(0);
    for tool in registry.iter() {
        println!("{:<width$}  {}", tool.name(), tool.description(), width = width);
    }
    Ok(())
}

fn show_config(overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let (config, source) = ConfigDiscovery::load(overrides)?;
    print!("{}", ConfigDiscovery::discovery_report(&config, source.as_deref())?);
    Ok(())
}
