//! Campus agent HTTP service.
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run -- --config campus-agent.toml
//! curl -X POST 'http://localhost:3000/api/agent/message?universityId=42' \
//!      -H 'content-type: application/json' \
//!      -d '{"message": "Quem é o usuário 7?", "sessionId": "ana"}'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use campus_agent::cache::ToolCache;
use campus_agent::checkpoint::{Checkpointer, FileCheckpointer, MemoryCheckpointer};
use campus_agent::config::{AppConfig, CheckpointKind};
use campus_agent::dispatcher::MessageDispatcher;
use campus_agent::llm;
use campus_agent::registry::RegistryClient;
use campus_agent::server::{AppState, build_router};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Agent service answering university users with per-university tools.
#[derive(Parser)]
#[command(about = "Per-university tool-calling agent service")]
struct Args {
    /// TOML configuration file. Defaults to ./campus-agent.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let registry = RegistryClient::with_timeout(
        config.registry.base_url.clone(),
        config.registry.timeout_secs.map(Duration::from_secs),
    )
    .context("building registry client")?;
    let cache = ToolCache::new(Arc::new(registry))
        .with_ttl(config.cache.ttl())
        .with_single_flight(config.cache.single_flight);

    let checkpointer: Arc<dyn Checkpointer> = match config.checkpoint.kind {
        CheckpointKind::Memory => Arc::new(MemoryCheckpointer::new()),
        CheckpointKind::File => Arc::new(FileCheckpointer::new(config.checkpoint.dir.clone())),
    };

    let mut http = reqwest::Client::builder();
    if let Some(secs) = config.tools.timeout_secs {
        http = http.timeout(Duration::from_secs(secs));
    }
    let http = http.build().context("building tool HTTP client")?;

    let dispatcher = MessageDispatcher::new(
        llm::from_config(&config.llm),
        checkpointer,
        http,
        config.agent.clone(),
    );

    let router = build_router(AppState {
        cache: Arc::new(cache),
        dispatcher: Arc::new(dispatcher),
    });

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        registry = %config.registry.base_url,
        model = %config.llm.model,
        "campus agent listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
