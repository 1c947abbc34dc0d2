use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "anify-server")]
#[command(about = "Anify media search gateway")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "anify.toml")]
    config: String,

    /// Address to bind to (overrides config)
    #[arg(long)]
    bind_addr: Option<String>,

    /// Query Meilisearch before the backend (overrides config)
    #[arg(long)]
    use_meilisearch: Option<bool>,
}

fn init_tracing(config: &anify::config::ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional; deployments usually set the variables directly
    let dotenv = dotenvy::dotenv();

    let mut config = anify::Config::load_or_create(std::path::Path::new(&args.config))?;
    config.apply_env_overrides();
    if let Some(bind_addr) = args.bind_addr {
        config.server.bind_addr = bind_addr;
    }
    if let Some(enabled) = args.use_meilisearch {
        config.meilisearch.enabled = enabled;
    }

    init_tracing(&config.observability);

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    config.validate()?;

    tracing::info!("Starting Anify search gateway on {}", config.server.bind_addr);
    tracing::info!("Config file: {}", args.config);
    if config.meilisearch.enabled {
        tracing::info!("Primary index: {}", config.meilisearch.url);
    } else {
        tracing::info!("Primary index disabled, serving from backend only");
    }
    tracing::info!("Backend: {}", config.backend.url);

    let pipeline = Arc::new(anify::search::SearchPipeline::from_config(&config)?);

    let mut server = anify::api::ApiServer::with_config(pipeline, &config.server);
    if config.observability.metrics_enabled {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
        server = server.with_metrics(handle);
        tracing::info!("Prometheus metrics at /metrics");
    }

    server.serve(&config.server.bind_addr).await?;

    Ok(())
}
