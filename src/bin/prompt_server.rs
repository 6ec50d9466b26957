use anyhow::Context;
use clap::Parser;
use prompt_pt::adapters::vector_store_from_config;
use prompt_pt::api::{build_router, AppState};
use prompt_pt::config::cli::ServerArgs;
use prompt_pt::utils::{logger, validation::Validate};
use prompt_pt::{AnthropicClient, AppConfig, RagPipeline, VoyageEmbedder};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let mut config = match AppConfig::load(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 命令列覆蓋設定
    if let Some(bind) = &args.bind {
        config.server.bind_address = bind.clone();
    }

    logger::init_server_logger(args.verbose, args.json_logs || config.server.json_logs);
    tracing::info!("🚀 Starting promPT analysis service");

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let embedder = Arc::new(VoyageEmbedder::new(&config.voyage)?);
    let store = vector_store_from_config(&config);
    let model = Arc::new(AnthropicClient::new(&config.anthropic));
    let pipeline = RagPipeline::new(embedder, store, model)
        .with_match_count(config.retrieval.match_count);

    let app = build_router(AppState::new(Arc::new(pipeline)), &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!("📡 Listening on http://{}", config.server.bind_address);
    tracing::info!("🌐 Allowed origins: {:?}", config.server.allowed_origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("🛑 Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
