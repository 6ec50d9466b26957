use clap::Parser;
use prompt_pt::adapters::pubmed::SearchMode;
use prompt_pt::adapters::vector_store_from_config;
use prompt_pt::config::cli::{FetchArgs, IngestArgs, IngestCommand, RunArgs, SearchArgs};
use prompt_pt::core::ingest::{write_report, IngestPhase, IngestionSummary};
use prompt_pt::domain::ports::{Embedder, ResearchSource, VectorStore};
use prompt_pt::utils::error::{ErrorSeverity, PromptError};
use prompt_pt::utils::logger;
use prompt_pt::utils::validation::{validate_url, Validate};
use prompt_pt::{AppConfig, IngestionRunner, LocalStorage, PubMedClient, VoyageEmbedder};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = IngestArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting promPT research ingestion");

    // 驗證參數
    if let Err(e) = args.validate() {
        tracing::error!("❌ Argument validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let config = match AppConfig::load(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let outcome = match &args.command {
        IngestCommand::Bulk(run) => ingest(&config, run, false, args.monitor).await,
        IngestCommand::Refresh(run) => ingest(&config, run, true, args.monitor).await,
        IngestCommand::Fetch(fetch) => fetch_only(&config, fetch).await,
        IngestCommand::Search(search) => search_store(&config, search).await,
    };

    if let Err(e) = outcome {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Ingestion failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn build_phases(config: &AppConfig, run: &RunArgs, refresh: bool) -> Result<Vec<IngestPhase>, PromptError> {
    let ingestion = &config.ingestion;
    let pick_conditions = |configured: &Vec<String>| {
        if run.conditions.is_empty() {
            configured.clone()
        } else {
            run.conditions.clone()
        }
    };

    let standard: Arc<dyn ResearchSource> =
        Arc::new(PubMedClient::new(&config.pubmed, SearchMode::Standard)?);
    let mut phases = vec![IngestPhase {
        name: "standard".to_string(),
        source: standard,
        conditions: pick_conditions(&ingestion.conditions),
        max_results: run.max_results.unwrap_or(ingestion.max_results),
        delay: Duration::from_secs(run.delay_seconds.unwrap_or(ingestion.condition_delay_seconds)),
        error_delay: Duration::from_secs(ingestion.error_delay_seconds),
    }];

    if refresh {
        let high_quality: Arc<dyn ResearchSource> =
            Arc::new(PubMedClient::new(&config.pubmed, SearchMode::HighQuality)?);
        phases.push(IngestPhase {
            name: "high_quality".to_string(),
            source: high_quality,
            conditions: pick_conditions(&ingestion.high_quality_conditions),
            max_results: run.max_results.unwrap_or(ingestion.high_quality_max_results),
            delay: Duration::from_secs(
                run.delay_seconds.unwrap_or(ingestion.high_quality_delay_seconds),
            ),
            // 高品質階段失敗後照常等待
            error_delay: Duration::ZERO,
        });
    }

    Ok(phases)
}

async fn ingest(config: &AppConfig, run: &RunArgs, refresh: bool, monitor: bool) -> Result<(), PromptError> {
    config.validate_ingestion()?;
    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let phases = build_phases(config, run, refresh)?;
    let embedder: Arc<dyn Embedder> = Arc::new(VoyageEmbedder::new(&config.voyage)?);
    let store = vector_store_from_config(config);

    let runner = IngestionRunner::new(embedder, store).with_monitoring(monitor);
    let summary = runner.run(&phases).await;

    print_summary(&summary);

    if let Some(dir) = &run.report_dir {
        let storage = LocalStorage::new(dir.clone());
        let filename = write_report(&storage, &summary).await?;
        tracing::info!("📁 Report saved to: {}/{}", dir, filename);
        println!("📁 Report saved to: {}/{}", dir, filename);
    }

    if summary.conditions_attempted > 0 && summary.conditions_failed == summary.conditions_attempted {
        return Err(PromptError::ProcessingError {
            message: format!("all {} conditions failed", summary.conditions_attempted),
        });
    }
    Ok(())
}

fn print_summary(summary: &IngestionSummary) {
    println!("✅ Ingestion complete");
    println!("   Conditions attempted: {}", summary.conditions_attempted);
    println!("   Conditions succeeded: {}", summary.conditions_succeeded);
    println!("   Conditions failed:    {}", summary.conditions_failed);
    println!("   Articles stored:      {}", summary.articles_stored);
    println!("   Duration:             {:.1}s", summary.duration_seconds);
    for failed in summary.results.iter().filter(|r| r.error.is_some()) {
        println!(
            "   ❌ [{}] {}: {}",
            failed.phase,
            failed.condition,
            failed.error.as_deref().unwrap_or_default()
        );
    }
}

async fn fetch_only(config: &AppConfig, fetch: &FetchArgs) -> Result<(), PromptError> {
    validate_url("pubmed.search_url", &config.pubmed.search_url)?;
    validate_url("pubmed.fetch_url", &config.pubmed.fetch_url)?;

    let mode = if fetch.high_quality {
        SearchMode::HighQuality
    } else {
        SearchMode::Standard
    };
    let client = PubMedClient::new(&config.pubmed, mode)?;
    let articles = client.fetch_research(&fetch.query, fetch.max_results).await?;

    tracing::info!("📥 Fetched {} articles for '{}'", articles.len(), fetch.query);
    println!("{}", serde_json::to_string_pretty(&articles)?);
    Ok(())
}

async fn search_store(config: &AppConfig, search: &SearchArgs) -> Result<(), PromptError> {
    config.validate_ingestion()?;

    let embedder = VoyageEmbedder::new(&config.voyage)?;
    let store = vector_store_from_config(config);

    let embedding = embedder.embed_query(&search.query).await?;
    let results = store.search(&embedding, search.match_count).await?;

    if results.is_empty() {
        println!("No matching documents");
    }
    for (i, scored) in results.iter().enumerate() {
        println!(
            "[{}] {:.3} {} ({})",
            i + 1,
            scored.similarity,
            scored.article.title,
            scored.article.url
        );
    }
    Ok(())
}
