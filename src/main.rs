use clap::Parser;
use prompt_pt::config::cli::IntakeArgs;
use prompt_pt::core::render::render_analysis;
use prompt_pt::core::session::SubmitOutcome;
use prompt_pt::utils::{logger, validation::Validate};
use prompt_pt::{HttpAnalysisService, IntakeSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = IntakeArgs::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("Starting promPT intake");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 驗證參數
    if let Err(e) = args.validate() {
        tracing::error!("❌ Argument validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let service = HttpAnalysisService::new(args.endpoint.clone());
    let session = IntakeSession::new(service);

    println!("⏳ Analyzing...");
    match session.submit(&args.to_form()).await {
        SubmitOutcome::Completed(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render_analysis(&result));
            }
        }
        SubmitOutcome::Failed(message) => {
            eprintln!("❌ {}", message);
            std::process::exit(1);
        }
        SubmitOutcome::Busy => {
            eprintln!("⚠️ A submission is already in progress");
            std::process::exit(2);
        }
    }

    Ok(())
}
