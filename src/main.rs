use anyhow::Context;
use clap::Parser;
use quarterly_risk::adapters::input::load_input;
use quarterly_risk::api::{create_routes, AppState};
use quarterly_risk::utils::error::ErrorSeverity;
use quarterly_risk::utils::{logger, validation::Validate};
use quarterly_risk::{CliConfig, Command, QuarterlyRiskAssessor, RiskError, TomlConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match cli.load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(exit_code(&e));
        }
    };

    // 初始化日誌
    let level = settings.logging.level.as_deref();
    if settings.logging.json {
        logger::init_json_logger(cli.verbose, level);
    } else {
        logger::init_cli_logger(cli.verbose, level);
    }

    tracing::info!("🚀 Starting quarterly-risk");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(exit_code(&e));
    }

    tracing::info!(
        order = %settings.assessment.arima_order,
        penalty_weight = settings.assessment.penalty_weight,
        late_weight = settings.assessment.late_weight,
        risk_threshold = settings.assessment.risk_threshold,
        "✅ Configuration loaded and validated successfully"
    );

    let assessor = QuarterlyRiskAssessor::new(&settings);

    match &cli.command {
        Command::Serve { .. } => serve(&settings, assessor).await,
        Command::Assess {
            input,
            detailed,
            pretty,
        } => {
            if let Err(e) = assess_file(&assessor, input, *detailed, *pretty) {
                // 記錄詳細錯誤信息
                tracing::error!(
                    "❌ Assessment failed: {} (Category: {:?}, Severity: {:?})",
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 建議: {}", e.recovery_suggestion());
                std::process::exit(exit_code(&e));
            }
            Ok(())
        }
    }
}

async fn serve(settings: &TomlConfig, assessor: QuarterlyRiskAssessor) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(assessor));
    let app = create_routes().with_state(state);

    let addr: SocketAddr = settings
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", settings.listen_addr()))?;
    tracing::info!(?addr, "Quarterly risk service listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Quarterly risk service stopped");
    Ok(())
}

fn assess_file(
    assessor: &QuarterlyRiskAssessor,
    path: &Path,
    detailed: bool,
    pretty: bool,
) -> quarterly_risk::Result<()> {
    tracing::info!("📁 Loading input from: {}", path.display());
    let input = load_input(path)?;
    let assessment = assessor.assess(&input)?;

    let output = match (detailed, pretty) {
        (true, true) => serde_json::to_string_pretty(&assessment)?,
        (true, false) => serde_json::to_string(&assessment)?,
        (false, true) => serde_json::to_string_pretty(&assessment.report)?,
        (false, false) => serde_json::to_string(&assessment.report)?,
    };
    println!("{}", output);

    if assessment.report.risk_flag {
        tracing::warn!("⚠️ Risk flag raised (score {})", assessment.report.risk_score);
    } else {
        tracing::info!("✅ No risk flag (score {})", assessment.report.risk_score);
    }
    Ok(())
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(error: &RiskError) -> i32 {
    match error.severity() {
        ErrorSeverity::High => 1,     // 輸入錯誤
        ErrorSeverity::Medium => 2,   // 模型或評分錯誤
        ErrorSeverity::Critical => 3, // 配置或系統錯誤
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
