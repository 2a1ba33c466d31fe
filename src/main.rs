use clap::Parser;
use compound_risk_scorer::{
    config::{ConfigValidator, LoggingSettings, Settings},
    io::{read_wallets, validate_deliverable, write_detailed, write_scores, DETAILED_FILE, SCORES_FILE},
    models::WalletRiskResult,
    services::{BatchScorer, BatchSummary, EtherscanClient, WalletScoringService},
    AppError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Score Compound V2/V3 wallets for lending risk on a 0-1000 scale", long_about = None)]
struct Args {
    /// CSV file with one wallet address per row
    #[arg(long, short)]
    input: PathBuf,

    /// Where to write the wallet_id,score deliverable
    #[arg(long, short, default_value = SCORES_FILE)]
    output: PathBuf,

    /// Where to write per-component scores and transaction counts
    #[arg(long, default_value = DETAILED_FILE)]
    detailed_output: PathBuf,

    /// TOML settings file (overrides built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wallets scored concurrently; provider calls stay paced across all of them
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        settings.batch.workers = workers;
    }
    init_logging(&settings.logging)?;
    ConfigValidator::new().validate(&settings)?;

    info!("Starting Compound wallet risk scoring");
    if settings.provider.api_key.is_none() {
        warn!("No provider API key configured; expect aggressive rate limiting");
    }

    let input = read_wallets(&args.input)?;
    if input.wallets.is_empty() {
        return Err(AppError::ValidationError(format!(
            "no valid wallet addresses found in {}",
            args.input.display()
        ))
        .into());
    }
    let skipped_invalid = input.invalid.len();
    if skipped_invalid > 0 {
        warn!(
            skipped_invalid,
            first = %input.invalid[0],
            "Some input rows are not wallet addresses and will not appear in the outputs"
        );
    }

    let provider = Arc::new(EtherscanClient::new(&settings.provider)?);
    let service = Arc::new(WalletScoringService::from_settings(&settings, provider)?);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing wallets already in flight");
            let _ = cancel_tx.send(true);
        }
    });

    let input_duplicates = input.duplicates;
    let run = BatchScorer::new(service, settings.batch.workers, cancel_rx)
        .run(input.wallets)
        .await;

    let results: Vec<WalletRiskResult> = run.outcomes.iter().map(|o| o.result().clone()).collect();
    write_scores(&args.output, &results)?;
    write_detailed(&args.detailed_output, &results)?;

    BatchSummary::from_outcomes(&run.outcomes).log();
    let rows = validate_deliverable(&args.output)?;

    info!(
        rows,
        skipped_invalid,
        duplicates = input_duplicates,
        elapsed = %compound_risk_scorer::utils::time::format_minutes(run.elapsed),
        output = %args.output.display(),
        detailed = %args.detailed_output.display(),
        "Analysis complete"
    );
    if run.cancelled {
        warn!(
            completed = run.completed(),
            requested = run.requested,
            "Run was interrupted; outputs cover completed wallets only"
        );
    }
    Ok(())
}

fn init_logging(logging: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = logging.level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("compound_risk_scorer={}", log_level).into())
    };

    match logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter())
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(filter())
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter())
                .with(tracing_subscriber::fmt::layer().compact())
                .try_init()?;
        }
    }

    info!("Logging initialized with level: {}, format: {}", logging.level, logging.format);
    Ok(())
}
