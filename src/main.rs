mod api;
mod app;
mod config;
mod dashboard;
mod error;
mod selection;
mod state;
mod tui;
mod ui;

use anyhow::{Context, Result};
use api::{HttpPredictionApi, PredictionApi};
use app::App;
use clap::Parser;
use config::DashboardConfig;
use dashboard::Dashboard;
use selection::{AssetClass, Selection, TimeRange};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Oasis TUI: stock & cryptocurrency price prediction dashboard",
    after_help = "EXAMPLES:
    # Open the dashboard against a local backend
    cargo run --release

    # Point at another backend and start on Ethereum, 1 year range
    cargo run --release -- --api-url http://10.0.0.5:8000 --asset-class crypto --symbol ETH-USD --range 1Y

    # Check the backend is up
    cargo run --release -- --health

    # One-shot prediction, printed to stdout
    cargo run --release -- --predict --symbol AAPL"
)]
struct Args {
    /// Prediction backend base URL (env: OASIS_API_URL, default: http://localhost:8000)
    #[arg(long)]
    api_url: Option<String>,

    /// Initial symbol; must belong to the asset class catalog
    #[arg(long, default_value = "TSLA")]
    symbol: String,

    /// Initial asset class
    #[arg(long, value_enum, default_value_t = AssetClass::Stock)]
    asset_class: AssetClass,

    /// Initial time range
    #[arg(long, value_enum, default_value_t = TimeRange::OneMonth)]
    range: TimeRange,

    /// Log file used while the dashboard owns the terminal (env: OASIS_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Probe the backend health endpoint and exit
    #[arg(long)]
    health: bool,

    /// Request a single prediction for the selection and exit
    #[arg(long)]
    predict: bool,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = config::load_dotenv();
    let args = Args::parse();
    let cfg = DashboardConfig::resolve(args.api_url.clone(), args.log_file.clone());
    let one_shot = args.health || args.predict;

    if one_shot {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&cfg.log_file)
            .with_context(|| format!("cannot open log file {}", cfg.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    match dotenv {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable .env: {}", e),
    }
    info!("Using prediction backend at {}", cfg.api_url);

    let api = Arc::new(HttpPredictionApi::new(&cfg.api_url));
    let selection = Selection::new(&args.symbol, args.asset_class, args.range);

    if args.health {
        return run_health(api.as_ref()).await;
    }

    if args.predict {
        return run_predict(api.as_ref(), &selection).await;
    }

    let mut terminal = tui::init()?;
    let mut app = App::new(Dashboard::new(api, selection));
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
        return Err(e.into());
    }

    Ok(())
}

async fn run_health(api: &dyn PredictionApi) -> Result<()> {
    let health = api.health().await.context("backend health check failed")?;
    info!(
        "Backend status={} service={} timestamp={}",
        health.status,
        health.service.as_deref().unwrap_or("-"),
        health.timestamp.as_deref().unwrap_or("-")
    );
    println!("{}", health.status);
    Ok(())
}

async fn run_predict(api: &dyn PredictionApi, selection: &Selection) -> Result<()> {
    let p = api
        .predict(selection.symbol(), selection.asset_class())
        .await
        .with_context(|| format!("prediction for {} failed", selection.symbol()))?;
    println!(
        "{}: current ${:.2} -> predicted ${:.2} ({:+.2}, {:+.2}%) rmse={:.2} mae={:.2}",
        p.symbol, p.current_price, p.predicted_price, p.change, p.change_percent, p.rmse, p.mae
    );
    Ok(())
}
