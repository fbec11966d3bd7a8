use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use minvar::Allocation;
use minvar::CoinGeckoClient;
use minvar::Config;
use minvar::Pipeline;
use minvar::PriceSource;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Minimum-variance portfolio weights for a set of crypto tickers.
#[derive(Parser)]
#[command(name = "minvar", version, about)]
struct Cli {
  /// Tickers or asset ids, e.g. `BTC ETH solana`.
  #[arg(required = true)]
  tickers: Vec<String>,

  /// Lookback window in days (7..=2000).
  #[arg(short, long)]
  days: Option<u32>,

  /// Override MINVAR_API_BASE.
  #[arg(long)]
  api_base: Option<String>,

  /// Print the allocation as JSON.
  #[arg(long)]
  json: bool,

  /// Recompute every N seconds until interrupted.
  #[arg(long, value_name = "SECS")]
  every: Option<u64>,
}

fn print_allocation(allocation: &Allocation, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(allocation)?);
    return Ok(());
  }

  println!(
    "Minimum-variance weights over {} days ({} observations):",
    allocation.window_days, allocation.observations
  );
  for (asset_id, weight) in allocation.iter() {
    println!("  {asset_id:<24} {:>8.2}%", weight * 100.0);
  }
  println!(
    "  portfolio volatility per period: {:.4}%",
    allocation.variance.sqrt() * 100.0
  );
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "minvar=info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();
  let mut config = Config::from_env().context("invalid MINVAR_* configuration")?;
  if let Some(api_base) = cli.api_base {
    config.api_base = api_base;
  }

  let source: Arc<dyn PriceSource> = Arc::new(
    CoinGeckoClient::new(
      config.api_base.clone(),
      config.api_key.clone(),
      config.http_timeout,
      config.catalog_pages,
    )
    .context("failed to build HTTP client")?,
  );

  let pipeline = Pipeline::from_config(&config, Arc::clone(&source));
  pipeline
    .catalog()
    .refresh(source.as_ref())
    .await
    .context("failed to load asset catalog")?;

  let Some(every) = cli.every else {
    let allocation = pipeline.run(cli.tickers.as_slice(), cli.days).await?;
    return print_allocation(&allocation, cli.json);
  };

  if let Some(period) = config.catalog_refresh {
    Arc::clone(pipeline.catalog()).spawn_refresh(Arc::clone(&source), period);
  }

  let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
  loop {
    tokio::select! {
      _ = ticker.tick() => {
        match pipeline.run(cli.tickers.as_slice(), cli.days).await {
          Ok(allocation) => print_allocation(&allocation, cli.json)?,
          Err(err) => error!(code = err.code(), error = %err, "allocation failed"),
        }
      }
      _ = tokio::signal::ctrl_c() => break,
    }
  }

  Ok(())
}
