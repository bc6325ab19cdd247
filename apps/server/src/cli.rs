//! Command line interface.
//!
//! - `serve` (default): refresh the watchlist in the background until Ctrl-C
//! - `quote`: resolve current prices once
//! - `history`: print daily history for one ticker

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use papertrade_core::market_data::DEFAULT_HISTORY_DAYS;
use papertrade_market_data::Ticker;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::main_lib::AppState;
use crate::scheduler::start_background_tasks;

#[derive(Parser, Debug)]
#[command(name = "papertrade")]
#[command(about = "Market data core of the papertrade dashboard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep watchlist prices fresh until interrupted
    Serve,
    /// Print current prices
    Quote(QuoteArgs),
    /// Print daily price history
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Ticker symbols
    #[arg(required = true)]
    pub tickers: Vec<String>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub ticker: String,

    /// Days back from now
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_DAYS)]
    pub days: i64,
}

pub async fn serve(state: Arc<AppState>, config: &Config) -> anyhow::Result<()> {
    info!("Serving market data from {}", state.db_path);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = start_background_tasks(state, config.market_data.scheduler.clone(), shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    shutdown_tx.send(true).ok();

    for task in tasks {
        if let Err(e) = task.await {
            warn!("Background task ended abnormally: {}", e);
        }
    }
    Ok(())
}

impl QuoteArgs {
    pub async fn execute(&self, state: &AppState) -> anyhow::Result<()> {
        let tickers: Vec<Ticker> = self.tickers.iter().map(Ticker::new).collect();
        let prices = state.gateway.get_batch_prices(&tickers).await;

        for ticker in &tickers {
            match prices.get(ticker) {
                Some(point) => println!("{}", serde_json::to_string(point)?),
                None => warn!("No price available for {}", ticker),
            }
        }
        Ok(())
    }
}

impl HistoryArgs {
    /// `[end - days, end]`, rejecting spans chrono cannot represent.
    fn range_ending(&self, end: DateTime<Utc>) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = Duration::try_days(self.days.max(0))
            .and_then(|span| end.checked_sub_signed(span))
            .with_context(|| format!("--days {} is out of range", self.days))?;
        Ok((start, end))
    }

    pub async fn execute(&self, state: &AppState) -> anyhow::Result<()> {
        let ticker = Ticker::new(&self.ticker);
        let (start, end) = self.range_ending(Utc::now())?;

        let points = state
            .gateway
            .get_price_history(&ticker, start, end)
            .await
            .with_context(|| format!("No history for {ticker}"))?;
        for point in &points {
            println!("{}", serde_json::to_string(point)?);
        }
        info!("{} history points for {}", points.len(), ticker);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn history_args(args: &[&str]) -> HistoryArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::History(history)) => history,
            other => panic!("expected history command, got {other:?}"),
        }
    }

    #[test]
    fn test_history_defaults_days() {
        let args = history_args(&["papertrade", "history", "aapl"]);
        assert_eq!(args.ticker, "aapl");
        assert_eq!(args.days, DEFAULT_HISTORY_DAYS);
    }

    #[test]
    fn test_history_range() {
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let args = history_args(&["papertrade", "history", "AAPL", "--days", "30"]);
        let (start, to) = args.range_ending(end).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(to, end);

        let args = history_args(&["papertrade", "history", "AAPL", "--days=-5"]);
        assert_eq!(args.range_ending(end).unwrap(), (end, end));
    }

    #[test]
    fn test_history_huge_days_is_an_error() {
        let args = history_args(&[
            "papertrade",
            "history",
            "AAPL",
            "--days",
            "9223372036854775807",
        ]);
        let err = args.range_ending(Utc::now()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
