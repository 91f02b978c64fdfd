//! Backtest command implementation.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use signal_backtest::{BacktestConfig, BacktestEngine, ReplayFeed};
use signal_strategies::StrategyFactory;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::BacktestArgs;

pub async fn run(args: BacktestArgs) -> Result<()> {
    info!(strategy = %args.strategy, symbol = %args.symbol, "starting backtest");

    let candles = signal_data::load_csv(
        args.data
            .to_str()
            .context("Data path is not valid UTF-8")?,
    )
    .with_context(|| format!("Failed to load candles from {}", args.data.display()))?;
    if candles.is_empty() {
        anyhow::bail!("No candles loaded from {}", args.data.display());
    }
    info!(bars = candles.len(), "candle data loaded");

    let feed = Arc::new(ReplayFeed::new(args.symbol.clone(), candles));

    // The strategy evaluates against the same feed the engine replays.
    let market: Arc<dyn signal_core::traits::MarketData> = Arc::clone(&feed) as _;
    let factory = StrategyFactory::new(market, None, None);
    let overrides = strategy_overrides(&args)?;
    let strategy = factory
        .create(&args.strategy, overrides)
        .await
        .context("Failed to create strategy")?;

    let engine = BacktestEngine::new(BacktestConfig {
        initial_capital: Decimal::try_from(args.capital).unwrap_or_default(),
    });
    let report = engine.run(strategy.as_ref(), &feed, &args.symbol).await;

    match args.output.as_str() {
        "json" => println!("{}", report.to_json()?),
        _ => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)?;
        info!(path = %save_path.display(), "report saved");
    }

    factory.destroy_all().await;
    Ok(())
}

/// Build the configuration overrides: the optional TOML file first, the
/// symbol from the command line on top.
fn strategy_overrides(args: &BacktestArgs) -> Result<serde_json::Value> {
    let mut overrides = match &args.strategy_config {
        Some(path) => load_toml_config(path)?,
        None => serde_json::json!({}),
    };

    let fields = overrides
        .as_object_mut()
        .context("Strategy configuration must be a TOML table")?;
    fields.insert(
        "symbols".to_string(),
        serde_json::json!([args.symbol.clone()]),
    );
    Ok(overrides)
}

fn load_toml_config(path: &Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: toml::Value = toml::from_str(&contents)
        .with_context(|| format!("Invalid TOML in {}", path.display()))?;
    serde_json::to_value(value).context("Failed to convert strategy configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::BacktestArgs;
    use std::io::Write;

    fn args_with_config(path: Option<std::path::PathBuf>) -> BacktestArgs {
        BacktestArgs {
            strategy: "grid".to_string(),
            symbol: "BTCUSDT".to_string(),
            data: std::path::PathBuf::new(),
            capital: 100000.0,
            strategy_config: path,
            output: "text".to_string(),
            save: None,
        }
    }

    #[test]
    fn test_symbol_injected_into_overrides() {
        let overrides = strategy_overrides(&args_with_config(None)).unwrap();
        assert_eq!(overrides["symbols"], serde_json::json!(["BTCUSDT"]));
    }

    #[test]
    fn test_toml_config_merged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grid_count = 20").unwrap();
        writeln!(file, "lower_price = 50.0").unwrap();
        file.flush().unwrap();

        let overrides =
            strategy_overrides(&args_with_config(Some(file.path().to_path_buf()))).unwrap();
        assert_eq!(overrides["grid_count"], serde_json::json!(20));
        assert_eq!(overrides["symbols"], serde_json::json!(["BTCUSDT"]));
    }
}
