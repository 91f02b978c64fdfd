//! Scan command implementation.

use anyhow::{Context, Result};
use serde_json::json;
use signal_core::types::CandleSeries;
use signal_detect::{AnomalyDetector, PatternDetector};
use tracing::info;

use crate::cli::ScanArgs;

pub async fn run(args: ScanArgs) -> Result<()> {
    let candles = signal_data::load_csv(
        args.data
            .to_str()
            .context("Data path is not valid UTF-8")?,
    )
    .with_context(|| format!("Failed to load candles from {}", args.data.display()))?;
    if candles.is_empty() {
        anyhow::bail!("No candles loaded from {}", args.data.display());
    }
    info!(bars = candles.len(), window = args.window, "scanning candle data");

    // Scan the most recent window only; detectors are pure, so callers that
    // want a rolling scan can slide the window themselves.
    let series: CandleSeries = candles.into_iter().collect();
    let window = series.last_n(args.window);

    let anomalies = AnomalyDetector::new().scan(&window);
    let patterns = PatternDetector::new().scan(&window);

    if args.output == "json" {
        let out = json!({
            "samples": anomalies.samples,
            "anomalies": anomalies.anomalies,
            "overall_severity": anomalies.severity,
            "patterns": patterns,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Scan Results ({} candles)", anomalies.samples);
    println!("═══════════════════════════════════════════════════════════");
    println!();

    if anomalies.anomalies.is_empty() {
        println!("  No anomalies detected.");
    } else {
        println!("  Anomalies (overall severity: {:?}):", anomalies.severity);
        for anomaly in &anomalies.anomalies {
            println!(
                "    [{:?}] {:?}: {}",
                anomaly.severity, anomaly.kind, anomaly.description
            );
        }
    }
    println!();

    if patterns.is_empty() {
        println!("  No chart patterns detected.");
    } else {
        println!("  Chart patterns:");
        for pattern in &patterns {
            println!("    [{:?}] {}", pattern.signal, pattern.description);
        }
    }

    Ok(())
}
