//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "signal-engine")]
#[command(author, version, about = "Strategy evaluation engine for trading signals")]
pub struct Cli {
    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available strategy types
    Strategies,
    /// Replay historical candles against a strategy
    Backtest(BacktestArgs),
    /// Scan historical candles for anomalies and chart patterns
    Scan(ScanArgs),
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Strategy type to backtest
    #[arg(short, long)]
    pub strategy: String,

    /// Symbol the data belongs to
    #[arg(short = 'S', long, default_value = "DATA")]
    pub symbol: String,

    /// Candle data file (CSV)
    #[arg(long)]
    pub data: PathBuf,

    /// Initial capital
    #[arg(long, default_value = "100000")]
    pub capital: f64,

    /// Strategy configuration file (TOML), merged over the type defaults
    #[arg(long)]
    pub strategy_config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Candle data file (CSV)
    #[arg(long)]
    pub data: PathBuf,

    /// Candles per scan window
    #[arg(long, default_value = "60")]
    pub window: usize,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}
