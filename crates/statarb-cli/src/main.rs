mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::backtest::BacktestArgs;
use commands::coint::CointArgs;
use commands::pairs::PairsArgs;

/// Pairs-trading research engine
#[derive(Parser)]
#[command(
    name = "statarb",
    version,
    about = "Backtest mean-reversion pairs trading strategies",
    long_about = "Estimates hedge ratios, tests cointegration and backtests a z-score \
                  entry/exit strategy on two aligned daily price series loaded from CSV."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Price CSV with a date column and one column per ticker
    #[arg(long, env = "STATARB_DATA_PATH", default_value = "data/prices.csv", global = true)]
    data: String,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, env = "STATARB_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pairs-trading backtest
    Backtest(BacktestArgs),
    /// List the tickers available in the price file
    Pairs(PairsArgs),
    /// Hedge ratio and cointegration diagnostics for two tickers
    Coint(CointArgs),
    /// Show engine defaults and validation bounds
    Config,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Backtest(args) => commands::backtest::run_backtest(args, &cli.data),
        Commands::Pairs(args) => commands::pairs::run_pairs(args, &cli.data),
        Commands::Coint(args) => commands::coint::run_coint(args, &cli.data),
        Commands::Config => commands::config::run_config(&cli.data),
        Commands::Version => {
            println!("statarb {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
