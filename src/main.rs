use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use auto_daily_lib::config::Config;

#[derive(Parser)]
#[command(name = "auto-daily")]
#[command(version, about = "Desktop activity logger with hourly summaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start window monitoring, periodic capture and hourly summaries
    Start,
    /// Summarize one hour of activity logs
    Summarize {
        /// Date in YYYY-MM-DD format (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Hour 0-23 (default: current hour)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
        /// Regenerate even if a summary already exists
        #[arg(long)]
        force: bool,
    },
    /// Generate the daily report from hourly summaries or logs
    Report {
        /// Date in YYYY-MM-DD format (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Summarize hours that have logs but no summary first
        #[arg(long)]
        auto_summarize: bool,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn main() -> Result<()> {
    auto_daily_lib::init_logging();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Start => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(auto_daily_lib::start_monitoring(config))?;
        }
        Commands::Summarize { date, hour, force } => {
            auto_daily_lib::run_summarize(&config, date, hour, force)?;
        }
        Commands::Report {
            date,
            auto_summarize,
        } => {
            auto_daily_lib::run_report(&config, date, auto_summarize)?;
        }
    }

    Ok(())
}
