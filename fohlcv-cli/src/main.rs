//! fohlcv CLI: download TOHLCV bars for one ticker and store them.
//!
//! Entry points:
//! - flags (`--ticker`, `--interval`, `--start`/`--end` or `--period`, ...)
//! - `--wizard`, or no ticker at all, for an interactive session
//!
//! Exit codes: 0 on success, 1 on argument or config errors, 2 when the
//! download pipeline fails.

mod args;
mod wizard;

use anyhow::Result;
use args::Cli;
use clap::Parser;
use fohlcv_core::data::{DataError, YahooProvider};
use fohlcv_core::domain::Query;
use fohlcv_core::{Pipeline, RunReport};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wizard::Wizard;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut config = cli.load_config()?;
    let mut options = cli.run_options();

    let query = if cli.use_wizard() {
        let stdin = io::stdin();
        let answers = Wizard::new(stdin.lock(), io::stdout()).run(&config)?;
        config.format = answers.format;
        options.save = answers.save;
        answers.query
    } else {
        cli.to_query(&config)?
    };

    let provider = YahooProvider::new(&config.provider)?
        .auto_adjust(cli.auto_adjust)
        .include_prepost(cli.prepost);

    match Pipeline::new(&config, &provider).run(&query, &options) {
        Ok(report) => {
            print_summary(&report);
            if let Some(location) = &report.location {
                println!("Saved -> {}", location.full_path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_failure(&query, &err);
            Ok(ExitCode::from(2))
        }
    }
}

fn print_summary(report: &RunReport) {
    let (from, to) = match report.span() {
        Some((first, last)) => (first.to_rfc3339(), last.to_rfc3339()),
        None => ("-".into(), "-".into()),
    };

    println!();
    println!("TOHLCV downloaded");
    println!(
        "{:<12} {:<8} {:>10}  {:<25}  {:<25}",
        "Ticker", "Interval", "Rows", "From", "To"
    );
    println!("{}", "-".repeat(86));
    println!(
        "{:<12} {:<8} {:>10}  {:<25}  {:<25}",
        report.ticker,
        report.interval,
        group_thousands(report.rows()),
        from,
        to
    );
}

fn print_failure(query: &Query, err: &DataError) {
    eprintln!("\nERROR: {err}\n");
    eprintln!("Quick hints (Yahoo Finance):");
    for hint in hints(query) {
        eprintln!(" - {hint}");
    }
    eprintln!();
}

/// Suggestions printed after a failed download.
fn hints(query: &Query) -> Vec<&'static str> {
    let mut hints = Vec::new();
    if query.start.is_some() && query.end.is_some() {
        hints.push("For a single day, set end to the following day (end is exclusive).");
    }
    if query.interval.is_intraday() {
        hints.push("Try --interval 1d (many tickers have no intraday history).");
    }
    hints.push("Try --period 30d or 60d without --start/--end.");
    if query.interval.is_intraday() {
        hints.push("Futures and commodities may limit intraday history for some periods.");
    }
    hints
}

/// `1234567` → `1,234,567`
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
