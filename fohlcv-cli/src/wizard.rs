//! Interactive adapter: prompts for the same fields the flags carry.
//!
//! Generic over its input and output so tests can script a session.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use fohlcv_core::data::StorageFormat;
use fohlcv_core::domain::{parse_date, Interval, Period, Query};
use fohlcv_core::Config;
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Asset classes offered by the wizard, with example Yahoo tickers.
pub const ASSET_TYPES: [(&str, &[&str]); 8] = [
    ("stock", &["AAPL", "MSFT", "TSLA"]),
    ("etf", &["SPY", "QQQ", "IWM"]),
    (
        "index",
        &[
            "^GSPC", "^IXIC", "^DJI", "^RUT", "^VIX", "^STOXX50E", "^FTSE", "^GDAXI", "^FCHI",
            "^IBEX", "^SSMI", "000001.SS", "399001.SZ", "000300.SS", "^HSI", "^HSCE",
        ],
    ),
    ("crypto", &["BTC-USD", "ETH-USD", "SOL-USD"]),
    ("fx", &["EURUSD=X", "GBPUSD=X", "USDJPY=X"]),
    ("commodity", &["GC=F", "CL=F", "SI=F"]),
    ("rate", &["^TNX", "^IRX", "^TYX"]),
    ("other", &[]),
];

/// Everything the wizard collects.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardAnswers {
    pub query: Query,
    pub format: StorageFormat,
    pub save: bool,
}

pub struct Wizard<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Wizard<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Run the full question sequence.
    pub fn run(&mut self, config: &Config) -> Result<WizardAnswers> {
        writeln!(self.output, "\nfohlcv wizard (Yahoo Finance)")?;
        writeln!(self.output, "Downloads TOHLCV: time, open, high, low, close, volume\n")?;

        let asset_names: Vec<&str> = ASSET_TYPES.iter().map(|(name, _)| *name).collect();
        let asset_type = self.ask_choice("Asset type", &asset_names, "stock")?;
        let examples = ASSET_TYPES
            .iter()
            .find(|(name, _)| *name == asset_type)
            .map(|(_, examples)| *examples)
            .unwrap_or_default();
        if !examples.is_empty() {
            writeln!(self.output, "Examples ({asset_type}): {}", examples.join(", "))?;
        }

        let ticker = loop {
            let answer = self.ask("Ticker (Yahoo symbol)", examples.first().copied())?;
            if !answer.trim().is_empty() {
                break answer;
            }
            writeln!(self.output, "A ticker is required.")?;
        };

        let interval: Interval = self.ask_parsed(
            "Interval (e.g. 1m,5m,15m,1h,1d,1wk,1mo)",
            config.default_interval.as_str(),
        )?;

        writeln!(self.output, "\nWindow")?;
        writeln!(
            self.output,
            "Note: end is exclusive. For a single day, use end = the following day."
        )?;
        let (start, end) = loop {
            let start = self.ask_optional_date("Start (YYYY-MM-DD) [blank = use period]")?;
            let end = self.ask_optional_date("End (YYYY-MM-DD) [blank = use period]")?;
            if start.is_some() == end.is_some() {
                break (start, end);
            }
            writeln!(self.output, "Give both start and end, or leave both blank.")?;
        };

        let period = if start.is_none() {
            let default_period = config.default_period.to_string();
            Some(self.ask_parsed::<Period>(
                "Period (e.g. 5d, 30d, 60d, 1y, max)",
                &default_period,
            )?)
        } else {
            None
        };

        let format = self
            .ask_choice("Output format", &["parquet", "csv"], config.format.extension())?
            .parse::<StorageFormat>()?;
        let save = self.ask_choice("Save to disk?", &["y", "n"], "y")? == "y";

        Ok(WizardAnswers {
            query: Query::new(&ticker, interval, start, end, period)?,
            format,
            save,
        })
    }

    /// One line of input. Blank answers take `default` when there is one.
    fn ask(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{prompt} (default: {d}): ")?,
            _ => write!(self.output, "{prompt}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed before the wizard finished");
        }
        let answer = line.trim();
        Ok(match default {
            Some(d) if answer.is_empty() => d.to_string(),
            _ => answer.to_string(),
        })
    }

    fn ask_choice(&mut self, prompt: &str, choices: &[&str], default: &str) -> Result<String> {
        let listed = choices.join("/");
        loop {
            let answer = self
                .ask(&format!("{prompt} ({listed})"), Some(default))?
                .to_ascii_lowercase();
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            writeln!(self.output, "Invalid choice. Pick one of: {listed}")?;
        }
    }

    fn ask_parsed<T>(&mut self, prompt: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        loop {
            match self.ask(prompt, Some(default))?.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }

    fn ask_optional_date(&mut self, prompt: &str) -> Result<Option<NaiveDate>> {
        loop {
            let answer = self.ask(prompt, None)?;
            if answer.is_empty() {
                return Ok(None);
            }
            match parse_date(&answer) {
                Ok(date) => return Ok(Some(date)),
                Err(e) => writeln!(self.output, "{e}")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(script: &str) -> (Result<WizardAnswers>, String) {
        let mut output = Vec::new();
        let result = Wizard::new(Cursor::new(script.as_bytes()), &mut output).run(&Config::default());
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn all_defaults() {
        // asset, ticker, interval, start, end, period, format, save
        let (result, output) = run_script("\n\n\n\n\n\n\n\n");
        let answers = result.unwrap();

        assert_eq!(answers.query.ticker, "AAPL");
        assert_eq!(answers.query.interval, Interval::Hour1);
        assert_eq!(answers.query.period, Some(Period::Days(60)));
        assert!(!answers.query.has_dates());
        assert_eq!(answers.format, StorageFormat::Parquet);
        assert!(answers.save);
        assert!(output.contains("Examples (stock): AAPL, MSFT, TSLA"));
    }

    #[test]
    fn crypto_with_explicit_range_skips_period() {
        let script = "crypto\n\n1h\n2025-01-01\n2026-01-01\ncsv\nn\n";
        let (result, output) = run_script(script);
        let answers = result.unwrap();

        assert_eq!(answers.query.ticker, "BTC-USD");
        assert_eq!(
            answers.query.start,
            NaiveDate::from_ymd_opt(2025, 1, 1)
        );
        assert_eq!(answers.query.end, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(answers.query.period, None);
        assert_eq!(answers.format, StorageFormat::Csv);
        assert!(!answers.save);
        assert!(!output.contains("Period"));
    }

    #[test]
    fn invalid_answers_reprompt() {
        // bad asset, bad interval, bad date, bad period, bad format, bad y/n
        let script = "bonds\netf\nQQQ\n7m\n1d\n2025-02-30\n\n\nforever\n1y\nxlsx\nparquet\nmaybe\ny\n";
        let (result, output) = run_script(script);
        let answers = result.unwrap();

        assert_eq!(answers.query.ticker, "QQQ");
        assert_eq!(answers.query.interval, Interval::Day1);
        assert_eq!(answers.query.period, Some(Period::Years(1)));
        assert!(answers.save);
        assert!(output.contains("Invalid choice"));
        assert!(output.contains("unknown interval '7m'"));
        assert!(output.contains("invalid date '2025-02-30'"));
        assert!(output.contains("invalid period 'forever'"));
    }

    #[test]
    fn half_open_window_reprompts() {
        let script = "stock\nMSFT\n1d\n2025-01-01\n\n2025-01-01\n2025-01-02\n\n\n";
        let (result, output) = run_script(script);
        let answers = result.unwrap();

        assert!(output.contains("Give both start and end"));
        assert_eq!(answers.query.end, NaiveDate::from_ymd_opt(2025, 1, 2));
    }

    #[test]
    fn other_asset_requires_a_ticker() {
        let script = "other\n\nEURUSD=X\n\n\n\n\n\n\n";
        let (result, output) = run_script(script);
        assert!(output.contains("A ticker is required."));
        assert_eq!(result.unwrap().query.ticker, "EURUSD=X");
    }

    #[test]
    fn closed_input_is_an_error() {
        let (result, _) = run_script("crypto\n");
        assert!(result.is_err());
    }
}
