//! One query, end to end: resolve → fetch → normalize → locate → write.
//!
//! The pipeline holds no state between runs. Configuration and the provider
//! are borrowed, so tests drive it with an in-memory provider and a
//! temporary data root.

use crate::config::Config;
use crate::data::canonicalize::normalize;
use crate::data::layout::{build_path, build_path_for_range, OutputLocation};
use crate::data::provider::{DataError, DataProvider};
use crate::data::range::{resolve, Resolution};
use crate::data::store::{self, StorageFormat};
use crate::domain::{CanonicalBar, Interval, Query};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-run switches that are not part of the query itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Write the table to disk. When false the run stops after normalization.
    pub save: bool,
    /// Explicit output file, replacing the derived layout path.
    pub out: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            save: true,
            out: None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub ticker: String,
    pub interval: Interval,
    pub resolution: Resolution,
    pub bars: Vec<CanonicalBar>,
    /// Where the table was written, when saving was requested.
    pub location: Option<OutputLocation>,
    pub format: StorageFormat,
}

impl RunReport {
    pub fn rows(&self) -> usize {
        self.bars.len()
    }

    /// First and last bar times.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.bars.first()?.time, self.bars.last()?.time))
    }
}

/// Download pipeline bound to a configuration and a provider.
pub struct Pipeline<'a> {
    config: &'a Config,
    provider: &'a dyn DataProvider,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, provider: &'a dyn DataProvider) -> Self {
        Self { config, provider }
    }

    /// Run one query. Nothing is written unless every earlier step succeeded.
    pub fn run(&self, query: &Query, options: &RunOptions) -> Result<RunReport, DataError> {
        let resolution = resolve(query.start, query.end, query.period)?;
        debug!(ticker = %query.ticker, interval = %query.interval, ?resolution, "resolved window");

        let raw = self.provider.fetch(&query.ticker, query.interval, &resolution)?;
        debug!(provider = self.provider.name(), rows = raw.height(), "fetched");
        if raw.is_empty() {
            return Err(DataError::NoData {
                ticker: query.ticker.clone(),
                interval: query.interval,
                reason: format!("{} returned an empty table", self.provider.name()),
            });
        }

        let bars = normalize(raw)?;
        let void = bars.iter().filter(|b| b.is_void()).count();
        if void > 0 {
            warn!(void, "bars without any price");
        }
        info!(ticker = %query.ticker, rows = bars.len(), "normalized");

        // `--out` only picks a format when something is written
        let (location, format) = if options.save {
            let format = match &options.out {
                Some(path) => format_for_override(path)?,
                None => self.config.format,
            };
            let location = self.locate(query, &resolution, &bars, format, options.out.as_deref())?;
            store::write(&bars, &location, format)?;
            info!(path = %location.full_path.display(), "saved");
            (Some(location), format)
        } else {
            (None, self.config.format)
        };

        Ok(RunReport {
            ticker: query.ticker.clone(),
            interval: query.interval,
            resolution,
            bars,
            location,
            format,
        })
    }

    /// Output location for a run. Period queries are labelled by the dates of
    /// the first and last bar.
    fn locate(
        &self,
        query: &Query,
        resolution: &Resolution,
        bars: &[CanonicalBar],
        format: StorageFormat,
        out: Option<&Path>,
    ) -> Result<OutputLocation, DataError> {
        let root = &self.config.data_root;
        let location = match resolution {
            Resolution::Range(range) => {
                build_path_for_range(root, &query.ticker, query.interval, range, format)
            }
            Resolution::Period(_) => {
                let (first, last) = match (bars.first(), bars.last()) {
                    (Some(first), Some(last)) => (first.time, last.time),
                    _ => return Err(DataError::Storage("no bars to label".into())),
                };
                build_path(
                    root,
                    &query.ticker,
                    query.interval,
                    first.date_naive(),
                    last.date_naive(),
                    format,
                )
            }
        };

        Ok(match out {
            Some(path) => location.with_path(path),
            None => location,
        })
    }
}

/// Format implied by an explicit output path; its extension must be known.
fn format_for_override(path: &Path) -> Result<StorageFormat, DataError> {
    StorageFormat::from_path(path).ok_or_else(|| {
        DataError::Storage(format!(
            "unsupported output extension: {} (use .parquet or .csv)",
            path.display()
        ))
    })
}
