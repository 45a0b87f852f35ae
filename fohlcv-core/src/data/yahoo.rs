//! Yahoo Finance data provider.
//!
//! Fetches TOHLCV bars from Yahoo's v8 chart API, for either an explicit
//! `period1`/`period2` window or a native `range` lookback. One request per
//! call: failures are reported, never retried.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! Timestamps come back as epoch seconds plus the exchange's UTC offset; the
//! table handed to the normalizer carries them as exchange-local, offset-aware
//! values, which is how the provider itself presents them.

use super::provider::{DataError, DataProvider, ProviderError};
use super::range::Resolution;
use super::raw::{RawTable, RawTimestamp};
use crate::config::ProviderConfig;
use crate::domain::Interval;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    gmtoffset: Option<i32>,
    exchange_timezone_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    auto_adjust: bool,
    include_prepost: bool,
}

impl YahooProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ProviderError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auto_adjust: false,
            include_prepost: false,
        })
    }

    /// Scale open/high/low/close by the provider's adjusted close.
    pub fn auto_adjust(mut self, enabled: bool) -> Self {
        self.auto_adjust = enabled;
        self
    }

    /// Include pre- and after-market bars where the venue has them.
    pub fn include_prepost(mut self, enabled: bool) -> Self {
        self.include_prepost = enabled;
        self
    }

    /// Build the chart API URL for a ticker, interval and window.
    fn chart_url(
        &self,
        ticker: &str,
        interval: Interval,
        window: &Resolution,
    ) -> Result<Url, DataError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::Client(format!("invalid base url {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ProviderError::Client(format!("base url cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("interval", interval.as_str());
            match window {
                Resolution::Range(range) => {
                    query.append_pair("period1", &midnight_utc(range.start).to_string());
                    query.append_pair("period2", &midnight_utc(range.end).to_string());
                }
                Resolution::Period(period) => {
                    query.append_pair("range", &period.to_string());
                }
            }
            query.append_pair(
                "includePrePost",
                if self.include_prepost { "true" } else { "false" },
            );
            query.append_pair("events", "div,splits");
        }

        Ok(url)
    }

    /// Parse the chart API response into a provider-native table.
    fn parse_response(
        ticker: &str,
        interval: Interval,
        resp: ChartResponse,
        auto_adjust: bool,
    ) -> Result<RawTable, DataError> {
        let no_data = |reason: String| DataError::NoData {
            ticker: ticker.to_string(),
            interval,
            reason,
        };

        if let Some(err) = resp.chart.error {
            return Err(match err.code.as_str() {
                "Not Found" | "Bad Request" | "Unprocessable Entity" => no_data(err.description),
                _ => ProviderError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                ))
                .into(),
            });
        }

        let result = resp.chart.result.ok_or_else(|| {
            ProviderError::ResponseFormatChanged("empty result with no error".into())
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| no_data("result array is empty".into()))?;

        let timestamps = match data.timestamp {
            Some(ts) if !ts.is_empty() => ts,
            _ => return Err(no_data("no timestamps in range".into())),
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let meta = data.meta;
        let gmtoffset = meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
        let offset = FixedOffset::east_opt(gmtoffset).ok_or_else(|| {
            ProviderError::ResponseFormatChanged(format!("invalid gmtoffset: {gmtoffset}"))
        })?;
        if let Some(tz) = meta.as_ref().and_then(|m| m.exchange_timezone_name.as_deref()) {
            debug!(ticker, exchange_tz = tz, gmtoffset, "chart metadata");
        }

        let n = timestamps.len();
        let mut times = Vec::with_capacity(n);
        let mut opens = Vec::with_capacity(n);
        let mut highs = Vec::with_capacity(n);
        let mut lows = Vec::with_capacity(n);
        let mut closes = Vec::with_capacity(n);
        let mut adjs = Vec::with_capacity(n);
        let mut volumes = Vec::with_capacity(n);

        for (i, &ts) in timestamps.iter().enumerate() {
            let time = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.with_timezone(&offset))
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let mut open = quote.open.get(i).copied().flatten();
            let mut high = quote.high.get(i).copied().flatten();
            let mut low = quote.low.get(i).copied().flatten();
            let mut close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten());

            // Skip bars where all OHLCV are None (holidays/non-trading slots)
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            if auto_adjust {
                if let (Some(adj), Some(c)) = (adj_close, close) {
                    if c != 0.0 {
                        let ratio = adj / c;
                        open = open.map(|v| v * ratio);
                        high = high.map(|v| v * ratio);
                        low = low.map(|v| v * ratio);
                        close = Some(adj);
                    }
                }
            }

            times.push(RawTimestamp::Zoned(time));
            opens.push(open);
            highs.push(high);
            lows.push(low);
            closes.push(close);
            adjs.push(adj_close);
            volumes.push(volume);
        }

        if times.is_empty() {
            return Err(no_data("every bar in range is empty".into()));
        }

        let mut table = RawTable::new()
            .with_timestamps("Datetime", times)
            .with_numbers("Open", opens)
            .with_numbers("High", highs)
            .with_numbers("Low", lows)
            .with_numbers("Close", closes);
        if adj_closes.is_some() && !auto_adjust {
            table = table.with_numbers("Adj Close", adjs);
        }
        Ok(table.with_numbers("Volume", volumes))
    }

    /// Execute the single HTTP request and classify the outcome.
    fn request(&self, ticker: &str, interval: Interval, url: Url) -> Result<RawTable, DataError> {
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::NetworkUnreachable(format!("request timed out: {e}"))
            } else {
                ProviderError::NetworkUnreachable(e.to_string())
            }
        })?;
        let status = resp.status();

        if status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Forbidden.into());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            )
            .into());
        }

        let body = resp
            .text()
            .map_err(|e| ProviderError::NetworkUnreachable(format!("reading body: {e}")))?;

        // Error statuses still carry a chart.error body worth classifying.
        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(chart) => Self::parse_response(ticker, interval, chart, self.auto_adjust),
            Err(e) if status.is_success() => Err(ProviderError::ResponseFormatChanged(format!(
                "failed to parse response for {ticker}: {e}"
            ))
            .into()),
            Err(_) => Err(ProviderError::Http {
                status: status.as_u16(),
                ticker: ticker.to_string(),
            }
            .into()),
        }
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        window: &Resolution,
    ) -> Result<RawTable, DataError> {
        let url = self.chart_url(ticker, interval, window)?;
        debug!(%url, "requesting chart");
        let table = self.request(ticker, interval, url)?;
        debug!(ticker, rows = table.height(), "chart received");
        Ok(table)
    }
}

/// Epoch seconds of 00:00 UTC on `date`.
fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}
