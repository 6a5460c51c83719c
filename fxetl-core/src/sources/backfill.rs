//! History construction strategies.
//!
//! The feeds only expose a "latest" snapshot. A `Backfill` decides how a
//! multi-day history is produced from them:
//! - `LiveSnapshot`: today's rows only
//! - `Jittered`: one snapshot replicated across N days with bounded noise
//! - `Replay`: one request per day against a dated endpoint

use super::fetch::JsonFetcher;
use crate::error::{EtlError, Result};
use crate::rng::source_rng;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Placeholder substituted with the `%Y-%m-%d` date in `Replay` mode.
pub const DATE_PLACEHOLDER: &str = "{date}";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How historical rows are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Backfill {
    /// Single fetch, rows for today only, no noise.
    LiveSnapshot,

    /// Single fetch replicated across every day with multiplicative noise.
    Jittered {
        #[serde(default)]
        seed: Option<u64>,
    },

    /// One fetch per day; the endpoint URL carries a `{date}` placeholder.
    Replay,
}

impl Default for Backfill {
    fn default() -> Self {
        Backfill::Jittered { seed: None }
    }
}

/// `days` calendar dates counting back from `today`, newest first.
///
/// Fails when the history would reach before the earliest representable date.
pub fn history_dates(today: NaiveDate, days: u32) -> Result<Vec<String>> {
    (0..u64::from(days))
        .map(|offset| {
            today
                .checked_sub_days(Days::new(offset))
                .map(|date| date.format(DATE_FORMAT).to_string())
                .ok_or_else(|| {
                    EtlError::InvalidArgument(format!(
                        "dias_historico = {days} reaches before the earliest supported date"
                    ))
                })
        })
        .collect()
}

/// Bounded multiplicative noise. Inert when constructed without an RNG.
pub struct Jitter {
    rng: Option<StdRng>,
}

impl Jitter {
    pub fn none() -> Self {
        Self { rng: None }
    }

    pub fn seeded(seed: Option<u64>, source: &str) -> Self {
        Self {
            rng: Some(source_rng(seed, source)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.rng.is_some()
    }

    /// `value` scaled by a uniform factor in `[1 - spread, 1 + spread]`.
    pub fn scale(&mut self, value: f64, spread: f64) -> f64 {
        match self.rng.as_mut() {
            Some(rng) => value * rng.gen_range((1.0 - spread)..=(1.0 + spread)),
            None => value,
        }
    }

    /// Uniform pick from `options`, or `fallback` when inert.
    pub fn pick<'a, T>(&mut self, options: &'a [T], fallback: &'a T) -> &'a T {
        match self.rng.as_mut() {
            Some(rng) => options.choose(rng).unwrap_or(fallback),
            None => fallback,
        }
    }
}

/// Everything an extractor needs to reach its feed.
pub struct SourceRequest<'a> {
    pub fetcher: &'a dyn JsonFetcher,
    pub url: &'a str,
    pub headers: &'a [(String, String)],
    pub timeout: Duration,
    pub dias_historico: u32,
    pub backfill: &'a Backfill,
    pub today: NaiveDate,
}

/// Fetch according to the backfill policy and expand entities into dated rows.
///
/// `parse` turns one payload into the base entities; `make_row` turns one
/// entity on one date into a row.
pub fn collect_history<E, R>(
    request: &SourceRequest<'_>,
    source: &str,
    parse: impl Fn(&Value) -> Vec<E>,
    make_row: impl Fn(&E, &str, &mut Jitter) -> R,
) -> Result<Vec<R>> {
    if request.dias_historico == 0 {
        return Err(EtlError::InvalidArgument(
            "dias_historico must be a positive integer".into(),
        ));
    }

    let mut rows = Vec::new();
    match request.backfill {
        Backfill::LiveSnapshot => {
            let payload = request
                .fetcher
                .fetch(request.url, request.headers, request.timeout)?;
            let entities = parse(&payload);
            let today = request.today.format(DATE_FORMAT).to_string();
            let mut jitter = Jitter::none();
            rows.extend(entities.iter().map(|e| make_row(e, &today, &mut jitter)));
        }
        Backfill::Jittered { seed } => {
            let dates = history_dates(request.today, request.dias_historico)?;
            let payload = request
                .fetcher
                .fetch(request.url, request.headers, request.timeout)?;
            let entities = parse(&payload);
            let mut jitter = Jitter::seeded(*seed, source);
            for date in dates {
                rows.extend(entities.iter().map(|e| make_row(e, &date, &mut jitter)));
            }
        }
        Backfill::Replay => {
            let dates = history_dates(request.today, request.dias_historico)?;
            let mut jitter = Jitter::none();
            for date in dates {
                let url = request.url.replace(DATE_PLACEHOLDER, &date);
                let payload = request
                    .fetcher
                    .fetch(&url, request.headers, request.timeout)?;
                let entities = parse(&payload);
                rows.extend(entities.iter().map(|e| make_row(e, &date, &mut jitter)));
            }
        }
    }
    Ok(rows)
}

/// Round to a fixed number of decimals, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
