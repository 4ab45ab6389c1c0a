//! Keyed close-price time series, loaded once from a JSON file mapping
//! symbol -> ordered series (oldest to newest). External collaborator of
//! the retrieval core; offsets are never meaningful here, so its citations
//! use the `0:0` sentinel.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub close: f64,
    pub date: String,
}

/// Relative performance of two symbols over the same window.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub a_return: f64,
    pub b_return: f64,
    pub relative: f64,
}

pub struct PriceStore {
    /// Identifier used as the citation source for every price answer.
    source: String,
    series: HashMap<String, Vec<PricePoint>>,
}

impl PriceStore {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let raw: HashMap<String, Vec<PricePoint>> =
            serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
        // Normalize keys to uppercase.
        let series = raw.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect();
        Ok(Self { source: path.to_string_lossy().to_string(), series })
    }

    pub fn empty(source: &str) -> Self {
        Self { source: source.to_string(), series: HashMap::new() }
    }

    pub fn from_series(source: &str, series: HashMap<String, Vec<PricePoint>>) -> Self {
        let series = series.into_iter().map(|(k, v)| (k.to_uppercase(), v)).collect();
        Self { source: source.to_string(), series }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut syms: Vec<String> = self.series.keys().cloned().collect();
        syms.sort();
        syms
    }

    pub fn latest_close(&self, symbol: &str) -> Option<&PricePoint> {
        self.series.get(&symbol.to_uppercase())?.last()
    }

    /// The last `n` points, oldest to newest. Unknown symbol is `None`;
    /// `n == 0` on a known symbol is an empty slice.
    pub fn latest_n(&self, symbol: &str, n: usize) -> Option<&[PricePoint]> {
        let series = self.series.get(&symbol.to_uppercase())?;
        if series.is_empty() {
            return None;
        }
        let start = series.len().saturating_sub(n);
        Some(&series[start..])
    }

    /// Returns of both symbols over their last `points` closes and the
    /// spread between them. Needs at least two points on each side.
    pub fn compare_performance(&self, a: &str, b: &str, points: usize) -> Option<Comparison> {
        let a_series = self.latest_n(a, points)?;
        let b_series = self.latest_n(b, points)?;
        if a_series.len() < 2 || b_series.len() < 2 {
            return None;
        }
        let a_return = pct_change(a_series[0].close, a_series[a_series.len() - 1].close);
        let b_return = pct_change(b_series[0].close, b_series[b_series.len() - 1].close);
        Some(Comparison { a_return, b_return, relative: a_return - b_return })
    }
}

pub fn pct_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    (new - old) / old
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(close: f64, date: &str) -> PricePoint {
        PricePoint { close, date: date.to_string() }
    }

    fn store() -> PriceStore {
        PriceStore::from_series(
            "data/prices.json",
            HashMap::from([
                (
                    "msft".to_string(),
                    vec![point(420.0, "2024-06-26"), point(425.5, "2024-06-27"), point(430.1, "2024-06-28")],
                ),
                ("spy".to_string(), vec![point(540.0, "2024-06-27"), point(545.4, "2024-06-28")]),
            ]),
        )
    }

    #[test]
    fn keys_normalize_to_uppercase() {
        let s = store();
        assert_eq!(s.symbols(), vec!["MSFT".to_string(), "SPY".to_string()]);
        assert!(s.latest_close("msft").is_some());
    }

    #[test]
    fn latest_close_is_the_newest_point() {
        let s = store();
        let latest = s.latest_close("MSFT").expect("series");
        assert_eq!(latest, &point(430.1, "2024-06-28"));
        assert!(store().latest_close("NVDA").is_none());
    }

    #[test]
    fn latest_n_clamps_to_series_length() {
        let s = store();
        assert_eq!(s.latest_n("MSFT", 2).expect("series").len(), 2);
        assert_eq!(s.latest_n("MSFT", 99).expect("series").len(), 3);
        assert!(s.latest_n("MSFT", 0).expect("series").is_empty());
        assert!(s.latest_n("NVDA", 2).is_none());
    }

    #[test]
    fn pct_change_handles_zero_base() {
        assert_eq!(pct_change(0.0, 10.0), 0.0);
        assert!((pct_change(100.0, 105.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn compare_performance_reports_relative_spread() {
        let s = store();
        let perf = s.compare_performance("MSFT", "SPY", 2).expect("comparison");
        assert!((perf.a_return - pct_change(425.5, 430.1)).abs() < 1e-12);
        assert!((perf.b_return - pct_change(540.0, 545.4)).abs() < 1e-12);
        assert!((perf.relative - (perf.a_return - perf.b_return)).abs() < 1e-12);
        // One side too short: no comparison.
        assert!(s.compare_performance("MSFT", "SPY", 1).is_none());
        assert!(s.compare_performance("MSFT", "NVDA", 5).is_none());
    }
}
