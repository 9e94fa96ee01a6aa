use crate::models::{Metric, Observation, SeriesKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for one (state, sector) group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub key: SeriesKey,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute grouped statistics for one metric by (state_id, sector_id).
pub fn grouped_summary(points: &[Observation], metric: Metric) -> Vec<Summary> {
    let mut groups: BTreeMap<SeriesKey, Vec<f64>> = BTreeMap::new();
    let mut missing: BTreeMap<SeriesKey, usize> = BTreeMap::new();
    for p in points {
        let key = SeriesKey {
            state_id: p.state_id.clone(),
            sector_id: p.sector_id.clone(),
        };
        match metric.value_of(p) {
            Some(v) => groups.entry(key).or_default().push(v),
            None => *missing.entry(key).or_default() += 1,
        }
    }

    // Groups that only ever saw missing values still get a row.
    for key in missing.keys() {
        groups.entry(key.clone()).or_default();
    }

    let mut out = Vec::new();
    for (key, mut vals) in groups {
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let count = vals.len();
        let min = vals.first().cloned();
        let max = vals.last().cloned();
        let mean = if count > 0 {
            Some(vals.iter().copied().sum::<f64>() / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        let miss = missing.get(&key).cloned().unwrap_or(0);
        out.push(Summary {
            key,
            count,
            missing: miss,
            min,
            max,
            mean,
            median,
        });
    }
    out
}

/// Yearly mean of a metric plus year-over-year growth in percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyGrowth {
    pub year: i32,
    pub mean: f64,
    /// Percent change versus the previous year; `None` for the first year.
    pub yoy_percent: Option<f64>,
}

/// Aggregate observations to yearly means and compute growth rates.
///
/// The year is taken from the leading `YYYY` of each period; rows with an
/// unparseable period or a missing metric value are skipped.
pub fn yearly_growth(points: &[Observation], metric: Metric) -> Vec<YearlyGrowth> {
    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for p in points {
        let Some(year) = p.period.get(..4).and_then(|y| y.parse::<i32>().ok()) else {
            continue;
        };
        if let Some(v) = metric.value_of(p) {
            by_year.entry(year).or_default().push(v);
        }
    }

    let mut out: Vec<YearlyGrowth> = Vec::with_capacity(by_year.len());
    let mut prev: Option<f64> = None;
    for (year, vals) in by_year {
        let mean = vals.iter().copied().sum::<f64>() / vals.len() as f64;
        let yoy_percent = prev
            .filter(|p| *p != 0.0)
            .map(|p| (mean / p - 1.0) * 100.0);
        out.push(YearlyGrowth {
            year,
            mean,
            yoy_percent,
        });
        prev = Some(mean);
    }
    out
}

/// Trailing moving average over an ordered series.
///
/// The first `window - 1` positions have no full window and yield `None`,
/// mirroring how rolling means are usually reported.
pub fn moving_average(series: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; series.len()];
    }
    let mut out = Vec::with_capacity(series.len());
    let mut sum = 0.0;
    for (i, v) in series.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= series[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(period: &str, state: &str, sector: &str, customers: Option<f64>) -> Observation {
        Observation {
            period: period.into(),
            state_id: state.into(),
            state_name: String::new(),
            sector_id: sector.into(),
            sector_name: String::new(),
            customers,
            price: None,
            revenue: None,
            sales: None,
        }
    }

    #[test]
    fn yearly_growth_computes_percent_change() {
        let points = vec![
            obs("2020-01", "US", "RES", Some(100.0)),
            obs("2020-02", "US", "RES", Some(100.0)),
            obs("2021-01", "US", "RES", Some(110.0)),
        ];
        let growth = yearly_growth(&points, Metric::Customers);
        assert_eq!(growth.len(), 2);
        assert_eq!(growth[0].year, 2020);
        assert_eq!(growth[0].yoy_percent, None);
        assert_eq!(growth[1].year, 2021);
        let yoy = growth[1].yoy_percent.unwrap();
        assert!((yoy - 10.0).abs() < 1e-9);
    }

    #[test]
    fn moving_average_has_no_partial_windows() {
        let series = [1.0, 2.0, 3.0, 4.0];
        let ma = moving_average(&series, 2);
        assert_eq!(ma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }
}
