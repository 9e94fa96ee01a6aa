//! Turn raw API rows into typed [`Observation`]s.
//!
//! The fetcher hands back schema-less records; this module owns the typing:
//! numeric measures arrive as JSON numbers *or* numeric strings depending on
//! the route, the `*-units` companion columns are dropped, and the output is
//! sorted so that identical inputs always produce identical tables.

use crate::models::{Observation, Record};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// `YYYY-MM` with a sanity window on the year.
fn period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("period regex"))
}

/// Whether a period string is a well-formed monthly period.
pub fn is_monthly_period(period: &str) -> bool {
    period_re().is_match(period)
}

fn str_field(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric measure: accept a JSON number or a string holding one.
fn num_field(record: &Record, key: &str) -> Option<f64> {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Convert raw rows into observations.
///
/// Rows keep their identifying fields as strings; the four measures are
/// coerced to `f64` (absent or non-numeric values become `None`). The
/// `customers-units`, `price-units`, `revenue-units`, and `sales-units`
/// columns carried by the API are not part of the tidy schema and disappear
/// here. Output order is (`period`, `state_id`, `sector_id`).
pub fn observations(records: &[Record]) -> Vec<Observation> {
    let mut out: Vec<Observation> = records
        .iter()
        .map(|r| Observation {
            period: str_field(r, "period"),
            state_id: str_field(r, "stateid"),
            state_name: str_field(r, "stateDescription"),
            sector_id: str_field(r, "sectorid"),
            sector_name: str_field(r, "sectorName"),
            customers: num_field(r, "customers"),
            price: num_field(r, "price"),
            revenue: num_field(r, "revenue"),
            sales: num_field(r, "sales"),
        })
        .collect();
    out.sort_by(|a, b| {
        (&a.period, &a.state_id, &a.sector_id).cmp(&(&b.period, &b.state_id, &b.sector_id))
    });
    out
}

/// Group observations by sector id, preserving each group's row order.
pub fn split_by_sector(observations: &[Observation]) -> BTreeMap<String, Vec<Observation>> {
    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry(obs.sector_id.clone())
            .or_default()
            .push(obs.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("record literal must be an object"),
        }
    }

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        let rows = vec![record(json!({
            "period": "2023-07",
            "stateid": "CO",
            "stateDescription": "Colorado",
            "sectorid": "RES",
            "sectorName": "residential",
            "customers": "2489318",
            "customers-units": "number of customers",
            "price": 14.12,
            "price-units": "cents per kilowatt-hour",
            "revenue": "315.5",
            "sales": 2234.7
        }))];

        let obs = observations(&rows);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].customers, Some(2_489_318.0));
        assert_eq!(obs[0].price, Some(14.12));
        assert_eq!(obs[0].revenue, Some(315.5));
        assert_eq!(obs[0].sales, Some(2234.7));
        assert_eq!(obs[0].state_name, "Colorado");
    }

    #[test]
    fn missing_or_null_measures_become_none() {
        let rows = vec![record(json!({
            "period": "2023-07",
            "stateid": "CO",
            "sectorid": "TRA",
            "customers": null,
            "price": "W"
        }))];

        let obs = observations(&rows);
        assert_eq!(obs[0].customers, None);
        assert_eq!(obs[0].price, None);
        assert_eq!(obs[0].sales, None);
        assert_eq!(obs[0].state_name, "");
    }

    #[test]
    fn output_is_sorted_by_period_state_sector() {
        let rows = vec![
            record(json!({"period": "2023-08", "stateid": "CO", "sectorid": "RES"})),
            record(json!({"period": "2023-07", "stateid": "TX", "sectorid": "COM"})),
            record(json!({"period": "2023-07", "stateid": "CO", "sectorid": "RES"})),
        ];

        let obs = observations(&rows);
        let order: Vec<(&str, &str)> = obs
            .iter()
            .map(|o| (o.period.as_str(), o.state_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("2023-07", "CO"), ("2023-07", "TX"), ("2023-08", "CO")]
        );
    }

    #[test]
    fn splits_by_sector() {
        let rows = vec![
            record(json!({"period": "2023-07", "stateid": "CO", "sectorid": "RES"})),
            record(json!({"period": "2023-07", "stateid": "CO", "sectorid": "COM"})),
            record(json!({"period": "2023-08", "stateid": "CO", "sectorid": "RES"})),
        ];
        let groups = split_by_sector(&observations(&rows));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["RES"].len(), 2);
        assert_eq!(groups["COM"].len(), 1);
    }

    #[test]
    fn validates_monthly_periods() {
        assert!(is_monthly_period("2023-07"));
        assert!(!is_monthly_period("2023-13"));
        assert!(!is_monthly_period("2023"));
        assert!(!is_monthly_period("07-2023"));
    }
}
