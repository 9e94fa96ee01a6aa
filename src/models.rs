use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw API row: an open mapping of field name to scalar. The fetcher does
/// not validate field shapes; typing happens in [`crate::normalize`].
pub type Record = serde_json::Map<String, Value>;

/// Reporting frequency understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Frequency {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_query_param(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Annual => "annual",
        }
    }
}

/// Top-level API payload: everything lives under a `response` key.
///
/// Both members of the inner envelope are optional here so that a missing key
/// can be reported as a protocol violation instead of a generic decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub response: Option<Envelope>,
}

/// The paging envelope: a total record count and one page of rows.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// The API sometimes serializes `total` as a **string**; accept both
    /// string/number and normalize to `u64`.
    #[serde(default, deserialize_with = "de_opt_u64_from_string_or_number")]
    pub total: Option<u64>,
    pub data: Option<Vec<Record>>,
}

/// Serde helper: parse `Option<u64>` from a JSON number, a numeric string, or null.
fn de_opt_u64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct OptU64Visitor;

    impl<'de> Visitor<'de> for OptU64Visitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("negative value for total"));
            }
            Ok(Some(v as u64))
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.parse::<u64>().map(Some).map_err(E::custom)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OptU64Visitor)
}

/// Tidy structure used by this crate (one row = one observation of a state
/// and sector in one period). Produced by [`crate::normalize::observations`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub period: String,
    pub state_id: String,
    pub state_name: String,
    pub sector_id: String,
    pub sector_name: String,
    pub customers: Option<f64>,
    pub price: Option<f64>,
    pub revenue: Option<f64>,
    pub sales: Option<f64>,
}

/// Which measured column to summarize or plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Metric {
    #[default]
    Customers,
    Price,
    Revenue,
    Sales,
}

impl Metric {
    /// The API field / CSV column backing this metric.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Customers => "customers",
            Metric::Price => "price",
            Metric::Revenue => "revenue",
            Metric::Sales => "sales",
        }
    }

    /// Human-readable axis/legend label, units included.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Customers => "Number of Customers",
            Metric::Price => "Price (cents/kWh)",
            Metric::Revenue => "Revenue (thousand dollars)",
            Metric::Sales => "Sales (MWh)",
        }
    }

    pub fn value_of(&self, obs: &Observation) -> Option<f64> {
        match self {
            Metric::Customers => obs.customers,
            Metric::Price => obs.price,
            Metric::Revenue => obs.revenue,
            Metric::Sales => obs.sales,
        }
    }
}

/// Grouping key used in stats and plotting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    pub state_id: String,
    pub sector_id: String,
}
