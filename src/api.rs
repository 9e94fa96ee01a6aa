//! Synchronous client for the **EIA Open Data API (v2)**.
//!
//! This module focuses on the paginated `data` endpoints (offset/length
//! windows over a JSON envelope with a total-count field) and returns raw
//! [`Record`] rows. Pagination is handled automatically and sequentially;
//! offset windows have no ordering guarantee when issued concurrently, so no
//! concurrent page requests are ever made.
//!
//! ### Notes
//! - The API sometimes serializes `total` as a **string**; we accept both
//!   string/number.
//! - The API key travels as the `api_key` query parameter and is never
//!   written to log output ([`ApiKey`] redacts itself in `Debug`).
//! - Network timeouts use a sane default (30s) and can be adjusted by editing
//!   the client builder.
//!
//! Typical usage:
//! ```no_run
//! # use eia_trends::{Client, FetchOptions};
//! let client = Client::new("my-api-key");
//! let report = client.fetch_all("electricity/retail-sales/data", &FetchOptions::retail_sales())?;
//! println!("{} rows, complete: {}", report.rows.len(), report.is_complete());
//! # Ok::<(), eia_trends::FetchError>(())
//! ```

use crate::models::{ApiResponse, Envelope, Frequency, Record};
use log::{info, warn};
use reqwest::blocking::Client as ReqwestClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Well-known data routes, relative to the API base URL.
pub mod routes {
    /// Monthly retail electricity sales by state and sector.
    pub const RETAIL_SALES: &str = "electricity/retail-sales/data";
    /// Operating generator capacity.
    pub const GENERATOR_CAPACITY: &str = "electricity/operating-generator-capacity/data";
}

/// Environment variable the CLI and GUI read the API key from.
pub const API_KEY_ENV: &str = "EIA_API_KEY";

/// API credential. Redacts itself in `Debug` output so it cannot leak into
/// logs or error chains.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret, for building the request query only.
    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One failed page attempt. `Network` and `Status` are retried; `Decode` is
/// escalated to [`ProtocolViolation::InvalidBody`] because retrying cannot
/// fix a malformed server contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request failed with HTTP {0}")]
    Status(u16),
    #[error("decode json: {0}")]
    Decode(String),
}

/// The server broke its own envelope contract. Fatal for the current fetch;
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("response body is not a valid envelope: {0}")]
    InvalidBody(String),
    #[error("response missing `response` object")]
    MissingResponse,
    #[error("response missing `response.total`")]
    MissingTotal,
    #[error("response missing `response.data`")]
    MissingData,
    #[error("reported total changed mid-fetch: {first} then {latest}")]
    TotalChanged { first: u64, latest: u64 },
}

/// Fatal fetch outcomes. Retry exhaustion is *not* one of these: it yields
/// an `Ok` report flagged [`Completion::Incomplete`] so that already
/// accumulated pages are not thrown away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("malformed server response: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("fetch cancelled")]
    Cancelled,
}

/// Abstract HTTP capability the fetcher drives. The production implementation
/// is [`HttpTransport`]; tests substitute scripted fakes.
pub trait Transport {
    /// Perform one GET and decode the body as JSON. Implementations must map
    /// non-2xx statuses to [`TransportError::Status`].
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, TransportError>;
}

/// [`Transport`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: ReqwestClient,
}

impl Default for HttpTransport {
    fn default() -> Self {
        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("eia_trends/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .expect("reqwest client build");
        Self { http }
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, TransportError> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.json()
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Cooperative cancellation for a long-running fetch. Checked before every
/// HTTP attempt and before every wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one fetch session needs besides the route: filters, paging and
/// retry knobs. All fields are plain data with sensible defaults; nothing is
/// hard-coded inside the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub frequency: Frequency,
    /// Requested measure columns, sent as repeated `data[]` parameters.
    pub data_fields: Vec<String>,
    /// Facet filters, sent as repeated `facets[<name>][]` parameters.
    /// A BTreeMap keeps the query parameter order stable across calls.
    pub facets: BTreeMap<String, Vec<String>>,
    /// Inclusive period bounds, e.g. `2001-01`.
    pub start: Option<String>,
    pub end: Option<String>,
    /// Records per page request (the `length` parameter).
    pub page_size: u64,
    /// Attempts per page before giving up on the whole fetch.
    pub max_retries: u32,
    /// Base unit for linear retry backoff (attempt n waits n × this).
    pub retry_backoff: Duration,
    /// Courtesy delay between successive page requests.
    pub page_delay: Duration,
    pub cancel: Option<CancelToken>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            frequency: Frequency::Monthly,
            data_fields: Vec::new(),
            facets: BTreeMap::new(),
            start: None,
            end: None,
            page_size: 5000,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            page_delay: Duration::from_secs(1),
            cancel: None,
        }
    }
}

impl FetchOptions {
    /// Defaults for the retail-sales route: the four measure columns and all
    /// sector facets, monthly frequency, 5000-row pages, three attempts.
    pub fn retail_sales() -> Self {
        let mut facets = BTreeMap::new();
        facets.insert(
            "sectorid".to_string(),
            ["ALL", "COM", "IND", "OTH", "RES", "TRA"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        Self {
            data_fields: ["customers", "price", "revenue", "sales"]
                .into_iter()
                .map(String::from)
                .collect(),
            facets,
            ..Self::default()
        }
    }

    /// Restrict the `stateid` facet to the given states.
    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        if !states.is_empty() {
            self.facets.insert("stateid".to_string(), states);
        }
        self
    }

    /// Restrict the `sectorid` facet to the given sectors.
    pub fn with_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sectors: Vec<String> = sectors.into_iter().map(Into::into).collect();
        if !sectors.is_empty() {
            self.facets.insert("sectorid".to_string(), sectors);
        }
        self
    }
}

/// How a fetch session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every page arrived; the dual stop rule fired.
    Complete,
    /// Retries were exhausted on the page at `next_offset`; everything fetched
    /// before it is in the report.
    Incomplete {
        next_offset: u64,
        attempts: u32,
        error: TransportError,
    },
}

/// The accumulated result of one fetch session.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// All rows received, in arrival order.
    pub rows: Vec<Record>,
    pub completion: Completion,
    /// The total the server reported, once observed.
    pub total_reported: Option<u64>,
    /// Number of pages fetched successfully.
    pub requests: u32,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.completion, Completion::Complete)
    }
}

/// Client for paginated EIA v2 data routes.
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    pub base_url: String,
    api_key: ApiKey,
    transport: T,
}

impl Client<HttpTransport> {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            base_url: "https://api.eia.gov/v2".into(),
            api_key: api_key.into(),
            transport: HttpTransport::default(),
        }
    }

    /// Build a client from the `EIA_API_KEY` environment variable.
    pub fn from_env() -> anyhow::Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} is not set; export your EIA API key", API_KEY_ENV))?;
        if key.trim().is_empty() {
            anyhow::bail!("{} is set but empty", API_KEY_ENV);
        }
        Ok(Self::new(key))
    }
}

impl<T: Transport> Client<T> {
    /// Build a client over a custom transport (used by tests).
    pub fn with_transport(api_key: impl Into<ApiKey>, transport: T) -> Self {
        Self {
            base_url: "https://api.eia.gov/v2".into(),
            api_key: api_key.into(),
            transport,
        }
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch every page of `route`.
    ///
    /// Pages are requested sequentially in `page_size` windows. Each page is
    /// attempted up to `max_retries` times with linear backoff; if one page
    /// exhausts its attempts the rows accumulated so far are returned with
    /// [`Completion::Incomplete`] rather than discarded. A malformed envelope
    /// ([`ProtocolViolation`]) aborts the fetch and is never retried.
    ///
    /// The loop stops cleanly when a page comes back shorter than `page_size`
    /// or when the accumulated row count reaches the server-reported total;
    /// either signal alone is enough, so an inconsistent server cannot cause
    /// endless pagination.
    pub fn fetch_all(&self, route: &str, opts: &FetchOptions) -> Result<FetchReport, FetchError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        );
        let cancel = opts.cancel.as_ref();

        let mut rows: Vec<Record> = Vec::new();
        let mut offset: u64 = 0;
        let mut total: Option<u64> = None;
        let mut requests: u32 = 0;

        loop {
            let query = self.build_query(opts, offset);

            // Attempt the page, retrying transport failures with linear backoff.
            let max_attempts = opts.max_retries.max(1);
            let mut attempt: u32 = 0;
            let body = loop {
                attempt += 1;
                check_cancel(cancel)?;
                match self.transport.get_json(&url, &query) {
                    Ok(body) => break body,
                    Err(TransportError::Decode(msg)) => {
                        return Err(ProtocolViolation::InvalidBody(msg).into());
                    }
                    Err(err) if attempt < max_attempts => {
                        warn!(
                            "attempt {}/{} for {} at offset {} failed: {}",
                            attempt, max_attempts, route, offset, err
                        );
                        pause(opts.retry_backoff * attempt, cancel)?;
                    }
                    Err(err) => {
                        warn!(
                            "giving up on {} at offset {} after {} attempts: {}",
                            route, offset, attempt, err
                        );
                        return Ok(FetchReport {
                            rows,
                            completion: Completion::Incomplete {
                                next_offset: offset,
                                attempts: attempt,
                                error: err,
                            },
                            total_reported: total,
                            requests,
                        });
                    }
                }
            };
            requests += 1;

            let envelope = parse_envelope(body)?;
            let page_total = envelope.total.ok_or(ProtocolViolation::MissingTotal)?;
            match total {
                None => total = Some(page_total),
                Some(first) if first != page_total => {
                    return Err(ProtocolViolation::TotalChanged {
                        first,
                        latest: page_total,
                    }
                    .into());
                }
                Some(_) => {}
            }

            let page = envelope.data.ok_or(ProtocolViolation::MissingData)?;
            let page_len = page.len() as u64;
            rows.extend(page);
            info!(
                "fetched {} of {} records from {}",
                rows.len(),
                page_total,
                route
            );

            // Dual stop rule: a short page means the data ran out, and the
            // accumulated count reaching the reported total means the same.
            if page_len < opts.page_size || rows.len() as u64 >= page_total {
                break;
            }

            offset += opts.page_size;
            pause(opts.page_delay, cancel)?;
        }

        Ok(FetchReport {
            rows,
            completion: Completion::Complete,
            total_reported: total,
            requests,
        })
    }

    /// Fetch the retail-sales route with the given options.
    pub fn fetch_retail_sales(&self, opts: &FetchOptions) -> Result<FetchReport, FetchError> {
        self.fetch_all(routes::RETAIL_SALES, opts)
    }

    fn build_query(&self, opts: &FetchOptions, offset: u64) -> Vec<(String, String)> {
        let mut q: Vec<(String, String)> = Vec::new();
        q.push(("api_key".into(), self.api_key.expose().into()));
        q.push((
            "frequency".into(),
            opts.frequency.as_query_param().into(),
        ));
        for field in &opts.data_fields {
            q.push(("data[]".into(), field.clone()));
        }
        for (facet, values) in &opts.facets {
            let key = format!("facets[{facet}][]");
            for value in values {
                q.push((key.clone(), value.clone()));
            }
        }
        if let Some(start) = &opts.start {
            q.push(("start".into(), start.clone()));
        }
        if let Some(end) = &opts.end {
            q.push(("end".into(), end.clone()));
        }
        q.push(("offset".into(), offset.to_string()));
        q.push(("length".into(), opts.page_size.to_string()));
        q
    }
}

fn check_cancel(cancel: Option<&CancelToken>) -> Result<(), FetchError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(FetchError::Cancelled),
        _ => Ok(()),
    }
}

fn pause(delay: Duration, cancel: Option<&CancelToken>) -> Result<(), FetchError> {
    check_cancel(cancel)?;
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
    Ok(())
}

fn parse_envelope(body: Value) -> Result<Envelope, ProtocolViolation> {
    let parsed: ApiResponse = serde_json::from_value(body)
        .map_err(|e| ProtocolViolation::InvalidBody(e.to_string()))?;
    parsed.response.ok_or(ProtocolViolation::MissingResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopTransport;

    impl Transport for NoopTransport {
        fn get_json(&self, _: &str, _: &[(String, String)]) -> Result<Value, TransportError> {
            Err(TransportError::Status(500))
        }
    }

    fn params<'a>(q: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        q.iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn query_carries_credential_paging_and_repeated_keys() {
        let client = Client::with_transport("secret", NoopTransport);
        let opts = FetchOptions::retail_sales().with_states(["CO"]);

        let q = client.build_query(&opts, 5000);

        assert_eq!(params(&q, "api_key"), vec!["secret"]);
        assert_eq!(params(&q, "frequency"), vec!["monthly"]);
        assert_eq!(
            params(&q, "data[]"),
            vec!["customers", "price", "revenue", "sales"]
        );
        assert_eq!(
            params(&q, "facets[sectorid][]"),
            vec!["ALL", "COM", "IND", "OTH", "RES", "TRA"]
        );
        assert_eq!(params(&q, "facets[stateid][]"), vec!["CO"]);
        assert_eq!(params(&q, "offset"), vec!["5000"]);
        assert_eq!(params(&q, "length"), vec!["5000"]);
    }

    #[test]
    fn facet_order_is_stable() {
        let client = Client::with_transport("secret", NoopTransport);
        let opts = FetchOptions::retail_sales().with_states(["TX", "CO"]);

        assert_eq!(client.build_query(&opts, 0), client.build_query(&opts, 0));
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let shown = format!("{:?}", ApiKey::new("hunter2"));
        assert!(!shown.contains("hunter2"));
        assert_eq!(shown, "ApiKey(***)");
    }
}
