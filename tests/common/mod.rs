#![allow(dead_code)]

use eia_trends::{Transport, TransportError};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted stand-in for the HTTP boundary: each call pops the next
/// prepared response. Panics on unscripted extra requests, which doubles as
/// an assertion that pagination terminates when it should.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    queries: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    /// The `offset` parameter of every request, in call order.
    pub fn offsets(&self) -> Vec<u64> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| {
                q.iter()
                    .find(|(k, _)| k == "offset")
                    .map(|(_, v)| v.parse().expect("offset param"))
                    .expect("every request carries an offset")
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn get_json(&self, _url: &str, query: &[(String, String)]) -> Result<Value, TransportError> {
        self.queries.lock().unwrap().push(query.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted")
    }
}

/// Rows `start..start + count`, each tagged with its index so arrival order
/// can be asserted downstream.
pub fn rows(start: u64, count: u64) -> Vec<Value> {
    (start..start + count)
        .map(|i| json!({"period": "2023-07", "stateid": "US", "sectorid": "RES", "seq": i}))
        .collect()
}

/// A well-formed envelope page.
pub fn page(total: u64, data: Vec<Value>) -> Value {
    json!({"response": {"total": total, "data": data}})
}

/// Same page but with `total` serialized as a string, as the API sometimes does.
pub fn page_string_total(total: u64, data: Vec<Value>) -> Value {
    json!({"response": {"total": total.to_string(), "data": data}})
}

/// The `seq` tags of fetched records, in order.
pub fn seqs(records: &[eia_trends::Record]) -> Vec<u64> {
    records
        .iter()
        .map(|r| r.get("seq").and_then(Value::as_u64).expect("seq field"))
        .collect()
}
