mod common;

use common::{ScriptedTransport, page, rows, seqs};
use eia_trends::{
    CancelToken, Client, Completion, FetchError, FetchOptions, ProtocolViolation, TransportError,
};
use serde_json::json;
use std::time::{Duration, Instant};

fn fast_opts(page_size: u64) -> FetchOptions {
    FetchOptions {
        page_size,
        retry_backoff: Duration::ZERO,
        page_delay: Duration::ZERO,
        ..FetchOptions::retail_sales()
    }
}

fn client(transport: ScriptedTransport) -> Client<ScriptedTransport> {
    Client::with_transport("test-key", transport)
}

#[test]
fn retry_then_success_yields_the_full_dataset() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Status(500)),
        Err(TransportError::Network("connection reset".into())),
        Ok(page(2, rows(0, 2))),
    ]);
    let client = client(transport);

    let mut opts = fast_opts(2);
    opts.max_retries = 3;
    opts.retry_backoff = Duration::from_millis(20);

    let started = Instant::now();
    let report = client
        .fetch_all("electricity/retail-sales/data", &opts)
        .unwrap();
    let elapsed = started.elapsed();

    assert!(report.is_complete());
    assert_eq!(seqs(&report.rows), vec![0, 1]);
    assert_eq!(client.transport().request_count(), 3);
    // Linear backoff: 1×20ms after the first failure, 2×20ms after the second.
    assert!(
        elapsed >= Duration::from_millis(60),
        "backoff not observed: {elapsed:?}"
    );
}

#[test]
fn retry_exhaustion_returns_partial_rows_with_incomplete_signal() {
    let transport = ScriptedTransport::new(vec![
        Ok(page(6, rows(0, 2))),
        Err(TransportError::Status(503)),
        Err(TransportError::Status(503)),
        Err(TransportError::Network("timed out".into())),
    ]);
    let client = client(transport);

    let mut opts = fast_opts(2);
    opts.max_retries = 3;

    let report = client
        .fetch_all("electricity/retail-sales/data", &opts)
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(seqs(&report.rows), vec![0, 1]);
    assert_eq!(report.total_reported, Some(6));
    assert_eq!(report.requests, 1);
    match report.completion {
        Completion::Incomplete {
            next_offset,
            attempts,
            error,
        } => {
            assert_eq!(next_offset, 2);
            assert_eq!(attempts, 3);
            assert_eq!(error, TransportError::Network("timed out".into()));
        }
        Completion::Complete => panic!("exhausted retries must not report completion"),
    }
}

#[test]
fn exhaustion_on_the_first_page_keeps_zero_rows_without_error() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Status(500)),
        Err(TransportError::Status(500)),
    ]);
    let client = client(transport);

    let mut opts = fast_opts(2);
    opts.max_retries = 2;

    let report = client
        .fetch_all("electricity/retail-sales/data", &opts)
        .unwrap();

    assert!(!report.is_complete());
    assert!(report.rows.is_empty());
    assert_eq!(report.total_reported, None);
}

#[test]
fn missing_total_is_a_protocol_violation_and_is_not_retried() {
    let transport =
        ScriptedTransport::new(vec![Ok(json!({"response": {"data": [{"seq": 0}]}}))]);
    let client = client(transport);

    let err = client
        .fetch_all("electricity/retail-sales/data", &fast_opts(2))
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::Protocol(ProtocolViolation::MissingTotal)
    );
    assert_eq!(client.transport().request_count(), 1);
}

#[test]
fn missing_data_is_a_protocol_violation() {
    let transport = ScriptedTransport::new(vec![Ok(json!({"response": {"total": 5}}))]);
    let client = client(transport);

    let err = client
        .fetch_all("electricity/retail-sales/data", &fast_opts(2))
        .unwrap_err();

    assert_eq!(err, FetchError::Protocol(ProtocolViolation::MissingData));
}

#[test]
fn missing_response_object_is_a_protocol_violation() {
    let transport = ScriptedTransport::new(vec![Ok(json!({"error": "no such route"}))]);
    let client = client(transport);

    let err = client
        .fetch_all("electricity/retail-sales/data", &fast_opts(2))
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::Protocol(ProtocolViolation::MissingResponse)
    );
}

#[test]
fn shrinking_total_aborts_pagination() {
    let transport = ScriptedTransport::new(vec![
        Ok(page(6, rows(0, 2))),
        Ok(page(5, rows(2, 2))),
    ]);
    let client = client(transport);

    let err = client
        .fetch_all("electricity/retail-sales/data", &fast_opts(2))
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::Protocol(ProtocolViolation::TotalChanged { first: 6, latest: 5 })
    );
    assert_eq!(client.transport().request_count(), 2);
}

#[test]
fn undecodable_body_is_fatal_without_a_retry_loop() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Decode(
        "expected value at line 1".into(),
    ))]);
    let client = client(transport);

    let mut opts = fast_opts(2);
    opts.max_retries = 5;

    let err = client
        .fetch_all("electricity/retail-sales/data", &opts)
        .unwrap_err();

    match err {
        FetchError::Protocol(ProtocolViolation::InvalidBody(_)) => {}
        other => panic!("expected InvalidBody, got {other:?}"),
    }
    assert_eq!(client.transport().request_count(), 1);
}

#[test]
fn cancelled_token_stops_before_any_request() {
    let transport = ScriptedTransport::new(vec![Ok(page(2, rows(0, 2)))]);
    let client = client(transport);

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut opts = fast_opts(2);
    opts.cancel = Some(cancel);

    let err = client
        .fetch_all("electricity/retail-sales/data", &opts)
        .unwrap_err();

    assert_eq!(err, FetchError::Cancelled);
    assert_eq!(client.transport().request_count(), 0);
}
