//! Prometheus metrics for the mock gateway

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::error::{MockError, Result};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn outcome_of<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => OUTCOME_OK,
        Err(e) if e.status().is_client_error() => OUTCOME_CLIENT_ERROR,
        Err(_) => OUTCOME_SERVER_ERROR,
    }
}

pub fn record_request(endpoint: &str, outcome: &str, duration: Duration) {
    counter!("mock_gateway_requests_total", "endpoint" => endpoint.to_string(), "outcome" => outcome.to_string()).increment(1);
    histogram!("mock_gateway_request_duration_seconds", "endpoint" => endpoint.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_ciphertexts_seeded(count: usize) {
    counter!("mock_gateway_ciphertexts_seeded_total").increment(count as u64);
}

pub fn init_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MockError::Internal(format!("Failed to install Prometheus recorder: {}", e)))
}
