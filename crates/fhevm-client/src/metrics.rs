//! Client-side metrics
//!
//! Only operation and outcome labels, never values, handles or addresses.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

pub const OP_INIT: &str = "init";
pub const OP_ENCRYPT: &str = "encrypt";
pub const OP_DECRYPT: &str = "decrypt";
pub const OP_PUBLIC_DECRYPT: &str = "public_decrypt";
pub const OP_BATCH_DECRYPT: &str = "batch_decrypt";

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_ERROR: &str = "error";

pub fn outcome<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        OUTCOME_OK
    } else {
        OUTCOME_ERROR
    }
}

pub fn record_operation(operation: &str, outcome: &str, duration: Duration) {
    counter!("fhevm_operations_total", "operation" => operation.to_string(), "outcome" => outcome.to_string()).increment(1);
    histogram!("fhevm_operation_duration_seconds", "operation" => operation.to_string(), "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn set_client_ready(ready: bool) {
    gauge!("fhevm_client_ready").set(if ready { 1.0 } else { 0.0 });
}

pub fn record_gateway_request(endpoint: &str, status: u16, duration: Duration) {
    counter!("fhevm_gateway_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string()).increment(1);
    histogram!("fhevm_gateway_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}
