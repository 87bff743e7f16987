//! Error types for fhevm-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported encrypted type: {0}")]
    UnsupportedType(String),

    #[error("Value {value} out of range for {ty}")]
    OutOfRange { ty: String, value: String },

    #[error("Type mismatch: {ty} cannot hold {actual}")]
    TypeMismatch { ty: String, actual: String },

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
