//! Error types for the FHEVM client

use thiserror::Error;

/// Client error
///
/// Cloneable so one failed initialization can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("FHEVM instance not initialized. Call init() first.")]
    NotInitialized,

    #[error("Unsupported encrypted type: {0}")]
    UnsupportedType(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Signature rejected: {0}")]
    SignatureRejected(String),

    /// Failure reported by the wrapped library or the network, verbatim
    #[error("{0}")]
    Network(String),

    /// Non-success response from the gateway, body verbatim
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error("Chain mismatch: configured {expected}, provider reports {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<fhevm_core::Error> for ClientError {
    fn from(err: fhevm_core::Error) -> Self {
        match err {
            fhevm_core::Error::UnsupportedType(ty) => ClientError::UnsupportedType(ty),
            fhevm_core::Error::InvalidConfig(msg) => ClientError::Config(msg),
            fhevm_core::Error::Io(e) => ClientError::Config(e.to_string()),
            fhevm_core::Error::Json(e) => ClientError::Config(e.to_string()),
            other => ClientError::Validation(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: ClientError = fhevm_core::Error::UnsupportedType("uint128".into()).into();
        assert_eq!(err, ClientError::UnsupportedType("uint128".into()));

        let err: ClientError = fhevm_core::Error::InvalidAddress("0x12".into()).into();
        assert!(matches!(err, ClientError::Validation(ref m) if m.contains("0x12")));

        let err: ClientError = fhevm_core::Error::InvalidConfig("networkUrl is required".into()).into();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_passthrough_messages() {
        assert_eq!(
            ClientError::Network("connection refused".into()).to_string(),
            "connection refused"
        );
        let gateway = ClientError::Gateway {
            status: 403,
            message: "user is not authorized".into(),
        };
        assert_eq!(gateway.to_string(), "user is not authorized");
    }
}
