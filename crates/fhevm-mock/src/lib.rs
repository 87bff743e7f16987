//! fhevm-mock: stand-in FHE library and decryption gateway
//!
//! For tests and demos only. "Ciphertexts" are clear values in a
//! [`CiphertextStore`]; what is real is the request flow: EIP-712 signatures
//! are produced and recovered, and access rules are checked the way the
//! on-chain ACL would.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod runtime;
pub mod server;
pub mod store;

pub use error::{MockError, Result};
pub use routes::{create_router, GatewayState, SharedState};
pub use runtime::{MockInput, MockInstance, MockRuntime, MockRuntimeBuilder, DEFAULT_NETWORK_KEY};
pub use server::{GatewayBuilder, MockGateway};
pub use store::{CiphertextEntry, CiphertextStore, SeedEntry};
