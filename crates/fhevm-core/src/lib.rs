//! fhevm-core: shared types and validation for the FHEVM SDK
//!
//! This crate holds everything that does not touch the network or the
//! wrapped FHE library:
//! - Encrypted type tags (`ebool`, `euint8` .. `euint64`, `eaddress`)
//! - Clear values, encrypted inputs and their contract/user scope
//! - Validation helpers that report instead of failing
//! - The configuration surface shared by clients and tools
//!
//! # Handles
//!
//! A handle is a 256-bit reference to a ciphertext held by the chain. It is
//! not the ciphertext. Handles are produced by encrypting an input and are
//! consumed by contract calls and decryption requests.

mod config;
mod encrypted_type;
mod error;
pub mod format;
pub mod validation;
mod value;

pub use config::{FhevmConfig, NetworkConfig};
pub use encrypted_type::EncryptedType;
pub use error::Error;
pub use validation::ValidationResult;
pub use value::{
    parse_address, AccessOptions, ClearValue, DecryptionOptions, EncryptedValue,
    EncryptionOptions,
};

pub use alloy_primitives::{Address, Bytes, B256, U256};

pub type Result<T> = std::result::Result<T, Error>;

/// Handle referencing an on-chain ciphertext
pub type Handle = U256;

/// Constants shared across the SDK
pub mod constants {
    /// Size of a handle in bytes
    pub const HANDLE_SIZE: usize = 32;

    /// EIP-712 domain name used for reencryption authorization
    pub const EIP712_DOMAIN_NAME: &str = "Authorization token";

    /// EIP-712 domain version used for reencryption authorization
    pub const EIP712_DOMAIN_VERSION: &str = "1";

    /// Default attempts for the retry helper
    pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

    /// Default base delay for the retry helper, in milliseconds
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
}
