//! fhevm-client: lifecycle, encryption and decryption on top of an FHE library
//!
//! The client owns exactly one library instance per configuration and hands
//! it to stateless dispatchers:
//!
//! ```text
//! FhevmContext ──► FhevmClient ──► SharedRuntime ──► FhevmRuntime (library)
//!      │                │
//!      │                └──► FhevmInstance ──► encryption / decryption
//!      └──► Encryptor, Decryptor, InputComposer (observable status)
//! ```
//!
//! Cryptography happens behind the [`FhevmRuntime`] and [`FhevmInstance`]
//! traits; signing happens behind [`TypedDataSigner`]. Nothing here retries
//! implicitly; see [`retry`].

pub mod client;
pub mod context;
pub mod decryption;
pub mod eip712;
pub mod encryption;
mod error;
pub mod gateway;
pub mod metrics;
pub mod retry;
pub mod runtime;
pub mod wallet;

pub use client::{ClientBuilder, ClientState, FhevmClient, LifecyclePhase};
pub use context::{ContextStatus, Decryptor, Encryptor, FhevmContext, InputComposer, OperationStatus};
pub use decryption::DecryptionAuthorization;
pub use eip712::ReencryptRequest;
pub use encryption::InputBuilder;
pub use error::{ClientError, Result};
pub use gateway::GatewayClient;
pub use retry::{retry, RetryPolicy};
pub use runtime::{
    EncryptedInput, FhevmInstance, FhevmRuntime, InstanceParams, SharedRuntime, TypedDataSigner,
    UserDecryptRequest, WalletProvider,
};
pub use wallet::{chain_name, LocalSigner, LocalWallet, RpcWallet};
