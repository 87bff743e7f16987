//! fhevm-kit: SDK for confidential smart contracts on FHEVM chains
//!
//! Re-exports the workspace crates under one name:
//! - [`core`]: encrypted types, clear values, validation, configuration
//! - [`client`]: client lifecycle, encryption/decryption dispatch, wallet and
//!   gateway plumbing, observable context
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fhevm_kit::prelude::*;
//!
//! let client = FhevmClient::builder(FhevmConfig::new("https://devnet.example"))
//!     .runtime(runtime)
//!     .build()?;
//! client.init(Arc::new(LocalWallet::new(9000, signer.clone()))).await?;
//!
//! let options = AccessOptions::new(contract, signer.address());
//! let encrypted = client.encrypt(100u32, EncryptedType::Uint32, &options).await?;
//! let handle = encrypted.first_handle().unwrap_or_default();
//! let value = client.decrypt(handle, EncryptedType::Uint32, &signer, &options).await?;
//! ```

pub use fhevm_client as client;
pub use fhevm_core as core;

pub mod prelude {
    pub use fhevm_client::{
        ClientBuilder, ClientError, ClientState, FhevmClient, FhevmContext, FhevmInstance,
        FhevmRuntime, LifecyclePhase, LocalSigner, LocalWallet, RpcWallet, SharedRuntime,
        TypedDataSigner, WalletProvider,
    };
    pub use fhevm_core::{
        AccessOptions, Address, ClearValue, EncryptedType, EncryptedValue, FhevmConfig,
        ValidationResult, U256,
    };
}
