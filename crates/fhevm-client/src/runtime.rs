//! Seams to the wrapped FHE library and to the wallet
//!
//! The SDK never performs encryption itself. Everything cryptographic goes
//! through these traits; the client only orders the calls and marshals the
//! values.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, Signature, U256};
use async_trait::async_trait;
use fhevm_core::{ClearValue, EncryptedType, EncryptedValue, NetworkConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::eip712::ReencryptRequest;
use crate::error::Result;

/// Parameters handed to the library when constructing an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceParams {
    pub chain_id: u64,
    pub network_url: String,
    pub gateway_url: Option<String>,
    pub public_key: Option<String>,
    pub acl_address: Option<Address>,
}

/// Authorized decryption request sent to the decryption service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle: U256,
    pub contract_address: Address,
    pub user_address: Address,
    /// Reencryption public key the user signed over
    pub public_key: Bytes,
    /// 65-byte EIP-712 signature
    pub signature: Bytes,
}

/// The wrapped FHE library
#[async_trait]
pub trait FhevmRuntime: Send + Sync {
    /// One-time global library initialization
    async fn bootstrap(&self) -> Result<()>;

    /// Construct an instance bound to a chain and its endpoints
    async fn create_instance(&self, params: InstanceParams) -> Result<Arc<dyn FhevmInstance>>;
}

/// A ready library instance
#[async_trait]
pub trait FhevmInstance: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Network FHE public key, when the instance knows it
    fn network_public_key(&self) -> Option<String>;

    /// Fresh single-use input builder scoped to a contract/user pair
    fn create_encrypted_input(&self, contract: Address, user: Address) -> Box<dyn EncryptedInput>;

    /// Typed data authorizing reencryption of values held by `contract`
    fn reencryption_request(&self, contract: Address, user: Address) -> ReencryptRequest;

    /// Decrypt a handle on behalf of a user that signed a reencryption request
    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<U256>;

    /// Decrypt a handle the contract marked publicly decryptable
    async fn public_decrypt(&self, contract: Address, handle: U256) -> Result<U256>;
}

/// Library-side encrypted input under construction
#[async_trait]
pub trait EncryptedInput: Send {
    /// Append one value; the caller has already checked it fits `ty`
    fn push(&mut self, ty: EncryptedType, value: ClearValue);

    /// Number of values appended so far
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encrypt every appended value under one proof
    async fn encrypt(self: Box<Self>) -> Result<EncryptedValue>;
}

/// Wallet/provider capability: network identification and signing
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn network(&self) -> Result<NetworkConfig>;

    async fn signer(&self) -> Result<Arc<dyn TypedDataSigner>>;
}

/// Account able to sign EIP-712 typed data
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign the request; a user or wallet refusal is `SignatureRejected`
    async fn sign_typed_data(&self, request: &ReencryptRequest) -> Result<Signature>;
}

/// Library handle shared by every client in the process
///
/// Bootstrapping runs at most once. Concurrent callers wait on the same
/// bootstrap; a failed bootstrap is not cached and the next caller retries.
pub struct SharedRuntime {
    runtime: Arc<dyn FhevmRuntime>,
    bootstrapped: OnceCell<()>,
}

impl SharedRuntime {
    pub fn new(runtime: Arc<dyn FhevmRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            bootstrapped: OnceCell::new(),
        })
    }

    pub async fn ensure_bootstrapped(&self) -> Result<()> {
        self.bootstrapped
            .get_or_try_init(|| async {
                tracing::info!("Bootstrapping FHE library");
                self.runtime.bootstrap().await
            })
            .await?;
        Ok(())
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.initialized()
    }

    pub async fn create_instance(&self, params: InstanceParams) -> Result<Arc<dyn FhevmInstance>> {
        self.runtime.create_instance(params).await
    }
}
