//! Wallet capabilities backed by a local private key

use std::sync::Arc;

use alloy_primitives::{Address, Signature, U64};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use fhevm_core::NetworkConfig;

use crate::eip712::ReencryptRequest;
use crate::error::{ClientError, Result};
use crate::runtime::{TypedDataSigner, WalletProvider};

/// Human-readable name for well-known chain ids
pub fn chain_name(chain_id: u64) -> String {
    match chain_id {
        1 => "mainnet".into(),
        11155111 => "sepolia".into(),
        8009 => "zama-devnet".into(),
        9000 => "local".into(),
        31337 => "hardhat".into(),
        other => format!("chain-{}", other),
    }
}

/// Typed-data signer holding a private key in memory
#[derive(Clone)]
pub struct LocalSigner {
    inner: PrivateKeySigner,
}

impl LocalSigner {
    pub fn new(inner: PrivateKeySigner) -> Self {
        Self { inner }
    }

    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// Parse a 0x-prefixed 32-byte hex private key
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let inner: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ClientError::Config(format!("Invalid private key: {}", e)))?;
        Ok(Self::new(inner))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.inner.address())
            .finish()
    }
}

#[async_trait]
impl TypedDataSigner for LocalSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_typed_data(&self, request: &ReencryptRequest) -> Result<Signature> {
        self.inner
            .sign_hash_sync(&request.signing_hash())
            .map_err(|e| ClientError::SignatureRejected(e.to_string()))
    }
}

/// Wallet with a fixed network, for tests, scripts and servers
#[derive(Debug, Clone)]
pub struct LocalWallet {
    network: NetworkConfig,
    signer: Arc<LocalSigner>,
}

impl LocalWallet {
    pub fn new(chain_id: u64, signer: LocalSigner) -> Self {
        Self {
            network: NetworkConfig::new(chain_id, chain_name(chain_id)),
            signer: Arc::new(signer),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn network(&self) -> Result<NetworkConfig> {
        Ok(self.network.clone())
    }

    async fn signer(&self) -> Result<Arc<dyn TypedDataSigner>> {
        Ok(self.signer.clone())
    }
}

/// Wallet that asks a JSON-RPC node which chain it is on and signs locally
pub struct RpcWallet {
    rpc: RpcClient,
    signer: Arc<LocalSigner>,
}

impl RpcWallet {
    pub async fn connect(rpc_url: &str, signer: LocalSigner) -> Result<Self> {
        let rpc = ClientBuilder::default()
            .connect(rpc_url)
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            rpc,
            signer: Arc::new(signer),
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let chain_id: U64 = self
            .rpc
            .request_noparams("eth_chainId")
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(chain_id.to::<u64>())
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn network(&self) -> Result<NetworkConfig> {
        let chain_id = self.chain_id().await?;
        tracing::debug!(chain_id, "Provider reported chain");
        Ok(NetworkConfig::new(chain_id, chain_name(chain_id)))
    }

    async fn signer(&self) -> Result<Arc<dyn TypedDataSigner>> {
        Ok(self.signer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    #[test]
    fn test_chain_names() {
        assert_eq!(chain_name(11155111), "sepolia");
        assert_eq!(chain_name(42), "chain-42");
    }

    #[test]
    fn test_from_hex() {
        let key = format!("0x{}", "01".repeat(32));
        let a = LocalSigner::from_hex(&key).unwrap();
        let b = LocalSigner::from_hex(&key).unwrap();
        assert_eq!(a.address(), b.address());
        assert!(matches!(
            LocalSigner::from_hex("0x1234"),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_local_wallet_signs_recoverable() {
        let wallet = LocalWallet::new(9000, LocalSigner::random());
        let network = wallet.network().await.unwrap();
        assert_eq!(network.chain_id, 9000);
        assert_eq!(network.name, "local");

        let signer = wallet.signer().await.unwrap();
        let request =
            ReencryptRequest::new(9000, Address::repeat_byte(0x11), Bytes::from(vec![1u8; 32]));
        let sig = signer.sign_typed_data(&request).await.unwrap();
        assert_eq!(request.recover(&sig.as_bytes()).unwrap(), wallet.address());
    }
}
