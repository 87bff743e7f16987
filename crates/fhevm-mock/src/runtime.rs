//! Mock FHE library
//!
//! Implements the library seams without any cryptography so the client can
//! be exercised end to end. Instances decrypt against a shared
//! [`CiphertextStore`], either in-process or through a gateway when the
//! client configuration names one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use fhevm_client::{
    ClientError, EncryptedInput, FhevmInstance, FhevmRuntime, GatewayClient, InstanceParams,
    ReencryptRequest, Result, UserDecryptRequest,
};
use fhevm_core::{ClearValue, EncryptedType, EncryptedValue};

use crate::store::CiphertextStore;

pub const DEFAULT_NETWORK_KEY: &str = "mock-network-public-key";

/// Mock library with call counters and injectable latency and failures
pub struct MockRuntime {
    store: Arc<CiphertextStore>,
    enforce_acl: bool,
    delay: Duration,
    network_key: String,
    bootstrap_failures: AtomicUsize,
    create_failures: AtomicUsize,
    bootstrap_calls: AtomicUsize,
    instances_created: AtomicUsize,
}

impl MockRuntime {
    pub fn builder() -> MockRuntimeBuilder {
        MockRuntimeBuilder::default()
    }

    pub fn store(&self) -> &Arc<CiphertextStore> {
        &self.store
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstrap_calls.load(Ordering::SeqCst)
    }

    pub fn instances_created(&self) -> usize {
        self.instances_created.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Take one injected failure, if any remain
fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl FhevmRuntime for MockRuntime {
    async fn bootstrap(&self) -> Result<()> {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if take_failure(&self.bootstrap_failures) {
            return Err(ClientError::Network("mock bootstrap failed".into()));
        }
        Ok(())
    }

    async fn create_instance(&self, params: InstanceParams) -> Result<Arc<dyn FhevmInstance>> {
        self.instances_created.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if take_failure(&self.create_failures) {
            return Err(ClientError::Network("mock instance creation failed".into()));
        }

        let (backend, network_key) = match &params.gateway_url {
            Some(url) => {
                let gateway = GatewayClient::new(url.clone())?;
                let keys = gateway.keys().await?;
                if keys.chain_id != params.chain_id {
                    return Err(ClientError::ChainMismatch {
                        expected: params.chain_id,
                        actual: keys.chain_id,
                    });
                }
                (Backend::Gateway(gateway), Some(keys.public_key))
            }
            None => (
                Backend::InProcess {
                    enforce_acl: self.enforce_acl,
                },
                Some(self.network_key.clone()),
            ),
        };

        tracing::debug!(chain_id = params.chain_id, gateway = ?params.gateway_url, "Created mock instance");

        Ok(Arc::new(MockInstance {
            chain_id: params.chain_id,
            network_key: params.public_key.or(network_key),
            store: self.store.clone(),
            backend,
            reencryption_keys: Mutex::new(HashMap::new()),
        }))
    }
}

#[derive(Default)]
pub struct MockRuntimeBuilder {
    store: Option<Arc<CiphertextStore>>,
    enforce_acl: bool,
    delay: Duration,
    network_key: Option<String>,
    bootstrap_failures: usize,
    create_failures: usize,
}

impl MockRuntimeBuilder {
    /// Share a store, e.g. with a mock gateway running in the same process
    pub fn store(mut self, store: Arc<CiphertextStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Check signer, contract binding and allow-list on in-process decrypts
    pub fn enforce_acl(mut self, enforce: bool) -> Self {
        self.enforce_acl = enforce;
        self
    }

    /// Latency added to bootstrap and instance creation
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn network_key(mut self, key: impl Into<String>) -> Self {
        self.network_key = Some(key.into());
        self
    }

    /// Fail the next `times` bootstrap calls
    pub fn fail_bootstrap(mut self, times: usize) -> Self {
        self.bootstrap_failures = times;
        self
    }

    /// Fail the next `times` instance creations
    pub fn fail_create(mut self, times: usize) -> Self {
        self.create_failures = times;
        self
    }

    pub fn build(self) -> Arc<MockRuntime> {
        Arc::new(MockRuntime {
            store: self.store.unwrap_or_default(),
            enforce_acl: self.enforce_acl,
            delay: self.delay,
            network_key: self.network_key.unwrap_or_else(|| DEFAULT_NETWORK_KEY.to_string()),
            bootstrap_failures: AtomicUsize::new(self.bootstrap_failures),
            create_failures: AtomicUsize::new(self.create_failures),
            bootstrap_calls: AtomicUsize::new(0),
            instances_created: AtomicUsize::new(0),
        })
    }
}

enum Backend {
    InProcess { enforce_acl: bool },
    Gateway(GatewayClient),
}

pub struct MockInstance {
    chain_id: u64,
    network_key: Option<String>,
    store: Arc<CiphertextStore>,
    backend: Backend,
    reencryption_keys: Mutex<HashMap<Address, Bytes>>,
}

impl MockInstance {
    /// Reencryption key for `contract`, generated on first use
    fn reencryption_key(&self, contract: Address) -> Bytes {
        let mut keys = self
            .reencryption_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        keys.entry(contract)
            .or_insert_with(|| Bytes::from(rand::random::<[u8; 32]>().to_vec()))
            .clone()
    }
}

#[async_trait]
impl FhevmInstance for MockInstance {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn network_public_key(&self) -> Option<String> {
        self.network_key.clone()
    }

    fn create_encrypted_input(&self, contract: Address, user: Address) -> Box<dyn EncryptedInput> {
        Box::new(MockInput {
            store: self.store.clone(),
            contract,
            user,
            values: Vec::new(),
        })
    }

    fn reencryption_request(&self, contract: Address, _user: Address) -> ReencryptRequest {
        ReencryptRequest::new(self.chain_id, contract, self.reencryption_key(contract))
    }

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<U256> {
        match &self.backend {
            Backend::InProcess { enforce_acl } => {
                Ok(self.store.user_decrypt(&request, self.chain_id, *enforce_acl)?)
            }
            Backend::Gateway(gateway) => gateway.reencrypt(&request).await,
        }
    }

    async fn public_decrypt(&self, contract: Address, handle: U256) -> Result<U256> {
        match &self.backend {
            Backend::InProcess { .. } => Ok(self.store.public_decrypt(contract, handle)?),
            Backend::Gateway(gateway) => gateway.public_decrypt(contract, handle).await,
        }
    }
}

/// Input that "encrypts" by storing values under fresh random handles
pub struct MockInput {
    store: Arc<CiphertextStore>,
    contract: Address,
    user: Address,
    values: Vec<(EncryptedType, ClearValue)>,
}

#[async_trait]
impl EncryptedInput for MockInput {
    fn push(&mut self, ty: EncryptedType, value: ClearValue) {
        self.values.push((ty, value));
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    async fn encrypt(self: Box<Self>) -> Result<EncryptedValue> {
        let mut handles = Vec::with_capacity(self.values.len());
        // proof layout: u32 big-endian count, handles, 32-byte salt
        let count = u32::try_from(self.values.len())
            .map_err(|_| ClientError::Validation("too many values in one input".into()))?;
        let mut proof = count.to_be_bytes().to_vec();
        for (ty, value) in &self.values {
            let handle = B256::random();
            self.store.insert(
                U256::from_be_bytes(handle.0),
                *ty,
                *value,
                self.contract,
                self.user,
            );
            proof.extend_from_slice(handle.as_slice());
            handles.push(handle);
        }
        proof.extend_from_slice(&rand::random::<[u8; 32]>());

        Ok(EncryptedValue {
            handles,
            input_proof: Bytes::from(proof),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> InstanceParams {
        InstanceParams {
            chain_id: 9000,
            network_url: "https://devnet.example".into(),
            gateway_url: None,
            public_key: None,
            acl_address: None,
        }
    }

    #[tokio::test]
    async fn test_failures_are_consumed() {
        let runtime = MockRuntime::builder().fail_bootstrap(1).build();
        assert!(runtime.bootstrap().await.is_err());
        assert!(runtime.bootstrap().await.is_ok());
        assert_eq!(runtime.bootstrap_calls(), 2);
    }

    #[tokio::test]
    async fn test_input_stores_values() {
        let runtime = MockRuntime::builder().build();
        let instance = runtime.create_instance(params()).await.unwrap();
        assert_eq!(instance.network_public_key().as_deref(), Some(DEFAULT_NETWORK_KEY));

        let contract = Address::repeat_byte(0x11);
        let user = Address::repeat_byte(0x22);
        let mut input = instance.create_encrypted_input(contract, user);
        input.push(EncryptedType::Uint32, ClearValue::Uint(100));
        input.push(EncryptedType::Bool, ClearValue::Bool(true));
        let encrypted = input.encrypt().await.unwrap();

        assert_eq!(encrypted.handles.len(), 2);
        assert_eq!(&encrypted.input_proof[..4], &2u32.to_be_bytes());
        assert_eq!(encrypted.input_proof.len(), 4 + 2 * 32 + 32);
        assert_eq!(runtime.store().len(), 2);
        let first = runtime.store().get(encrypted.handle(0).unwrap()).unwrap();
        assert_eq!(first.value, ClearValue::Uint(100));
        assert_eq!(first.contract_address, contract);
        assert!(first.allowed.contains(&user));
    }

    #[tokio::test]
    async fn test_large_input_count_is_not_truncated() {
        let runtime = MockRuntime::builder().build();
        let instance = runtime.create_instance(params()).await.unwrap();
        let mut input = instance.create_encrypted_input(Address::ZERO, Address::ZERO);
        for i in 0..300u64 {
            input.push(EncryptedType::Uint64, ClearValue::Uint(i));
        }
        let encrypted = input.encrypt().await.unwrap();
        assert_eq!(encrypted.handles.len(), 300);
        assert_eq!(&encrypted.input_proof[..4], &300u32.to_be_bytes());
    }

    #[tokio::test]
    async fn test_encryption_is_randomized() {
        let runtime = MockRuntime::builder().build();
        let instance = runtime.create_instance(params()).await.unwrap();
        let instance = &instance;
        let encrypt = || async move {
            let mut input = instance.create_encrypted_input(Address::ZERO, Address::ZERO);
            input.push(EncryptedType::Uint8, ClearValue::Uint(1));
            input.encrypt().await.unwrap()
        };
        let a = encrypt().await;
        let b = encrypt().await;
        assert_ne!(a.handles, b.handles);
        assert_ne!(a.input_proof, b.input_proof);
    }

    #[tokio::test]
    async fn test_reencryption_key_is_per_contract() {
        let runtime = MockRuntime::builder().build();
        let instance = runtime.create_instance(params()).await.unwrap();
        let a = instance.reencryption_request(Address::repeat_byte(1), Address::ZERO);
        let again = instance.reencryption_request(Address::repeat_byte(1), Address::ZERO);
        let b = instance.reencryption_request(Address::repeat_byte(2), Address::ZERO);
        assert_eq!(a.public_key(), again.public_key());
        assert_ne!(a.public_key(), b.public_key());
    }
}
