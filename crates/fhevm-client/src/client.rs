//! FHEVM client lifecycle
//!
//! A client negotiates one library instance against the wallet's network and
//! hands it to the dispatchers. States move `Uninitialized -> Initializing ->
//! Ready`; a failed negotiation falls back to `Uninitialized` and `reset`
//! returns there from anywhere.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use alloy_primitives::U256;
use futures::future::{BoxFuture, FutureExt, Shared};
use fhevm_core::{ClearValue, EncryptedType, EncryptedValue, FhevmConfig, AccessOptions};

use crate::decryption;
use crate::encryption::{self, InputBuilder};
use crate::error::{ClientError, Result};
use crate::metrics;
use crate::runtime::{
    FhevmInstance, FhevmRuntime, InstanceParams, SharedRuntime, TypedDataSigner, WalletProvider,
};

type InitFlight = Shared<BoxFuture<'static, Result<ReadyState>>>;

/// Everything cached once negotiation succeeds
#[derive(Clone)]
struct ReadyState {
    instance: Arc<dyn FhevmInstance>,
    public_key: Option<String>,
    chain_id: u64,
}

enum Lifecycle {
    Uninitialized,
    Initializing { attempt: u64, flight: InitFlight },
    Ready { attempt: u64, ready: ReadyState },
}

struct Inner {
    lifecycle: Lifecycle,
    attempts: u64,
}

/// Coarse lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    Initializing,
    Ready,
}

/// Snapshot of a client's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub phase: LifecyclePhase,
    pub initialized: bool,
    pub public_key: Option<String>,
    pub chain_id: Option<u64>,
}

/// Owner of the single library instance for one configuration
pub struct FhevmClient {
    config: FhevmConfig,
    runtime: Arc<SharedRuntime>,
    inner: Mutex<Inner>,
}

impl FhevmClient {
    pub fn new(config: FhevmConfig, runtime: Arc<SharedRuntime>) -> Self {
        Self {
            config,
            runtime,
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::Uninitialized,
                attempts: 0,
            }),
        }
    }

    pub fn builder(config: FhevmConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn config(&self) -> &FhevmConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<SharedRuntime> {
        &self.runtime
    }

    /// Negotiate an instance, or return the one already negotiated
    ///
    /// Overlapping calls share a single negotiation and all observe the same
    /// instance or the same error. If `reset` runs while a negotiation is in
    /// flight, its callers still receive the result but the client stays
    /// reset.
    pub async fn init(&self, provider: Arc<dyn WalletProvider>) -> Result<Arc<dyn FhevmInstance>> {
        let (attempt, flight) = {
            let mut inner = self.lock();
            match &inner.lifecycle {
                Lifecycle::Ready { ready, .. } => return Ok(ready.instance.clone()),
                Lifecycle::Initializing { attempt, flight } => {
                    tracing::debug!(attempt, "Joining in-flight initialization");
                    (*attempt, flight.clone())
                }
                Lifecycle::Uninitialized => {
                    inner.attempts += 1;
                    let attempt = inner.attempts;
                    tracing::info!(attempt, network_url = %self.config.network_url, "Initializing FHEVM client");
                    let flight = negotiate(self.runtime.clone(), self.config.clone(), provider)
                        .boxed()
                        .shared();
                    inner.lifecycle = Lifecycle::Initializing {
                        attempt,
                        flight: flight.clone(),
                    };
                    (attempt, flight)
                }
            }
        };

        let result = flight.await;

        {
            let mut inner = self.lock();
            let owns_flight = matches!(
                &inner.lifecycle,
                Lifecycle::Initializing { attempt: current, .. } if *current == attempt
            );
            if owns_flight {
                match &result {
                    Ok(ready) => {
                        tracing::info!(chain_id = ready.chain_id, "FHEVM client ready");
                        metrics::set_client_ready(true);
                        inner.lifecycle = Lifecycle::Ready {
                            attempt,
                            ready: ready.clone(),
                        };
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "FHEVM initialization failed");
                        inner.lifecycle = Lifecycle::Uninitialized;
                    }
                }
            } else if !matches!(
                &inner.lifecycle,
                Lifecycle::Ready { attempt: current, .. } if *current == attempt
            ) {
                tracing::debug!(attempt, "Discarding result of superseded initialization");
            }
        }

        result.map(|ready| ready.instance)
    }

    /// The negotiated instance, or `NotInitialized`
    pub fn instance(&self) -> Result<Arc<dyn FhevmInstance>> {
        match &self.lock().lifecycle {
            Lifecycle::Ready { ready, .. } => Ok(ready.instance.clone()),
            _ => Err(ClientError::NotInitialized),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.lock().lifecycle, Lifecycle::Ready { .. })
    }

    pub fn state(&self) -> ClientState {
        match &self.lock().lifecycle {
            Lifecycle::Uninitialized => ClientState {
                phase: LifecyclePhase::Uninitialized,
                initialized: false,
                public_key: None,
                chain_id: None,
            },
            Lifecycle::Initializing { .. } => ClientState {
                phase: LifecyclePhase::Initializing,
                initialized: false,
                public_key: None,
                chain_id: None,
            },
            Lifecycle::Ready { ready, .. } => ClientState {
                phase: LifecyclePhase::Ready,
                initialized: true,
                public_key: ready.public_key.clone(),
                chain_id: Some(ready.chain_id),
            },
        }
    }

    /// Drop the instance and return to `Uninitialized`
    pub fn reset(&self) {
        let mut inner = self.lock();
        if !matches!(inner.lifecycle, Lifecycle::Uninitialized) {
            tracing::info!("Resetting FHEVM client");
        }
        inner.lifecycle = Lifecycle::Uninitialized;
        metrics::set_client_ready(false);
    }

    pub async fn encrypt(
        &self,
        value: impl Into<ClearValue>,
        ty: EncryptedType,
        options: &AccessOptions,
    ) -> Result<EncryptedValue> {
        let instance = self.instance()?;
        encryption::encrypt(instance.as_ref(), value.into(), ty, options).await
    }

    pub fn create_encrypted_input(&self, options: &AccessOptions) -> Result<InputBuilder> {
        let instance = self.instance()?;
        Ok(encryption::create_encrypted_input(instance.as_ref(), options))
    }

    pub async fn build_encrypted_input<F>(&self, options: &AccessOptions, build: F) -> Result<EncryptedValue>
    where
        F: FnOnce(&mut InputBuilder) -> Result<()>,
    {
        let instance = self.instance()?;
        encryption::build_encrypted_input(instance.as_ref(), options, build).await
    }

    pub async fn decrypt(
        &self,
        handle: U256,
        ty: EncryptedType,
        signer: &dyn TypedDataSigner,
        options: &AccessOptions,
    ) -> Result<ClearValue> {
        let instance = self.instance()?;
        decryption::decrypt(instance.as_ref(), handle, ty, signer, options).await
    }

    pub async fn public_decrypt(
        &self,
        handle: U256,
        ty: EncryptedType,
        contract: alloy_primitives::Address,
    ) -> Result<ClearValue> {
        let instance = self.instance()?;
        decryption::public_decrypt(instance.as_ref(), handle, ty, contract).await
    }

    pub async fn batch_decrypt(
        &self,
        handles: &[U256],
        ty: EncryptedType,
        signer: &dyn TypedDataSigner,
        options: &AccessOptions,
    ) -> Result<Vec<ClearValue>> {
        let instance = self.instance()?;
        decryption::batch_decrypt(instance.as_ref(), handles, ty, signer, options).await
    }

    pub async fn batch_decrypt_typed(
        &self,
        handles: &[(U256, EncryptedType)],
        signer: &dyn TypedDataSigner,
        options: &AccessOptions,
    ) -> Result<Vec<ClearValue>> {
        let instance = self.instance()?;
        decryption::batch_decrypt_typed(instance.as_ref(), handles, signer, options).await
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn negotiate(
    runtime: Arc<SharedRuntime>,
    config: FhevmConfig,
    provider: Arc<dyn WalletProvider>,
) -> Result<ReadyState> {
    let start = Instant::now();
    let result = negotiate_inner(&runtime, &config, provider.as_ref()).await;
    metrics::record_operation(metrics::OP_INIT, metrics::outcome(&result), start.elapsed());
    result
}

async fn negotiate_inner(
    runtime: &SharedRuntime,
    config: &FhevmConfig,
    provider: &dyn WalletProvider,
) -> Result<ReadyState> {
    runtime.ensure_bootstrapped().await?;

    let network = provider.network().await?;
    if let Some(expected) = &config.network {
        if expected.chain_id != network.chain_id {
            return Err(ClientError::ChainMismatch {
                expected: expected.chain_id,
                actual: network.chain_id,
            });
        }
    }
    tracing::debug!(chain_id = network.chain_id, name = %network.name, "Provider network identified");

    let instance = runtime
        .create_instance(InstanceParams {
            chain_id: network.chain_id,
            network_url: config.network_url.clone(),
            gateway_url: config.gateway_url.clone(),
            public_key: config.public_key.clone(),
            acl_address: config.acl_address,
        })
        .await?;

    let public_key = config
        .public_key
        .clone()
        .or_else(|| instance.network_public_key());

    Ok(ReadyState {
        instance,
        public_key,
        chain_id: network.chain_id,
    })
}

/// Builder for [`FhevmClient`]
pub struct ClientBuilder {
    config: FhevmConfig,
    runtime: Option<Arc<SharedRuntime>>,
}

impl ClientBuilder {
    pub fn new(config: FhevmConfig) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// Share an existing runtime, and its bootstrap, with other clients
    pub fn shared_runtime(mut self, runtime: Arc<SharedRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Wrap a library implementation in a fresh shared runtime
    pub fn runtime(mut self, runtime: Arc<dyn FhevmRuntime>) -> Self {
        self.runtime = Some(SharedRuntime::new(runtime));
        self
    }

    pub fn build(self) -> Result<FhevmClient> {
        self.config.validate()?;
        let runtime = self
            .runtime
            .ok_or_else(|| ClientError::Config("an FHE runtime is required".into()))?;
        Ok(FhevmClient::new(self.config, runtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::ReencryptRequest;
    use crate::runtime::{EncryptedInput, UserDecryptRequest};
    use alloy_primitives::{Address, Bytes, Signature};
    use async_trait::async_trait;
    use fhevm_core::NetworkConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubInstance {
        chain_id: u64,
    }

    #[async_trait]
    impl FhevmInstance for StubInstance {
        fn chain_id(&self) -> u64 {
            self.chain_id
        }

        fn network_public_key(&self) -> Option<String> {
            Some("network-key".into())
        }

        fn create_encrypted_input(&self, _contract: Address, _user: Address) -> Box<dyn EncryptedInput> {
            unimplemented!("not used by lifecycle tests")
        }

        fn reencryption_request(&self, contract: Address, _user: Address) -> ReencryptRequest {
            ReencryptRequest::new(self.chain_id, contract, Bytes::new())
        }

        async fn user_decrypt(&self, _request: UserDecryptRequest) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn public_decrypt(&self, _contract: Address, _handle: U256) -> Result<U256> {
            Ok(U256::ZERO)
        }
    }

    #[derive(Default)]
    struct StubRuntime {
        bootstraps: AtomicUsize,
        instances: AtomicUsize,
        fail_create: bool,
    }

    #[async_trait]
    impl FhevmRuntime for StubRuntime {
        async fn bootstrap(&self) -> Result<()> {
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn create_instance(&self, params: InstanceParams) -> Result<Arc<dyn FhevmInstance>> {
            self.instances.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_create {
                return Err(ClientError::Network("library exploded".into()));
            }
            Ok(Arc::new(StubInstance {
                chain_id: params.chain_id,
            }))
        }
    }

    struct StubWallet {
        chain_id: u64,
    }

    #[async_trait]
    impl WalletProvider for StubWallet {
        async fn network(&self) -> Result<NetworkConfig> {
            Ok(NetworkConfig::new(self.chain_id, "stub"))
        }

        async fn signer(&self) -> Result<Arc<dyn TypedDataSigner>> {
            Err(ClientError::SignatureRejected("no signer".into()))
        }
    }

    struct NoSigner;

    #[async_trait]
    impl TypedDataSigner for NoSigner {
        fn address(&self) -> Address {
            Address::ZERO
        }

        async fn sign_typed_data(&self, _request: &ReencryptRequest) -> Result<Signature> {
            Err(ClientError::SignatureRejected("user rejected".into()))
        }
    }

    fn client(runtime: Arc<StubRuntime>, config: FhevmConfig) -> FhevmClient {
        ClientBuilder::new(config).runtime(runtime).build().unwrap()
    }

    fn wallet(chain_id: u64) -> Arc<dyn WalletProvider> {
        Arc::new(StubWallet { chain_id })
    }

    #[tokio::test]
    async fn test_init_then_ready() {
        let runtime = Arc::new(StubRuntime::default());
        let client = client(runtime.clone(), FhevmConfig::new("https://devnet.example"));

        assert!(!client.is_ready());
        assert_eq!(client.instance().err(), Some(ClientError::NotInitialized));

        client.init(wallet(9000)).await.unwrap();
        let state = client.state();
        assert_eq!(state.phase, LifecyclePhase::Ready);
        assert!(state.initialized);
        assert_eq!(state.chain_id, Some(9000));
        assert_eq!(state.public_key.as_deref(), Some("network-key"));

        // Ready: no renegotiation
        client.init(wallet(9000)).await.unwrap();
        assert_eq!(runtime.instances.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configured_public_key_wins() {
        let runtime = Arc::new(StubRuntime::default());
        let config = FhevmConfig::new("https://devnet.example").with_public_key("configured");
        let client = client(runtime, config);
        client.init(wallet(9000)).await.unwrap();
        assert_eq!(client.state().public_key.as_deref(), Some("configured"));
    }

    #[tokio::test]
    async fn test_concurrent_init_single_flight() {
        let runtime = Arc::new(StubRuntime::default());
        let client = client(runtime.clone(), FhevmConfig::new("https://devnet.example"));

        let (a, b) = tokio::join!(client.init(wallet(9000)), client.init(wallet(9000)));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(runtime.bootstraps.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.instances.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_init_returns_to_uninitialized() {
        let runtime = Arc::new(StubRuntime {
            fail_create: true,
            ..Default::default()
        });
        let client = client(runtime.clone(), FhevmConfig::new("https://devnet.example"));

        let (a, b) = tokio::join!(client.init(wallet(9000)), client.init(wallet(9000)));
        let expected = ClientError::Network("library exploded".into());
        assert_eq!(a.err(), Some(expected.clone()));
        assert_eq!(b.err(), Some(expected));
        assert_eq!(runtime.instances.load(Ordering::SeqCst), 1);
        assert_eq!(client.state().phase, LifecyclePhase::Uninitialized);
    }

    #[tokio::test]
    async fn test_chain_mismatch() {
        let runtime = Arc::new(StubRuntime::default());
        let config = FhevmConfig::new("https://devnet.example").with_network(8009, "devnet");
        let client = client(runtime.clone(), config);

        let err = client.init(wallet(1)).await.err();
        assert_eq!(
            err,
            Some(ClientError::ChainMismatch {
                expected: 8009,
                actual: 1
            })
        );
        assert_eq!(runtime.instances.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_result() {
        let runtime = Arc::new(StubRuntime::default());
        let client = Arc::new(client(runtime, FhevmConfig::new("https://devnet.example")));

        let pending = {
            let client = client.clone();
            tokio::spawn(async move { client.init(wallet(9000)).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(client.state().phase, LifecyclePhase::Initializing);
        client.reset();

        assert!(pending.await.unwrap().is_ok());
        assert!(!client.is_ready());
        assert_eq!(client.instance().err(), Some(ClientError::NotInitialized));
    }

    #[tokio::test]
    async fn test_operations_require_ready() {
        let runtime = Arc::new(StubRuntime::default());
        let client = client(runtime, FhevmConfig::new("https://devnet.example"));
        let options = AccessOptions::new(Address::repeat_byte(1), Address::repeat_byte(2));

        let err = client
            .encrypt(5u32, EncryptedType::Uint32, &options)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::NotInitialized);

        let err = client
            .decrypt(U256::from(1u64), EncryptedType::Uint32, &NoSigner, &options)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::NotInitialized);
    }

    #[test]
    fn test_builder_validates() {
        let runtime: Arc<dyn FhevmRuntime> = Arc::new(StubRuntime::default());
        assert!(ClientBuilder::new(FhevmConfig::new("ftp://nope"))
            .runtime(runtime)
            .build()
            .is_err());
        assert!(matches!(
            ClientBuilder::new(FhevmConfig::new("https://ok")).build(),
            Err(ClientError::Config(_))
        ));
    }
}
