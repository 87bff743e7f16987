//! End-to-end tests against the mock gateway over HTTP
//!
//! The client talks to a real axum server: chain detection goes through the
//! JSON-RPC endpoint, keys and decryptions through the gateway routes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use fhevm_kit::client::gateway::{HealthResponse, KeysResponse};
use fhevm_kit::client::{
    ClientError, FhevmClient, GatewayClient, LocalSigner, ReencryptRequest, RpcWallet,
    TypedDataSigner, UserDecryptRequest, WalletProvider,
};
use fhevm_kit::core::{AccessOptions, ClearValue, EncryptedType, FhevmConfig};
use fhevm_mock::{CiphertextStore, GatewayBuilder, MockRuntime, DEFAULT_NETWORK_KEY};
use reqwest::Client;
use tokio::net::TcpListener;

const CHAIN_ID: u64 = 9000;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn contract() -> Address {
    Address::repeat_byte(0x11)
}

/// Mock gateway on a local port plus a client wired to it
struct TestHarness {
    url: String,
    store: Arc<CiphertextStore>,
    runtime: Arc<MockRuntime>,
    http: Client,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestHarness {
    async fn new() -> Self {
        let store = Arc::new(CiphertextStore::new());
        let port = next_port();
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let url = format!("http://127.0.0.1:{}", port);

        let gateway = GatewayBuilder::new(CHAIN_ID)
            .addr(addr)
            .store(store.clone())
            .build();
        let listener = TcpListener::bind(addr).await.expect("Bind should succeed");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            gateway
                .serve(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        let http = Client::new();
        for _ in 0..10 {
            if http.get(format!("{}/health", url)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let runtime = MockRuntime::builder().store(store.clone()).build();
        Self {
            url,
            store,
            runtime,
            http,
            _shutdown: shutdown_tx,
        }
    }

    fn client(&self) -> FhevmClient {
        let config = FhevmConfig::new(format!("{}/rpc", self.url)).with_gateway(self.url.clone());
        FhevmClient::builder(config)
            .runtime(self.runtime.clone())
            .build()
            .expect("valid config")
    }

    async fn wallet(&self, signer: &LocalSigner) -> Arc<dyn WalletProvider> {
        let wallet = RpcWallet::connect(&format!("{}/rpc", self.url), signer.clone())
            .await
            .expect("rpc wallet");
        Arc::new(wallet)
    }

    async fn ready_client(&self, signer: &LocalSigner) -> FhevmClient {
        let client = self.client();
        client.init(self.wallet(signer).await).await.expect("init");
        client
    }
}

#[tokio::test]
async fn test_health_and_keys() {
    let harness = TestHarness::new().await;

    let health: HealthResponse = harness
        .http
        .get(format!("{}/health", harness.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.chain_id, Some(CHAIN_ID));

    let gateway = GatewayClient::new(harness.url.clone()).unwrap();
    let keys: KeysResponse = gateway.keys().await.unwrap();
    assert_eq!(keys.chain_id, CHAIN_ID);
    assert_eq!(keys.public_key, DEFAULT_NETWORK_KEY);
}

#[tokio::test]
async fn test_rpc_wallet_reports_chain() {
    let harness = TestHarness::new().await;
    let wallet = RpcWallet::connect(&format!("{}/rpc", harness.url), LocalSigner::random())
        .await
        .unwrap();
    assert_eq!(wallet.chain_id().await.unwrap(), CHAIN_ID);
}

#[tokio::test]
async fn test_encrypt_decrypt_over_http() {
    let harness = TestHarness::new().await;
    let signer = LocalSigner::random();
    let client = harness.ready_client(&signer).await;

    let state = client.state();
    assert_eq!(state.chain_id, Some(CHAIN_ID));
    assert_eq!(state.public_key.as_deref(), Some(DEFAULT_NETWORK_KEY));

    let options = AccessOptions::new(contract(), signer.address());
    let encrypted = client
        .encrypt(1234u32, EncryptedType::Uint32, &options)
        .await
        .unwrap();
    let handle = encrypted.first_handle().unwrap();
    assert!(harness.store.get(handle).is_some());

    let value = client
        .decrypt(handle, EncryptedType::Uint32, &signer, &options)
        .await
        .unwrap();
    assert_eq!(value, ClearValue::Uint(1234));
}

#[tokio::test]
async fn test_gateway_error_is_passed_through() {
    let harness = TestHarness::new().await;
    let owner = LocalSigner::random();
    let stranger = LocalSigner::random();

    let owner_client = harness.ready_client(&owner).await;
    let owner_options = AccessOptions::new(contract(), owner.address());
    let encrypted = owner_client
        .encrypt(true, EncryptedType::Bool, &owner_options)
        .await
        .unwrap();
    let handle = encrypted.first_handle().unwrap();

    let stranger_client = harness.ready_client(&stranger).await;
    let stranger_options = AccessOptions::new(contract(), stranger.address());
    let err = stranger_client
        .decrypt(handle, EncryptedType::Bool, &stranger, &stranger_options)
        .await
        .unwrap_err();

    // same request sent by hand: the client must surface the body unchanged
    let public_key = Bytes::from(vec![7u8; 32]);
    let typed = ReencryptRequest::new(CHAIN_ID, contract(), public_key.clone());
    let signature = stranger.sign_typed_data(&typed).await.unwrap();
    let request = UserDecryptRequest {
        handle,
        contract_address: contract(),
        user_address: stranger.address(),
        public_key,
        signature: Bytes::from(signature.as_bytes().to_vec()),
    };
    let response = harness
        .http
        .post(format!("{}/reencrypt", harness.url))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body = response.text().await.unwrap();

    assert_eq!(
        err,
        ClientError::Gateway {
            status: 403,
            message: body.clone(),
        }
    );
    assert_eq!(err.to_string(), body);

    harness.store.allow(handle, stranger.address()).unwrap();
    let value = stranger_client
        .decrypt(handle, EncryptedType::Bool, &stranger, &stranger_options)
        .await
        .unwrap();
    assert_eq!(value, ClearValue::Bool(true));
}

#[tokio::test]
async fn test_unknown_handle_over_http() {
    let harness = TestHarness::new().await;
    let signer = LocalSigner::random();
    let client = harness.ready_client(&signer).await;

    let options = AccessOptions::new(contract(), signer.address());
    let err = client
        .decrypt(U256::from(0xdeadu64), EncryptedType::Uint8, &signer, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Gateway { status: 404, ref message } if message.contains("Handle not found")));
}

#[tokio::test]
async fn test_public_decrypt_over_http() {
    let harness = TestHarness::new().await;
    let signer = LocalSigner::random();
    let client = harness.ready_client(&signer).await;

    let options = AccessOptions::new(contract(), signer.address());
    let encrypted = client
        .encrypt(77u64, EncryptedType::Uint64, &options)
        .await
        .unwrap();
    let handle = encrypted.first_handle().unwrap();

    let err = client
        .public_decrypt(handle, EncryptedType::Uint64, contract())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Gateway { status: 403, .. }));

    harness.store.make_publicly_decryptable(handle).unwrap();
    let value = client
        .public_decrypt(handle, EncryptedType::Uint64, contract())
        .await
        .unwrap();
    assert_eq!(value, ClearValue::Uint(77));
}

#[tokio::test]
async fn test_gateway_on_wrong_chain_is_rejected() {
    let harness = TestHarness::new().await;
    let client = harness.client();
    let signer = LocalSigner::random();

    // provider claims another chain than the gateway serves
    let provider: Arc<dyn WalletProvider> =
        Arc::new(fhevm_kit::client::LocalWallet::new(CHAIN_ID + 1, signer));
    let err = client.init(provider).await.err();
    assert_eq!(
        err,
        Some(ClientError::ChainMismatch {
            expected: CHAIN_ID + 1,
            actual: CHAIN_ID,
        })
    );
    assert!(!client.is_ready());
}
