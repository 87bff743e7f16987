//! Observable client state for UI and service bindings
//!
//! `FhevmContext` shares one client between consumers and publishes its
//! status on a `watch` channel. The operation adapters (`Encryptor`,
//! `Decryptor`, `InputComposer`) each publish their own loading/error
//! status, so a binding can render progress without polling.

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use fhevm_core::validation::{is_valid_address, validate_encryption_params};
use fhevm_core::{AccessOptions, ClearValue, EncryptedType, EncryptedValue};
use tokio::sync::watch;

use crate::client::FhevmClient;
use crate::encryption::InputBuilder;
use crate::error::{ClientError, Result};
use crate::runtime::{FhevmInstance, TypedDataSigner, WalletProvider};
use crate::{decryption, encryption};

/// Client status as seen by bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStatus {
    pub is_ready: bool,
    pub is_loading: bool,
    pub error: Option<ClientError>,
}

/// Status of one operation adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationStatus {
    pub is_loading: bool,
    pub error: Option<ClientError>,
}

/// Shared handle to a client plus its published status
#[derive(Clone)]
pub struct FhevmContext {
    client: Arc<FhevmClient>,
    status: Arc<watch::Sender<ContextStatus>>,
}

impl FhevmContext {
    pub fn new(client: Arc<FhevmClient>) -> Self {
        let initial = ContextStatus {
            is_ready: client.is_ready(),
            ..Default::default()
        };
        let (status, _) = watch::channel(initial);
        Self {
            client,
            status: Arc::new(status),
        }
    }

    pub fn client(&self) -> &Arc<FhevmClient> {
        &self.client
    }

    /// Current status; `is_ready` always reflects the client itself
    pub fn status(&self) -> ContextStatus {
        self.sync_ready();
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ContextStatus> {
        self.sync_ready();
        self.status.subscribe()
    }

    pub async fn init(&self, provider: Arc<dyn WalletProvider>) -> Result<Arc<dyn FhevmInstance>> {
        self.status.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
        self.finish_init(provider).await
    }

    /// Initialize unless already ready or loading
    ///
    /// Returns `None` when another caller owns initialization or the client
    /// is already up.
    pub async fn init_if_idle(
        &self,
        provider: Arc<dyn WalletProvider>,
    ) -> Option<Result<Arc<dyn FhevmInstance>>> {
        let is_ready = self.client.is_ready();
        let mut claimed = false;
        self.status.send_if_modified(|s| {
            let stale = s.is_ready != is_ready;
            s.is_ready = is_ready;
            if is_ready || s.is_loading {
                return stale;
            }
            s.is_loading = true;
            s.error = None;
            claimed = true;
            true
        });
        if !claimed {
            return None;
        }
        Some(self.finish_init(provider).await)
    }

    async fn finish_init(&self, provider: Arc<dyn WalletProvider>) -> Result<Arc<dyn FhevmInstance>> {
        let mut guard = LoadingGuard {
            status: &self.status,
            client: &self.client,
            armed: true,
        };
        let result = self.client.init(provider).await;
        guard.armed = false;
        let is_ready = self.client.is_ready();
        self.status.send_modify(|s| {
            s.is_loading = false;
            s.is_ready = is_ready;
            s.error = result.as_ref().err().cloned();
        });
        result
    }

    fn sync_ready(&self) {
        let is_ready = self.client.is_ready();
        self.status.send_if_modified(|s| {
            if s.is_ready == is_ready {
                return false;
            }
            s.is_ready = is_ready;
            true
        });
    }

    pub fn reset(&self) {
        self.client.reset();
        self.status.send_replace(ContextStatus::default());
    }

    pub fn encryptor(&self) -> Encryptor {
        Encryptor {
            client: self.client.clone(),
            tracker: Tracker::new(),
        }
    }

    pub fn decryptor(&self) -> Decryptor {
        Decryptor {
            client: self.client.clone(),
            tracker: Tracker::new(),
        }
    }

    pub fn input_composer(&self) -> InputComposer {
        InputComposer {
            client: self.client.clone(),
            tracker: Tracker::new(),
        }
    }
}

/// Clears `is_loading` if an init future is dropped before it finishes
struct LoadingGuard<'a> {
    status: &'a watch::Sender<ContextStatus>,
    client: &'a FhevmClient,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let is_ready = self.client.is_ready();
        tracing::debug!("Context initialization abandoned");
        self.status.send_modify(|s| {
            s.is_loading = false;
            s.is_ready = is_ready;
        });
    }
}

/// Loading/error bookkeeping shared by the adapters
#[derive(Clone)]
struct Tracker {
    status: Arc<watch::Sender<OperationStatus>>,
}

impl Tracker {
    fn new() -> Self {
        let (status, _) = watch::channel(OperationStatus::default());
        Self {
            status: Arc::new(status),
        }
    }

    fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    async fn run<T, Fut>(&self, op: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.status.send_replace(OperationStatus {
            is_loading: true,
            error: None,
        });
        let mut guard = OperationGuard {
            status: &self.status,
            armed: true,
        };
        let result = op.await;
        guard.armed = false;
        self.status.send_replace(OperationStatus {
            is_loading: false,
            error: result.as_ref().err().cloned(),
        });
        result
    }
}

/// Resets an adapter to idle if its operation is dropped mid-flight
struct OperationGuard<'a> {
    status: &'a watch::Sender<OperationStatus>,
    armed: bool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_replace(OperationStatus::default());
        }
    }
}

/// Encryption adapter
#[derive(Clone)]
pub struct Encryptor {
    client: Arc<FhevmClient>,
    tracker: Tracker,
}

impl Encryptor {
    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }

    pub async fn encrypt(
        &self,
        value: impl Into<ClearValue>,
        ty: EncryptedType,
        options: &AccessOptions,
    ) -> Result<EncryptedValue> {
        let instance = self.client.instance()?;
        let value = value.into();
        self.tracker
            .run(encryption::encrypt(instance.as_ref(), value, ty, options))
            .await
    }

    /// Encrypt form input: every field is a string and is validated first
    pub async fn encrypt_str(
        &self,
        value: &str,
        ty: &str,
        contract: &str,
        user: &str,
    ) -> Result<EncryptedValue> {
        let instance = self.client.instance()?;
        self.tracker
            .run(async {
                let parsed = ty.parse::<EncryptedType>();
                if let Err(reason) = validate_encryption_params(value, ty, contract, user).into_result() {
                    // the tag is checked right after both addresses
                    return Err(match parsed {
                        Err(e) if is_valid_address(contract) && is_valid_address(user) => e.into(),
                        _ => ClientError::Validation(reason),
                    });
                }
                let ty = parsed?;
                let options = AccessOptions::parse(contract, user)?;
                let value = ClearValue::parse(ty, value)?;
                encryption::encrypt(instance.as_ref(), value, ty, &options).await
            })
            .await
    }
}

/// Decryption adapter
#[derive(Clone)]
pub struct Decryptor {
    client: Arc<FhevmClient>,
    tracker: Tracker,
}

impl Decryptor {
    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }

    pub async fn decrypt(
        &self,
        handle: U256,
        ty: EncryptedType,
        signer: &dyn TypedDataSigner,
        options: &AccessOptions,
    ) -> Result<ClearValue> {
        let instance = self.client.instance()?;
        self.tracker
            .run(decryption::decrypt(instance.as_ref(), handle, ty, signer, options))
            .await
    }

    pub async fn public_decrypt(
        &self,
        handle: U256,
        ty: EncryptedType,
        contract: Address,
    ) -> Result<ClearValue> {
        let instance = self.client.instance()?;
        self.tracker
            .run(decryption::public_decrypt(instance.as_ref(), handle, ty, contract))
            .await
    }

    pub async fn batch_decrypt(
        &self,
        handles: &[U256],
        ty: EncryptedType,
        signer: &dyn TypedDataSigner,
        options: &AccessOptions,
    ) -> Result<Vec<ClearValue>> {
        let instance = self.client.instance()?;
        self.tracker
            .run(decryption::batch_decrypt(instance.as_ref(), handles, ty, signer, options))
            .await
    }
}

/// Multi-value input adapter
#[derive(Clone)]
pub struct InputComposer {
    client: Arc<FhevmClient>,
    tracker: Tracker,
}

impl InputComposer {
    pub fn status(&self) -> OperationStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.tracker.subscribe()
    }

    pub async fn build<F>(&self, options: &AccessOptions, build: F) -> Result<EncryptedValue>
    where
        F: FnOnce(&mut InputBuilder) -> Result<()>,
    {
        let instance = self.client.instance()?;
        self.tracker
            .run(encryption::build_encrypted_input(instance.as_ref(), options, build))
            .await
    }
}
