//! Encryption dispatch
//!
//! Every call builds a fresh single-use input scoped to a contract/user
//! pair, appends values in order and finalizes them under one proof.

use std::time::Instant;

use alloy_primitives::Address;
use fhevm_core::{ClearValue, EncryptedType, EncryptedValue, EncryptionOptions};

use crate::error::{ClientError, Result};
use crate::metrics;
use crate::runtime::{EncryptedInput, FhevmInstance};

/// Ordered encrypted input under construction
pub struct InputBuilder {
    input: Box<dyn EncryptedInput>,
    types: Vec<EncryptedType>,
}

impl InputBuilder {
    pub fn new(input: Box<dyn EncryptedInput>) -> Self {
        Self {
            input,
            types: Vec::new(),
        }
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.push(EncryptedType::Bool, value.into())
    }

    pub fn add8(&mut self, value: u8) -> &mut Self {
        self.push(EncryptedType::Uint8, value.into())
    }

    pub fn add16(&mut self, value: u16) -> &mut Self {
        self.push(EncryptedType::Uint16, value.into())
    }

    pub fn add32(&mut self, value: u32) -> &mut Self {
        self.push(EncryptedType::Uint32, value.into())
    }

    pub fn add64(&mut self, value: u64) -> &mut Self {
        self.push(EncryptedType::Uint64, value.into())
    }

    pub fn add_address(&mut self, value: Address) -> &mut Self {
        self.push(EncryptedType::Address, value.into())
    }

    /// Append a value under a runtime-chosen type, rejecting values that do
    /// not fit it
    pub fn add(&mut self, ty: EncryptedType, value: impl Into<ClearValue>) -> Result<&mut Self> {
        let value = value.into();
        value.check_fits(ty)?;
        Ok(self.push(ty, value))
    }

    /// Types appended so far, in order
    pub fn types(&self) -> &[EncryptedType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Finalize into one handle per appended value and a joint proof
    pub async fn encrypt(self) -> Result<EncryptedValue> {
        if self.is_empty() {
            return Err(ClientError::Validation(
                "encrypted input has no values".into(),
            ));
        }
        let expected = self.types.len();
        let encrypted = self.input.encrypt().await?;
        if encrypted.handles.len() != expected {
            return Err(ClientError::InvalidResponse(format!(
                "expected {} handles, library returned {}",
                expected,
                encrypted.handles.len()
            )));
        }
        Ok(encrypted)
    }

    fn push(&mut self, ty: EncryptedType, value: ClearValue) -> &mut Self {
        self.input.push(ty, value);
        self.types.push(ty);
        self
    }
}

impl std::fmt::Debug for InputBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputBuilder")
            .field("types", &self.types)
            .finish()
    }
}

/// Start an input scoped to `options`
pub fn create_encrypted_input(instance: &dyn FhevmInstance, options: &EncryptionOptions) -> InputBuilder {
    InputBuilder::new(instance.create_encrypted_input(options.contract_address, options.user_address))
}

/// Encrypt a single value
pub async fn encrypt(
    instance: &dyn FhevmInstance,
    value: ClearValue,
    ty: EncryptedType,
    options: &EncryptionOptions,
) -> Result<EncryptedValue> {
    let start = Instant::now();
    let result: Result<EncryptedValue> = async {
        let mut input = create_encrypted_input(instance, options);
        input.add(ty, value)?;
        input.encrypt().await
    }
    .await;

    metrics::record_operation(metrics::OP_ENCRYPT, metrics::outcome(&result), start.elapsed());
    match &result {
        Ok(_) => tracing::debug!(ty = %ty, contract = %options.contract_address, "Encrypted value"),
        Err(e) => tracing::warn!(ty = %ty, error = %e, "Encryption failed"),
    }
    result
}

pub async fn encrypt_bool(instance: &dyn FhevmInstance, value: bool, options: &EncryptionOptions) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Bool, options).await
}

pub async fn encrypt_u8(instance: &dyn FhevmInstance, value: u8, options: &EncryptionOptions) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Uint8, options).await
}

pub async fn encrypt_u16(instance: &dyn FhevmInstance, value: u16, options: &EncryptionOptions) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Uint16, options).await
}

pub async fn encrypt_u32(instance: &dyn FhevmInstance, value: u32, options: &EncryptionOptions) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Uint32, options).await
}

pub async fn encrypt_u64(instance: &dyn FhevmInstance, value: u64, options: &EncryptionOptions) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Uint64, options).await
}

pub async fn encrypt_address(
    instance: &dyn FhevmInstance,
    value: Address,
    options: &EncryptionOptions,
) -> Result<EncryptedValue> {
    encrypt(instance, value.into(), EncryptedType::Address, options).await
}

/// Encrypt several values under one proof
///
/// `build` appends values in order; an error from it aborts before anything
/// is encrypted.
pub async fn build_encrypted_input<F>(
    instance: &dyn FhevmInstance,
    options: &EncryptionOptions,
    build: F,
) -> Result<EncryptedValue>
where
    F: FnOnce(&mut InputBuilder) -> Result<()>,
{
    let start = Instant::now();
    let mut input = create_encrypted_input(instance, options);
    let result = match build(&mut input) {
        Ok(()) => input.encrypt().await,
        Err(e) => Err(e),
    };
    metrics::record_operation(metrics::OP_ENCRYPT, metrics::outcome(&result), start.elapsed());
    if let Ok(encrypted) = &result {
        tracing::debug!(values = encrypted.handles.len(), "Encrypted input");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::ReencryptRequest;
    use crate::runtime::UserDecryptRequest;
    use alloy_primitives::{Bytes, B256, U256};
    use async_trait::async_trait;

    struct CountingInput {
        values: Vec<(EncryptedType, ClearValue)>,
    }

    #[async_trait]
    impl EncryptedInput for CountingInput {
        fn push(&mut self, ty: EncryptedType, value: ClearValue) {
            self.values.push((ty, value));
        }

        fn len(&self) -> usize {
            self.values.len()
        }

        async fn encrypt(self: Box<Self>) -> Result<EncryptedValue> {
            Ok(EncryptedValue {
                handles: (0..self.values.len()).map(|i| B256::with_last_byte(i as u8 + 1)).collect(),
                input_proof: Bytes::from(vec![0xaa; 8]),
            })
        }
    }

    struct StubInstance;

    #[async_trait]
    impl FhevmInstance for StubInstance {
        fn chain_id(&self) -> u64 {
            9000
        }

        fn network_public_key(&self) -> Option<String> {
            None
        }

        fn create_encrypted_input(&self, _contract: Address, _user: Address) -> Box<dyn EncryptedInput> {
            Box::new(CountingInput { values: Vec::new() })
        }

        fn reencryption_request(&self, contract: Address, _user: Address) -> ReencryptRequest {
            ReencryptRequest::new(9000, contract, Bytes::new())
        }

        async fn user_decrypt(&self, _request: UserDecryptRequest) -> Result<U256> {
            Ok(U256::ZERO)
        }

        async fn public_decrypt(&self, _contract: Address, _handle: U256) -> Result<U256> {
            Ok(U256::ZERO)
        }
    }

    fn options() -> EncryptionOptions {
        EncryptionOptions::new(Address::repeat_byte(0x11), Address::repeat_byte(0x22))
    }

    #[tokio::test]
    async fn test_encrypt_single() {
        let encrypted = encrypt_u32(&StubInstance, 100, &options()).await.unwrap();
        assert_eq!(encrypted.handles.len(), 1);
        assert!(!encrypted.input_proof.is_empty());
    }

    #[tokio::test]
    async fn test_encrypt_rejects_out_of_range() {
        let err = encrypt(&StubInstance, ClearValue::Uint(300), EncryptedType::Uint8, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = encrypt(&StubInstance, ClearValue::Bool(true), EncryptedType::Uint8, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_build_multi_value_input() {
        let encrypted = build_encrypted_input(&StubInstance, &options(), |input| {
            input.add_bool(true).add8(7).add64(u64::MAX);
            input.add(EncryptedType::Address, Address::repeat_byte(0x33))?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(encrypted.handles.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let err = build_encrypted_input(&StubInstance, &options(), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_builder_error_aborts() {
        let err = build_encrypted_input(&StubInstance, &options(), |input| {
            input.add8(1);
            input.add(EncryptedType::Uint16, 70_000u32)?;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_builder_tracks_types() {
        let mut input = create_encrypted_input(&StubInstance, &options());
        input.add_bool(false).add32(9);
        assert_eq!(input.types(), &[EncryptedType::Bool, EncryptedType::Uint32]);
        assert_eq!(input.len(), 2);
    }
}
