//! Decryption dispatch
//!
//! User decryption signs an EIP-712 reencryption request, submits it with
//! the handle and casts the returned word to the requested type. Public
//! decryption skips the signature and only works for values the contract
//! marked publicly decryptable.

use std::time::Instant;

use alloy_primitives::{Address, Bytes, Signature, U256};
use fhevm_core::{ClearValue, DecryptionOptions, EncryptedType};

use crate::eip712::ReencryptRequest;
use crate::error::{ClientError, Result};
use crate::metrics;
use crate::runtime::{FhevmInstance, TypedDataSigner, UserDecryptRequest};

/// Signed reencryption request for one contract/user pair
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptionAuthorization {
    pub request: ReencryptRequest,
    pub signature: Signature,
}

impl DecryptionAuthorization {
    pub fn public_key(&self) -> &Bytes {
        self.request.public_key()
    }

    /// 65-byte `r || s || v` encoding
    pub fn signature_bytes(&self) -> Bytes {
        Bytes::from(self.signature.as_bytes().to_vec())
    }

    fn user_request(&self, handle: U256, options: &DecryptionOptions) -> UserDecryptRequest {
        UserDecryptRequest {
            handle,
            contract_address: options.contract_address,
            user_address: options.user_address,
            public_key: self.public_key().clone(),
            signature: self.signature_bytes(),
        }
    }
}

/// Produce the signature authorizing decryption for `options`
///
/// Signer errors pass through unchanged: a refusal is already
/// `SignatureRejected`, a dead wallet connection stays `Network`.
pub async fn generate_decryption_signature(
    instance: &dyn FhevmInstance,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<DecryptionAuthorization> {
    let request = instance.reencryption_request(options.contract_address, options.user_address);
    let signature = signer.sign_typed_data(&request).await?;
    Ok(DecryptionAuthorization { request, signature })
}

/// Decrypt one handle on behalf of `options.user_address`
pub async fn decrypt(
    instance: &dyn FhevmInstance,
    handle: U256,
    ty: EncryptedType,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<ClearValue> {
    let start = Instant::now();
    let result: Result<ClearValue> = async {
        let auth = generate_decryption_signature(instance, signer, options).await?;
        decrypt_authorized(instance, &auth, handle, ty, options).await
    }
    .await;
    metrics::record_operation(metrics::OP_DECRYPT, metrics::outcome(&result), start.elapsed());
    result
}

async fn decrypt_authorized(
    instance: &dyn FhevmInstance,
    auth: &DecryptionAuthorization,
    handle: U256,
    ty: EncryptedType,
    options: &DecryptionOptions,
) -> Result<ClearValue> {
    let word = instance.user_decrypt(auth.user_request(handle, options)).await;
    match word {
        Ok(word) => {
            tracing::debug!(ty = %ty, contract = %options.contract_address, "Decrypted handle");
            cast(ty, word)
        }
        Err(e) => {
            tracing::warn!(ty = %ty, error = %e, "Decryption failed");
            Err(e)
        }
    }
}

pub async fn decrypt_bool(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<bool> {
    let value = decrypt(instance, handle, EncryptedType::Bool, signer, options).await?;
    value
        .as_bool()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected bool, got {}", value)))
}

pub async fn decrypt_u8(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<u8> {
    let value = decrypt(instance, handle, EncryptedType::Uint8, signer, options).await?;
    narrow(value)
}

pub async fn decrypt_u16(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<u16> {
    let value = decrypt(instance, handle, EncryptedType::Uint16, signer, options).await?;
    narrow(value)
}

pub async fn decrypt_u32(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<u32> {
    let value = decrypt(instance, handle, EncryptedType::Uint32, signer, options).await?;
    narrow(value)
}

pub async fn decrypt_u64(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<u64> {
    let value = decrypt(instance, handle, EncryptedType::Uint64, signer, options).await?;
    narrow(value)
}

pub async fn decrypt_address(
    instance: &dyn FhevmInstance,
    handle: U256,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<Address> {
    let value = decrypt(instance, handle, EncryptedType::Address, signer, options).await?;
    value
        .as_address()
        .ok_or_else(|| ClientError::InvalidResponse(format!("expected address, got {}", value)))
}

/// Decrypt a publicly decryptable handle; no signature involved
pub async fn public_decrypt(
    instance: &dyn FhevmInstance,
    handle: U256,
    ty: EncryptedType,
    contract: Address,
) -> Result<ClearValue> {
    let start = Instant::now();
    let result: Result<ClearValue> = async {
        let word = instance.public_decrypt(contract, handle).await?;
        cast(ty, word)
    }
    .await;
    metrics::record_operation(metrics::OP_PUBLIC_DECRYPT, metrics::outcome(&result), start.elapsed());
    if let Err(e) = &result {
        tracing::warn!(ty = %ty, error = %e, "Public decryption failed");
    }
    result
}

/// Decrypt handles of one type, sequentially and in order
///
/// Each handle goes through the full authorized flow, so the signer is
/// prompted once per handle, in input order. The first failure aborts and
/// no partial results are returned.
pub async fn batch_decrypt(
    instance: &dyn FhevmInstance,
    handles: &[U256],
    ty: EncryptedType,
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<Vec<ClearValue>> {
    let typed: Vec<(U256, EncryptedType)> = handles.iter().map(|h| (*h, ty)).collect();
    batch_decrypt_typed(instance, &typed, signer, options).await
}

/// Decrypt handles of mixed types, sequentially and in order
pub async fn batch_decrypt_typed(
    instance: &dyn FhevmInstance,
    handles: &[(U256, EncryptedType)],
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<Vec<ClearValue>> {
    let start = Instant::now();
    let result = decrypt_sequential(instance, handles, signer, options).await;
    metrics::record_operation(metrics::OP_BATCH_DECRYPT, metrics::outcome(&result), start.elapsed());
    result
}

async fn decrypt_sequential(
    instance: &dyn FhevmInstance,
    handles: &[(U256, EncryptedType)],
    signer: &dyn TypedDataSigner,
    options: &DecryptionOptions,
) -> Result<Vec<ClearValue>> {
    let mut values = Vec::with_capacity(handles.len());
    for (handle, ty) in handles {
        let auth = generate_decryption_signature(instance, signer, options).await?;
        values.push(decrypt_authorized(instance, &auth, *handle, *ty, options).await?);
    }
    Ok(values)
}

fn cast(ty: EncryptedType, word: U256) -> Result<ClearValue> {
    ClearValue::from_word(ty, word).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

fn narrow<T: TryFrom<u64>>(value: ClearValue) -> Result<T> {
    value
        .as_u64()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ClientError::InvalidResponse(format!("unexpected decrypted value {}", value)))
}
