//! Ciphertext bookkeeping for the mock library and gateway
//!
//! Nothing here is encrypted. The store maps handles to clear values plus the
//! access rules a real ACL contract would enforce.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, U256};
use fhevm_client::{ReencryptRequest, UserDecryptRequest};
use fhevm_core::format::format_handle;
use fhevm_core::{ClearValue, EncryptedType};
use serde::{Deserialize, Serialize};

use crate::error::{MockError, Result};

/// One stored "ciphertext"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiphertextEntry {
    #[serde(rename = "type")]
    pub ty: EncryptedType,
    pub value: ClearValue,
    pub contract_address: Address,
    #[serde(default)]
    pub allowed: HashSet<Address>,
    #[serde(default)]
    pub public: bool,
}

/// Preloaded entry, as read from a seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEntry {
    pub handle: U256,
    #[serde(flatten)]
    pub entry: CiphertextEntry,
}

#[derive(Debug, Default)]
pub struct CiphertextStore {
    entries: Mutex<HashMap<U256, CiphertextEntry>>,
}

impl CiphertextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value bound to `contract`, decryptable by `owner`
    pub fn insert(&self, handle: U256, ty: EncryptedType, value: ClearValue, contract: Address, owner: Address) {
        let entry = CiphertextEntry {
            ty,
            value,
            contract_address: contract,
            allowed: HashSet::from([owner]),
            public: false,
        };
        self.lock().insert(handle, entry);
    }

    pub fn insert_entry(&self, handle: U256, entry: CiphertextEntry) {
        self.lock().insert(handle, entry);
    }

    pub fn load_seed(&self, seed: Vec<SeedEntry>) -> usize {
        let mut entries = self.lock();
        let count = seed.len();
        for SeedEntry { handle, entry } in seed {
            entries.insert(handle, entry);
        }
        count
    }

    pub fn get(&self, handle: U256) -> Option<CiphertextEntry> {
        self.lock().get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Grant `user` decryption rights on `handle`
    pub fn allow(&self, handle: U256, user: Address) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries.get_mut(&handle).ok_or_else(|| not_found(handle))?;
        entry.allowed.insert(user);
        Ok(())
    }

    pub fn make_publicly_decryptable(&self, handle: U256) -> Result<()> {
        let mut entries = self.lock();
        let entry = entries.get_mut(&handle).ok_or_else(|| not_found(handle))?;
        entry.public = true;
        Ok(())
    }

    /// Authorized decryption
    ///
    /// The signature must always recover. With `enforce_acl` it must also
    /// recover to the requesting user, the handle must belong to the
    /// contract and the user must be allowed; without it the stored value is
    /// echoed back.
    pub fn user_decrypt(&self, request: &UserDecryptRequest, chain_id: u64, enforce_acl: bool) -> Result<U256> {
        let typed = ReencryptRequest::new(chain_id, request.contract_address, request.public_key.clone());
        let signer = typed
            .recover(&request.signature)
            .map_err(|e| MockError::Unauthorized(e.to_string()))?;

        let entries = self.lock();
        let entry = entries
            .get(&request.handle)
            .ok_or_else(|| not_found(request.handle))?;

        if enforce_acl {
            if signer != request.user_address {
                return Err(MockError::Unauthorized(format!(
                    "signature was produced by {}, not {}",
                    signer, request.user_address
                )));
            }
            if entry.contract_address != request.contract_address {
                return Err(MockError::Unauthorized(format!(
                    "handle {} is not bound to contract {}",
                    format_handle(request.handle),
                    request.contract_address
                )));
            }
            if !entry.allowed.contains(&request.user_address) {
                return Err(MockError::Unauthorized(format!(
                    "user {} may not decrypt handle {}",
                    request.user_address,
                    format_handle(request.handle)
                )));
            }
        }

        Ok(entry.value.to_word())
    }

    pub fn public_decrypt(&self, contract: Address, handle: U256) -> Result<U256> {
        let entries = self.lock();
        let entry = entries.get(&handle).ok_or_else(|| not_found(handle))?;
        if !entry.public {
            return Err(MockError::NotPublic(format_handle(handle)));
        }
        if entry.contract_address != contract {
            return Err(MockError::Unauthorized(format!(
                "handle {} is not bound to contract {}",
                format_handle(handle),
                contract
            )));
        }
        Ok(entry.value.to_word())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<U256, CiphertextEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(handle: U256) -> MockError {
    MockError::NotFound(format_handle(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, Signature};
    use fhevm_client::{LocalSigner, TypedDataSigner};

    const CHAIN_ID: u64 = 9000;

    fn contract() -> Address {
        Address::repeat_byte(0x11)
    }

    async fn signed_request(signer: &LocalSigner, handle: U256, user: Address) -> UserDecryptRequest {
        let public_key = Bytes::from(vec![3u8; 32]);
        let typed = ReencryptRequest::new(CHAIN_ID, contract(), public_key.clone());
        let signature: Signature = signer.sign_typed_data(&typed).await.unwrap();
        UserDecryptRequest {
            handle,
            contract_address: contract(),
            user_address: user,
            public_key,
            signature: Bytes::from(signature.as_bytes().to_vec()),
        }
    }

    #[tokio::test]
    async fn test_acl_enforced() {
        let store = CiphertextStore::new();
        let owner = LocalSigner::random();
        let other = LocalSigner::random();
        let handle = U256::from(1u64);
        store.insert(handle, EncryptedType::Uint32, ClearValue::Uint(100), contract(), owner.address());

        let request = signed_request(&owner, handle, owner.address()).await;
        assert_eq!(store.user_decrypt(&request, CHAIN_ID, true).unwrap(), U256::from(100u64));

        let request = signed_request(&other, handle, other.address()).await;
        assert!(matches!(
            store.user_decrypt(&request, CHAIN_ID, true),
            Err(MockError::Unauthorized(_))
        ));

        store.allow(handle, other.address()).unwrap();
        assert!(store.user_decrypt(&request, CHAIN_ID, true).is_ok());
    }

    #[tokio::test]
    async fn test_signature_must_match_user() {
        let store = CiphertextStore::new();
        let owner = LocalSigner::random();
        let handle = U256::from(2u64);
        store.insert(handle, EncryptedType::Bool, ClearValue::Bool(true), contract(), owner.address());

        let impostor = LocalSigner::random();
        let request = signed_request(&impostor, handle, owner.address()).await;
        assert!(store.user_decrypt(&request, CHAIN_ID, true).is_err());
        // echo mode only needs a recoverable signature
        assert_eq!(store.user_decrypt(&request, CHAIN_ID, false).unwrap(), U256::from(1u64));
    }

    #[tokio::test]
    async fn test_wrong_chain_recovers_another_address() {
        let store = CiphertextStore::new();
        let owner = LocalSigner::random();
        let handle = U256::from(3u64);
        store.insert(handle, EncryptedType::Uint8, ClearValue::Uint(7), contract(), owner.address());

        let request = signed_request(&owner, handle, owner.address()).await;
        assert!(store.user_decrypt(&request, CHAIN_ID + 1, true).is_err());
    }

    #[test]
    fn test_public_decrypt() {
        let store = CiphertextStore::new();
        let handle = U256::from(4u64);
        store.insert(handle, EncryptedType::Uint64, ClearValue::Uint(42), contract(), Address::ZERO);

        assert!(matches!(
            store.public_decrypt(contract(), handle),
            Err(MockError::NotPublic(_))
        ));
        store.make_publicly_decryptable(handle).unwrap();
        assert_eq!(store.public_decrypt(contract(), handle).unwrap(), U256::from(42u64));
        assert!(store.public_decrypt(Address::repeat_byte(0x99), handle).is_err());
        assert!(matches!(
            store.make_publicly_decryptable(U256::from(99u64)),
            Err(MockError::NotFound(_))
        ));
    }

    #[test]
    fn test_seed_entries() {
        let json = r#"[{"handle":"0x10","type":"euint8","value":{"kind":"uint","value":5},"contractAddress":"0x1111111111111111111111111111111111111111","public":true}]"#;
        let seed: Vec<SeedEntry> = serde_json::from_str(json).unwrap();
        let store = CiphertextStore::new();
        assert_eq!(store.load_seed(seed), 1);
        assert_eq!(store.public_decrypt(contract(), U256::from(16u64)).unwrap(), U256::from(5u64));
    }
}
