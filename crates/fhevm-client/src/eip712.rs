//! EIP-712 reencryption authorization
//!
//! A user authorizes the gateway to reencrypt a ciphertext for them by
//! signing `Reencrypt(bytes publicKey)` under a domain bound to the chain
//! and the contract holding the ciphertext.

use alloy_primitives::{hex, Address, Bytes, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use fhevm_core::constants::{EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION};
use serde_json::json;

use crate::error::{ClientError, Result};

sol! {
    struct Reencrypt {
        bytes publicKey;
    }
}

/// Typed data a wallet signs to authorize decryption for one contract
#[derive(Debug, Clone, PartialEq)]
pub struct ReencryptRequest {
    domain: Eip712Domain,
    public_key: Bytes,
}

impl ReencryptRequest {
    pub fn new(chain_id: u64, verifying_contract: Address, public_key: Bytes) -> Self {
        let domain = Eip712Domain::new(
            Some(EIP712_DOMAIN_NAME.into()),
            Some(EIP712_DOMAIN_VERSION.into()),
            Some(U256::from(chain_id)),
            Some(verifying_contract),
            None,
        );
        Self { domain, public_key }
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Reencryption public key carried in the message
    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }

    pub fn verifying_contract(&self) -> Option<Address> {
        self.domain.verifying_contract
    }

    /// Hash a signer signs: `keccak256("\x19\x01" || domainSeparator || structHash)`
    pub fn signing_hash(&self) -> B256 {
        let message = Reencrypt {
            publicKey: self.public_key.clone(),
        };
        message.eip712_signing_hash(&self.domain)
    }

    /// Recover the address that produced a 65-byte signature over this request
    pub fn recover(&self, signature: &[u8]) -> Result<Address> {
        let signature = Signature::from_raw(signature)
            .map_err(|e| ClientError::SignatureRejected(format!("malformed signature: {}", e)))?;
        signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| ClientError::SignatureRejected(format!("unrecoverable signature: {}", e)))
    }

    /// `eth_signTypedData_v4` payload for wallets that sign JSON
    pub fn to_typed_data_json(&self) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" },
                ],
                "Reencrypt": [
                    { "name": "publicKey", "type": "bytes" },
                ],
            },
            "primaryType": "Reencrypt",
            "domain": {
                "name": EIP712_DOMAIN_NAME,
                "version": EIP712_DOMAIN_VERSION,
                "chainId": self.domain.chain_id.map(|c| c.to_string()),
                "verifyingContract": self.domain.verifying_contract.map(|a| a.to_string()),
            },
            "message": {
                "publicKey": hex::encode_prefixed(&self.public_key),
            },
        })
    }
}
