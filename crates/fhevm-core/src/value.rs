//! Clear values, encrypted inputs and access scopes

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{validation, EncryptedType, Error, Result};

/// A plaintext value before encryption or after decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ClearValue {
    Bool(bool),
    Uint(u64),
    Address(Address),
}

impl ClearValue {
    /// Check that this value can be appended under `ty`
    pub fn check_fits(&self, ty: EncryptedType) -> Result<()> {
        match (self, ty) {
            (ClearValue::Bool(_), EncryptedType::Bool) => Ok(()),
            (ClearValue::Address(_), EncryptedType::Address) => Ok(()),
            (ClearValue::Uint(v), _) if ty.is_uint() => {
                let max = ty.max_uint().unwrap_or(u64::MAX);
                if *v > max {
                    return Err(Error::OutOfRange {
                        ty: ty.to_string(),
                        value: v.to_string(),
                    });
                }
                Ok(())
            }
            _ => Err(Error::TypeMismatch {
                ty: ty.to_string(),
                actual: self.kind().to_string(),
            }),
        }
    }

    /// Parse a user-supplied string as a value of type `ty`
    pub fn parse(ty: EncryptedType, input: &str) -> Result<Self> {
        let input = input.trim();
        match ty {
            EncryptedType::Bool => match input.to_lowercase().as_str() {
                "true" | "1" => Ok(ClearValue::Bool(true)),
                "false" | "0" => Ok(ClearValue::Bool(false)),
                _ => Err(Error::TypeMismatch {
                    ty: ty.to_string(),
                    actual: input.to_string(),
                }),
            },
            EncryptedType::Address => {
                if !validation::is_valid_address(input) {
                    return Err(Error::InvalidAddress(input.to_string()));
                }
                input
                    .parse::<Address>()
                    .map(ClearValue::Address)
                    .map_err(|e| Error::InvalidAddress(format!("{}: {}", input, e)))
            }
            _ => {
                let value: i128 = input.parse().map_err(|_| Error::TypeMismatch {
                    ty: ty.to_string(),
                    actual: input.to_string(),
                })?;
                if !validation::is_within_uint_bounds(value, ty.bits()) {
                    return Err(Error::OutOfRange {
                        ty: ty.to_string(),
                        value: input.to_string(),
                    });
                }
                Ok(ClearValue::Uint(value as u64))
            }
        }
    }

    /// Cast a decrypted 256-bit word back into a clear value of type `ty`
    pub fn from_word(ty: EncryptedType, word: U256) -> Result<Self> {
        match ty {
            EncryptedType::Bool => {
                if word == U256::ZERO {
                    Ok(ClearValue::Bool(false))
                } else if word == U256::from(1u64) {
                    Ok(ClearValue::Bool(true))
                } else {
                    Err(Error::OutOfRange {
                        ty: ty.to_string(),
                        value: word.to_string(),
                    })
                }
            }
            EncryptedType::Address => {
                if word.bit_len() > 160 {
                    return Err(Error::OutOfRange {
                        ty: ty.to_string(),
                        value: word.to_string(),
                    });
                }
                Ok(ClearValue::Address(Address::from_word(B256::from(
                    word.to_be_bytes::<32>(),
                ))))
            }
            _ => {
                let max = ty.max_uint().unwrap_or(u64::MAX);
                if word > U256::from(max) {
                    return Err(Error::OutOfRange {
                        ty: ty.to_string(),
                        value: word.to_string(),
                    });
                }
                Ok(ClearValue::Uint(word.to::<u64>()))
            }
        }
    }

    /// Encode as the 256-bit word the library works with
    pub fn to_word(&self) -> U256 {
        match self {
            ClearValue::Bool(b) => U256::from(*b as u64),
            ClearValue::Uint(v) => U256::from(*v),
            ClearValue::Address(a) => U256::from_be_bytes(a.into_word().0),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClearValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ClearValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            ClearValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ClearValue::Bool(_) => "bool",
            ClearValue::Uint(_) => "uint",
            ClearValue::Address(_) => "address",
        }
    }
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearValue::Bool(b) => write!(f, "{}", b),
            ClearValue::Uint(v) => write!(f, "{}", v),
            ClearValue::Address(a) => write!(f, "{}", a),
        }
    }
}

impl From<bool> for ClearValue {
    fn from(v: bool) -> Self {
        ClearValue::Bool(v)
    }
}

impl From<u8> for ClearValue {
    fn from(v: u8) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u16> for ClearValue {
    fn from(v: u16) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u32> for ClearValue {
    fn from(v: u32) -> Self {
        ClearValue::Uint(v as u64)
    }
}

impl From<u64> for ClearValue {
    fn from(v: u64) -> Self {
        ClearValue::Uint(v)
    }
}

impl From<Address> for ClearValue {
    fn from(v: Address) -> Self {
        ClearValue::Address(v)
    }
}

/// Output of an encrypted input builder: one handle per appended value
/// plus a proof covering all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedValue {
    pub handles: Vec<B256>,
    pub input_proof: Bytes,
}

impl EncryptedValue {
    /// Handle at `index` as the 256-bit integer contracts and decryption use
    pub fn handle(&self, index: usize) -> Option<U256> {
        self.handles.get(index).map(|h| U256::from_be_bytes(h.0))
    }

    /// First handle, for single-value inputs
    pub fn first_handle(&self) -> Option<U256> {
        self.handle(0)
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Contract/user pair an encryption or decryption is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessOptions {
    pub contract_address: Address,
    pub user_address: Address,
}

pub type EncryptionOptions = AccessOptions;
pub type DecryptionOptions = AccessOptions;

impl AccessOptions {
    pub fn new(contract_address: Address, user_address: Address) -> Self {
        Self {
            contract_address,
            user_address,
        }
    }

    /// Parse both addresses from 0x-prefixed hex strings
    pub fn parse(contract_address: &str, user_address: &str) -> Result<Self> {
        Ok(Self {
            contract_address: parse_address(contract_address)?,
            user_address: parse_address(user_address)?,
        })
    }
}

/// Parse a 0x-prefixed, 40-hex-digit address
pub fn parse_address(s: &str) -> Result<Address> {
    if !validation::is_valid_address(s) {
        return Err(Error::InvalidAddress(s.to_string()));
    }
    s.parse::<Address>()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))
}
