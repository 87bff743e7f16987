//! Encrypted type tags understood by the FHE library

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Encrypted type tag
///
/// Selects which typed slot an input value is appended to and how a
/// decrypted 256-bit word is cast back into a clear value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptedType {
    #[serde(rename = "ebool")]
    Bool,
    #[serde(rename = "euint8")]
    Uint8,
    #[serde(rename = "euint16")]
    Uint16,
    #[serde(rename = "euint32")]
    Uint32,
    #[serde(rename = "euint64")]
    Uint64,
    #[serde(rename = "eaddress")]
    Address,
}

impl EncryptedType {
    /// All supported tags, narrowest integer first
    pub const ALL: [EncryptedType; 6] = [
        EncryptedType::Bool,
        EncryptedType::Uint8,
        EncryptedType::Uint16,
        EncryptedType::Uint32,
        EncryptedType::Uint64,
        EncryptedType::Address,
    ];

    /// Bit width of the encrypted value
    pub fn bits(&self) -> u32 {
        match self {
            EncryptedType::Bool => 1,
            EncryptedType::Uint8 => 8,
            EncryptedType::Uint16 => 16,
            EncryptedType::Uint32 => 32,
            EncryptedType::Uint64 => 64,
            EncryptedType::Address => 160,
        }
    }

    /// Largest clear value for unsigned integer tags
    pub fn max_uint(&self) -> Option<u64> {
        match self {
            EncryptedType::Uint8 => Some(u8::MAX as u64),
            EncryptedType::Uint16 => Some(u16::MAX as u64),
            EncryptedType::Uint32 => Some(u32::MAX as u64),
            EncryptedType::Uint64 => Some(u64::MAX),
            EncryptedType::Bool | EncryptedType::Address => None,
        }
    }

    /// Returns true for the four unsigned integer tags
    pub fn is_uint(&self) -> bool {
        self.max_uint().is_some()
    }

    /// Solidity-side name of the tag (`euint32`, `ebool`, ...)
    pub fn solidity_name(&self) -> &'static str {
        match self {
            EncryptedType::Bool => "ebool",
            EncryptedType::Uint8 => "euint8",
            EncryptedType::Uint16 => "euint16",
            EncryptedType::Uint32 => "euint32",
            EncryptedType::Uint64 => "euint64",
            EncryptedType::Address => "eaddress",
        }
    }
}

impl fmt::Display for EncryptedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptedType::Bool => write!(f, "bool"),
            EncryptedType::Uint8 => write!(f, "uint8"),
            EncryptedType::Uint16 => write!(f, "uint16"),
            EncryptedType::Uint32 => write!(f, "uint32"),
            EncryptedType::Uint64 => write!(f, "uint64"),
            EncryptedType::Address => write!(f, "address"),
        }
    }
}

impl FromStr for EncryptedType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "ebool" => Ok(EncryptedType::Bool),
            "uint8" | "u8" | "euint8" => Ok(EncryptedType::Uint8),
            "uint16" | "u16" | "euint16" => Ok(EncryptedType::Uint16),
            "uint32" | "u32" | "euint32" => Ok(EncryptedType::Uint32),
            "uint64" | "u64" | "euint64" => Ok(EncryptedType::Uint64),
            "address" | "eaddress" => Ok(EncryptedType::Address),
            _ => Err(Error::UnsupportedType(s.to_string())),
        }
    }
}
