//! SDK configuration

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Chain the SDK expects to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
}

impl NetworkConfig {
    pub fn new(chain_id: u64, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
        }
    }
}

/// Configuration for an FHEVM client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FhevmConfig {
    /// JSON-RPC endpoint of the FHEVM chain
    pub network_url: String,
    /// Gateway (decryption service) endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    /// Expected network; init fails if the provider reports another chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
    /// Explicit network public key, skipping key discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Access-control-list contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_address: Option<Address>,
}

impl FhevmConfig {
    pub fn new(network_url: impl Into<String>) -> Self {
        Self {
            network_url: network_url.into(),
            gateway_url: None,
            network: None,
            public_key: None,
            acl_address: None,
        }
    }

    pub fn with_gateway(mut self, gateway_url: impl Into<String>) -> Self {
        self.gateway_url = Some(gateway_url.into());
        self
    }

    pub fn with_network(mut self, chain_id: u64, name: impl Into<String>) -> Self {
        self.network = Some(NetworkConfig::new(chain_id, name));
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_acl_address(mut self, acl_address: Address) -> Self {
        self.acl_address = Some(acl_address);
        self
    }

    /// Check required fields and URL schemes
    pub fn validate(&self) -> crate::Result<()> {
        check_url("networkUrl", &self.network_url, &["http://", "https://", "ws://", "wss://"])?;
        if let Some(gateway) = &self.gateway_url {
            check_url("gatewayUrl", gateway, &["http://", "https://"])?;
        }
        if let Some(network) = &self.network {
            if network.chain_id == 0 {
                return Err(Error::InvalidConfig("network.chainId must be non-zero".into()));
            }
        }
        if self.public_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(Error::InvalidConfig("publicKey must not be empty".into()));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

fn check_url(field: &str, url: &str, schemes: &[&str]) -> crate::Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidConfig(format!("{} is required", field)));
    }
    if !schemes.iter().any(|s| url.starts_with(s)) {
        return Err(Error::InvalidConfig(format!(
            "{} must start with one of {}",
            field,
            schemes.join(", ")
        )));
    }
    Ok(())
}
