//! HTTP client for the decryption gateway

use std::time::{Duration, Instant};

use alloy_primitives::{Address, U256};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::metrics;
use crate::runtime::UserDecryptRequest;

/// Network keys and parameters published by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_address: Option<Address>,
    pub chain_id: u64,
}

/// Decrypted 256-bit word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDecryptRequest {
    pub handle: U256,
    pub contract_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Gateway client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.get("health").await?;
        Ok(resp.json().await?)
    }

    pub async fn keys(&self) -> Result<KeysResponse> {
        let resp = self.get("keys").await?;
        let keys: KeysResponse = resp.json().await?;
        tracing::debug!(chain_id = keys.chain_id, "Fetched network keys");
        Ok(keys)
    }

    /// Authorized decryption; the gateway checks the signature and ACL
    pub async fn reencrypt(&self, request: &UserDecryptRequest) -> Result<U256> {
        let resp = self.post("reencrypt", request).await?;
        let body: DecryptResponse = resp.json().await?;
        Ok(body.value)
    }

    pub async fn public_decrypt(&self, contract: Address, handle: U256) -> Result<U256> {
        let request = PublicDecryptRequest {
            handle,
            contract_address: contract,
        };
        let resp = self.post("public-decrypt", &request).await?;
        let body: DecryptResponse = resp.json().await?;
        Ok(body.value)
    }

    async fn get(&self, endpoint: &'static str) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let start = Instant::now();
        let resp = self.http.get(&url).send().await?;
        check(endpoint, resp, start).await
    }

    async fn post<T: Serialize + ?Sized>(&self, endpoint: &'static str, body: &T) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let start = Instant::now();
        let resp = self.http.post(&url).json(body).send().await?;
        check(endpoint, resp, start).await
    }
}

async fn check(endpoint: &str, resp: Response, start: Instant) -> Result<Response> {
    let status = resp.status();
    metrics::record_gateway_request(endpoint, status.as_u16(), start.elapsed());

    if !status.is_success() {
        let message = resp.text().await.map_err(|e| {
            ClientError::Network(format!(
                "gateway returned {} and the body could not be read: {}",
                status.as_u16(),
                e
            ))
        })?;
        tracing::warn!(endpoint, status = status.as_u16(), %message, "Gateway request failed");
        return Err(ClientError::Gateway {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}
