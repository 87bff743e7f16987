//! Mock gateway server

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use alloy_primitives::Address;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::error::{MockError, Result};
use crate::routes::{create_router, GatewayState, SharedState};
use crate::runtime::DEFAULT_NETWORK_KEY;
use crate::store::CiphertextStore;

/// Mock decryption gateway
pub struct MockGateway {
    state: SharedState,
    addr: SocketAddr,
}

impl MockGateway {
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn store(&self) -> Arc<CiphertextStore> {
        self.state.store.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind and serve until the process exits
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = create_router(self.state);
        tracing::info!(addr = ?listener.local_addr().ok(), "Mock gateway listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MockError::Internal(e.to_string()))
    }
}

/// Builder for [`MockGateway`]
pub struct GatewayBuilder {
    chain_id: u64,
    addr: SocketAddr,
    store: Option<Arc<CiphertextStore>>,
    public_key: String,
    acl_address: Option<Address>,
    enforce_acl: bool,
    prometheus: Option<PrometheusHandle>,
}

impl GatewayBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            addr: ([127, 0, 0, 1], 3000).into(),
            store: None,
            public_key: DEFAULT_NETWORK_KEY.to_string(),
            acl_address: None,
            enforce_acl: true,
            prometheus: None,
        }
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.addr = ([0, 0, 0, 0], port).into();
        self
    }

    pub fn store(mut self, store: Arc<CiphertextStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = key.into();
        self
    }

    pub fn acl_address(mut self, acl_address: Address) -> Self {
        self.acl_address = Some(acl_address);
        self
    }

    /// Disable ACL checks and echo stored values to any valid signature
    pub fn enforce_acl(mut self, enforce: bool) -> Self {
        self.enforce_acl = enforce;
        self
    }

    pub fn prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn build(self) -> MockGateway {
        let state = GatewayState {
            store: self.store.unwrap_or_default(),
            chain_id: self.chain_id,
            public_key: self.public_key,
            acl_address: self.acl_address,
            enforce_acl: self.enforce_acl,
            prometheus: self.prometheus,
        };
        MockGateway {
            state: Arc::new(state),
            addr: self.addr,
        }
    }
}
