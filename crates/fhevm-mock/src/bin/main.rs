//! Mock FHEVM gateway binary
//!
//! Run with:
//! ```bash
//! cargo run -p fhevm-mock --bin fhevm-mock-gateway -- --port 3000 --chain-id 9000
//! ```

use std::path::PathBuf;

use clap::Parser;
use fhevm_core::parse_address;
use fhevm_mock::metrics::{init_prometheus_recorder, record_ciphertexts_seeded};
use fhevm_mock::{GatewayBuilder, SeedEntry};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fhevm-mock-gateway")]
#[command(about = "Mock FHEVM decryption gateway for local development")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Chain ID reported by /keys and /rpc
    #[arg(long, default_value = "9000")]
    chain_id: u64,

    /// JSON file of ciphertexts to preload
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Network public key served by /keys
    #[arg(long)]
    public_key: Option<String>,

    /// ACL contract address served by /keys
    #[arg(long)]
    acl_address: Option<String>,

    /// Echo stored values to any valid signature instead of checking the ACL
    #[arg(long)]
    no_acl: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fhevm_mock=info".parse()?))
        .init();

    let args = Args::parse();

    let prometheus = init_prometheus_recorder()?;
    let mut builder = GatewayBuilder::new(args.chain_id)
        .port(args.port)
        .enforce_acl(!args.no_acl)
        .prometheus(prometheus);

    if let Some(key) = args.public_key {
        builder = builder.public_key(key);
    }
    if let Some(acl) = &args.acl_address {
        builder = builder.acl_address(parse_address(acl)?);
    }

    let gateway = builder.build();

    if let Some(path) = &args.seed {
        let content = std::fs::read_to_string(path)?;
        let seed: Vec<SeedEntry> = serde_json::from_str(&content)?;
        let count = gateway.store().load_seed(seed);
        record_ciphertexts_seeded(count);
        tracing::info!(count, path = %path.display(), "Loaded seed ciphertexts");
    }

    tracing::info!(
        port = args.port,
        chain_id = args.chain_id,
        enforce_acl = !args.no_acl,
        "Mock gateway ready"
    );
    gateway.run().await?;

    Ok(())
}
