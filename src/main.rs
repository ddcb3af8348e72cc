use std::sync::Arc;

use anyhow::{Context, Result};
use bitcoincore_rpc::RpcApi;
use tokio::runtime::Builder as TokioBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vtc_blockindexer::bitcoind_flexible::FlexibleBitcoindClient;
use vtc_blockindexer::config::{
    AppConfig, get_bitcoind_rpc_client, get_config, get_index_db, init_config,
};
use vtc_blockindexer::protocols::{Classifier, ParsedBlock};
use vtc_blockindexer::runtime::mdb::Mdb;
use vtc_blockindexer::runtime::store::KvStore;
use vtc_blockindexer::server::{ApiState, run};

/// One-shot scan: fetch the block at `height` and print its protocol
/// transactions as JSON.
fn classify_at(
    height: u64,
    cfg: &AppConfig,
    node: &FlexibleBitcoindClient,
    db: &Mdb,
) -> Result<()> {
    let hash = node.get_block_hash(height).context("getblockhash failed")?;
    let block = node.get_block(&hash).context("getblock failed")?;
    let parsed = ParsedBlock::from_bitcoin(&block, height);

    let solver = cfg.script_solver();
    let classifier = Classifier::new(&solver, node, &cfg.esignature_sentinel);
    let view = db.read_view();
    let found = classifier.classify_block(&parsed, &*view);
    info!("[mode] block {height} ({hash}): {} protocol transactions", found.len());
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // the node client is a blocking reqwest client; build it before tokio starts
    init_config()?;
    let cfg = get_config()?;
    let node = get_bitcoind_rpc_client()?;
    let db = get_index_db()?;

    if cfg.view_only {
        info!("[mode] view-only enabled: index opened read-only");
    }
    match node.get_block_count() {
        Ok(height) => info!("[rpc] node reachable at {}, tip height {height}", cfg.bitcoind_rpc_url),
        Err(e) => warn!("[rpc] node not reachable yet at {}: {e}", cfg.bitcoind_rpc_url),
    }

    if let Some(height) = cfg.classify_block {
        return classify_at(height, cfg, &node, &db);
    }

    let state = ApiState::new(Arc::new(db), node);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(cfg.listen_addr(), state))
}
