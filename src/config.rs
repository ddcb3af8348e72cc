use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::{fs, path::Path};
use tracing::{info, warn};

use crate::address::{default_esignature_sentinel, is_network_address};
use crate::bitcoind_flexible::FlexibleBitcoindClient as CoreClient;
use crate::consts::{DEFAULT_HTTP_PORT, Network};
use crate::protocols::StandardScriptSolver;
use crate::runtime::mdb::Mdb;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();
static BITCOIND_CLIENT: OnceLock<Arc<CoreClient>> = OnceLock::new();
static INDEX_DB: OnceLock<Mdb> = OnceLock::new();

fn default_db_path() -> String {
    "./db".to_string()
}

fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_network() -> String {
    "mainnet".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    pub bitcoind_rpc_url: String,
    #[serde(default)]
    pub bitcoind_rpc_user: String,
    #[serde(default)]
    pub bitcoind_rpc_pass: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub host: Option<SocketAddr>,
    #[serde(default = "default_network")]
    pub network: String,
    /// Read the whole index once at startup to fill the block cache.
    #[serde(default)]
    pub warm_cache: bool,
    /// Defaults to the well-known sentinel for `network`.
    #[serde(default)]
    pub esignature_sentinel: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub bitcoind_rpc_url: String,
    pub bitcoind_rpc_user: String,
    pub bitcoind_rpc_pass: String,
    pub view_only: bool,
    pub port: u16,
    pub host: Option<SocketAddr>,
    pub network: Network,
    pub warm_cache: bool,
    pub esignature_sentinel: String,
    /// Classify one block against the index and exit instead of serving.
    pub classify_block: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Path to JSON config file.
    #[arg(long, default_value = "./config.json")]
    pub config_path: String,

    /// Open the index read-only, next to a running ingestion writer.
    #[arg(long, default_value_t = false)]
    pub view_only: bool,

    /// Print the protocol transactions of the block at this height and exit.
    #[arg(long)]
    pub classify_block: Option<u64>,
}

fn load_config_file(path: &str) -> Result<ConfigFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {path}"))?;
    parse_config_file(&raw)
}

fn parse_config_file(raw: &str) -> Result<ConfigFile> {
    serde_json::from_str(raw).context("failed to parse config JSON")
}

impl AppConfig {
    pub fn from_file(file: ConfigFile, view_only: bool) -> Result<Self> {
        let network: Network = file.network.parse().map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(Self {
            db_path: file.db_path,
            bitcoind_rpc_url: file.bitcoind_rpc_url.trim().to_string(),
            bitcoind_rpc_user: file.bitcoind_rpc_user,
            bitcoind_rpc_pass: file.bitcoind_rpc_pass,
            view_only,
            port: file.port,
            host: file.host,
            network,
            warm_cache: file.warm_cache,
            esignature_sentinel: match file.esignature_sentinel {
                Some(s) => s.trim().to_string(),
                None => default_esignature_sentinel(network),
            },
            classify_block: None,
        })
    }

    /// Script solver rendering addresses for the configured network.
    pub fn script_solver(&self) -> StandardScriptSolver {
        StandardScriptSolver::new(self.network)
    }

    /// Address the HTTP service binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.host.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], self.port)))
    }

    fn rpc_auth(&self) -> Option<(String, String)> {
        if !self.bitcoind_rpc_user.is_empty() && !self.bitcoind_rpc_pass.is_empty() {
            Some((self.bitcoind_rpc_user.clone(), self.bitcoind_rpc_pass.clone()))
        } else {
            None
        }
    }
}

/// Checks that need no global state. Creates `db_path` when writable.
pub fn validate(cfg: &AppConfig) -> Result<()> {
    if cfg.bitcoind_rpc_url.is_empty() {
        anyhow::bail!("bitcoind_rpc_url must be provided");
    }
    if cfg.host.is_none() && cfg.port == 0 {
        anyhow::bail!("port must be greater than 0");
    }

    let sentinel = &cfg.esignature_sentinel;
    if !is_network_address(sentinel, cfg.network) {
        anyhow::bail!("esignature_sentinel is not a {} address: {sentinel}", cfg.network);
    }

    let db_root = Path::new(&cfg.db_path);
    if cfg.view_only {
        if !db_root.is_dir() {
            anyhow::bail!("db_path must be an existing directory in view-only mode: {}", cfg.db_path);
        }
    } else if !db_root.exists() {
        fs::create_dir_all(db_root)
            .with_context(|| format!("Failed to create db_path {}", cfg.db_path))?;
    } else if !db_root.is_dir() {
        anyhow::bail!("db_path is not a directory: {}", cfg.db_path);
    }
    Ok(())
}

/// Validate and publish the process-wide config, node client and index
/// handle. Call once, before starting the async runtime.
pub fn init_config_from(cfg: AppConfig) -> Result<()> {
    validate(&cfg)?;
    if cfg.rpc_auth().is_none() {
        warn!("[config] no bitcoind rpc credentials configured; sending unauthenticated requests");
    }

    CONFIG
        .set(cfg.clone())
        .map_err(|_| anyhow::anyhow!("config already initialized"))?;

    let core = CoreClient::new(&cfg.bitcoind_rpc_url, cfg.rpc_auth())?;
    BITCOIND_CLIENT
        .set(Arc::new(core))
        .map_err(|_| anyhow::anyhow!("bitcoind rpc client already initialized"))?;

    let mdb = if cfg.view_only {
        Mdb::open_read_only(&cfg.db_path, cfg.warm_cache)
    } else {
        Mdb::open(&cfg.db_path, cfg.warm_cache)
    }
    .with_context(|| format!("failed to open index db at {}", cfg.db_path))?;
    INDEX_DB
        .set(mdb)
        .map_err(|_| anyhow::anyhow!("index db already initialized"))?;

    info!(
        "[config] network={} sentinel={} db={} view_only={} listen={}",
        cfg.network,
        cfg.esignature_sentinel,
        cfg.db_path,
        cfg.view_only,
        cfg.listen_addr()
    );
    Ok(())
}

pub fn init_config() -> Result<()> {
    let cli = CliArgs::parse();
    let file = load_config_file(&cli.config_path)?;
    let mut cfg = AppConfig::from_file(file, cli.view_only)?;
    cfg.classify_block = cli.classify_block;
    init_config_from(cfg)
}

const UNINIT: &str = "init_config() must be called once at startup";

pub fn get_config() -> Result<&'static AppConfig> {
    CONFIG.get().context(UNINIT)
}

pub fn get_bitcoind_rpc_client() -> Result<Arc<CoreClient>> {
    BITCOIND_CLIENT.get().cloned().context(UNINIT)
}

/// Cloneable handle to the index RocksDB
pub fn get_index_db() -> Result<Mdb> {
    INDEX_DB.get().cloned().context(UNINIT)
}
