// Node JSON-RPC client over plain HTTP.
// Speaks JSON-RPC 2.0 with optional Basic auth, so it works against vertcoind
// and against proxies that do not implement the 1.0 envelope.

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bitcoincore_rpc::jsonrpc::error::RpcError as JsonRpcError;
use bitcoincore_rpc::{Error as RpcError, RpcApi};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

use crate::errors::IndexerError;
use crate::protocols::MempoolMonitor;

/// Node-side "no such transaction" code.
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;

/// Raw transaction pass-through used by the `/getTransaction` route.
pub trait TransactionLookup: Send + Sync {
    /// `getrawtransaction <txid> true`
    fn get_raw_transaction_verbose(&self, txid: &str) -> crate::errors::Result<Value>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorDetail>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcErrorDetail {
    code: i32,
    message: String,
}

fn rpc_error(code: i32, message: String) -> RpcError {
    RpcError::JsonRpc(bitcoincore_rpc::jsonrpc::Error::Rpc(JsonRpcError {
        code,
        message,
        data: None,
    }))
}

pub struct FlexibleBitcoindClient {
    url: String,
    auth: Option<String>,
    client: reqwest::blocking::Client,
    request_id: AtomicU32,
}

impl FlexibleBitcoindClient {
    /// Must be called outside any tokio runtime: the blocking reqwest client
    /// owns its own runtime.
    pub fn new(url: &str, auth: Option<(String, String)>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        let auth_header =
            auth.map(|(user, pass)| format!("Basic {}", BASE64.encode(format!("{user}:{pass}"))));

        Ok(Self { url: url.to_string(), auth: auth_header, client, request_id: AtomicU32::new(1) })
    }

    fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        debug!("[rpc] -> {method} (id {id})");

        let request = JsonRpcRequest { jsonrpc: "2.0", id, method, params };

        let mut req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(ref auth) = self.auth {
            req = req.header("Authorization", auth);
        }

        let response =
            req.send().map_err(|e| rpc_error(-1, format!("HTTP request failed: {}", e)))?;

        // vertcoind answers node-level errors with HTTP 404/500 and a JSON body;
        // try the envelope before giving up on the status code.
        let status = response.status();
        let body = response.text().map_err(|e| rpc_error(-1, format!("HTTP read failed: {e}")))?;
        let rpc_response: JsonRpcResponse<T> = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(_) if !status.is_success() => {
                return Err(rpc_error(status.as_u16() as i32, format!("HTTP {}: {}", status, body)));
            }
            Err(e) => {
                return Err(rpc_error(-2, format!("Failed to parse JSON-RPC response: {}", e)));
            }
        };

        if let Some(error) = rpc_response.error {
            return Err(rpc_error(error.code, error.message));
        }

        rpc_response
            .result
            .ok_or_else(|| rpc_error(-3, "Missing result field in response".to_string()))
    }
}

impl RpcApi for FlexibleBitcoindClient {
    fn call<T: for<'a> serde::de::Deserialize<'a>>(
        &self,
        cmd: &str,
        args: &[serde_json::Value],
    ) -> Result<T, RpcError> {
        self.rpc_call(cmd, args.to_vec())
    }

    fn get_block_count(&self) -> Result<u64, RpcError> {
        self.rpc_call("getblockcount", vec![])
    }
}

impl From<RpcError> for IndexerError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::JsonRpc(bitcoincore_rpc::jsonrpc::Error::Rpc(r)) => {
                IndexerError::Rpc { code: r.code, message: r.message }
            }
            other => IndexerError::Rpc { code: -1, message: other.to_string() },
        }
    }
}

impl TransactionLookup for FlexibleBitcoindClient {
    fn get_raw_transaction_verbose(&self, txid: &str) -> crate::errors::Result<Value> {
        Ok(self.call("getrawtransaction", &[json!(txid), json!(true)])?)
    }
}

/// Owner of output `vout` in a verbose transaction: `scriptPubKey.address`, or
/// a single-entry `scriptPubKey.addresses` on older nodes.
pub fn output_address(tx: &Value, vout: u32) -> Option<String> {
    let spk = tx.get("vout")?.get(vout as usize)?.get("scriptPubKey")?;
    if let Some(addr) = spk.get("address").and_then(Value::as_str) {
        return Some(addr.to_string());
    }
    match spk.get("addresses")?.as_array()?.as_slice() {
        [one] => one.as_str().map(str::to_string),
        _ => None,
    }
}

/// Outputs the index has not reached yet are read back from the node, which
/// sees both its mempool and its transaction index.
impl MempoolMonitor for FlexibleBitcoindClient {
    fn get_txo_address(&self, tx_hash: &str, vout: u32) -> Option<String> {
        match self.get_raw_transaction_verbose(tx_hash) {
            Ok(tx) => output_address(&tx, vout),
            Err(e) => {
                debug!("[rpc] txo {tx_hash}:{vout} unavailable: {e}");
                None
            }
        }
    }
}
