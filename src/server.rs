//! HTTP boundary: address queries over the index and a raw-transaction
//! pass-through to the node.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::bitcoind_flexible::TransactionLookup;
use crate::errors::{IndexerError, Result};
use crate::index::query::{get_balance, get_txos};
use crate::runtime::store::KvStore;
use crate::utils::is_hex_id;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn KvStore>,
    pub node: Arc<dyn TransactionLookup>,
}

impl ApiState {
    pub fn new(store: Arc<dyn KvStore>, node: Arc<dyn TransactionLookup>) -> Self {
        Self { store, node }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/addressBalance/{address}", get(address_balance))
        .route("/addressTxos/{address}", get(address_txos))
        .route("/addressTxosSince/{since_block}/{address}", get(address_txos_since))
        .route("/getTransaction/{id}", get(get_transaction))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, state: ApiState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("[http] listening on {addr}");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

fn error_response(e: IndexerError) -> Response {
    let status = match &e {
        IndexerError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        IndexerError::NotFound(_) => StatusCode::NOT_FOUND,
        // the node's own message is the body, as vertcoind phrased it
        IndexerError::Rpc { message, .. } => {
            return (StatusCode::NOT_FOUND, message.clone()).into_response();
        }
        IndexerError::StoreScan(_) | IndexerError::Store(_) => {
            error!("[http] {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string()).into_response()
}

/// Runs store/RPC work off the async workers.
async fn blocking<T, F>(f: F) -> std::result::Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(error_response(e)),
        Err(join) => {
            error!("[http] worker failed: {join}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response())
        }
    }
}

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn address_balance(State(state): State<ApiState>, Path(address): Path<String>) -> Response {
    info!("[http] balance for {address}");
    let res = blocking(move || {
        let view = state.store.read_view();
        get_balance(&*view, &address)
    })
    .await;
    match res {
        Ok(balance) => balance.to_string().into_response(),
        Err(resp) => resp,
    }
}

async fn txos_response(state: ApiState, address: String, since: u64) -> Response {
    info!("[http] txos for {address} since block {since}");
    let res = blocking(move || {
        let view = state.store.read_view();
        let txos = get_txos(&*view, &address, since)?;
        serde_json::to_string(&txos).map_err(|e| IndexerError::MalformedInput(e.to_string()))
    })
    .await;
    match res {
        Ok(body) => json_response(body),
        Err(resp) => resp,
    }
}

async fn address_txos(State(state): State<ApiState>, Path(address): Path<String>) -> Response {
    txos_response(state, address, 0).await
}

async fn address_txos_since(
    State(state): State<ApiState>,
    Path((since_block, address)): Path<(String, String)>,
) -> Response {
    // digits only; "+5" or "-1" would parse but are not block heights
    if since_block.is_empty() || !since_block.bytes().all(|b| b.is_ascii_digit()) {
        return error_response(IndexerError::MalformedInput(format!(
            "sinceBlock is not a block height: {since_block}"
        )));
    }
    let Ok(since) = since_block.parse::<u64>() else {
        return error_response(IndexerError::MalformedInput(format!(
            "sinceBlock out of range: {since_block}"
        )));
    };
    txos_response(state, address, since).await
}

async fn get_transaction(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if !is_hex_id(&id) {
        return error_response(IndexerError::MalformedInput(format!("not a transaction id: {id}")));
    }
    info!("[http] looking up txid {id}");
    let res = blocking(move || {
        let tx = state.node.get_raw_transaction_verbose(&id)?;
        serde_json::to_string_pretty(&tx).map_err(|e| IndexerError::MalformedInput(e.to_string()))
    })
    .await;
    match res {
        Ok(body) => json_response(body),
        Err(resp) => {
            if resp.status() == StatusCode::NOT_FOUND {
                info!("[http] transaction not found");
            }
            resp
        }
    }
}
