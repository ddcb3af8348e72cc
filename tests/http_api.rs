use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use vtc_blockindexer::server::{ApiState, router};
use vtc_blockindexer::test_utils::{IndexFixture, MemStore, StaticNode, hash};

fn app_with(store: Arc<MemStore>) -> axum::Router {
    let node = StaticNode::new().with_tx(&hash('a'), json!({"txid": hash('a'), "confirmations": 3}));
    router(ApiState::new(store, Arc::new(node)))
}

fn populated() -> Arc<MemStore> {
    let store = Arc::new(MemStore::new());
    IndexFixture::new(&*store)
        .add_txo("Vq", &hash('1'), 0, 10, 1_000)
        .add_txo("Vq", &hash('2'), 1, 20, 250)
        .spend(&hash('1'), 0, &hash('9'));
    store
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, ctype, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn balance_is_plain_text() {
    let (status, ctype, body) = get(app_with(populated()), "/addressBalance/Vq").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctype.unwrap().starts_with("text/plain"));
    assert_eq!(body, "250");

    let (status, _, body) = get(app_with(populated()), "/addressBalance/Vnobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "0");
}

#[tokio::test]
async fn txos_are_json() {
    let (status, ctype, body) = get(app_with(populated()), "/addressTxos/Vq").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/json"));
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        v,
        json!([
            {"txhash": hash('1'), "vout": 0, "block": 10, "value": 1000, "spender": hash('9')},
            {"txhash": hash('2'), "vout": 1, "block": 20, "value": 250, "spender": null}
        ])
    );
}

#[tokio::test]
async fn txos_since_filters_by_height() {
    let (status, _, body) = get(app_with(populated()), "/addressTxosSince/11/Vq").await;
    assert_eq!(status, StatusCode::OK);
    let v: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0]["block"], 20);

    let (_, _, body) = get(app_with(populated()), "/addressTxosSince/0/Vq").await;
    assert_eq!(serde_json::from_str::<Vec<Value>>(&body).unwrap().len(), 2);
}

#[tokio::test]
async fn non_numeric_since_is_bad_request() {
    for uri in ["/addressTxosSince/abc/Vq", "/addressTxosSince/-1/Vq", "/addressTxosSince/+1/Vq"] {
        let (status, _, _) = get(app_with(populated()), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn scan_failure_is_server_error() {
    let store = populated();
    store.fail_scans(true);
    let (status, _, body) = get(app_with(store.clone()), "/addressBalance/Vq").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("store scan failed"));

    let (status, _, _) = get(app_with(store), "/addressTxos/Vq").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn transaction_pass_through() {
    let (status, ctype, body) = get(app_with(populated()), &format!("/getTransaction/{}", hash('a'))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctype.as_deref(), Some("application/json"));
    // pretty-printed like the node's styled output
    assert!(body.contains('\n'));
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["confirmations"], 3);
}

#[tokio::test]
async fn unknown_transaction_is_not_found_with_node_message() {
    let (status, _, body) = get(app_with(populated()), &format!("/getTransaction/{}", hash('b'))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.starts_with("No such mempool or blockchain transaction"));
}

#[tokio::test]
async fn non_hex_transaction_id_is_bad_request() {
    let (status, _, _) = get(app_with(populated()), "/getTransaction/xyz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let upper = hash('a').to_uppercase();
    let (status, _, _) = get(app_with(populated()), &format!("/getTransaction/{upper}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
