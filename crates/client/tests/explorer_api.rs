// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! End-to-end tests against a local fake explorer served by axum.

use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, response::IntoResponse};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tzstats::micheline::{Parameters, Prim};
use tzstats::types::{Address, AddressType, OpHash};
use tzstats::{Client, ClientError, OpParams, Order, TableQuery};
use tzstats_config::ApiConfig;

#[derive(Default)]
struct Explorer {
    script_requests: AtomicUsize,
    last_query: std::sync::Mutex<Option<String>>,
}

fn contract() -> Address {
    Address::new(AddressType::Contract, [9u8; 20])
}

fn mint_params(amount: i64) -> String {
    hex::encode(
        Parameters {
            entrypoint: "mint".to_string(),
            value: Prim::int(amount),
        }
        .to_binary()
        .unwrap(),
    )
}

async fn op_table(State(state): State<Arc<Explorer>>, RawQuery(query): RawQuery) -> Json<Value> {
    *state.last_query.lock().unwrap() = query;
    let receiver = contract().to_string();
    Json(json!([
        [1, "transaction", 1, receiver, mint_params(10)],
        [2, "transaction", 1, receiver, mint_params(20)],
        [3, "delegation", 0, null, ""],
    ]))
}

async fn block_table() -> Json<Value> {
    Json(json!([[100, 5000], [101, 5001]]))
}

async fn contract_script(State(state): State<Arc<Explorer>>, Path(address): Path<String>) -> impl IntoResponse {
    state.script_requests.fetch_add(1, Ordering::SeqCst);
    if address != contract().to_string() {
        return (StatusCode::NOT_FOUND, Json(json!({"errors": ["not found"]})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "script": {
                "code": [
                    {"prim": "parameter", "args": [{"prim": "or", "args": [
                        {"prim": "nat", "annots": ["%mint"]},
                        {"prim": "unit", "annots": ["%pause"]}
                    ]}]},
                    {"prim": "storage", "args": [{"prim": "nat"}]},
                    {"prim": "code", "args": [[]]}
                ]
            }
        })),
    )
}

async fn operation(Path(hash): Path<String>, headers: HeaderMap) -> impl IntoResponse {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("secret") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"errors": ["no key"]})));
    }
    (
        StatusCode::OK,
        Json(json!([{
            "id": 77,
            "hash": hash,
            "type": "transaction",
            "height": 12,
            "status": "applied",
            "is_success": true,
        }])),
    )
}

async fn spawn_explorer() -> (String, Arc<Explorer>) {
    let state = Arc::new(Explorer::default());
    let app = Router::new()
        .route("/tables/op", get(op_table))
        .route("/tables/block", get(block_table))
        .route("/explorer/contract/:address/script", get(contract_script))
        .route("/explorer/op/:hash", get(operation))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn client(url: &str, api_key: Option<&str>) -> Client {
    Client::new(&ApiConfig {
        url: url.to_string(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_query_ops_resolves_and_caches_scripts() {
    let (url, state) = spawn_explorer().await;
    let client = client(&url, None);
    let query = TableQuery::new("op")
        .with_columns(&["id", "type", "is_contract", "receiver", "parameters"])
        .with_limit(3)
        .with_order(Order::Desc);

    let list = client.query_ops(query, &CancellationToken::new()).await.unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list.cursor(), Some(3));

    let first = list.rows[0].parameters.as_ref().unwrap();
    assert_eq!(first.entrypoint, "mint");
    assert_eq!(first.value.value, Some(json!("10")));
    assert_eq!(list.rows[1].parameters.as_ref().unwrap().value.value, Some(json!("20")));
    assert!(list.rows[2].parameters.is_none());

    // one fetch for two calls to the same contract
    assert_eq!(state.script_requests.load(Ordering::SeqCst), 1);
    assert_eq!(client.cache().len(), 1);

    let sent = state.last_query.lock().unwrap().clone().unwrap();
    assert!(sent.contains("limit=3"));
    assert!(sent.contains("order=desc"));
}

#[tokio::test]
async fn test_query_blocks() {
    let (url, _state) = spawn_explorer().await;
    let client = client(&url, None);
    let query = TableQuery::new("block").with_columns(&["row_id", "height"]);
    let list = client.query_blocks(query, &CancellationToken::new()).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.rows[1].height, 5001);
    assert_eq!(list.cursor(), Some(101));
}

#[tokio::test]
async fn test_unknown_contract_is_not_found() {
    let (url, _state) = spawn_explorer().await;
    let client = client(&url, None);
    let other = Address::new(AddressType::Contract, [3u8; 20]);
    let err = client
        .get_contract_script(&other, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_get_op_sends_api_key() {
    let (url, _state) = spawn_explorer().await;
    let hash = OpHash::new([5u8; 32]);

    let ops = client(&url, Some("secret"))
        .get_op(&hash, &OpParams::new().with_prim(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].row_id, 77);
    assert_eq!(ops[0].hash, hash);

    let err = client(&url, None)
        .get_op(&hash, &OpParams::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}
