use super::*;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct LedgerState {
    requests: Arc<Mutex<Vec<GetTableRowsRequest>>>,
    status: StatusCode,
    body: Value,
}

async fn handle_get_table_rows(
    State(state): State<LedgerState>,
    Json(payload): Json<GetTableRowsRequest>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(payload);
    (state.status, Json(state.body.clone()))
}

async fn spawn_ledger_server(
    status: StatusCode,
    body: Value,
) -> (String, Arc<Mutex<Vec<GetTableRowsRequest>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = LedgerState {
        requests: Arc::clone(&requests),
        status,
        body,
    };
    let app = Router::new()
        .route(GET_TABLE_ROWS_PATH, post(handle_get_table_rows))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), requests)
}

fn name(raw: &str) -> AccountName {
    AccountName::parse(raw).expect("account name")
}

#[tokio::test]
async fn posts_bounded_query_and_decodes_rows() {
    let (api_url, requests) = spawn_ledger_server(
        StatusCode::OK,
        json!({
            "rows": [{"account": "alice", "invitedby": "bob", "lastupdated": 5, "score": 2, "claimed": false}],
            "more": false,
            "next_key": ""
        }),
    )
    .await;
    let reader = HttpChainReader::new(format!("{api_url}/"), Duration::from_secs(5)).expect("reader");
    assert_eq!(reader.api_url(), api_url);

    let rows = reader
        .get_table_rows(&TableQuery::new(&name("tono.cxc"), TableName::Adopters).with_key(&name("alice")))
        .await
        .expect("rows");

    assert_eq!(rows.rows.len(), 1);
    assert!(!rows.more);
    assert_eq!(rows.rows[0]["account"], "alice");

    let requests = requests.lock().await;
    assert_eq!(
        requests.as_slice(),
        &[GetTableRowsRequest {
            code: "tono.cxc".to_string(),
            scope: "tono.cxc".to_string(),
            table: "adopters".to_string(),
            lower_bound: Some("alice".to_string()),
            upper_bound: Some("alice".to_string()),
            limit: 1,
            json: true,
        }]
    );
}

#[tokio::test]
async fn unbounded_query_omits_key_range() {
    let (api_url, requests) =
        spawn_ledger_server(StatusCode::OK, json!({"rows": [], "more": false})).await;
    let reader = HttpChainReader::new(api_url, Duration::from_secs(5)).expect("reader");

    let rows = reader
        .get_table_rows(&TableQuery::new(&name("tono.cxc"), TableName::Stats).with_limit(10))
        .await
        .expect("rows");
    assert!(rows.rows.is_empty());

    let requests = requests.lock().await;
    assert_eq!(requests[0].lower_bound, None);
    assert_eq!(requests[0].upper_bound, None);
    assert_eq!(requests[0].limit, 10);
}

#[tokio::test]
async fn ledger_error_body_becomes_status_error() {
    let (api_url, _requests) = spawn_ledger_server(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 3060003,
                "name": "contract_table_query_exception",
                "what": "Contract Table Query Exception",
                "details": [{"message": "Table config is not specified in the ABI"}]
            }
        }),
    )
    .await;
    let reader = HttpChainReader::new(api_url, Duration::from_secs(5)).expect("reader");

    let err = reader
        .get_table_rows(&TableQuery::new(&name("tono.cxc"), TableName::Config))
        .await
        .expect_err("must fail");

    match err {
        TransportError::Status { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("Contract Table Query Exception"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_node_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let reader = HttpChainReader::new(format!("http://{addr}"), Duration::from_secs(2)).expect("reader");
    let err = reader
        .get_table_rows(&TableQuery::new(&name("tono.cxc"), TableName::Stats))
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Http(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn contract_client_refreshes_over_http() {
    let (api_url, requests) = spawn_ledger_server(
        StatusCode::OK,
        json!({"rows": [], "more": false, "next_key": ""}),
    )
    .await;
    let mut network = crate::NetworkConfig::testnet().expect("testnet");
    network.api_url = api_url;
    let client = crate::ContractClient::new(&network).expect("client");

    client.refresh_all_data(&name("alice")).await;

    assert_eq!(client.invite_data().get(), None);
    assert_eq!(client.global_stats().get(), None);
    assert_eq!(client.contract_config().get(), None);

    let mut tables: Vec<String> = requests
        .lock()
        .await
        .iter()
        .map(|request| {
            assert_eq!(request.code, "tonotest.cxc");
            request.table.clone()
        })
        .collect();
    tables.sort();
    assert_eq!(tables, vec!["adopters", "config", "stats"]);
}
