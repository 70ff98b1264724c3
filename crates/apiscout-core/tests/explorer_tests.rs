use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use apiscout_core::error::{FetchError, LookupError, ParseError};
use apiscout_core::{ApiExplorer, ScoutConfig, ScoutError, SpecCache};
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde_json::{Map, json};

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const USERS: &str = include_str!("fixtures/users.yaml");

async fn users(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    USERS
}

async fn petstore() -> &'static str {
    PETSTORE
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    USERS
}

async fn garbage() -> &'static str {
    "{ this is: [not a document"
}

/// Serve the fixtures on an ephemeral port and return the base URL.
async fn serve(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route("/users.yaml", get(users))
        .route("/petstore.yaml", get(petstore))
        .route("/slow.yaml", get(slow))
        .route("/garbage", get(garbage))
        .with_state(hits);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn explorer() -> ApiExplorer {
    ApiExplorer::new(&ScoutConfig::default()).unwrap()
}

#[tokio::test]
async fn discover_fetches_once_per_ttl() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(hits.clone()).await;
    let explorer = explorer();
    let url = format!("{base}/users.yaml");

    let summary = explorer.discover(&url).await.unwrap();
    assert_eq!(summary.title, "Users API");
    assert_eq!(summary.operations.len(), 1);

    explorer.discover(&url).await.unwrap();
    explorer.find_operation(&url, "get", "/users/{id}").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert!(explorer.invalidate(&url));
    explorer.discover(&url).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn explorers_can_share_a_cache() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(hits.clone()).await;
    let url = format!("{base}/users.yaml");
    let config = ScoutConfig::default();
    let cache = Arc::new(SpecCache::from_config(&config.cache));

    let first = ApiExplorer::with_cache(&config, cache.clone()).unwrap();
    let second = ApiExplorer::with_cache(&config, cache.clone()).unwrap();
    first.discover(&url).await.unwrap();
    second.discover(&url).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn every_route_is_found_through_the_facade() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();
    let url = format!("{base}/petstore.yaml");

    let summary = explorer.discover(&url).await.unwrap();
    for op in &summary.operations {
        let found = explorer.find_operation(&url, &op.method, &op.path).await.unwrap();
        assert_eq!(found.key(), op.key());
    }

    let err = explorer
        .find_operation(&url, "GET", "/pets/1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScoutError::Lookup(LookupError::RouteNotFound { .. })
    ));
}

#[tokio::test]
async fn validate_through_the_facade() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();
    let url = format!("{base}/users.yaml");

    let mut params = Map::new();
    let report = explorer
        .validate(&url, "getUser", &mut params, None, None)
        .await
        .unwrap();
    assert!(!report.valid);

    params.insert("id".to_string(), json!("u-1"));
    let report = explorer
        .validate(&url, "getUser", &mut params, None, None)
        .await
        .unwrap();
    assert!(report.valid);

    let err = explorer
        .validate(&url, "deleteUser", &mut params, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScoutError::Lookup(LookupError::OperationNotFound(_))
    ));

    let response = explorer
        .validate_response(&url, "getUser", "200", None)
        .await
        .unwrap();
    assert!(response.valid);
}

#[tokio::test]
async fn missing_document_is_a_status_error() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();

    let err = explorer
        .discover(&format!("{base}/nothing-here.json"))
        .await
        .unwrap_err();
    match err {
        ScoutError::Fetch(FetchError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_document_is_a_parse_error() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();

    let err = explorer
        .discover(&format!("{base}/garbage"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Parse(ParseError::Unparseable { .. })));
    assert!(explorer.cache().is_empty());
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();

    let err = explorer
        .load_with_timeout(&format!("{base}/slow.yaml"), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Fetch(FetchError::Timeout { .. })));
    assert!(!err.hint().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_validation() {
    let base = serve(Arc::default()).await;
    let explorer = explorer();
    let url = format!("{base}/petstore.yaml");

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let explorer = explorer.clone();
            let url = url.clone();
            tokio::spawn(async move {
                let mut params = Map::new();
                params.insert("petId".to_string(), json!(i + 1));
                explorer
                    .validate(&url, "getPet", &mut params, None, None)
                    .await
            })
        })
        .collect();

    for task in tasks {
        let report = task.await.unwrap().unwrap();
        assert!(report.valid);
    }
    assert_eq!(explorer.cache().len(), 1);
}

#[tokio::test]
async fn load_bytes_registers_local_documents() {
    let explorer = explorer();
    let entry = explorer.load_bytes("file://users.yaml", USERS.as_bytes()).unwrap();
    assert_eq!(entry.document.info.title, "Users API");

    let summary = explorer.discover("file://users.yaml").await.unwrap();
    assert_eq!(summary.operations[0].display_id, "getUser");
}
