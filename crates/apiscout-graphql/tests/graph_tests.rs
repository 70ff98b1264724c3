use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use apiscout_core::ScoutConfig;
use apiscout_core::error::FetchError;
use apiscout_graphql::{GraphError, GraphExplorer, OperationKind};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Map, Value, json};

const INTROSPECTION: &str = include_str!("fixtures/introspection.json");

#[derive(Clone, Default)]
struct Counters {
    introspections: Arc<AtomicUsize>,
    executions: Arc<AtomicUsize>,
}

async fn graphql(State(counters): State<Counters>, Json(request): Json<Value>) -> Json<Value> {
    let query = request["query"].as_str().unwrap_or_default();
    if query.contains("__schema") {
        counters.introspections.fetch_add(1, Ordering::SeqCst);
        return Json(serde_json::from_str(INTROSPECTION).unwrap());
    }
    counters.executions.fetch_add(1, Ordering::SeqCst);
    if query.contains("missing") {
        return Json(json!({
            "data": null,
            "errors": [{"message": "Book not found", "path": ["book"], "locations": [{"line": 1, "column": 3}]}]
        }));
    }
    Json(json!({
        "data": {"book": {"id": request["variables"]["id"].clone(), "title": "Dune"}}
    }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn not_json() -> &'static str {
    "<html>hello</html>"
}

async fn locked() -> Json<Value> {
    Json(json!({"data": null, "errors": [{"message": "introspection is disabled"}]}))
}

async fn serve(counters: Counters) -> String {
    let app = Router::new()
        .route("/graphql", post(graphql))
        .route("/broken", post(broken))
        .route("/html", post(not_json))
        .route("/locked", post(locked))
        .with_state(counters);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn explorer() -> GraphExplorer {
    GraphExplorer::new(&ScoutConfig::default()).unwrap()
}

#[tokio::test]
async fn discovery_builds_and_caches_the_catalog() {
    let counters = Counters::default();
    let base = serve(counters.clone()).await;
    let explorer = explorer();
    let endpoint = format!("{base}/graphql");

    let catalog = explorer.discover_graph(&endpoint).await.unwrap();
    let names: Vec<&str> = catalog.queries.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, vec!["book", "books"]);
    assert_eq!(catalog.mutations.len(), 1);
    assert!(catalog.subscriptions.is_empty());

    let books = catalog.find(OperationKind::Query, "books").unwrap();
    assert_eq!(books.returns, "[Book!]!");
    assert!(books.required_args.is_empty());
    assert_eq!(books.available_fields, vec!["genre", "id", "title"]);

    let add = catalog.find(OperationKind::Mutation, "addBook").unwrap();
    assert_eq!(add.required_args, vec!["input"]);
    assert_eq!(add.example, "mutation { addBook(input: {}) { id title genre } }");

    let types: Vec<&str> = catalog.types.keys().map(String::as_str).collect();
    assert_eq!(types, vec!["Book", "BookInput", "Genre", "Query"]);
    assert_eq!(catalog.types["BookInput"].fields, vec!["genre", "title"]);

    explorer.discover_graph(&endpoint).await.unwrap();
    assert_eq!(counters.introspections.load(Ordering::SeqCst), 1);

    assert!(explorer.invalidate(&endpoint));
    explorer.discover_graph(&endpoint).await.unwrap();
    assert_eq!(counters.introspections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn execute_returns_data() {
    let base = serve(Counters::default()).await;
    let explorer = explorer();
    let endpoint = format!("{base}/graphql");

    let mut variables = Map::new();
    variables.insert("id".to_string(), json!("b-1"));
    let response = explorer
        .execute_graph(
            &endpoint,
            "query Book($id: ID!) { book(id: $id) { id title } }",
            Some(variables),
            Some("Book"),
        )
        .await
        .unwrap();
    assert!(!response.has_errors());
    assert_eq!(response.data["book"]["id"], "b-1");
    assert_eq!(response.data["book"]["title"], "Dune");
}

#[tokio::test]
async fn server_errors_are_data_not_failures() {
    let base = serve(Counters::default()).await;
    let explorer = explorer();

    let response = explorer
        .execute_graph(
            &format!("{base}/graphql"),
            r#"{ book(id: "missing") { id } }"#,
            None,
            None,
        )
        .await
        .unwrap();
    assert!(response.data.is_null());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Book not found");
    assert_eq!(response.errors[0].locations[0].line, 1);
    assert_eq!(response.error_summary(), "Book not found");
}

#[tokio::test]
async fn cached_catalog_enables_preflight_checks() {
    let counters = Counters::default();
    let base = serve(counters.clone()).await;
    let explorer = explorer();
    let endpoint = format!("{base}/graphql");
    explorer.discover_graph(&endpoint).await.unwrap();

    let err = explorer
        .execute_graph(&endpoint, "{ book { id } author { name } }", None, None)
        .await
        .unwrap_err();
    match err {
        GraphError::Validation(problems) => assert_eq!(
            problems,
            vec![
                "field 'book' argument 'id' of type 'ID!' is required but not provided",
                "field 'author' doesn't exist on type 'Query'",
            ]
        ),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(counters.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn syntax_errors_never_reach_the_network() {
    let counters = Counters::default();
    let base = serve(counters.clone()).await;
    let explorer = explorer();

    let err = explorer
        .execute_graph(&format!("{base}/graphql"), "{ book(id: ) { id } }", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Syntax { line: 1, .. }));
    assert_eq!(counters.executions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transport_failures_are_errors() {
    let base = serve(Counters::default()).await;
    let explorer = explorer();

    let err = explorer
        .execute_graph(&format!("{base}/broken"), "{ ping }", None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Transport(FetchError::Status { status: 500, .. })
    ));

    let err = explorer
        .execute_graph(&format!("{base}/html"), "{ ping }", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Decode { .. }));
}

#[tokio::test]
async fn introspection_errors_are_reported() {
    let base = serve(Counters::default()).await;
    let explorer = explorer();
    let endpoint = format!("{base}/locked");

    let err = explorer.discover_graph(&endpoint).await.unwrap_err();
    match err {
        GraphError::Introspection(ref message) => {
            assert_eq!(message, "introspection is disabled")
        }
        ref other => panic!("expected an introspection error, got {other:?}"),
    }
    assert!(!err.hint().is_empty());
    assert!(explorer.cache().is_empty());
}
