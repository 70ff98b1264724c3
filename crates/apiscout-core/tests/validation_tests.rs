use apiscout_core::error::LookupError;
use apiscout_core::parse;
use apiscout_core::schema::IssueKind;
use apiscout_core::{OperationDiscovery, ValidationEngine, ValidationOptions};
use serde_json::{Map, Value, json};

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const USERS: &str = include_str!("fixtures/users.yaml");

fn discover(yaml: &str) -> OperationDiscovery {
    let doc = parse::from_yaml(yaml).expect("fixture should parse");
    OperationDiscovery::new(&doc).expect("fixture refs should resolve")
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn coercing() -> ValidationOptions {
    ValidationOptions {
        allow_coercion: true,
        ..ValidationOptions::default()
    }
}

#[test]
fn valid_request_passes() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);
    let mut p = params(json!({"id": "abc"}));

    let report = engine
        .validate_request("getUser", &mut p, None, &ValidationOptions::default())
        .unwrap();
    assert!(report.valid);
    assert_eq!(report.error_count(), 0);
    assert_eq!(
        report.guidance.summary,
        "Request validation passed successfully"
    );
    assert!(report.suggestions.is_empty());
    assert!(report.parameters["id"].valid);
}

#[test]
fn missing_required_path_parameter() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);
    let mut p = Map::new();

    let report = engine
        .validate_request("getUser", &mut p, None, &ValidationOptions::default())
        .unwrap();
    assert!(!report.valid);
    let id = &report.parameters["id"];
    assert!(id.has(IssueKind::Required));
    assert_eq!(id.messages(), vec!["required parameter 'id' is missing"]);
    assert_eq!(
        report.guidance.summary,
        "Request validation failed with 1 error"
    );
    assert_eq!(
        report.suggestions,
        vec!["Add the required parameter 'id' to your request"]
    );
}

#[test]
fn skip_required_accepts_missing_parameters() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);
    let options = ValidationOptions {
        skip_required: true,
        ..ValidationOptions::default()
    };

    let report = engine
        .validate_request("getUser", &mut Map::new(), None, &options)
        .unwrap();
    assert!(report.valid);
    assert!(report.parameters.is_empty());
}

#[test]
fn unexpected_body_is_reported() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);
    let mut p = params(json!({"id": "abc"}));
    let body = json!({"name": "x"});

    let report = engine
        .validate_request("getUser", &mut p, Some(&body), &ValidationOptions::default())
        .unwrap();
    assert!(!report.valid);
    let rb = report.request_body.as_ref().unwrap();
    assert!(rb.has(IssueKind::UnexpectedBody));
    assert_eq!(rb.messages(), vec!["operation does not expect a request body"]);
    assert!(report.guidance.body.is_some());
}

#[test]
fn coercion_rewrites_caller_parameters() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);

    let mut strict = params(json!({"id": 123}));
    let report = engine
        .validate_request("getUser", &mut strict, None, &ValidationOptions::default())
        .unwrap();
    assert!(!report.valid);
    assert!(report.parameters["id"].has(IssueKind::Type));
    assert_eq!(strict["id"], json!(123));

    let mut loose = params(json!({"id": 123}));
    let report = engine
        .validate_request("getUser", &mut loose, None, &coercing())
        .unwrap();
    assert!(report.valid);
    assert_eq!(loose["id"], json!("123"));
    assert_eq!(report.parameters["id"].actual_value, Some(json!("123")));
}

#[test]
fn coercion_to_integer() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);
    let mut p = params(json!({"petId": "42"}));

    let report = engine
        .validate_request("getPet", &mut p, None, &coercing())
        .unwrap();
    assert!(report.valid);
    assert_eq!(p["petId"], json!(42));
}

#[test]
fn parameter_constraints() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);
    let mut p = params(json!({"limit": 500, "status": "lost"}));

    let report = engine
        .validate_request("listPets", &mut p, None, &ValidationOptions::default())
        .unwrap();
    assert_eq!(report.error_count(), 2);
    assert!(report.parameters["limit"].has(IssueKind::Range));
    assert!(report.parameters["status"].has(IssueKind::Enum));
    assert_eq!(
        report.guidance.parameters["limit"],
        "Parameter 'limit' must be at most 100. Example: 20"
    );

    let relaxed = ValidationOptions {
        skip_constraints: true,
        ..ValidationOptions::default()
    };
    let report = engine
        .validate_request("listPets", &mut p, None, &relaxed)
        .unwrap();
    assert!(report.valid);
}

#[test]
fn undeclared_parameters_are_warnings() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);
    let mut p = params(json!({"id": "abc", "verbose": true}));

    let report = engine
        .validate_request("getUser", &mut p, None, &ValidationOptions::default())
        .unwrap();
    assert!(report.valid);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("verbose"));
}

#[test]
fn body_field_errors() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);
    let body = json!({"petId": 7, "email": "not-an-email", "code": "ab", "gift": true});

    let report = engine
        .validate_request("placeOrder", &mut Map::new(), Some(&body), &ValidationOptions::default())
        .unwrap();
    assert!(!report.valid);
    assert_eq!(report.error_count(), 1);
    let rb = report.request_body.as_ref().unwrap();
    assert!(rb.has(IssueKind::Format));
    assert!(rb.has(IssueKind::Length));
    assert!(rb.has(IssueKind::Pattern));
    assert!(rb.has(IssueKind::AdditionalProperty));
    let paths: Vec<&str> = rb.errors.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"email"));
    assert!(paths.contains(&"gift"));

    let guidance = report.guidance.body.as_deref().unwrap();
    assert!(guidance.starts_with("Request body validation failed."));
    assert!(guidance.contains("Supported content types: application/json."));
}

#[test]
fn body_missing_required_field() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);
    let body = json!({"petId": 7});

    let report = engine
        .validate_request("placeOrder", &mut Map::new(), Some(&body), &ValidationOptions::default())
        .unwrap();
    let rb = report.request_body.as_ref().unwrap();
    assert_eq!(rb.messages(), vec!["email is required"]);
    assert_eq!(rb.errors[0].path, "email");
}

#[test]
fn required_body_missing() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);

    let report = engine
        .validate_request("createPet", &mut Map::new(), None, &ValidationOptions::default())
        .unwrap();
    let rb = report.request_body.as_ref().unwrap();
    assert_eq!(rb.messages(), vec!["required request body is missing"]);
    assert_eq!(
        report.guidance.body.as_deref(),
        Some("This operation requires a request body. Supported content types: application/json.")
    );
}

#[test]
fn unknown_operation_is_an_error() {
    let discovery = discover(USERS);
    let engine = ValidationEngine::new(&discovery);

    let err = engine
        .validate_request("nope", &mut Map::new(), None, &ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(err, LookupError::OperationNotFound(ref id) if id == "nope"));
}

#[test]
fn response_validation() {
    let discovery = discover(PETSTORE);
    let engine = ValidationEngine::new(&discovery);

    let ok = engine
        .validate_response("getPet", "200", Some(&json!({"id": 1, "name": "Rex"})))
        .unwrap();
    assert!(ok.valid);

    let missing_id = engine
        .validate_response("getPet", "200", Some(&json!({"name": "Rex"})))
        .unwrap();
    assert!(missing_id.has(IssueKind::Required));

    let no_schema = engine.validate_response("getPet", "404", None).unwrap();
    assert!(no_schema.valid);

    let fallback = engine
        .validate_response("listPets", "502", Some(&json!({"error": "x"})))
        .unwrap();
    assert!(fallback.valid);

    let undeclared = engine.validate_response("getPet", "500", None).unwrap();
    assert!(!undeclared.valid);
    assert_eq!(undeclared.constraints, "declared: 200, 404");
    assert_eq!(undeclared.errors[0].kind, IssueKind::UndeclaredStatus);
}
