use apiscout_core::error::ParseError;
use apiscout_core::parse;
use apiscout_core::parse::parameter::ParameterOrRef;
use apiscout_core::parse::schema::SchemaOrRef;

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const USERS: &str = include_str!("fixtures/users.yaml");

#[test]
fn parse_petstore_yaml() {
    let doc = parse::from_yaml(PETSTORE).expect("should parse petstore");
    assert_eq!(doc.openapi, "3.1.0");
    assert_eq!(doc.info.title, "Petstore");
    assert_eq!(doc.paths.len(), 4);
    assert_eq!(doc.webhooks.len(), 1);
    assert_eq!(doc.servers[0].expanded_url(), "https://eu.petstore.example.com/v2");

    let components = doc.components.as_ref().expect("should have components");
    assert_eq!(components.schemas.len(), 2);
    assert_eq!(components.security_schemes.len(), 2);
}

#[test]
fn parse_preserves_explicit_empty_security() {
    let doc = parse::from_yaml(PETSTORE).unwrap();
    let health = doc.paths["/health"].get.as_ref().unwrap();
    assert_eq!(health.security.as_deref(), Some(&[][..]));

    let list = doc.paths["/pets"].get.as_ref().unwrap();
    assert!(list.security.is_none());
}

#[test]
fn parse_path_level_parameters_and_servers() {
    let doc = parse::from_yaml(PETSTORE).unwrap();
    let pets = &doc.paths["/pets"];
    assert_eq!(pets.parameters.len(), 2);
    assert!(matches!(pets.parameters[0], ParameterOrRef::Ref { .. }));

    let pet = &doc.paths["/pets/{petId}"];
    assert_eq!(pet.servers.len(), 1);
    assert_eq!(pet.delete.as_ref().unwrap().servers.len(), 1);
}

#[test]
fn parse_json_and_yaml_through_the_same_entry_point() {
    let yaml = parse::parse_document(USERS.as_bytes(), "users.yaml").unwrap();
    let as_json = serde_json::to_vec(&yaml).unwrap();
    let json = parse::parse_document(&as_json, "users.json").unwrap();
    assert_eq!(yaml, json);
}

#[test]
fn parse_json_without_paths_needs_components() {
    let bare = r#"{"openapi": "3.1.0", "info": {"title": "Bare", "version": "1"}}"#;
    assert!(matches!(parse::from_json(bare), Err(ParseError::NoContent)));

    let with_components = r#"{
        "openapi": "3.1.0",
        "info": {"title": "Models", "version": "1"},
        "components": {"schemas": {"Id": {"type": "string"}}}
    }"#;
    let doc = parse::from_json(with_components).unwrap();
    assert!(doc.paths.is_empty());
    assert!(matches!(parse::from_json("{not json"), Err(ParseError::Json(_))));
}

#[test]
fn parse_invalid_version() {
    let yaml = r#"
openapi: "2.0.0"
info:
  title: Test
  version: "1.0"
paths: {}
"#;
    let result = parse::from_yaml(yaml);
    assert!(matches!(result, Err(ParseError::UnsupportedVersion(ref v)) if v == "2.0.0"));
}

#[test]
fn parse_empty_title_is_rejected() {
    let yaml = r#"
openapi: 3.0.0
info:
  title: ""
  version: "1.0"
paths:
  /a: {}
"#;
    let err = parse::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().starts_with("malformed specification"));
    assert!(!err.hint().is_empty());
}

#[test]
fn parse_components_schemas() {
    let doc = parse::from_yaml(PETSTORE).unwrap();
    let components = doc.components.as_ref().unwrap();

    let pet = components.schemas.get("Pet").unwrap();
    match pet {
        SchemaOrRef::Schema(s) => {
            assert_eq!(s.all_of.len(), 2);
            assert!(matches!(s.all_of[0], SchemaOrRef::Ref { .. }));
        }
        _ => panic!("expected inline schema"),
    }
}
