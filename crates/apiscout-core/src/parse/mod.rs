pub mod components;
pub mod document;
pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod ref_resolve;
pub mod request_body;
pub mod response;
pub mod schema;
pub mod security;
pub mod server;

use log::debug;

use crate::error::ParseError;
use document::Document;

/// OpenAPI minor versions accepted under major version 3.
const SUPPORTED_MINORS: [&str; 3] = ["0", "1", "2"];

/// Parse an OpenAPI document from YAML.
pub fn from_yaml(input: &str) -> Result<Document, ParseError> {
    let doc: Document = serde_yaml_ng::from_str(input)?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<Document, ParseError> {
    let doc: Document = serde_json::from_str(input)?;
    validate_document(&doc)?;
    Ok(doc)
}

/// Parse raw document bytes, trying strict JSON first and YAML second.
///
/// `source` labels the document (usually its URL) in error messages.
pub fn parse_document(bytes: &[u8], source: &str) -> Result<Document, ParseError> {
    let doc = match serde_json::from_slice::<Document>(bytes) {
        Ok(doc) => doc,
        Err(json) => {
            debug!("{source} is not JSON ({json}), trying YAML");
            match serde_yaml_ng::from_slice::<Document>(bytes) {
                Ok(doc) => doc,
                Err(yaml) => {
                    return Err(ParseError::Unparseable {
                        origin: source.to_string(),
                        json,
                        yaml,
                    });
                }
            }
        }
    };
    validate_document(&doc)?;
    Ok(doc)
}

/// Check the structural invariants every accepted document satisfies.
pub fn validate_document(doc: &Document) -> Result<(), ParseError> {
    if doc.openapi.trim().is_empty() {
        return Err(ParseError::MissingField("openapi".to_string()));
    }
    if !is_supported_version(&doc.openapi) {
        return Err(ParseError::UnsupportedVersion(doc.openapi.clone()));
    }
    if doc.info.title.trim().is_empty() {
        return Err(ParseError::MissingField("info.title".to_string()));
    }
    if doc.info.version.trim().is_empty() {
        return Err(ParseError::MissingField("info.version".to_string()));
    }
    if doc.paths.is_empty() && doc.components.is_none() && doc.webhooks.is_empty() {
        return Err(ParseError::NoContent);
    }
    Ok(())
}

fn is_supported_version(version: &str) -> bool {
    let mut parts = version.trim().split('.');
    let major = parts.next();
    let minor = parts.next();
    matches!((major, minor), (Some("3"), Some(m)) if SUPPORTED_MINORS.contains(&m))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
openapi: 3.0.3
info:
  title: Minimal
  version: "1.0"
paths:
  /ping:
    get:
      responses:
        "200":
          description: pong
"#;

    #[test]
    fn accepts_supported_versions() {
        for v in ["3.0.0", "3.0.3", "3.1.0", "3.2.0"] {
            assert!(is_supported_version(v), "{v}");
        }
        for v in ["2.0", "3.3.0", "4.0.0", "3", "swagger"] {
            assert!(!is_supported_version(v), "{v}");
        }
    }

    #[test]
    fn yaml_fallback_after_json_failure() {
        let doc = parse_document(MINIMAL.as_bytes(), "minimal.yaml").unwrap();
        assert_eq!(doc.info.title, "Minimal");
        assert_eq!(doc.paths.len(), 1);
    }

    #[test]
    fn combined_error_when_both_formats_fail() {
        let err = parse_document(b"{ not: [valid", "broken").unwrap_err();
        match err {
            ParseError::Unparseable { ref origin, .. } => assert_eq!(origin, "broken"),
            other => panic!("expected Unparseable, got {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("JSON"));
        assert!(msg.contains("YAML"));
    }

    #[test]
    fn missing_title_is_malformed() {
        let json = r#"{"openapi":"3.1.0","info":{"version":"1"},"paths":{"/a":{}}}"#;
        let err = parse_document(json.as_bytes(), "t").unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "info.title"));
    }

    #[test]
    fn missing_version_marker_is_malformed() {
        let json = r#"{"info":{"title":"t","version":"1"},"paths":{"/a":{}}}"#;
        let err = parse_document(json.as_bytes(), "t").unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "openapi"));
    }

    #[test]
    fn no_content_sections_is_malformed() {
        let json = r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"}}"#;
        let err = parse_document(json.as_bytes(), "t").unwrap_err();
        assert!(matches!(err, ParseError::NoContent));
    }

    #[test]
    fn webhooks_alone_are_enough() {
        let json = r#"{"openapi":"3.1.0","info":{"title":"t","version":"1"},
            "webhooks":{"newPet":{"post":{"responses":{"200":{"description":"ok"}}}}}}"#;
        let doc = parse_document(json.as_bytes(), "t").unwrap();
        assert_eq!(doc.webhooks.len(), 1);
    }
}
