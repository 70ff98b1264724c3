use anyhow::{Context, Result};
use apiscout_core::DiscoverySummary;
use apiscout_graphql::GraphCatalog;
use apiscout_graphql::guidance::catalog_guidance;
use minijinja::{Environment, context};
use serde_json::{Value, json};

/// Markdown catalog of a discovered REST API.
pub fn summary_markdown(summary: &DiscoverySummary) -> Result<String> {
    let operations: Vec<Value> = summary
        .operations
        .iter()
        .map(|op| {
            let params: Vec<Value> = op
                .parameters()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "location": p.location.as_str(),
                        "type": p.schema.type_name(),
                        "required": p.required,
                        "description": p.description.as_deref().unwrap_or(""),
                    })
                })
                .collect();
            let body = op.request_body.as_ref().map(|b| {
                json!({
                    "required": b.required,
                    "type": b.schema.as_ref().map(|s| s.type_name()).unwrap_or_else(|| "any".to_string()),
                    "content_types": b.content_types,
                })
            });
            json!({
                "method": op.method,
                "path": op.path,
                "id": op.display_id,
                "summary": op.summary,
                "tags": op.tags,
                "auth": op.auth_methods,
                "deprecated": op.deprecated,
                "params": params,
                "body": body,
                "usage": op.guidance.usage,
            })
        })
        .collect();
    let schemes: Vec<Value> = summary
        .security_schemes
        .iter()
        .map(|(name, text)| json!({"name": name, "summary": text}))
        .collect();

    render(
        "catalog.md.j2",
        include_str!("../templates/catalog.md.j2"),
        context! {
            title => summary.title,
            version => summary.version,
            description => summary.description,
            guidance => summary.guidance,
            servers => summary.server_urls,
            schemes => schemes,
            operations => operations,
        },
    )
}

/// Markdown catalog of a discovered graph endpoint.
pub fn graph_markdown(catalog: &GraphCatalog) -> Result<String> {
    let sections = json!([
        {"title": "Queries", "operations": catalog.queries},
        {"title": "Mutations", "operations": catalog.mutations},
        {"title": "Subscriptions", "operations": catalog.subscriptions},
    ]);
    render(
        "graph.md.j2",
        include_str!("../templates/graph.md.j2"),
        context! {
            endpoint => catalog.endpoint,
            guidance => catalog_guidance(catalog),
            sections => sections,
        },
    )
}

fn render(name: &str, source: &str, ctx: minijinja::Value) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(name, source)
        .with_context(|| format!("invalid template {name}"))?;
    let tmpl = env.get_template(name)?;
    tmpl.render(ctx)
        .with_context(|| format!("failed to render {name}"))
}

#[cfg(test)]
mod tests {
    use apiscout_core::{OperationDiscovery, parse};

    use super::*;

    const SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Users API
  version: "1.0.0"
servers:
  - url: https://api.example.com
paths:
  /users/{id}:
    get:
      operationId: getUser
      summary: Get a user
      tags: [users]
      parameters:
        - name: id
          in: path
          required: true
          description: User id
          schema:
            type: string
      responses:
        "200":
          description: The user
"#;

    #[test]
    fn markdown_lists_operations_and_parameters() {
        let doc = parse::from_yaml(SPEC).unwrap();
        let summary = OperationDiscovery::new(&doc).unwrap().summary();
        let md = summary_markdown(&summary).unwrap();

        assert!(md.starts_with("# Users API 1.0.0"));
        assert!(md.contains("- https://api.example.com"));
        assert!(md.contains("### `GET /users/{id}`"));
        assert!(md.contains("- id: `getUser`"));
        assert!(md.contains("| `id` | path | string | yes | User id |"));
    }
}
