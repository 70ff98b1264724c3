use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;

use super::components::Components;
use super::document::Document;
use super::media_type::{ExampleOrRef, MediaType};
use super::operation::{Operation, PathItem};
use super::parameter::{HeaderOrRef, Parameter, ParameterOrRef};
use super::request_body::{RequestBody, RequestBodyOrRef};
use super::response::{Response, ResponseOrRef};
use super::schema::{AdditionalProperties, Schema, SchemaOrRef};
use crate::error::ResolveError;

/// Resolves `$ref` pointers into `#/components/...` throughout a document.
///
/// Parameter, request body and response references must resolve. Schema
/// references that are circular or dangling are left in place as `$ref`
/// nodes, which later stages treat as accept-anything schemas. Example and
/// header references are inlined when found and kept otherwise.
///
/// Each schema reference is resolved once; later uses share the resolved
/// `Arc<Schema>`. A resolution that had to cut a cycle depends on where it
/// started and is not reused.
pub struct RefResolver<'a> {
    components: Option<&'a Components>,
    visited: HashSet<String>,
    resolved: HashMap<String, SchemaOrRef>,
    cycle_cuts: usize,
}

impl<'a> RefResolver<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            components: doc.components.as_ref(),
            visited: HashSet::new(),
            resolved: HashMap::new(),
            cycle_cuts: 0,
        }
    }

    /// Produce a copy of the document with references inlined.
    pub fn resolve_document(&mut self, doc: &Document) -> Result<Document, ResolveError> {
        let mut resolved = doc.clone();

        for item in resolved.paths.values_mut() {
            self.resolve_path_item(item)?;
        }
        for item in resolved.webhooks.values_mut() {
            self.resolve_path_item(item)?;
        }

        if let Some(ref mut components) = resolved.components {
            for schema in components.schemas.values_mut() {
                *schema = self.resolve_schema_or_ref(schema)?;
            }
        }

        Ok(resolved)
    }

    fn resolve_path_item(&mut self, item: &mut PathItem) -> Result<(), ResolveError> {
        item.parameters = self.resolve_parameters(&item.parameters)?;
        for op in item.operations_mut() {
            self.resolve_operation(op)?;
        }
        Ok(())
    }

    fn resolve_operation(&mut self, op: &mut Operation) -> Result<(), ResolveError> {
        op.parameters = self.resolve_parameters(&op.parameters)?;

        if let Some(ref body) = op.request_body {
            let resolved = self.resolve_request_body_or_ref(body)?;
            op.request_body = Some(RequestBodyOrRef::RequestBody(resolved));
        }

        let mut resolved_responses = IndexMap::new();
        for (status, resp) in &op.responses {
            let resolved = self.resolve_response_or_ref(resp)?;
            resolved_responses.insert(status.clone(), ResponseOrRef::Response(resolved));
        }
        op.responses = resolved_responses;

        Ok(())
    }

    pub fn resolve_schema_or_ref(
        &mut self,
        schema_or_ref: &SchemaOrRef,
    ) -> Result<SchemaOrRef, ResolveError> {
        match schema_or_ref {
            SchemaOrRef::Ref { ref_path } => {
                if let Some(done) = self.resolved.get(ref_path) {
                    return Ok(done.clone());
                }
                if self.visited.contains(ref_path) {
                    // Circular reference: keep the pointer to break the cycle.
                    self.cycle_cuts += 1;
                    return Ok(schema_or_ref.clone());
                }
                let Some(target) = self.lookup_schema(ref_path) else {
                    warn!("schema reference {ref_path} not found, treating as unconstrained");
                    return Ok(schema_or_ref.clone());
                };
                let cuts_before = self.cycle_cuts;
                self.visited.insert(ref_path.clone());
                let result = self.resolve_schema_or_ref(&target);
                self.visited.remove(ref_path);
                let result = result?;
                if self.cycle_cuts == cuts_before {
                    self.resolved.insert(ref_path.clone(), result.clone());
                }
                Ok(result)
            }
            SchemaOrRef::Schema(schema) => {
                let resolved = self.resolve_schema(schema)?;
                Ok(SchemaOrRef::Schema(Arc::new(resolved)))
            }
        }
    }

    fn resolve_schema(&mut self, schema: &Schema) -> Result<Schema, ResolveError> {
        let mut resolved = schema.clone();

        let mut resolved_props = IndexMap::new();
        for (name, prop) in &schema.properties {
            resolved_props.insert(name.clone(), self.resolve_schema_or_ref(prop)?);
        }
        resolved.properties = resolved_props;

        if let Some(ref items) = schema.items {
            resolved.items = Some(Box::new(self.resolve_schema_or_ref(items)?));
        }

        resolved.all_of = self.resolve_schema_list(&schema.all_of)?;
        resolved.one_of = self.resolve_schema_list(&schema.one_of)?;
        resolved.any_of = self.resolve_schema_list(&schema.any_of)?;

        if let Some(ref not) = schema.not {
            resolved.not = Some(Box::new(self.resolve_schema_or_ref(not)?));
        }

        if let Some(AdditionalProperties::Schema(ref s)) = schema.additional_properties {
            resolved.additional_properties = Some(AdditionalProperties::Schema(Box::new(
                self.resolve_schema_or_ref(s)?,
            )));
        }

        Ok(resolved)
    }

    fn resolve_schema_list(
        &mut self,
        list: &[SchemaOrRef],
    ) -> Result<Vec<SchemaOrRef>, ResolveError> {
        list.iter()
            .map(|s| self.resolve_schema_or_ref(s))
            .collect()
    }

    fn resolve_parameters(
        &mut self,
        params: &[ParameterOrRef],
    ) -> Result<Vec<ParameterOrRef>, ResolveError> {
        let mut resolved = Vec::with_capacity(params.len());
        for p in params {
            let param = match p {
                ParameterOrRef::Ref { ref_path } => self.lookup_parameter(ref_path)?,
                ParameterOrRef::Parameter(p) => p.clone(),
            };
            resolved.push(ParameterOrRef::Parameter(self.resolve_parameter(param)?));
        }
        Ok(resolved)
    }

    fn resolve_parameter(&mut self, mut param: Parameter) -> Result<Parameter, ResolveError> {
        if let Some(ref s) = param.schema {
            param.schema = Some(self.resolve_schema_or_ref(s)?);
        }
        self.resolve_examples(&mut param.examples);
        Ok(param)
    }

    fn resolve_request_body_or_ref(
        &mut self,
        body: &RequestBodyOrRef,
    ) -> Result<RequestBody, ResolveError> {
        let mut rb = match body {
            RequestBodyOrRef::Ref { ref_path } => self.lookup_request_body(ref_path)?,
            RequestBodyOrRef::RequestBody(rb) => rb.clone(),
        };
        self.resolve_media_types(&mut rb.content)?;
        Ok(rb)
    }

    fn resolve_response_or_ref(&mut self, resp: &ResponseOrRef) -> Result<Response, ResolveError> {
        let mut r = match resp {
            ResponseOrRef::Ref { ref_path } => self.lookup_response(ref_path)?,
            ResponseOrRef::Response(r) => r.clone(),
        };
        self.resolve_media_types(&mut r.content)?;
        for header in r.headers.values_mut() {
            self.resolve_header(header)?;
        }
        Ok(r)
    }

    fn resolve_header(&mut self, header: &mut HeaderOrRef) -> Result<(), ResolveError> {
        if let HeaderOrRef::Ref { ref_path } = header {
            let found = parse_ref_name(ref_path, "headers")
                .ok()
                .and_then(|name| self.components.and_then(|c| c.headers.get(name)))
                .cloned();
            match found {
                Some(target) => *header = target,
                None => {
                    warn!("header reference {ref_path} not found");
                    return Ok(());
                }
            }
        }
        if let HeaderOrRef::Header(h) = header {
            if let Some(ref s) = h.schema {
                h.schema = Some(self.resolve_schema_or_ref(s)?);
            }
        }
        Ok(())
    }

    fn resolve_media_types(
        &mut self,
        content: &mut IndexMap<String, MediaType>,
    ) -> Result<(), ResolveError> {
        for mt in content.values_mut() {
            if let Some(ref s) = mt.schema {
                mt.schema = Some(self.resolve_schema_or_ref(s)?);
            }
            self.resolve_examples(&mut mt.examples);
        }
        Ok(())
    }

    fn resolve_examples(&self, examples: &mut IndexMap<String, ExampleOrRef>) {
        for example in examples.values_mut() {
            if let ExampleOrRef::Ref { ref_path } = example {
                let found = parse_ref_name(ref_path, "examples")
                    .ok()
                    .and_then(|name| self.components.and_then(|c| c.examples.get(name)))
                    .cloned();
                if let Some(target) = found {
                    *example = target;
                }
            }
        }
    }

    // Lookup helpers

    fn lookup_schema(&self, ref_path: &str) -> Option<SchemaOrRef> {
        let name = parse_ref_name(ref_path, "schemas").ok()?;
        self.components
            .and_then(|c| c.schemas.get(name))
            .cloned()
    }

    fn lookup_parameter(&self, ref_path: &str) -> Result<Parameter, ResolveError> {
        let name = parse_ref_name(ref_path, "parameters")?;
        self.components
            .and_then(|c| c.parameters.get(name))
            .and_then(|p| match p {
                ParameterOrRef::Parameter(param) => Some(param.clone()),
                _ => None,
            })
            .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.to_string()))
    }

    fn lookup_request_body(&self, ref_path: &str) -> Result<RequestBody, ResolveError> {
        let name = parse_ref_name(ref_path, "requestBodies")?;
        self.components
            .and_then(|c| c.request_bodies.get(name))
            .and_then(|rb| match rb {
                RequestBodyOrRef::RequestBody(body) => Some(body.clone()),
                _ => None,
            })
            .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.to_string()))
    }

    fn lookup_response(&self, ref_path: &str) -> Result<Response, ResolveError> {
        let name = parse_ref_name(ref_path, "responses")?;
        self.components
            .and_then(|c| c.responses.get(name))
            .and_then(|r| match r {
                ResponseOrRef::Response(resp) => Some(resp.clone()),
                _ => None,
            })
            .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.to_string()))
    }
}

/// Parse a `$ref` path like `#/components/schemas/Foo` and extract the name.
fn parse_ref_name<'a>(ref_path: &'a str, expected_section: &str) -> Result<&'a str, ResolveError> {
    let stripped = ref_path
        .strip_prefix("#/components/")
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    let (section, name) = stripped
        .split_once('/')
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    if section != expected_section {
        return Err(ResolveError::InvalidRefFormat(format!(
            "expected section '{}', got '{}' in {}",
            expected_section, section, ref_path
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const SPEC: &str = r##"
openapi: 3.1.0
info: { title: Refs, version: "1" }
paths:
  /nodes/{id}:
    parameters:
      - $ref: "#/components/parameters/NodeId"
    get:
      responses:
        "200":
          $ref: "#/components/responses/NodeResponse"
components:
  parameters:
    NodeId:
      name: id
      in: path
      required: true
      schema: { $ref: "#/components/schemas/Id" }
  responses:
    NodeResponse:
      description: A node
      content:
        application/json:
          schema: { $ref: "#/components/schemas/Node" }
  schemas:
    Id: { type: string }
    Node:
      type: object
      properties:
        id: { $ref: "#/components/schemas/Id" }
        children:
          type: array
          items: { $ref: "#/components/schemas/Node" }
"##;

    #[test]
    fn inlines_parameters_and_responses() {
        let doc = parse::from_yaml(SPEC).unwrap();
        let resolved = RefResolver::new(&doc).resolve_document(&doc).unwrap();
        let item = &resolved.paths["/nodes/{id}"];
        let ParameterOrRef::Parameter(ref p) = item.parameters[0] else {
            panic!("parameter should be inlined");
        };
        assert_eq!(p.name, "id");
        assert!(matches!(p.schema, Some(SchemaOrRef::Schema(_))));

        let get = item.get.as_ref().unwrap();
        assert!(matches!(get.responses["200"], ResponseOrRef::Response(_)));
    }

    #[test]
    fn leaves_cycles_as_references() {
        let doc = parse::from_yaml(SPEC).unwrap();
        let resolved = RefResolver::new(&doc).resolve_document(&doc).unwrap();
        let get = resolved.paths["/nodes/{id}"].get.as_ref().unwrap();
        let ResponseOrRef::Response(ref ok) = get.responses["200"] else {
            panic!("response should be inlined");
        };
        let Some(SchemaOrRef::Schema(ref node)) = ok.content["application/json"].schema else {
            panic!("Node should resolve");
        };
        let Some(SchemaOrRef::Schema(children)) = node.properties.get("children") else {
            panic!("children should be inline");
        };
        assert!(matches!(
            children.items.as_deref(),
            Some(SchemaOrRef::Ref { .. })
        ));
    }

    #[test]
    fn missing_parameter_target_is_an_error() {
        let yaml = r##"
openapi: 3.0.0
info: { title: T, version: "1" }
paths:
  /a:
    get:
      parameters:
        - $ref: "#/components/parameters/Nope"
      responses: {}
"##;
        let doc = parse::from_yaml(yaml).unwrap();
        let err = RefResolver::new(&doc).resolve_document(&doc).unwrap_err();
        assert!(matches!(err, ResolveError::RefTargetNotFound(_)));
    }

    #[test]
    fn shared_components_resolve_to_one_allocation() {
        let yaml = r##"
openapi: 3.1.0
info: { title: Shared, version: "1" }
paths:
  /orders:
    get:
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Order" }
    post:
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Order" }
      responses: {}
components:
  schemas:
    Money: { type: object, properties: { amount: { type: integer } } }
    Order:
      type: object
      properties:
        total: { $ref: "#/components/schemas/Money" }
        tax: { $ref: "#/components/schemas/Money" }
"##;
        let doc = parse::from_yaml(yaml).unwrap();
        let resolved = RefResolver::new(&doc).resolve_document(&doc).unwrap();
        let item = &resolved.paths["/orders"];

        let ResponseOrRef::Response(ref ok) = item.get.as_ref().unwrap().responses["200"] else {
            panic!("response should be inlined");
        };
        let Some(SchemaOrRef::Schema(ref from_response)) = ok.content["application/json"].schema
        else {
            panic!("Order should resolve");
        };
        let Some(RequestBodyOrRef::RequestBody(ref body)) = item.post.as_ref().unwrap().request_body
        else {
            panic!("body should be inline");
        };
        let Some(SchemaOrRef::Schema(ref from_body)) = body.content["application/json"].schema
        else {
            panic!("Order should resolve");
        };
        assert!(Arc::ptr_eq(from_response, from_body));

        let (Some(SchemaOrRef::Schema(total)), Some(SchemaOrRef::Schema(tax))) = (
            from_response.properties.get("total"),
            from_response.properties.get("tax"),
        ) else {
            panic!("Money should resolve");
        };
        assert!(Arc::ptr_eq(total, tax));
    }

    #[test]
    fn cycle_dependent_resolutions_are_not_reused() {
        let doc = parse::from_yaml(SPEC).unwrap();
        let mut resolver = RefResolver::new(&doc);
        resolver.resolve_document(&doc).unwrap();
        assert!(resolver.resolved.contains_key("#/components/schemas/Id"));
        assert!(!resolver.resolved.contains_key("#/components/schemas/Node"));
    }
}
