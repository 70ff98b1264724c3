use indexmap::{IndexMap, IndexSet};

use super::guidance;
use super::model::{
    AuthSource, EnrichedOperation, ExampleInfo, Guidance, HeaderInfo, ParameterInfo,
    RequestBodyInfo, ResponseInfo,
};
use crate::naming::route_to_name;
use crate::parse::document::Document;
use crate::parse::media_type::{ExampleOrRef, MediaType};
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{HeaderOrRef, Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::ResponseOrRef;
use crate::parse::security::SecurityRequirement;
use crate::schema::{SchemaConverter, SchemaInfo};

/// Flatten one resolved operation into its enriched form, guidance included.
///
/// `schemas` is shared across a document so components convert once.
pub fn enrich(
    doc: &Document,
    path: &str,
    item: &PathItem,
    method: &str,
    op: &Operation,
    schemas: &mut SchemaConverter,
) -> EnrichedOperation {
    let mut path_params = Vec::new();
    let mut query_params = Vec::new();
    let mut header_params = Vec::new();
    let mut cookie_params = Vec::new();
    for param in merge_parameters(&item.parameters, &op.parameters) {
        let info = parameter_info(param, schemas);
        match info.location {
            ParameterLocation::Path => path_params.push(info),
            ParameterLocation::Query => query_params.push(info),
            ParameterLocation::Header => header_params.push(info),
            ParameterLocation::Cookie => cookie_params.push(info),
        }
    }

    let (auth_methods, auth_source) = auth_methods(op.security.as_deref(), doc.security.as_deref());
    let request_body = op
        .request_body
        .as_ref()
        .and_then(|body| request_body_info(body, schemas));
    let mut responses = IndexMap::new();
    for (status, resp) in &op.responses {
        if let ResponseOrRef::Response(r) = resp {
            responses.insert(status.clone(), response_info(r, schemas));
        }
    }

    let mut enriched = EnrichedOperation {
        method: method.to_uppercase(),
        path: path.to_string(),
        operation_id: op.operation_id.clone(),
        display_id: op
            .operation_id
            .clone()
            .unwrap_or_else(|| route_to_name(method, path)),
        summary: op.summary.clone().or_else(|| item.summary.clone()),
        description: op.description.clone().or_else(|| item.description.clone()),
        tags: op.tags.clone(),
        deprecated: op.deprecated.unwrap_or(false),
        path_params,
        query_params,
        header_params,
        cookie_params,
        request_body,
        responses,
        security: op.security.clone(),
        auth_methods,
        auth_source,
        server_urls: server_urls(doc, item, op),
        guidance: Guidance::default(),
    };
    enriched.guidance = guidance::generate(&enriched);
    enriched
}

/// Operation parameters replace path-level ones with the same name and
/// location, keeping the path-level position.
fn merge_parameters<'a>(
    path_level: &'a [ParameterOrRef],
    op_level: &'a [ParameterOrRef],
) -> impl Iterator<Item = &'a Parameter> {
    let mut merged: IndexMap<(&str, ParameterLocation), &Parameter> = IndexMap::new();
    for p in path_level.iter().chain(op_level) {
        if let ParameterOrRef::Parameter(param) = p {
            merged.insert((param.name.as_str(), param.location), param);
        }
    }
    merged.into_values()
}

fn parameter_info(param: &Parameter, schemas: &mut SchemaConverter) -> ParameterInfo {
    let schema = param
        .schema
        .as_ref()
        .map(|s| schemas.convert(s))
        .unwrap_or_else(SchemaInfo::any);
    let examples = example_list(&param.examples);
    let example = param
        .example
        .clone()
        .or_else(|| examples.first().map(|e| e.value.clone()));
    ParameterInfo {
        name: param.name.clone(),
        location: param.location,
        description: param.description.clone(),
        // Path parameters are always required.
        required: param.required || param.location == ParameterLocation::Path,
        deprecated: param.deprecated.unwrap_or(false),
        schema,
        example,
        examples,
    }
}

fn request_body_info(
    body: &RequestBodyOrRef,
    schemas: &mut SchemaConverter,
) -> Option<RequestBodyInfo> {
    let RequestBodyOrRef::RequestBody(rb) = body else {
        return None;
    };
    let media = preferred_media(&rb.content);
    Some(RequestBodyInfo {
        description: rb.description.clone(),
        required: rb.required,
        content_types: rb.content.keys().cloned().collect(),
        schema: media
            .and_then(|m| m.schema.as_ref())
            .map(|s| schemas.convert(s)),
        examples: media.map(media_examples).unwrap_or_default(),
    })
}

fn response_info(
    resp: &crate::parse::response::Response,
    schemas: &mut SchemaConverter,
) -> ResponseInfo {
    let media = preferred_media(&resp.content);
    let mut headers = IndexMap::new();
    for (name, h) in &resp.headers {
        if let HeaderOrRef::Header(h) = h {
            let info = HeaderInfo {
                description: h.description.clone(),
                required: h.required,
                schema: h.schema.as_ref().map(|s| schemas.convert(s)),
            };
            headers.insert(name.clone(), info);
        }
    }
    ResponseInfo {
        description: resp.description.clone(),
        content_types: resp.content.keys().cloned().collect(),
        schema: media
            .and_then(|m| m.schema.as_ref())
            .map(|s| schemas.convert(s)),
        headers,
    }
}

/// JSON media types win; otherwise the first declared one.
fn preferred_media(content: &IndexMap<String, MediaType>) -> Option<&MediaType> {
    content
        .iter()
        .find(|(ct, _)| is_json(ct))
        .or_else(|| content.first())
        .map(|(_, m)| m)
}

fn is_json(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or("").trim();
    base == "application/json" || base.ends_with("+json")
}

fn media_examples(media: &MediaType) -> Vec<ExampleInfo> {
    let mut out = Vec::new();
    if let Some(ref value) = media.example {
        out.push(ExampleInfo {
            name: "default".to_string(),
            summary: None,
            description: None,
            value: value.clone(),
        });
    }
    out.extend(example_list(&media.examples));
    out
}

fn example_list(examples: &IndexMap<String, ExampleOrRef>) -> Vec<ExampleInfo> {
    examples
        .iter()
        .filter_map(|(name, ex)| match ex {
            ExampleOrRef::Example(e) => e.value.as_ref().map(|value| ExampleInfo {
                name: name.clone(),
                summary: e.summary.clone(),
                description: e.description.clone(),
                value: value.clone(),
            }),
            ExampleOrRef::Ref { .. } => None,
        })
        .collect()
}

/// Operation servers override path servers, which override document servers.
fn server_urls(doc: &Document, item: &PathItem, op: &Operation) -> Vec<String> {
    let servers = if !op.servers.is_empty() {
        &op.servers
    } else if !item.servers.is_empty() {
        &item.servers
    } else {
        &doc.servers
    };
    servers.iter().map(|s| s.expanded_url()).collect()
}

/// Scheme names an operation authenticates with, and where they come from.
///
/// An explicit empty operation list disables authentication even when the
/// document declares requirements.
fn auth_methods(
    op_security: Option<&[SecurityRequirement]>,
    doc_security: Option<&[SecurityRequirement]>,
) -> (Vec<String>, AuthSource) {
    let (requirements, source) = match (op_security, doc_security) {
        (Some([]), _) => return (Vec::new(), AuthSource::Disabled),
        (Some(reqs), _) => (reqs, AuthSource::Operation),
        (None, Some(reqs)) if !reqs.is_empty() => (reqs, AuthSource::Document),
        (None, _) => return (Vec::new(), AuthSource::None),
    };
    let names: IndexSet<&String> = requirements.iter().flat_map(|r| r.keys()).collect();
    (names.into_iter().cloned().collect(), source)
}
