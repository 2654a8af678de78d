//! OpenAPI 3.0 document generation
//!
//! Only specs whose first binding is REST appear in the document. Operations
//! are grouped by URI and method; a later spec with the same pair replaces the
//! earlier one.

use crate::components::generate_components;
use apispec_builder_common::{
    ApiSpec, BuilderError, EventBinding, ParamLocation, ParamSpec, ProjectInfo, PropertySpec,
    ResponseContract, Responses, Result, SpecRegistry,
};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Type emitted for response properties that declare none
const UNSUPPORTED_TYPE: &str = "invalid or unsupported type";

/// Build the `paths` object from every visible REST spec
pub fn generate_paths(registry: &SpecRegistry) -> Map<String, Value> {
    let mut grouped: IndexMap<String, IndexMap<String, &ApiSpec>> = IndexMap::new();

    for entry in registry.entries() {
        let item = &entry.item;
        if item.hide {
            continue;
        }
        let Some(primary) = item.primary_event().filter(|e| e.is_rest()) else {
            continue;
        };
        let Some(method) = primary.http_method() else {
            continue;
        };

        let uri = match item.rest_event() {
            Some(EventBinding::Rest {
                path: Some(path), ..
            }) if !path.is_empty() => path.clone(),
            _ => item.uri.clone(),
        };
        let uri = if uri.starts_with('/') {
            uri
        } else {
            format!("/{}", uri)
        };

        if let Some(previous) = grouped.entry(uri.clone()).or_default().insert(method.clone(), item)
        {
            debug!(
                uri = %uri,
                method = %method,
                replaced = %previous.name,
                by = %item.name,
                "operation redefined"
            );
        }
    }

    let mut paths = Map::new();
    for (uri, methods) in grouped {
        let mut path_item = Map::new();
        for (method, spec) in methods {
            path_item.insert(method.clone(), Value::Object(build_operation(spec, &method)));
        }
        paths.insert(uri, Value::Object(path_item));
    }
    paths
}

/// Build one OperationObject
fn build_operation(spec: &ApiSpec, method: &str) -> Map<String, Value> {
    let mut operation = Map::new();
    insert_opt(&mut operation, "description", spec.desc.as_deref());
    insert_opt(&mut operation, "summary", spec.summary.as_deref());
    insert_opt(&mut operation, "operationId", spec.operation_id.as_deref());

    let tags: Vec<&str> = std::iter::once(spec.category.as_str())
        .chain(spec.tags.iter().map(String::as_str))
        .collect();
    operation.insert("tags".to_string(), json!(tags));

    if !spec.no_auth {
        operation.insert("security".to_string(), json!([{ "bearerAuth": [] }]));
    }

    match &spec.responses {
        Some(Responses::Contract(contract)) => {
            operation.insert(
                "responses".to_string(),
                Value::Object(build_responses(spec, contract)),
            );
        }
        Some(Responses::Raw(raw)) => {
            operation.insert("responses".to_string(), raw.clone());
        }
        None => {}
    }

    let (parameters, body) = build_parameters(spec, method);
    operation.insert("parameters".to_string(), Value::Array(parameters));

    if method == "post" || method == "put" {
        operation.insert("requestBody".to_string(), body);
    }
    if let Some(request_body) = &spec.request_body {
        operation.insert("requestBody".to_string(), request_body.clone());
    }
    if let Some(request_query) = &spec.request_query {
        operation.insert("parameters".to_string(), request_query.clone());
    }

    operation
}

fn build_responses(spec: &ApiSpec, contract: &ResponseContract) -> Map<String, Value> {
    let status = contract
        .status_code
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "200".to_string());

    let mut properties = Map::new();
    for (name, raw) in &contract.schema.properties {
        let property = PropertySpec::from_value(raw);
        let mut schema = Map::new();
        schema.insert(
            "type".to_string(),
            Value::String(
                property
                    .property_type
                    .map(|t| t.to_lowercase())
                    .unwrap_or_else(|| UNSUPPORTED_TYPE.to_string()),
            ),
        );
        insert_opt(&mut schema, "description", property.desc.as_deref());
        if let Some(items) = property.items {
            schema.insert("items".to_string(), items);
        }
        properties.insert(name.clone(), Value::Object(schema));
    }

    let mut schema = Map::new();
    insert_opt(&mut schema, "type", contract.schema.schema_type.as_deref());
    insert_opt(&mut schema, "description", contract.schema.desc.as_deref());
    schema.insert("properties".to_string(), Value::Object(properties));
    if let Some(items) = &contract.schema.items {
        schema.insert("items".to_string(), items.clone());
    }

    let mut success = Map::new();
    insert_opt(&mut success, "description", contract.description.as_deref());
    success.insert(
        "content".to_string(),
        json!({ contract.content.as_str(): { "schema": schema } }),
    );

    let mut responses = Map::new();
    responses.insert(status, Value::Object(success));
    for (key, error) in &spec.errors {
        responses.insert(error.status_code.to_string(), json!({ "description": key }));
    }
    responses
}

/// Parameter objects plus the synthesized JSON request body
fn build_parameters(spec: &ApiSpec, method: &str) -> (Vec<Value>, Value) {
    let query_by_default = method == "get" || method == "delete";
    let body_by_default = method == "post" || method == "put";

    let mut parameters = Vec::new();
    let mut required = Vec::new();
    let mut properties = Map::new();

    for (name, param) in &spec.parameters {
        let location = match param.location {
            Some(
                location @ (ParamLocation::Path | ParamLocation::Header | ParamLocation::Query),
            ) => Some(location.as_str()),
            None if query_by_default => Some(ParamLocation::Query.as_str()),
            _ => None,
        };
        if let Some(location) = location {
            parameters.push(parameter_object(name, location, param));
        }

        let in_body = match param.location {
            Some(ParamLocation::Body) => true,
            None => body_by_default,
            _ => false,
        };
        if in_body {
            if param.is_required() {
                required.push(Value::String(name.clone()));
            }
            let mut property = Map::new();
            insert_opt(&mut property, "description", param.desc.as_deref());
            insert_opt(&mut property, "type", param.schema_type().as_deref());
            if let Some(nested) = &param.properties {
                property.insert("properties".to_string(), nested.clone());
            }
            properties.insert(name.clone(), Value::Object(property));
        }
    }

    let body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "required": required,
                    "properties": properties
                }
            }
        }
    });

    (parameters, body)
}

fn parameter_object(name: &str, location: &str, param: &ParamSpec) -> Value {
    let mut object = Map::new();
    object.insert("name".to_string(), Value::String(name.to_string()));
    object.insert("in".to_string(), Value::String(location.to_string()));
    insert_opt(&mut object, "description", param.desc.as_deref());
    if let Some(required) = param.required.or(param.req) {
        object.insert("required".to_string(), Value::Bool(required));
    }
    let mut schema = Map::new();
    insert_opt(&mut schema, "type", param.schema_type().as_deref());
    object.insert("schema".to_string(), Value::Object(schema));
    Value::Object(object)
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Assemble the full document from project info, paths and components
pub fn build_document(
    info: &ProjectInfo,
    paths: Map<String, Value>,
    components: Map<String, Value>,
) -> Value {
    let mut components = components;
    components.insert(
        "securitySchemes".to_string(),
        json!({ "bearerAuth": { "type": "http", "scheme": "bearer" } }),
    );

    let mut document = Map::new();
    document.insert("openapi".to_string(), json!("3.0.0"));
    document.insert("info".to_string(), Value::Object(info.info.clone()));
    if let Some(servers) = &info.servers {
        document.insert("servers".to_string(), servers.clone());
    }
    document.insert("paths".to_string(), Value::Object(paths));
    document.insert("components".to_string(), Value::Object(components));
    Value::Object(document)
}

/// Generates and writes `api_doc_<stage>.yml`
pub struct OpenApiGenerator<'a> {
    registry: &'a SpecRegistry,
    info: &'a ProjectInfo,
}

impl<'a> OpenApiGenerator<'a> {
    pub fn new(registry: &'a SpecRegistry, info: &'a ProjectInfo) -> Self {
        Self { registry, info }
    }

    /// Build the document, reading components from `components_dir`
    pub fn generate(&self, components_dir: &Path) -> Result<Value> {
        let paths = generate_paths(self.registry);
        let components = generate_components(components_dir)?;
        debug!(
            paths = paths.len(),
            components = components.len(),
            "openapi document assembled"
        );
        Ok(build_document(self.info, paths, components))
    }

    /// Generate and write the document as YAML
    pub fn write(&self, components_dir: &Path, output_path: &Path) -> Result<()> {
        let document = self.generate(components_dir)?;
        let rendered = serde_yaml::to_string(&document)?;

        fs::write(output_path, rendered).map_err(|e| {
            BuilderError::Generation(format!("Failed to write {:?}: {}", output_path, e))
        })?;

        info!(path = %output_path.display(), "wrote OpenAPI document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(raw: Value) -> ApiSpec {
        serde_json::from_value(raw).unwrap()
    }

    fn registry(specs: Vec<Value>) -> SpecRegistry {
        let mut registry = SpecRegistry::new();
        for raw in specs {
            let item = spec(raw);
            registry.insert(format!("/src/lambda/{}.yml", item.name), item);
        }
        registry
    }

    #[test]
    fn test_non_rest_and_hidden_specs_skipped() {
        let registry = registry(vec![
            json!({ "category": "Q", "name": "q/consume", "uri": "q/consume",
                    "event": [{ "type": "sqs", "sqs": "Q" }, { "type": "REST", "method": "post" }] }),
            json!({ "category": "P", "name": "p/get", "uri": "p", "hide": true,
                    "event": [{ "type": "REST", "method": "get" }] }),
            json!({ "category": "D", "name": "d/get", "uri": "d",
                    "event": [{ "type": "datatable" }] }),
            json!({ "category": "N", "name": "n/none", "uri": "n/none" }),
        ]);

        assert!(generate_paths(&registry).is_empty());
    }

    #[test]
    fn test_path_override_and_leading_slash() {
        let registry = registry(vec![
            json!({ "category": "P", "name": "p/get", "uri": "p",
                    "event": [{ "type": "REST", "method": "GET", "path": "/custom/{id}" }] }),
            json!({ "category": "U", "name": "u/delete", "uri": "u",
                    "event": [{ "type": "REST", "method": "Delete" }] }),
        ]);

        let paths = generate_paths(&registry);
        let keys: Vec<&String> = paths.keys().collect();
        assert_eq!(keys, vec!["/custom/{id}", "/u"]);
        assert!(paths["/u"].get("delete").is_some());
    }

    #[test]
    fn test_same_uri_and_method_last_wins() {
        let registry = registry(vec![
            json!({ "category": "A", "name": "a/get", "uri": "pet", "desc": "first",
                    "event": [{ "type": "REST", "method": "get" }] }),
            json!({ "category": "B", "name": "b/get", "uri": "pet", "desc": "second",
                    "event": [{ "type": "REST", "method": "get" }] }),
        ]);

        let paths = generate_paths(&registry);
        assert_eq!(paths["/pet"]["get"]["description"], "second");
    }

    #[test]
    fn test_operation_metadata_and_security() {
        let open = spec(json!({
            "category": "Pet", "name": "pet/get", "uri": "pet", "summary": "List",
            "operationId": "listPets", "tags": ["public"], "noAuth": true,
            "event": [{ "type": "REST", "method": "get" }]
        }));
        let operation = build_operation(&open, "get");
        assert_eq!(operation["tags"], json!(["Pet", "public"]));
        assert_eq!(operation["operationId"], "listPets");
        assert!(operation.get("security").is_none());
        assert!(operation.get("requestBody").is_none());

        let secured = spec(json!({ "category": "Pet", "name": "pet/get" }));
        let operation = build_operation(&secured, "get");
        assert_eq!(operation["security"], json!([{ "bearerAuth": [] }]));
    }

    #[test]
    fn test_content_responses_and_errors() {
        let item = spec(json!({
            "category": "Pet",
            "name": "pet/get",
            "responses": {
                "description": "a pet",
                "content": "application/json",
                "statusCode": 201,
                "schema": {
                    "type": "object",
                    "desc": "pet body",
                    "properties": {
                        "id": { "type": "String", "desc": "pet id" },
                        "tags": { "type": "Array", "items": { "type": "string" } },
                        "mystery": { "desc": "no type" }
                    }
                }
            },
            "errors": {
                "notFound": { "status_code": 404, "reason": "no pet" },
                "gone": { "status_code": "410", "reason": "deleted" }
            }
        }));

        let operation = build_operation(&item, "get");
        let responses = &operation["responses"];
        let schema = &responses["201"]["content"]["application/json"]["schema"];

        assert_eq!(responses["201"]["description"], "a pet");
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["description"], "pet body");
        assert_eq!(
            schema["properties"]["id"],
            json!({ "type": "string", "description": "pet id" })
        );
        assert_eq!(schema["properties"]["tags"]["items"], json!({ "type": "string" }));
        assert_eq!(schema["properties"]["mystery"]["type"], UNSUPPORTED_TYPE);
        assert_eq!(responses["404"], json!({ "description": "notFound" }));
        assert_eq!(responses["410"], json!({ "description": "gone" }));
    }

    #[test]
    fn test_raw_responses_copied_and_errors_ignored() {
        let item = spec(json!({
            "category": "Pet",
            "name": "pet/get",
            "responses": { "200": { "description": "ok" } },
            "errors": { "notFound": { "status_code": 404 } }
        }));

        let operation = build_operation(&item, "get");
        assert_eq!(operation["responses"], json!({ "200": { "description": "ok" } }));
    }

    #[test]
    fn test_parameter_locations() {
        let item = spec(json!({
            "category": "Pet",
            "name": "pet/put",
            "parameters": {
                "id": { "type": "String", "in": "path", "req": true, "desc": "pet id" },
                "token": { "type": "String", "in": "header" },
                "dry": { "type": "Boolean", "in": "query" },
                "name": { "type": "String", "required": true },
                "meta": { "type": "Object", "in": "body", "properties": { "k": { "type": "string" } } },
                "session": { "type": "String", "in": "cookie" }
            }
        }));

        let operation = build_operation(&item, "put");
        assert_eq!(
            operation["parameters"],
            json!([
                { "name": "id", "in": "path", "description": "pet id", "required": true,
                  "schema": { "type": "string" } },
                { "name": "token", "in": "header", "schema": { "type": "string" } },
                { "name": "dry", "in": "query", "schema": { "type": "boolean" } }
            ])
        );

        let body = &operation["requestBody"];
        assert_eq!(body["required"], true);
        let schema = &body["content"]["application/json"]["schema"];
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(
            schema["properties"]["meta"],
            json!({ "type": "object", "properties": { "k": { "type": "string" } } })
        );
        assert_eq!(schema["properties"]["name"], json!({ "type": "string" }));
    }

    #[test]
    fn test_empty_post_body_still_emitted() {
        let item = spec(json!({ "category": "Pet", "name": "pet/post" }));
        let operation = build_operation(&item, "post");

        assert_eq!(operation["parameters"], json!([]));
        assert_eq!(
            operation["requestBody"]["content"]["application/json"]["schema"],
            json!({ "type": "object", "required": [], "properties": {} })
        );
    }

    #[test]
    fn test_request_overrides_win() {
        let item = spec(json!({
            "category": "Pet",
            "name": "pet/post",
            "parameters": { "name": { "type": "String" } },
            "requestBody": { "$ref": "#/components/requestBodies/Pet" },
            "requestQuery": [{ "$ref": "#/components/parameters/Limit" }]
        }));

        let operation = build_operation(&item, "post");
        assert_eq!(
            operation["requestBody"],
            json!({ "$ref": "#/components/requestBodies/Pet" })
        );
        assert_eq!(
            operation["parameters"],
            json!([{ "$ref": "#/components/parameters/Limit" }])
        );
    }

    #[test]
    fn test_build_document() {
        let info = ProjectInfo::from_yaml(
            "info:\n  title: Petstore\n  version: 1.0.0\nservers:\n  - url: https://api.example.com\n",
        )
        .unwrap();
        let mut components = Map::new();
        components.insert("schemas".to_string(), json!({ "Pet": { "type": "object" } }));

        let document = build_document(&info, Map::new(), components);

        assert_eq!(document["openapi"], "3.0.0");
        assert_eq!(document["info"]["title"], "Petstore");
        assert_eq!(document["servers"][0]["url"], "https://api.example.com");
        assert_eq!(document["components"]["schemas"]["Pet"]["type"], "object");
        assert_eq!(
            document["components"]["securitySchemes"]["bearerAuth"],
            json!({ "type": "http", "scheme": "bearer" })
        );
    }
}
