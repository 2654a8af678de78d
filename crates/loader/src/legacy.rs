//! Older declaration shapes
//!
//! Early specs declared a single `event` object and kept the trigger kind and
//! most binding fields at the top level of the spec. They are rewritten into
//! the list form before deserialization so nothing downstream sees them.

use serde_json::{Map, Value};

/// Binding fields that older specs placed next to `type` at the top level
const TOP_LEVEL_BINDING_KEYS: [&str; 12] = [
    "method",
    "authorizer",
    "sqs",
    "sqsARN",
    "batchSize",
    "maximumBatchingWindow",
    "maximumConcurrency",
    "poolNameRef",
    "trigger",
    "machineName",
    "stateName",
    "topic",
];

/// Binding type tags as the data model spells them
const BINDING_TYPES: [&str; 13] = [
    "websocket",
    "REST",
    "s3",
    "sqs",
    "cognito",
    "sfn",
    "iot",
    "dynamodb_stream",
    "kinesis_stream",
    "ddb",
    "cloudFront",
    "datatable",
    "pure",
];

/// Rewrite a raw spec so that `event` is always a list
///
/// A missing or null `event` next to a top-level `type` is the legacy form
/// too. Binding types are matched case-insensitively and rewritten to their
/// canonical spelling.
///
/// Returns `true` when the legacy single-object form was rewritten.
pub fn normalize_event(spec: &mut Value) -> bool {
    let Some(doc) = spec.as_object_mut() else {
        return false;
    };

    let is_list = matches!(doc.get("event"), Some(Value::Array(_)));
    let is_absent = doc.get("event").map_or(true, Value::is_null);
    let has_top_level_type = doc.get("type").map_or(false, |t| !t.is_null());

    let rewritten = if is_list {
        false
    } else if is_absent && !has_top_level_type {
        doc.insert("event".to_string(), Value::Array(Vec::new()));
        false
    } else {
        let binding = legacy_binding(doc);
        doc.insert("event".to_string(), Value::Array(vec![binding]));
        true
    };

    if let Some(Value::Array(bindings)) = doc.get_mut("event") {
        bindings.iter_mut().for_each(canonicalize_type);
    }

    rewritten
}

fn canonicalize_type(binding: &mut Value) {
    let Some(Value::String(kind)) = binding.get_mut("type") else {
        return;
    };
    if let Some(canonical) = BINDING_TYPES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(kind.as_str()))
    {
        *kind = canonical.to_string();
    }
}

fn legacy_binding(doc: &Map<String, Value>) -> Value {
    let mut binding = match doc.get("event") {
        Some(Value::Object(fields)) => fields.clone(),
        _ => Map::new(),
    };

    for key in TOP_LEVEL_BINDING_KEYS {
        if let Some(value) = doc.get(key).filter(|v| !v.is_null()) {
            binding.insert(key.to_string(), value.clone());
        }
    }

    let kind = doc
        .get("type")
        .or_else(|| binding.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("pure")
        .to_string();

    if kind.eq_ignore_ascii_case("rest") {
        if let Some(Value::String(name)) = binding.get("authorizer") {
            let name = name.clone();
            let mut authorizer = Map::new();
            authorizer.insert("name".to_string(), Value::String(name));
            binding.insert("authorizer".to_string(), Value::Object(authorizer));
        }
    }

    binding.insert("type".to_string(), Value::String(kind));
    Value::Object(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_form_untouched() {
        let mut spec = json!({ "event": [{ "type": "REST", "method": "get" }] });
        let before = spec.clone();
        assert!(!normalize_event(&mut spec));
        assert_eq!(spec, before);
    }

    #[test]
    fn test_missing_event_becomes_empty_list() {
        let mut spec = json!({ "category": "Pet" });
        normalize_event(&mut spec);
        assert_eq!(spec["event"], json!([]));

        let mut spec = json!({ "category": "Pet", "event": null });
        normalize_event(&mut spec);
        assert_eq!(spec["event"], json!([]));
    }

    #[test]
    fn test_legacy_rest() {
        let mut spec = json!({
            "category": "Pet",
            "type": "REST",
            "method": "Post",
            "authorizer": "cognitoAuth",
            "event": { "method": "get" }
        });
        assert!(normalize_event(&mut spec));
        assert_eq!(
            spec["event"],
            json!([{
                "method": "Post",
                "authorizer": { "name": "cognitoAuth" },
                "type": "REST"
            }])
        );
    }

    #[test]
    fn test_legacy_s3_keeps_event_fields() {
        let mut spec = json!({
            "category": "Upload",
            "type": "s3",
            "event": { "bucket": "uploads", "event": "s3:ObjectCreated:*", "existing": true }
        });
        normalize_event(&mut spec);
        assert_eq!(
            spec["event"],
            json!([{
                "bucket": "uploads",
                "event": "s3:ObjectCreated:*",
                "existing": true,
                "type": "s3"
            }])
        );
    }

    #[test]
    fn test_legacy_sqs_fields_from_top_level() {
        let mut spec = json!({
            "category": "Queue",
            "type": "sqs",
            "sqs": "MyQueue",
            "batchSize": 10,
            "event": {}
        });
        normalize_event(&mut spec);
        assert_eq!(
            spec["event"],
            json!([{ "sqs": "MyQueue", "batchSize": 10, "type": "sqs" }])
        );
    }

    #[test]
    fn test_legacy_without_event_object() {
        let mut spec = json!({
            "category": "Queue",
            "type": "sqs",
            "sqs": "MyQueue"
        });
        assert!(normalize_event(&mut spec));
        assert_eq!(spec["event"], json!([{ "sqs": "MyQueue", "type": "sqs" }]));

        let mut spec = json!({
            "category": "Device",
            "type": "iot",
            "topic": "devices/+/state",
            "event": null
        });
        assert!(normalize_event(&mut spec));
        assert_eq!(
            spec["event"],
            json!([{ "topic": "devices/+/state", "type": "iot" }])
        );
    }

    #[test]
    fn test_binding_types_match_case_insensitively() {
        let mut spec = json!({
            "category": "Pet",
            "event": [
                { "type": "ReSt", "method": "get" },
                { "type": "CLOUDFRONT" },
                { "type": "Dynamodb_Stream", "arn": "arn:aws:dynamodb:stream" },
                { "type": "carrier-pigeon" }
            ]
        });
        assert!(!normalize_event(&mut spec));
        let kinds: Vec<&str> = spec["event"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["type"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec!["REST", "cloudFront", "dynamodb_stream", "carrier-pigeon"]
        );
    }

    #[test]
    fn test_legacy_without_type_is_pure() {
        let mut spec = json!({ "category": "Misc", "event": {} });
        normalize_event(&mut spec);
        assert_eq!(spec["event"], json!([{ "type": "pure" }]));
    }
}
