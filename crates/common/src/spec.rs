//! API spec data model
//!
//! `ApiSpec` is the declarative record stored next to each handler. Fields the
//! generators copy through verbatim (authorizers, environment blocks, OpenAPI
//! overrides) are kept as `serde_json::Value`.

use crate::{BuilderError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declarative description of one function's triggers and contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    /// Registry bucket and OpenAPI tag
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Defaults to `name` once loaded
    #[serde(
        rename = "operationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_id: Option<String>,

    /// Extra OpenAPI tags appended after the category
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Trigger bindings, always in list form after loading
    #[serde(default)]
    pub event: Vec<EventBinding>,

    #[serde(default)]
    pub parameters: IndexMap<String, ParamSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Responses>,

    #[serde(default)]
    pub errors: IndexMap<String, ErrorSpec>,

    /// Verbatim OpenAPI `requestBody` override
    #[serde(
        rename = "requestBody",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_body: Option<Value>,

    /// Verbatim OpenAPI `parameters` override
    #[serde(
        rename = "requestQuery",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_query: Option<Value>,

    /// Slash-joined path segments after the root marker, extension stripped
    #[serde(default)]
    pub name: String,

    /// `name` with HTTP method segments removed
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_stages: Vec<String>,

    #[serde(
        rename = "functionName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub function_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_function: Option<String>,

    /// A single layer reference or a list of them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<NumberLike>,

    #[serde(
        rename = "memorySize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_size: Option<NumberLike>,

    #[serde(
        rename = "ephemeralStorageSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ephemeral_storage_size: Option<NumberLike>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,

    /// Lambda function URL configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,

    #[serde(default)]
    pub response_stream: bool,

    #[serde(rename = "noAuth", default)]
    pub no_auth: bool,

    /// Excluded from the OpenAPI document
    #[serde(default)]
    pub hide: bool,
}

impl ApiSpec {
    /// Whether the spec is excluded from deployment for `stage`
    pub fn is_disabled_for(&self, stage: &str) -> bool {
        self.disabled || self.disabled_stages.iter().any(|s| s == stage)
    }

    /// First binding, which decides the OpenAPI treatment
    pub fn primary_event(&self) -> Option<&EventBinding> {
        self.event.first()
    }

    /// First REST binding, if any
    pub fn rest_event(&self) -> Option<&EventBinding> {
        self.event.iter().find(|e| e.is_rest())
    }

    /// Layers normalized to a list
    pub fn layers(&self) -> Option<Vec<Value>> {
        match self.layer.as_ref()? {
            Value::Array(items) => Some(items.clone()),
            v if is_truthy(v) => Some(vec![v.clone()]),
            _ => None,
        }
    }
}

/// A trigger binding, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventBinding {
    #[serde(rename = "websocket")]
    Websocket {
        #[serde(default)]
        route: String,
    },

    #[serde(rename = "REST", alias = "rest", alias = "Rest")]
    Rest {
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorizer: Option<Value>,
    },

    #[serde(rename = "s3")]
    S3 {
        #[serde(default)]
        bucket: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event: Option<Value>,
        #[serde(default)]
        existing: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Value>,
    },

    #[serde(rename = "sqs")]
    Sqs {
        /// Logical id of a queue created in the same stack
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sqs: Option<String>,
        /// ARN of an externally managed queue
        #[serde(rename = "sqsARN", default, skip_serializing_if = "Option::is_none")]
        sqs_arn: Option<Value>,
        #[serde(rename = "batchSize", default, skip_serializing_if = "Option::is_none")]
        batch_size: Option<Value>,
        #[serde(
            rename = "maximumBatchingWindow",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        maximum_batching_window: Option<Value>,
        #[serde(
            rename = "maximumConcurrency",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        maximum_concurrency: Option<Value>,
    },

    #[serde(rename = "cognito")]
    Cognito {
        /// Key into the template's `custom.apiSpec` table
        #[serde(rename = "poolNameRef", default)]
        pool_name_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger: Option<Value>,
    },

    #[serde(rename = "sfn")]
    Sfn {
        #[serde(rename = "machineName", default)]
        machine_name: String,
        #[serde(rename = "stateName", default)]
        state_name: String,
    },

    #[serde(rename = "iot")]
    Iot {
        #[serde(default)]
        topic: String,
    },

    #[serde(rename = "dynamodb_stream")]
    DynamodbStream {
        #[serde(default)]
        arn: Value,
    },

    #[serde(rename = "kinesis_stream")]
    KinesisStream {
        #[serde(default)]
        arn: Value,
    },

    /// DynamoDB table stream created in the same stack
    #[serde(rename = "ddb")]
    Ddb {
        #[serde(default)]
        table: String,
        #[serde(
            rename = "filterPatterns",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        filter_patterns: Option<Value>,
    },

    #[serde(rename = "cloudFront")]
    CloudFront {
        #[serde(rename = "eventType", default, skip_serializing_if = "Option::is_none")]
        event_type: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<Value>,
    },

    /// Implicit GET route at the spec's uri
    #[serde(rename = "datatable")]
    Datatable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorizer: Option<Value>,
    },

    #[serde(rename = "pure")]
    Pure,

    #[serde(other)]
    Unknown,
}

impl EventBinding {
    pub fn is_rest(&self) -> bool {
        matches!(self, EventBinding::Rest { .. })
    }

    /// Lower-cased HTTP method for REST bindings, `get` for datatable
    pub fn http_method(&self) -> Option<String> {
        match self {
            EventBinding::Rest { method, .. } => Some(method.to_lowercase()),
            EventBinding::Datatable { .. } => Some("get".to_string()),
            _ => None,
        }
    }

    /// Short label used in documentation listings
    pub fn kind(&self) -> &'static str {
        match self {
            EventBinding::Websocket { .. } => "websocket",
            EventBinding::Rest { .. } => "rest",
            EventBinding::S3 { .. } => "s3",
            EventBinding::Sqs { .. } => "sqs",
            EventBinding::Cognito { .. } => "cognito",
            EventBinding::Sfn { .. } => "sfn",
            EventBinding::Iot { .. } => "iot",
            EventBinding::DynamodbStream { .. } => "dynamodb_stream",
            EventBinding::KinesisStream { .. } => "kinesis_stream",
            EventBinding::Ddb { .. } => "ddb",
            EventBinding::CloudFront { .. } => "cloudfront",
            EventBinding::Datatable { .. } => "datatable",
            EventBinding::Pure => "pure",
            EventBinding::Unknown => "unknown",
        }
    }
}

/// Where a parameter travels in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Header,
    Query,
    Body,
    #[serde(other)]
    Other,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Header => "header",
            ParamLocation::Query => "query",
            ParamLocation::Body => "body",
            ParamLocation::Other => "other",
        }
    }
}

/// Declared request parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParamLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Older spelling of `required`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Nested parameters of an object/array parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<IndexMap<String, ParamSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.required.or(self.req).unwrap_or(false)
    }

    /// Declared type, lower-cased
    pub fn schema_type(&self) -> Option<String> {
        self.param_type.as_ref().map(|t| t.to_lowercase())
    }
}

/// Declared error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSpec {
    pub status_code: NumberLike,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The `responses` block: a content contract, or anything else kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", untagged)]
pub enum Responses {
    Contract(ResponseContract),
    Raw(Value),
}

impl TryFrom<Value> for Responses {
    type Error = BuilderError;

    fn try_from(value: Value) -> Result<Self> {
        let has_content = value.get("content").map(is_truthy).unwrap_or(false);
        if !has_content {
            return Ok(Responses::Raw(value));
        }
        let contract = serde_json::from_value(value)
            .map_err(|e| BuilderError::Parse(format!("Invalid responses block: {}", e)))?;
        Ok(Responses::Contract(contract))
    }
}

/// Success response declared with a content type and schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Media type, e.g. `application/json`
    pub content: String,

    #[serde(default)]
    pub schema: ResponseSchema,

    #[serde(rename = "statusCode", default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<NumberLike>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Property values stay raw; list-shaped entries appear in datatable specs
    #[serde(default)]
    pub properties: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
}

/// Read-only view over one response schema property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySpec {
    pub property_type: Option<String>,
    pub desc: Option<String>,
    pub items: Option<Value>,
}

impl PropertySpec {
    pub fn from_value(value: &Value) -> Self {
        Self {
            property_type: value.get("type").and_then(Value::as_str).map(String::from),
            desc: value.get("desc").and_then(Value::as_str).map(String::from),
            items: value.get("items").cloned(),
        }
    }
}

/// Numeric setting that may be written as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberLike {
    /// Integer value, reading only the leading digits of strings ("30s" is 30)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberLike::Int(n) => Some(*n),
            NumberLike::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            NumberLike::Float(_) => None,
            NumberLike::Text(s) => {
                let trimmed = s.trim();
                let (sign, digits) = match trimmed.strip_prefix('-') {
                    Some(rest) => (-1, rest),
                    None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
                };
                let end = digits
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(digits.len());
                digits[..end].parse::<i64>().ok().map(|n| sign * n)
            }
        }
    }

    /// Integer value, treating zero as unset
    pub fn non_zero(&self) -> Option<i64> {
        self.as_i64().filter(|n| *n != 0)
    }
}

impl fmt::Display for NumberLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberLike::Int(n) => write!(f, "{}", n),
            NumberLike::Float(v) => write!(f, "{}", v),
            NumberLike::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Loose truthiness for values that are "set" when present and non-empty
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
