//! Deployment descriptor (`serverless.yml`) generation
//!
//! Generation runs in two phases. [`DeploymentGenerator::plan`] walks the
//! registry and produces function descriptors, state machine patches and extra
//! resources without touching the template. [`DeploymentGenerator::apply`]
//! then merges the plan into the template document.

use apispec_builder_common::naming::{capitalize_first, function_key};
use apispec_builder_common::{
    is_truthy, ApiSpec, BuilderError, EventBinding, NumberLike, Result, SpecRegistry,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// One entry of the deployment document's `functions` map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub name: String,
    pub handler: String,
    pub events: Vec<TriggerEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage_size: Option<i64>,
}

/// A trigger wired to a function, in deployment document shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerEvent {
    Websocket {
        route: String,
    },
    HttpApi {
        path: String,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        authorizer: Option<Value>,
    },
    S3 {
        bucket: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<Value>,
        existing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    Sqs {
        arn: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        batch_size: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum_batching_window: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum_concurrency: Option<Value>,
    },
    CognitoUserPool {
        #[serde(skip_serializing_if = "Option::is_none")]
        pool: Option<YamlValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trigger: Option<Value>,
        existing: bool,
    },
    Iot {
        sql: String,
        enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    Stream {
        #[serde(rename = "type")]
        stream_type: String,
        arn: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        filter_patterns: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    CloudFront {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_type: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<Value>,
    },
}

/// Points a state machine task at a generated function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePatch {
    pub machine: String,
    pub state: String,
    pub function_name: String,
}

/// Everything phase one derives from the registry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentPlan {
    pub functions: IndexMap<String, FunctionDescriptor>,
    pub patches: Vec<TemplatePatch>,
    pub extra_resources: IndexMap<String, Value>,
    /// Whether any REST binding was wired
    pub rest_seen: bool,
}

/// Builds the deployment document for one stage and version
#[derive(Debug, Clone)]
pub struct DeploymentGenerator {
    stage: String,
    version: String,
    handler_prefix: String,
}

impl DeploymentGenerator {
    pub fn new(stage: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            version: version.into(),
            handler_prefix: "src/lambda".to_string(),
        }
    }

    /// Override the directory prefix of generated `handler` references
    pub fn with_handler_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.handler_prefix = prefix.into();
        self
    }

    /// Derive function descriptors, patches and extra resources
    ///
    /// `template` is only read, for cognito pool lookups.
    pub fn plan(&self, template: &YamlValue, registry: &SpecRegistry) -> DeploymentPlan {
        let mut plan = DeploymentPlan::default();

        for entry in registry.entries() {
            let item = &entry.item;
            if item.is_disabled_for(&self.stage) {
                debug!(name = %item.name, stage = %self.stage, "function disabled for stage");
                continue;
            }

            let target = item.target_function.as_deref().unwrap_or(&item.name);
            let segments: Vec<&str> = target.split('/').collect();
            let function_name = item
                .function_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| {
                    format!(
                        "${{self:service}}_{}_{}_{}",
                        self.stage,
                        self.version,
                        segments.join("_")
                    )
                });

            let mut descriptor = FunctionDescriptor {
                name: function_name.clone(),
                handler: format!(
                    "{}/{}.handler",
                    self.handler_prefix.trim_end_matches('/'),
                    target
                ),
                events: Vec::new(),
                layers: item.layers(),
                timeout: item.timeout.as_ref().and_then(NumberLike::non_zero),
                environment: truthy(&item.environment),
                role: truthy(&item.role),
                memory_size: item.memory_size.as_ref().and_then(NumberLike::non_zero),
                url: truthy(&item.url),
                ephemeral_storage_size: item
                    .ephemeral_storage_size
                    .as_ref()
                    .and_then(NumberLike::non_zero),
            };

            for binding in &item.event {
                if let Some(event) = self.trigger_event(item, binding, template, &mut plan) {
                    descriptor.events.push(event);
                }
                if let EventBinding::Sfn {
                    machine_name,
                    state_name,
                } = binding
                {
                    plan.patches.push(TemplatePatch {
                        machine: machine_name.clone(),
                        state: state_name.clone(),
                        function_name: function_name.clone(),
                    });
                }
            }

            if descriptor.url.is_some() && item.response_stream {
                let key = capitalize_first(&format!(
                    "{}LambdaFunctionUrl",
                    segments.join("Underscore")
                ));
                plan.extra_resources.insert(
                    key,
                    json!({ "Properties": { "InvokeMode": "RESPONSE_STREAM" } }),
                );
            }

            let key = function_key(target);
            if plan.functions.contains_key(&key) {
                warn!(
                    key = %key,
                    path = %entry.path.display(),
                    "duplicate function key, keeping the later spec"
                );
            }
            plan.functions.insert(key, descriptor);
        }

        plan
    }

    fn trigger_event(
        &self,
        item: &ApiSpec,
        binding: &EventBinding,
        template: &YamlValue,
        plan: &mut DeploymentPlan,
    ) -> Option<TriggerEvent> {
        let event = match binding {
            EventBinding::Websocket { route } => {
                if route.is_empty() {
                    warn!(name = %item.name, "websocket binding declares no route");
                }
                TriggerEvent::Websocket {
                    route: route.clone(),
                }
            }
            EventBinding::Rest {
                method,
                path,
                authorizer,
            } => {
                plan.rest_seen = true;
                let route = item.target_function.as_deref().unwrap_or(&item.uri);
                TriggerEvent::HttpApi {
                    path: path
                        .clone()
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(|| format!("/{}/{}", self.stage, route)),
                    method: method.to_lowercase(),
                    authorizer: authorizer.clone(),
                }
            }
            EventBinding::S3 {
                bucket,
                event,
                existing,
                rules,
            } => TriggerEvent::S3 {
                bucket: bucket.clone(),
                event: event.clone(),
                existing: *existing,
                rules: rules.clone(),
            },
            EventBinding::Sqs {
                sqs,
                sqs_arn,
                batch_size,
                maximum_batching_window,
                maximum_concurrency,
            } => {
                let arn = match sqs_arn.as_ref().filter(|arn| is_truthy(arn)) {
                    Some(arn) => arn.clone(),
                    None => {
                        if sqs.is_none() {
                            warn!(
                                name = %item.name,
                                "sqs binding names neither a queue nor an ARN"
                            );
                        }
                        json!({ "Fn::GetAtt": [sqs, "Arn"] })
                    }
                };
                TriggerEvent::Sqs {
                    arn,
                    batch_size: batch_size.clone(),
                    maximum_batching_window: maximum_batching_window.clone(),
                    maximum_concurrency: maximum_concurrency.clone(),
                }
            }
            EventBinding::Cognito {
                pool_name_ref,
                trigger,
            } => {
                let pool = template
                    .get("custom")
                    .and_then(|custom| custom.get("apiSpec"))
                    .and_then(|refs| refs.get(pool_name_ref.as_str()))
                    .cloned();
                if pool.is_none() {
                    warn!(
                        name = %item.name,
                        pool = %pool_name_ref,
                        "cognito pool not found in custom.apiSpec"
                    );
                }
                TriggerEvent::CognitoUserPool {
                    pool,
                    trigger: trigger.clone(),
                    existing: true,
                }
            }
            EventBinding::Iot { topic } => TriggerEvent::Iot {
                sql: format!("select *, topic() as topic from \"{}\"", topic),
                enabled: true,
            },
            EventBinding::DynamodbStream { arn } => TriggerEvent::Stream {
                stream_type: "dynamodb".to_string(),
                arn: arn.clone(),
                filter_patterns: None,
            },
            EventBinding::KinesisStream { arn } => TriggerEvent::Stream {
                stream_type: "kinesis".to_string(),
                arn: arn.clone(),
                filter_patterns: None,
            },
            EventBinding::Ddb {
                table,
                filter_patterns,
            } => TriggerEvent::Stream {
                stream_type: "dynamodb".to_string(),
                arn: json!({ "Fn::GetAtt": [table, "StreamArn"] }),
                filter_patterns: filter_patterns.clone(),
            },
            EventBinding::CloudFront { event_type, origin } => TriggerEvent::CloudFront {
                event_type: event_type.clone(),
                origin: origin.clone(),
            },
            EventBinding::Datatable { authorizer } => TriggerEvent::HttpApi {
                path: format!("/{}/{}", self.stage, item.uri),
                method: "get".to_string(),
                authorizer: authorizer.clone(),
            },
            EventBinding::Sfn { .. } | EventBinding::Pure | EventBinding::Unknown => return None,
        };
        Some(event)
    }

    /// Merge a plan into the template
    ///
    /// Patches are applied first, so a missing state fails before anything
    /// else is touched.
    pub fn apply(&self, template: YamlValue, plan: &DeploymentPlan) -> Result<YamlValue> {
        let mut document = match template {
            YamlValue::Null => YamlValue::Mapping(Mapping::new()),
            YamlValue::Mapping(_) => template,
            _ => {
                return Err(BuilderError::Generation(
                    "Deployment template must be a YAML mapping".to_string(),
                ))
            }
        };

        for patch in &plan.patches {
            apply_patch(&mut document, patch)?;
        }

        let root = as_mapping(&mut document, "template root")?;

        let template_functions = root
            .get_mut("functions")
            .map(|v| std::mem::replace(v, YamlValue::Null));
        let mut functions = Mapping::new();
        for (key, descriptor) in &plan.functions {
            // serde_yaml writes enum variants as tags; the JSON detour keeps
            // trigger events as single-key mappings.
            let descriptor = serde_yaml::to_value(serde_json::to_value(descriptor)?)?;
            functions.insert(YamlValue::from(key.as_str()), descriptor);
        }
        if let Some(YamlValue::Mapping(overrides)) = template_functions {
            for (key, value) in overrides {
                if functions.contains_key(&key) {
                    debug!(key = ?key, "template function overrides generated descriptor");
                }
                functions.insert(key, value);
            }
        }
        root.insert("functions".into(), YamlValue::Mapping(functions));

        child_mapping(root, "provider")?.insert(
            "stage".into(),
            YamlValue::from(format!("{}-{}", self.stage, self.version)),
        );

        let resources = child_mapping(root, "resources")?;
        let resource_map = child_mapping(resources, "Resources")?;
        for (key, value) in &plan.extra_resources {
            resource_map.insert(YamlValue::from(key.as_str()), serde_yaml::to_value(value)?);
        }

        let template_outputs = resources
            .get_mut("Outputs")
            .map(|v| std::mem::replace(v, YamlValue::Null));
        let mut outputs = Mapping::new();
        outputs.insert(
            "ServerlessDeploymentBucketName".into(),
            serde_yaml::to_value(json!({
                "Export": { "Name": "${self:provider.stackName}-ServiceEndpoint" },
                "Value": "${self:provider.stackName}-ServiceEndpoint"
            }))?,
        );
        if let Some(YamlValue::Mapping(existing)) = template_outputs {
            for (key, value) in existing {
                outputs.insert(key, value);
            }
        }
        if plan.rest_seen {
            for name in ["HttpApiUrl", "HttpApiId"] {
                outputs.insert(
                    name.into(),
                    serde_yaml::to_value(json!({
                        "Export": { "Name": format!("${{self:provider.stackName}}-{}", name) }
                    }))?,
                );
            }
        }
        resources.insert("Outputs".into(), YamlValue::Mapping(outputs));

        Ok(document)
    }

    /// Plan, merge and serialize
    pub fn generate(&self, template: YamlValue, registry: &SpecRegistry) -> Result<String> {
        let plan = self.plan(&template, registry);
        debug!(
            functions = plan.functions.len(),
            patches = plan.patches.len(),
            rest = plan.rest_seen,
            "deployment plan ready"
        );
        let document = self.apply(template, &plan)?;
        Ok(serde_yaml::to_string(&document)?)
    }

    /// Read the template, generate and write the deployment document
    pub fn write(
        &self,
        template_path: &Path,
        output_path: &Path,
        registry: &SpecRegistry,
    ) -> Result<()> {
        let template = load_template(template_path)?;
        let rendered = self.generate(template, registry)?;

        fs::write(output_path, rendered).map_err(|e| {
            BuilderError::Generation(format!("Failed to write {:?}: {}", output_path, e))
        })?;

        info!(path = %output_path.display(), stage = %self.stage, "wrote deployment document");
        Ok(())
    }
}

/// Read and parse the base deployment template
pub fn load_template(path: &Path) -> Result<YamlValue> {
    let content = fs::read_to_string(path).map_err(|e| {
        BuilderError::Parse(format!("Failed to read deployment template {:?}: {}", path, e))
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        BuilderError::Parse(format!(
            "Failed to parse deployment template from {:?}: {}",
            path, e
        ))
    })
}

fn truthy(value: &Option<Value>) -> Option<Value> {
    value.as_ref().filter(|v| is_truthy(v)).cloned()
}

fn as_mapping<'a>(value: &'a mut YamlValue, what: &str) -> Result<&'a mut Mapping> {
    value
        .as_mapping_mut()
        .ok_or_else(|| BuilderError::Generation(format!("Expected a mapping at {}", what)))
}

/// Mapping under `key`, created when absent or null
fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> Result<&'a mut Mapping> {
    let slot = parent.entry(YamlValue::from(key)).or_insert(YamlValue::Null);
    if slot.is_null() {
        *slot = YamlValue::Mapping(Mapping::new());
    }
    as_mapping(slot, key)
}

fn apply_patch(document: &mut YamlValue, patch: &TemplatePatch) -> Result<()> {
    let machine = document
        .get_mut("resources")
        .and_then(|r| r.get_mut("Resources"))
        .and_then(|r| r.get_mut(patch.machine.as_str()))
        .ok_or_else(|| BuilderError::StateMachineNotFound(patch.machine.clone()))?;

    let not_found = || BuilderError::StateNotFound {
        machine: patch.machine.clone(),
        state: patch.state.clone(),
    };

    let states = machine
        .get_mut("Properties")
        .and_then(|p| p.get_mut("Definition"))
        .and_then(|d| d.get_mut("States"))
        .ok_or_else(not_found)?;

    match count_key(states, &patch.state) {
        0 => return Err(not_found()),
        1 => {}
        count => {
            return Err(BuilderError::AmbiguousState {
                machine: patch.machine.clone(),
                state: patch.state.clone(),
                count,
            })
        }
    }

    let state = find_key_mut(states, &patch.state).ok_or_else(not_found)?;
    if state.is_null() {
        *state = YamlValue::Mapping(Mapping::new());
    }
    let state = as_mapping(state, &patch.state)?;
    child_mapping(state, "Parameters")?.insert(
        "FunctionName".into(),
        YamlValue::from(patch.function_name.as_str()),
    );

    debug!(
        machine = %patch.machine,
        state = %patch.state,
        function = %patch.function_name,
        "patched state machine task"
    );
    Ok(())
}

/// Number of mapping keys equal to `key` anywhere below `value`
fn count_key(value: &YamlValue, key: &str) -> usize {
    match value {
        YamlValue::Mapping(map) => map
            .iter()
            .map(|(k, v)| usize::from(k.as_str() == Some(key)) + count_key(v, key))
            .sum(),
        YamlValue::Sequence(items) => items.iter().map(|v| count_key(v, key)).sum(),
        YamlValue::Tagged(tagged) => count_key(&tagged.value, key),
        _ => 0,
    }
}

fn find_key_mut<'a>(value: &'a mut YamlValue, key: &str) -> Option<&'a mut YamlValue> {
    match value {
        YamlValue::Mapping(map) => {
            for (k, v) in map.iter_mut() {
                if k.as_str() == Some(key) {
                    return Some(v);
                }
                if let Some(found) = find_key_mut(v, key) {
                    return Some(found);
                }
            }
            None
        }
        YamlValue::Sequence(items) => items.iter_mut().find_map(|v| find_key_mut(v, key)),
        YamlValue::Tagged(tagged) => find_key_mut(&mut tagged.value, key),
        _ => None,
    }
}
