//! API documentation pages
//!
//! A [`DocumentationPage`] is a flat, render-ready summary of the registry.
//! Publishing is behind [`DocumentationPublisher`]; [`MarkdownPublisher`]
//! writes one Markdown file per page.

use crate::templates;
use apispec_builder_common::{
    ApiSpec, BuilderError, EventBinding, ParamSpec, ProjectInfo, Result, SpecRegistry,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tera::Tera;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One generated documentation page covering every spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentationPage {
    /// `<info.title>-<stage>-<version>`
    pub title: String,
    pub stage: String,
    pub version: String,
    pub description: String,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Value>,
    pub entries: Vec<DocEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocEntry {
    /// Counts down to 1 over the page
    pub seq: usize,
    pub name: String,
    pub category: String,
    /// `REST:GET`, `DATATABLE:GET`, `SQS`, ...
    pub kind: String,
    pub description: String,
    pub uri: Option<String>,
    pub method: Option<String>,
    pub parameters: Vec<DocParam>,
    pub errors: Vec<String>,
    pub sqs_arns: Vec<String>,
    pub s3_events: Vec<S3DocEvent>,
    /// Pretty-printed `responses` block
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocParam {
    pub line: String,
    pub sub: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct S3DocEvent {
    pub event: String,
    pub bucket: String,
    pub existing: bool,
}

impl DocumentationPage {
    /// Summarize the registry, categories in order and each category newest first
    pub fn build(
        registry: &SpecRegistry,
        info: &ProjectInfo,
        stage: &str,
        version: &str,
        generated_at: NaiveDateTime,
    ) -> Self {
        let generated_at = generated_at.format(TIMESTAMP_FORMAT).to_string();
        let mut seq = registry.len();
        let mut entries = Vec::with_capacity(seq);

        for (_, bucket) in registry.categories() {
            for entry in bucket.iter().rev() {
                entries.push(doc_entry(&entry.item, seq));
                seq = seq.saturating_sub(1);
            }
        }

        Self {
            title: format!("{}-{}-{}", info.title(), stage, version),
            stage: stage.to_string(),
            version: version.to_string(),
            description: format!("{}({})", info.description().unwrap_or_default(), generated_at),
            generated_at,
            contact: info.contact().cloned(),
            entries,
        }
    }
}

fn doc_entry(item: &ApiSpec, seq: usize) -> DocEntry {
    let primary = item.primary_event();
    let (kind, method) = match primary {
        Some(EventBinding::Rest { method, .. }) => (
            format!("REST:{}", method.to_uppercase()),
            Some(method.to_lowercase()),
        ),
        Some(EventBinding::Datatable { .. }) => {
            ("DATATABLE:GET".to_string(), Some("get".to_string()))
        }
        Some(binding) => (binding.kind().to_uppercase(), None),
        None => ("PURE".to_string(), None),
    };
    let is_http = method.is_some();

    let mut entry = DocEntry {
        seq,
        name: item.name.clone(),
        category: item.category.clone(),
        kind,
        description: item.desc.clone().unwrap_or_default(),
        uri: is_http.then(|| item.uri.to_lowercase()),
        method,
        parameters: Vec::new(),
        errors: Vec::new(),
        sqs_arns: Vec::new(),
        s3_events: Vec::new(),
        response: None,
    };

    for binding in &item.event {
        match binding {
            EventBinding::Sqs { sqs, sqs_arn, .. } => {
                let arn = sqs_arn
                    .as_ref()
                    .map(value_text)
                    .or_else(|| sqs.clone())
                    .unwrap_or_default();
                entry.sqs_arns.push(arn);
            }
            EventBinding::S3 {
                bucket,
                event,
                existing,
                ..
            } => entry.s3_events.push(S3DocEvent {
                event: event.as_ref().map(value_text).unwrap_or_default(),
                bucket: value_text(bucket),
                existing: *existing,
            }),
            _ => {}
        }
    }

    if is_http {
        entry.parameters = item
            .parameters
            .iter()
            .map(|(name, param)| DocParam {
                line: param_line(name, param),
                sub: param
                    .sub
                    .iter()
                    .flatten()
                    .map(|(sub_name, sub)| sub_param_line(sub_name, sub))
                    .collect(),
            })
            .collect();

        entry.errors = item
            .errors
            .iter()
            .map(|(key, error)| {
                format!(
                    "{}({}):{}",
                    key,
                    error.status_code,
                    error.reason.as_deref().unwrap_or_default()
                )
            })
            .collect();

        entry.response = item
            .responses
            .as_ref()
            .and_then(|r| serde_json::to_string_pretty(r).ok());
    }

    entry
}

/// `name[type](Optional):desc(min~max)`
fn param_line(name: &str, param: &ParamSpec) -> String {
    let param_type = param.param_type.as_deref().unwrap_or_default();
    let unit = if param_type.eq_ignore_ascii_case("string") {
        " chars"
    } else {
        ""
    };
    let range = match (&param.min, &param.max) {
        (Some(min), Some(max)) => format!("({}~{}{})", value_text(min), value_text(max), unit),
        (Some(min), None) => format!("({}~{})", value_text(min), unit),
        (None, Some(max)) => format!("(~{}{})", value_text(max), unit),
        (None, None) => String::new(),
    };

    format!(
        "{}[{}]{}:{}{}",
        name,
        param_type,
        if param.is_required() { "" } else { "(Optional)" },
        param.desc.as_deref().unwrap_or_default(),
        range
    )
}

fn sub_param_line(name: &str, param: &ParamSpec) -> String {
    format!(
        "{}[{}]{}:{}",
        name,
        param.param_type.as_deref().unwrap_or_default(),
        if param.is_required() { "" } else { "(Optional)" },
        param.desc.as_deref().unwrap_or_default()
    )
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Destination for generated documentation
#[cfg_attr(test, mockall::automock)]
pub trait DocumentationPublisher {
    fn publish(&self, page: &DocumentationPage) -> Result<()>;
}

/// Writes `<out_dir>/<title>.md`
pub struct MarkdownPublisher {
    out_dir: PathBuf,
    tera: Tera,
}

impl MarkdownPublisher {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            out_dir: out_dir.into(),
            tera: templates::load_templates()?,
        })
    }

    /// Render a page to Markdown
    pub fn render(&self, page: &DocumentationPage) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("page", page);
        self.tera
            .render("documentation.md", &context)
            .map_err(|e| {
                BuilderError::Template(format!("Failed to render documentation: {:?}", e))
            })
    }

    /// File the page is written to
    pub fn page_path(&self, page: &DocumentationPage) -> PathBuf {
        let file_name: String = page
            .title
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.out_dir.join(format!("{}.md", file_name))
    }
}

impl DocumentationPublisher for MarkdownPublisher {
    fn publish(&self, page: &DocumentationPage) -> Result<()> {
        fs::create_dir_all(&self.out_dir).map_err(|e| {
            BuilderError::Generation(format!("Failed to create docs directory: {}", e))
        })?;

        let rendered = self.render(page)?;
        let path = self.page_path(page);
        fs::write(&path, rendered).map_err(|e| {
            BuilderError::Generation(format!("Failed to write {:?}: {}", path, e))
        })?;

        info!(
            path = %path.display(),
            entries = page.entries.len(),
            "wrote documentation page"
        );
        Ok(())
    }
}

/// Build the page for a stage and hand it to `publisher`
pub fn publish_documentation<P: DocumentationPublisher + ?Sized>(
    publisher: &P,
    registry: &SpecRegistry,
    info: &ProjectInfo,
    stage: &str,
    version: &str,
    generated_at: NaiveDateTime,
) -> Result<DocumentationPage> {
    let page = DocumentationPage::build(registry, info, stage, version, generated_at);
    publisher.publish(&page)?;
    Ok(page)
}
