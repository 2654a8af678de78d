//! Artifact generation for apispec-builder
//!
//! This crate turns a loaded [`SpecRegistry`](apispec_builder_common::SpecRegistry)
//! into the deployment descriptor (`serverless.yml`), the OpenAPI document and
//! the documentation pages. Generators only read the registry.

mod components;
mod docs;
mod openapi;
mod serverless;
mod templates;

pub use components::{generate_components, COMPONENT_SECTIONS};
pub use docs::{
    publish_documentation, DocEntry, DocParam, DocumentationPage, DocumentationPublisher,
    MarkdownPublisher, S3DocEvent,
};
pub use openapi::{build_document, generate_paths, OpenApiGenerator};
pub use serverless::{
    load_template, DeploymentGenerator, DeploymentPlan, FunctionDescriptor, TemplatePatch,
    TriggerEvent,
};
