//! Common types and utilities for apispec-builder
//!
//! This crate contains the API spec data model, the spec registry, path/name
//! derivation helpers, run configuration and the error type shared by the
//! loader, generator and CLI components.

mod config;
pub mod naming;
mod project_info;
mod registry;
mod spec;

pub use config::BuilderConfig;
pub use project_info::ProjectInfo;
pub use registry::{RegistryEntry, SpecRegistry};
pub use spec::{
    is_truthy, ApiSpec, ErrorSpec, EventBinding, NumberLike, ParamLocation, ParamSpec,
    PropertySpec, ResponseContract, ResponseSchema, Responses,
};

use thiserror::Error;

/// Errors that can occur while loading specs or generating artifacts
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Path {path} does not contain the root marker segment '{marker}'")]
    MissingRootMarker { path: String, marker: String },

    #[error("State machine '{0}' is not defined in resources.Resources")]
    StateMachineNotFound(String),

    #[error("Cannot find state '{state}' in state machine '{machine}'")]
    StateNotFound { machine: String, state: String },

    #[error("State '{state}' matched {count} times in state machine '{machine}'")]
    AmbiguousState {
        machine: String,
        state: String,
        count: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, BuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_messages() {
        let err = BuilderError::StateNotFound {
            machine: "OrderMachine".to_string(),
            state: "Charge".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot find state 'Charge' in state machine 'OrderMachine'"
        );

        let err = BuilderError::AmbiguousState {
            machine: "OrderMachine".to_string(),
            state: "Charge".to_string(),
            count: 2,
        };
        assert!(err.to_string().contains("matched 2 times"));
    }
}
