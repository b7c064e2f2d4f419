use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Kubeconfig Error: {0}")]
    KubeconfigError(#[source] kube::config::KubeconfigError),

    #[error("InferConfig Error: {0}")]
    InferConfigError(#[source] kube::config::InferConfigError),

    #[error("ConfigError: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("JsonPathError: {0}")]
    JsonPathError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IllegalImportId: {0}")]
    IllegalImportId(String),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Kubernetes answered with 404 for the requested object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(e)) if e.code == 404)
    }
}

/// Schema, diagnostics and the lifecycle contract every resource implements
pub mod framework;

/// Log integrations
pub mod telemetry;

/// Resources
pub mod resources;

/// JSONPath evaluation used by wait conditions
pub mod jsonpath;

/// Polling helpers
pub mod wait;

/// Settings
mod settings;
pub use settings::{Apply, Settings};

/// Context
mod context;
pub use context::*;

#[cfg(test)]
pub mod fixtures;
