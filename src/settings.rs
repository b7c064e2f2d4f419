use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FIELD_MANAGER: &str = "k8s-provider";

/// Where the Kubernetes client configuration comes from.
///
/// When nothing is set the in-cluster environment or the default kubeconfig is used.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Kubernetes {
    pub config_path: Option<String>,
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Apply {
    pub field_manager: String,
    pub force_conflicts: bool,
    pub wait_timeout_seconds: u64,
    pub poll_interval_millis: u64,
    pub delete_timeout_seconds: u64,
}

impl Default for Apply {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            wait_timeout_seconds: 30,
            poll_interval_millis: 1000,
            delete_timeout_seconds: 60,
        }
    }
}

impl Apply {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_seconds)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub kubernetes: Kubernetes,
    pub apply: Apply,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("/etc/k8s-provider/settings").required(false))
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("K8S_PROVIDER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn kubernetes(&self) -> &Kubernetes {
        &self.kubernetes
    }

    pub fn apply(&self) -> &Apply {
        &self.apply
    }
}
