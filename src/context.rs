use crate::{Error, Result, Settings};
use kube::Client as KubeClient;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use std::sync::Arc;
use tracing::*;

/// Context shared by every resource the provider manages
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub kube_client: KubeClient,
    /// Settings
    pub settings: Arc<Settings>,
}

impl Context {
    pub fn new(kube_client: KubeClient, settings: Settings) -> Context {
        Context {
            kube_client,
            settings: Arc::new(settings),
        }
    }

    /// Build a client from the configured kubeconfig, or infer one from the environment
    pub async fn connect(settings: Settings) -> Result<Context> {
        let kubernetes = settings.kubernetes();
        let options = KubeConfigOptions {
            context: kubernetes.context.clone(),
            cluster: kubernetes.cluster.clone(),
            user: kubernetes.user.clone(),
        };

        let config = match &kubernetes.config_path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(Error::KubeconfigError)?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(Error::KubeconfigError)?
            }
            None if options.context.is_some()
                || options.cluster.is_some()
                || options.user.is_some() =>
            {
                Config::from_kubeconfig(&options)
                    .await
                    .map_err(Error::KubeconfigError)?
            }
            None => Config::infer().await.map_err(Error::InferConfigError)?,
        };

        info!(
            "Connecting to Kubernetes cluster_url={} default_namespace={}",
            config.cluster_url, config.default_namespace
        );
        let kube_client = KubeClient::try_from(config).map_err(Error::KubeError)?;

        Ok(Context::new(kube_client, settings))
    }
}
