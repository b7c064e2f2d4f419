use crate::{Apply, framework::Schema};
use kube::api::{Api, DynamicObject};
use kube::client::Client as KubeClient;
use kube::discovery::ApiResource;

/// Kubernetes core API group
pub mod core;

/// Schema of every managed resource type, keyed by type name
pub fn schemas(defaults: &Apply) -> Vec<(&'static str, Schema)> {
    vec![(
        self::core::service_account::TYPE_NAME,
        self::core::service_account::schema(defaults),
    )]
}

/// All schemas as a multi-document YAML stream
pub fn schema_documents(defaults: &Apply) -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for (type_name, schema) in schemas(defaults) {
        out.push_str("---\n");
        out.push_str(&format!("# {type_name}\n"));
        out.push_str(&serde_yaml::to_string(&schema)?);
    }
    Ok(out)
}

/// Types with a compile time known group, version and kind.
pub trait HasApiResource {
    /// API group, empty for the core group
    const GROUP: &'static str;
    const VERSION: &'static str;
    const KIND: &'static str;
    /// Lowercase plural used in URL paths
    const PLURAL: &'static str;

    fn api_resource() -> ApiResource {
        let api_version = if Self::GROUP.is_empty() {
            Self::VERSION.to_string()
        } else {
            format!("{}/{}", Self::GROUP, Self::VERSION)
        };
        ApiResource {
            group: Self::GROUP.to_string(),
            version: Self::VERSION.to_string(),
            api_version,
            kind: Self::KIND.to_string(),
            plural: Self::PLURAL.to_string(),
        }
    }

    /// Dynamic client scoped to one namespace
    fn dynamic_api(client: KubeClient, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(client, namespace, &Self::api_resource())
    }
}
