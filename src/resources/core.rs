use serde::{Deserialize, Serialize};

pub mod service_account;

pub const GROUP: &str = "";
pub const VERSION: &str = "v1";

/// Reference to an object in the same namespace, same shape in state and on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// State form of `core/v1 ObjectReference`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl From<k8s_openapi::api::core::v1::ObjectReference> for ObjectReference {
    fn from(r: k8s_openapi::api::core::v1::ObjectReference) -> Self {
        Self {
            api_version: r.api_version,
            field_path: r.field_path,
            kind: r.kind,
            name: r.name,
            namespace: r.namespace,
            resource_version: r.resource_version,
            uid: r.uid,
        }
    }
}

impl From<ObjectReference> for k8s_openapi::api::core::v1::ObjectReference {
    fn from(r: ObjectReference) -> Self {
        Self {
            api_version: r.api_version,
            field_path: r.field_path,
            kind: r.kind,
            name: r.name,
            namespace: r.namespace,
            resource_version: r.resource_version,
            uid: r.uid,
        }
    }
}
