use super::{Diagnostics, Schema};
use serde::Serialize;
use serde_json::Value;

pub struct CreateRequest {
    pub plan: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct CreateResponse {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub struct ReadRequest {
    pub state: Value,
}

/// `state == None` means the object no longer exists and must be dropped from state.
#[derive(Debug, Default, Serialize)]
pub struct ReadResponse {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub struct UpdateRequest {
    pub plan: Value,
    pub state: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateResponse {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub struct DeleteRequest {
    pub state: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

pub struct ImportStateRequest {
    pub id: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportStateResponse {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

/// Lifecycle contract between a managed resource type and the orchestrator driving it.
///
/// Operations never fail with `Err`: every problem is reported through the
/// response diagnostics so the orchestrator can show it to the user.
#[allow(async_fn_in_trait)]
pub trait Resource {
    /// Type name as referenced from configuration, e.g. `k8s_core_v1_service_account`
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, request: CreateRequest) -> CreateResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse;
}
