use super::{GROUP, LocalObjectReference, ObjectReference, VERSION};
use crate::{
    Apply, Context, Error, Result,
    framework::{
        Attribute, CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, Diagnostics,
        ImportStateRequest, ImportStateResponse, PlanModifier, ReadRequest, ReadResponse,
        Resource, Schema, UpdateRequest, UpdateResponse, Validator,
    },
    jsonpath::JsonPath,
    resources::HasApiResource,
    wait::{self, WaitCondition},
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::*;

pub const TYPE_NAME: &str = "k8s_core_v1_service_account";

/// Configuration and state document of a managed ServiceAccount
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccountModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_conflicts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<Vec<WaitFor>>,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automount_service_account_token: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secrets: Option<Vec<LocalObjectReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<ObjectReference>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitFor {
    pub jsonpath: String,
    pub value: String,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Fields of the object besides apiVersion, kind and metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceAccountData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    automount_service_account_token: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_pull_secrets: Option<Vec<LocalObjectReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secrets: Option<Vec<k8s_openapi::api::core::v1::ObjectReference>>,
}

impl ServiceAccountModel {
    fn object_id(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// Apply document, only the fields set in configuration are sent
    fn to_object(&self) -> Result<DynamicObject> {
        let data = ServiceAccountData {
            automount_service_account_token: self.automount_service_account_token,
            image_pull_secrets: self.image_pull_secrets.clone(),
            secrets: self
                .secrets
                .clone()
                .map(|secrets| secrets.into_iter().map(Into::into).collect()),
        };

        let mut object =
            DynamicObject::new(&self.metadata.name, &ServiceAccountResource::api_resource())
                .within(&self.metadata.namespace)
                .data(serde_json::to_value(data).map_err(Error::SerializationError)?);
        object.metadata.labels = self.metadata.labels.clone();
        object.metadata.annotations = self.metadata.annotations.clone();
        Ok(object)
    }

    /// Overwrite the object fields with what the API server returned
    fn copy_from(&mut self, object: DynamicObject) -> Result<()> {
        let data: ServiceAccountData =
            serde_json::from_value(object.data).map_err(Error::SerializationError)?;
        let ObjectMeta {
            name,
            namespace,
            labels,
            annotations,
            ..
        } = object.metadata;

        if let Some(name) = name {
            self.metadata.name = name;
        }
        if let Some(namespace) = namespace {
            self.metadata.namespace = namespace;
        }
        self.metadata.labels = labels;
        self.metadata.annotations = annotations;
        self.automount_service_account_token = data.automount_service_account_token;
        self.image_pull_secrets = data.image_pull_secrets;
        self.secrets = data
            .secrets
            .map(|secrets| secrets.into_iter().map(Into::into).collect());
        Ok(())
    }

    fn wait_conditions(&self, default_timeout: Duration) -> Vec<WaitCondition> {
        self.wait_for
            .iter()
            .flatten()
            .map(|w| WaitCondition {
                jsonpath: w.jsonpath.clone(),
                value: w.value.clone(),
                timeout: w.timeout.map(Duration::from_secs).unwrap_or(default_timeout),
            })
            .collect()
    }
}

/// Split an import identifier of the form `namespace/name`
pub fn parse_import_id(id: &str) -> Result<(String, String)> {
    match id.split('/').collect::<Vec<_>>().as_slice() {
        [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
            Ok((namespace.to_string(), name.to_string()))
        }
        _ => Err(Error::IllegalImportId(id.to_string())),
    }
}

fn decode(value: Value, what: &str, diags: &mut Diagnostics) -> Option<ServiceAccountModel> {
    match serde_json::from_value(value) {
        Ok(model) => Some(model),
        Err(e) => {
            diags.add_error(
                format!("Unable to decode {what}"),
                format!(
                    "An unexpected error occurred while decoding the resource {what}.\n\nDecode Error: {e}"
                ),
            );
            None
        }
    }
}

fn encode(model: &ServiceAccountModel, diags: &mut Diagnostics) -> Option<Value> {
    match serde_json::to_value(model) {
        Ok(state) => Some(state),
        Err(e) => {
            diags.add_error(
                "Unable to encode state",
                format!(
                    "An unexpected error occurred while encoding the resource state.\n\nEncode Error: {e}"
                ),
            );
            None
        }
    }
}

fn unmarshal_error(diags: &mut Diagnostics, e: Error) {
    diags.add_error(
        "Unable to unmarshal resource",
        format!(
            "An unexpected error occurred while parsing the resource response. Please report this issue to the provider developers.\n\nUnmarshal Error: {e}"
        ),
    );
}

fn record_span(model: &ServiceAccountModel) {
    let span = Span::current();
    span.record("namespace", field::display(&model.metadata.namespace));
    span.record("name", field::display(&model.metadata.name));
}

/// Declared attributes, with defaults taken from the provider settings
pub fn schema(defaults: &Apply) -> Schema {
    Schema {
        description: "ServiceAccount binds together: a name, understood by users, and perhaps by peripheral systems, for an identity; a principal that can be authenticated and authorized; a set of secrets.".to_string(),
        attributes: vec![
            Attribute::string("id")
                .computed()
                .description("The unique ID for this resource, formatted as 'namespace/name'.")
                .plan_modifier(PlanModifier::UseStateForUnknown),
            Attribute::bool("force_conflicts")
                .optional_computed()
                .default_value(defaults.force_conflicts)
                .description("If 'true', server-side apply will force the changes against conflicts."),
            Attribute::string("field_manager")
                .optional_computed()
                .default_value(defaults.field_manager.clone())
                .validator(Validator::LengthAtLeast(1))
                .description("The name of the manager used to track field ownership."),
            Attribute::object_list(
                "wait_for",
                vec![
                    Attribute::string("jsonpath")
                        .required()
                        .validator(Validator::LengthAtLeast(1))
                        .validator(Validator::JsonPath)
                        .description("JSONPath expression evaluated against the object, e.g. '$.secrets[0].name'."),
                    Attribute::string("value")
                        .required()
                        .description("Value the JSONPath expression has to produce."),
                    Attribute::int64("timeout")
                        .optional_computed()
                        .default_value(defaults.wait_timeout_seconds)
                        .validator(Validator::AtLeast(1))
                        .description("Seconds to wait for the condition before giving up."),
                ],
            )
            .optional()
            .description("Conditions the object has to meet after it was applied."),
            Attribute::object(
                "metadata",
                vec![
                    Attribute::string("name")
                        .required()
                        .validator(Validator::Dns1123Subdomain)
                        .plan_modifier(PlanModifier::RequiresReplace)
                        .description("Unique name of the ServiceAccount within its namespace. Cannot be updated."),
                    Attribute::string("namespace")
                        .required()
                        .validator(Validator::Dns1123Label)
                        .plan_modifier(PlanModifier::RequiresReplace)
                        .description("Namespace the ServiceAccount lives in. Cannot be updated."),
                    Attribute::string_map("labels")
                        .optional()
                        .validator(Validator::QualifiedNameKeys)
                        .validator(Validator::LabelValues)
                        .description("Map of string keys and values that can be used to organize and categorize objects."),
                    Attribute::string_map("annotations")
                        .optional()
                        .validator(Validator::QualifiedNameKeys)
                        .description("Unstructured key value map stored with the object that may be set by external tools."),
                ],
            )
            .required()
            .description("Data that helps uniquely identify the object."),
            Attribute::bool("automount_service_account_token")
                .optional()
                .description("Indicates whether pods running as this service account should have an API token automatically mounted."),
            Attribute::object_list(
                "image_pull_secrets",
                vec![
                    Attribute::string("name")
                        .optional()
                        .description("Name of the referent secret in the same namespace."),
                ],
            )
            .optional()
            .description("References to secrets in the same namespace to use for pulling any images in pods that reference this ServiceAccount."),
            Attribute::object_list(
                "secrets",
                vec![
                    Attribute::string("api_version")
                        .optional()
                        .description("API version of the referent."),
                    Attribute::string("field_path")
                        .optional()
                        .description("Piece of an object instead of an entire object."),
                    Attribute::string("kind")
                        .optional()
                        .description("Kind of the referent."),
                    Attribute::string("name")
                        .optional()
                        .description("Name of the referent."),
                    Attribute::string("namespace")
                        .optional()
                        .description("Namespace of the referent."),
                    Attribute::string("resource_version")
                        .optional()
                        .description("Specific resourceVersion to which this reference is made."),
                    Attribute::string("uid")
                        .optional()
                        .description("UID of the referent."),
                ],
            )
            .optional()
            .description("Secrets in the same namespace that pods running using this ServiceAccount are allowed to use."),
        ],
    }
}

/// ServiceAccount in the core/v1 API, managed with server-side apply
#[derive(Clone)]
pub struct ServiceAccountResource {
    context: Context,
}

impl HasApiResource for ServiceAccountResource {
    const GROUP: &'static str = GROUP;
    const VERSION: &'static str = VERSION;
    const KIND: &'static str = "ServiceAccount";
    const PLURAL: &'static str = "serviceaccounts";
}

impl ServiceAccountResource {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Self::dynamic_api(self.context.kube_client.clone(), namespace)
    }

    fn defaults(&self) -> &Apply {
        self.context.settings.apply()
    }

    /// Server-side apply the model, wait for its conditions and return the new state
    async fn apply(&self, mut model: ServiceAccountModel, diags: &mut Diagnostics) -> Option<Value> {
        let defaults = self.defaults();
        let field_manager = model
            .field_manager
            .get_or_insert_with(|| defaults.field_manager.clone())
            .clone();
        let force = *model.force_conflicts.get_or_insert(defaults.force_conflicts);

        let conditions = model.wait_conditions(defaults.wait_timeout());
        for condition in &conditions {
            if let Err(e) = condition.jsonpath.parse::<JsonPath>() {
                diags.add_error(
                    "Invalid wait condition",
                    format!("The resource was not applied.\n\nJSONPath Error: {e}"),
                );
                return None;
            }
        }

        let object = match model.to_object() {
            Ok(object) => object,
            Err(e) => {
                diags.add_error(
                    "Unable to marshal resource",
                    format!(
                        "An unexpected error occurred while creating the resource request. Please report this issue to the provider developers.\n\nMarshal Error: {e}"
                    ),
                );
                return None;
            }
        };

        let name = model.metadata.name.clone();
        let api = self.api(&model.metadata.namespace);
        let params = PatchParams {
            field_manager: Some(field_manager),
            force,
            ..PatchParams::default()
        };

        let patched = match api.patch(&name, &params, &Patch::Apply(&object)).await {
            Ok(patched) => patched,
            Err(e) => {
                diags.add_error(
                    "Unable to PATCH resource",
                    format!(
                        "An unexpected error occurred while creating the resource PATCH request. Please report this issue to the provider developers.\n\nPATCH Error: {e}"
                    ),
                );
                return None;
            }
        };
        debug!(
            "Applied {} resource_version={:?}",
            model.object_id(),
            patched.metadata.resource_version
        );

        let latest =
            match wait::wait_for_conditions(&api, &name, &conditions, defaults.poll_interval())
                .await
            {
                Ok(latest) => latest.unwrap_or(patched),
                Err(e) => {
                    // the object exists, keep it in state alongside the error
                    diags.add_error(
                        "Unable to wait for resource",
                        format!(
                            "The resource was applied but did not reach the requested state.\n\nWait Error: {e}"
                        ),
                    );
                    patched
                }
            };

        model.id = Some(model.object_id());
        if let Err(e) = model.copy_from(latest) {
            unmarshal_error(diags, e);
            return None;
        }
        encode(&model, diags)
    }
}

impl Resource for ServiceAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema(self.defaults())
    }

    #[instrument(skip_all, fields(namespace, name))]
    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut response = CreateResponse::default();
        let Some(model) = decode(request.plan, "plan", &mut response.diagnostics) else {
            return response;
        };
        record_span(&model);

        info!("Creating ServiceAccount {}", model.object_id());
        response.state = self.apply(model, &mut response.diagnostics).await;
        response
    }

    #[instrument(skip_all, fields(namespace, name))]
    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut response = ReadResponse::default();
        let prior = request.state.clone();
        let Some(mut model) = decode(request.state, "state", &mut response.diagnostics) else {
            return response;
        };
        record_span(&model);

        let api = self.api(&model.metadata.namespace);
        match api.get_opt(&model.metadata.name).await {
            Ok(Some(object)) => {
                model.id = Some(model.object_id());
                if object.metadata.deletion_timestamp.is_some() {
                    response.diagnostics.add_warning(
                        "Resource is being deleted",
                        format!(
                            "{} has a deletion timestamp and will disappear once its finalizers complete.",
                            model.object_id()
                        ),
                    );
                }
                match model.copy_from(object) {
                    Ok(()) => response.state = encode(&model, &mut response.diagnostics),
                    Err(e) => {
                        unmarshal_error(&mut response.diagnostics, e);
                        response.state = Some(prior);
                    }
                }
            }
            Ok(None) => {
                warn!(
                    "ServiceAccount {} no longer exists, removing it from state",
                    model.object_id()
                );
            }
            Err(e) => {
                response.diagnostics.add_error(
                    "Unable to GET resource",
                    format!(
                        "An unexpected error occurred while reading the resource. Please report this issue to the provider developers.\n\nGET Error: {e}"
                    ),
                );
                response.state = Some(prior);
            }
        }
        response
    }

    #[instrument(skip_all, fields(namespace, name))]
    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut response = UpdateResponse::default();
        let Some(model) = decode(request.plan, "plan", &mut response.diagnostics) else {
            return response;
        };
        let Some(prior) = decode(request.state, "state", &mut response.diagnostics) else {
            return response;
        };
        record_span(&model);

        if prior.object_id() != model.object_id() {
            response.diagnostics.add_error(
                "Unable to update resource",
                format!(
                    "The name and namespace of an existing resource cannot change, it has to be replaced. Got: '{}' Want: '{}'",
                    prior.object_id(),
                    model.object_id()
                ),
            );
            return response;
        }

        info!("Updating ServiceAccount {}", model.object_id());
        response.state = self.apply(model, &mut response.diagnostics).await;
        response
    }

    #[instrument(skip_all, fields(namespace, name))]
    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut response = DeleteResponse::default();
        let Some(model) = decode(request.state, "state", &mut response.diagnostics) else {
            return response;
        };
        record_span(&model);

        info!("Deleting ServiceAccount {}", model.object_id());
        let name = &model.metadata.name;
        let api = self.api(&model.metadata.namespace);
        match api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(Error::KubeError)
        {
            Ok(deleted) if deleted.is_right() => debug!("Deleted {}", model.object_id()),
            Ok(_) => {
                let defaults = self.defaults();
                if let Err(e) = wait::wait_for_deletion(
                    &api,
                    name,
                    defaults.delete_timeout(),
                    defaults.poll_interval(),
                )
                .await
                {
                    response.diagnostics.add_error(
                        "Unable to wait for deletion",
                        format!(
                            "The resource was deleted but is still present.\n\nWait Error: {e}"
                        ),
                    );
                }
            }
            Err(e) if e.is_not_found() => debug!("{} was already gone", model.object_id()),
            Err(e) => response.diagnostics.add_error(
                "Unable to DELETE resource",
                format!(
                    "An unexpected error occurred while deleting the resource. Please report this issue to the provider developers.\n\nDELETE Error: {e}"
                ),
            ),
        }
        response
    }

    async fn import_state(&self, request: ImportStateRequest) -> ImportStateResponse {
        let mut response = ImportStateResponse::default();
        let (namespace, name) = match parse_import_id(&request.id) {
            Ok(parts) => parts,
            Err(_) => {
                response.diagnostics.add_error(
                    "Error importing resource",
                    format!(
                        "Expected import identifier with format: 'namespace/name' Got: '{}'",
                        request.id
                    ),
                );
                return response;
            }
        };

        let defaults = self.defaults();
        let model = ServiceAccountModel {
            id: Some(request.id),
            force_conflicts: Some(defaults.force_conflicts),
            field_manager: Some(defaults.field_manager.clone()),
            metadata: Metadata {
                name,
                namespace,
                ..Metadata::default()
            },
            ..ServiceAccountModel::default()
        };
        response.state = encode(&model, &mut response.diagnostics);
        response
    }
}
