//! Resource trait and request/response types
//!
//! A resource implements the full lifecycle: schema, validation, create,
//! read, update, delete. Import and state upgrade have default
//! implementations; resources that support "terraform import" or schema
//! version bumps override them.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{
    ClientCapabilities, Deferred, Diagnostic, DynamicValue, RawState, ResourceIdentityData,
};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Lifecycle implementation for one managed resource type.
///
/// `type_name` must match the key the provider's factory answers to.
/// `create` and `update` must populate every attribute of the returned
/// state, computed ones included; `read` returns `None` state when the
/// remote object no longer exists so Terraform drops it from state.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse;

    async fn schema(&self, ctx: Context, request: ResourceSchemaRequest) -> ResourceSchemaResponse;

    /// Config validation, called during plan before any API traffic.
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;

    /// Seeds state from an out-of-band identifier for "terraform import".
    /// The default rejects imports; override to support them.
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![Diagnostic::error(
                "Import Not Supported",
                format!("resource type {} does not support import", request.type_name),
            )],
            deferred: None,
        }
    }

    /// Migrates stored state across schema versions.
    ///
    /// The default handles the common case: state stored at the current
    /// schema version passes through unchanged, anything else is an
    /// error. Override after bumping `Schema::version`.
    async fn upgrade_state(
        &self,
        ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        let schema_response = self.schema(ctx, ResourceSchemaRequest {}).await;
        let current_version = schema_response.schema.version;

        if request.version != current_version {
            return UpgradeResourceStateResponse {
                upgraded_state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!(
                        "state for {} was stored at schema version {} but the current version is {} and no upgrade is implemented",
                        request.type_name, request.version, current_version
                    ),
                )],
            };
        }

        let json = match &request.raw_state.json {
            Some(json) if !json.is_empty() => json,
            _ => {
                return UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Unable to Upgrade Resource State",
                        "stored state has no JSON payload; legacy flatmap states are not supported",
                    )],
                }
            }
        };

        match DynamicValue::decode_json(json) {
            Ok(state) => UpgradeResourceStateResponse {
                upgraded_state: state,
                diagnostics: vec![],
            },
            Err(e) => UpgradeResourceStateResponse {
                upgraded_state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!("stored state could not be decoded: {}", e),
                )],
            },
        }
    }
}

pub struct ResourceMetadataRequest;

pub struct ResourceMetadataResponse {
    pub type_name: String,
}

pub struct ResourceSchemaRequest;

pub struct ResourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
    pub private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
    pub client_capabilities: ClientCapabilities,
    pub current_identity: Option<ResourceIdentityData>,
}

pub struct ReadResourceResponse {
    /// None means the remote object is gone and Terraform should forget it
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
    pub private: Vec<u8>,
    pub deferred: Option<Deferred>,
    pub new_identity: Option<ResourceIdentityData>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
    pub planned_identity: Option<ResourceIdentityData>,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub private: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
    pub new_identity: Option<ResourceIdentityData>,
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    pub version: i64,
    pub raw_state: RawState,
}

pub struct UpgradeResourceStateResponse {
    pub upgraded_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
    pub client_capabilities: ClientCapabilities,
    pub identity: Option<ResourceIdentityData>,
}

pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
    pub deferred: Option<Deferred>,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
    pub private: Vec<u8>,
    pub identity: Option<ResourceIdentityData>,
}

/// Receives provider data after construction.
///
/// Called by the server right after the factory builds the resource; this
/// is where API clients and credentials arrive. The provider data is the
/// value the provider's `configure` returned, downcast to the provider's
/// concrete type.
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;
}

pub struct ConfigureResourceRequest {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}
