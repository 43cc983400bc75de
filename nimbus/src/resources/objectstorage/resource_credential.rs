//! Object storage access key resource
//!
//! The secret access key is returned exactly once by the create call
//! and kept in state; reads refresh the key metadata without it.

use async_trait::async_trait;
use tfkit::context::Context;
use tfkit::import::import_state_composite_id;
use tfkit::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfkit::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfkit::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfkit::types::{AttributePath, Diagnostic, DynamicValue};
use time::format_description::well_known::Rfc3339;

use crate::api::objectstorage::{AccessKey, CreateAccessKeyRequest};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct ObjectStorageCredentialResource {
    provider_data: Option<NimbusProviderData>,
}

/// RFC 3339 timestamp check, e.g. `2027-01-01T00:00:00Z` or
/// `2027-01-01T00:00:00.500+02:00`.
fn is_rfc3339_timestamp(value: &str) -> bool {
    time::OffsetDateTime::parse(value, &Rfc3339).is_ok()
}

impl ObjectStorageCredentialResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_metadata_into_state(state: &mut DynamicValue, key: &AccessKey) {
        let _ = state.set_string(&AttributePath::new("credential_id"), key.key_id.clone());
        if let Some(display_name) = &key.display_name {
            let _ = state.set_string(&AttributePath::new("display_name"), display_name.clone());
        }
        if let Some(access_key) = &key.access_key {
            let _ = state.set_string(&AttributePath::new("access_key"), access_key.clone());
        }
        if let Some(expires) = &key.expires {
            let _ = state.set_string(&AttributePath::new("expires"), expires.clone());
        }
    }
}

#[async_trait]
impl Resource for ObjectStorageCredentialResource {
    fn type_name(&self) -> &str {
        "nimbus_objectstorage_credential"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an access key within an object storage credentials group")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the key belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credentials_group_id", AttributeType::String)
                    .description("Credentials group the key is created in")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("expires", AttributeType::String)
                    .description("RFC 3339 expiry timestamp; keys without one never expire")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credential_id", AttributeType::String)
                    .description("Server-assigned key identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Display name assigned by the platform")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access_key", AttributeType::String)
                    .description("Access key id for S3-compatible clients")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret_access_key", AttributeType::String)
                    .description("Secret access key, only returned on create")
                    .computed()
                    .sensitive()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(expires) = request.config.get_string(&AttributePath::new("expires")) {
            if !is_rfc3339_timestamp(&expires) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid expiry timestamp",
                        format!("'{}' is not an RFC 3339 timestamp", expires),
                    )
                    .with_attribute(AttributePath::new("expires")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let (project_id, group_id) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request
                .config
                .get_string(&AttributePath::new("credentials_group_id")),
        ) {
            (Ok(p), Ok(g)) => (p, g),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Both 'project_id' and 'credentials_group_id' are required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let create_request = CreateAccessKeyRequest {
            expires: request.config.get_string(&AttributePath::new("expires")).ok(),
        };

        let mut new_state = request.planned_state;
        match provider_data
            .client
            .create_access_key(&project_id, &group_id, &create_request)
            .await
        {
            Ok(key) => {
                Self::map_metadata_into_state(&mut new_state, &key);
                if let Some(secret) = &key.secret_access_key {
                    let _ = new_state
                        .set_string(&AttributePath::new("secret_access_key"), secret.clone());
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create access key",
                    format!("API error: {}", e),
                ));
            }
        }

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        let (project_id, group_id, credential_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("credentials_group_id")),
            request
                .current_state
                .get_string(&AttributePath::new("credential_id")),
        ) {
            (Ok(p), Ok(g), Ok(c)) => (p, g, c),
            _ => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        match provider_data
            .client
            .get_access_key(&project_id, &group_id, &credential_id)
            .await
        {
            Ok(key) => {
                // The stored secret from create stays untouched.
                let mut new_state = request.current_state.clone();
                Self::map_metadata_into_state(&mut new_state, &key);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read access key",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        // Every configurable attribute forces replacement.
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        let (project_id, group_id, credential_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("credentials_group_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("credential_id")),
        ) {
            (Ok(p), Ok(g), Ok(c)) => (p, g, c),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_access_key(&project_id, &group_id, &credential_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete access key",
                    format!("API error: {}", e),
                ));
            }
        }

        DeleteResourceResponse { diagnostics }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_composite_id(
            &ctx,
            &[
                AttributePath::new("project_id"),
                AttributePath::new("credentials_group_id"),
                AttributePath::new("credential_id"),
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for ObjectStorageCredentialResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<NimbusProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract NimbusProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}
