//! Secrets Manager user resource
//!
//! The generated password is returned exactly once on create. Only the
//! write flag changes in place; everything else forces replacement.

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

use crate::api::secretsmanager::{
    CreateSecretsUserRequest, SecretsUser, UpdateSecretsUserRequest,
};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct SecretsUserResource {
    provider_data: Option<NimbusProviderData>,
}

impl SecretsUserResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_metadata_into_state(state: &mut DynamicValue, user: &SecretsUser) {
        let _ = state.set_string(&AttributePath::new("user_id"), user.user_id.clone());
        if let Some(username) = &user.username {
            let _ = state.set_string(&AttributePath::new("username"), username.clone());
        }
        if let Some(description) = &user.description {
            let _ = state.set_string(&AttributePath::new("description"), description.clone());
        }
        let _ = state.set_bool(&AttributePath::new("write_enabled"), user.write_enabled);
    }
}

#[async_trait]
impl Resource for SecretsUserResource {
    fn type_name(&self) -> &str {
        "nimbus_secrets_user"
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
            .description("Manages a user of a Secrets Manager instance")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the instance belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Instance the user is created in")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form purpose of the user")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("write_enabled", AttributeType::Bool)
                    .description("Whether the user may write secrets")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_id", AttributeType::String)
                    .description("Server-assigned user identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("Generated login name")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("Generated password, only returned on create")
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
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
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

        let (project_id, instance_id) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request
                .config
                .get_string(&AttributePath::new("instance_id")),
        ) {
            (Ok(p), Ok(i)) => (p, i),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Both 'project_id' and 'instance_id' are required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let create_request = CreateSecretsUserRequest {
            description: request
                .config
                .get_string(&AttributePath::new("description"))
                .ok(),
            write_enabled: request
                .config
                .get_bool(&AttributePath::new("write_enabled"))
                .unwrap_or(false),
        };

        let mut new_state = request.planned_state;
        match provider_data
            .client
            .create_secrets_user(&project_id, &instance_id, &create_request)
            .await
        {
            Ok(user) => {
                Self::map_metadata_into_state(&mut new_state, &user);
                if let Some(password) = &user.password {
                    let _ =
                        new_state.set_string(&AttributePath::new("password"), password.clone());
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create secrets user",
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

        let (project_id, instance_id, user_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("instance_id")),
            request
                .current_state
                .get_string(&AttributePath::new("user_id")),
        ) {
            (Ok(p), Ok(i), Ok(u)) => (p, i, u),
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
            .get_secrets_user(&project_id, &instance_id, &user_id)
            .await
        {
            Ok(user) => {
                // The stored password from create stays untouched.
                let mut new_state = request.current_state.clone();
                Self::map_metadata_into_state(&mut new_state, &user);
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
                    "Failed to read secrets user",
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
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let (project_id, instance_id, user_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("instance_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("user_id")),
        ) {
            (Ok(p), Ok(i), Ok(u)) => (p, i, u),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Prior state is missing project_id, instance_id or user_id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let write_enabled = request
            .config
            .get_bool(&AttributePath::new("write_enabled"))
            .unwrap_or(false);

        if let Err(e) = provider_data
            .client
            .update_secrets_user(
                &project_id,
                &instance_id,
                &user_id,
                &UpdateSecretsUserRequest { write_enabled },
            )
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to update secrets user",
                format!("API error: {}", e),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
                new_identity: None,
            };
        }

        let mut new_state = request.planned_state;
        let _ = new_state.set_bool(&AttributePath::new("write_enabled"), write_enabled);

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
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

        let (project_id, instance_id, user_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("instance_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("user_id")),
        ) {
            (Ok(p), Ok(i), Ok(u)) => (p, i, u),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_secrets_user(&project_id, &instance_id, &user_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete secrets user",
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
                AttributePath::new("instance_id"),
                AttributePath::new("user_id"),
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for SecretsUserResource {
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
