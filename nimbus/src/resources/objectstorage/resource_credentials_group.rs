//! Object storage credentials group resource
//!
//! The create call returns no body, so the group is located afterwards
//! by listing the project's groups and matching on display name.

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
use tfkit::validator::StringLengthValidator;

use crate::api::objectstorage::{CreateCredentialsGroupRequest, CredentialsGroup};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct CredentialsGroupResource {
    provider_data: Option<NimbusProviderData>,
}

impl CredentialsGroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_group_into_state(state: &mut DynamicValue, group: &CredentialsGroup) {
        let _ = state.set_string(
            &AttributePath::new("credentials_group_id"),
            group.credentials_group_id.clone(),
        );
        let _ = state.set_string(
            &AttributePath::new("display_name"),
            group.display_name.clone(),
        );
        if let Some(urn) = &group.urn {
            let _ = state.set_string(&AttributePath::new("urn"), urn.clone());
        }
    }
}

#[async_trait]
impl Resource for CredentialsGroupResource {
    fn type_name(&self) -> &str {
        "nimbus_objectstorage_credentials_group"
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
            .description("Manages a credentials group for object storage access keys")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the group belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Display name, unique within the project")
                    .required()
                    .validator(StringLengthValidator::at_least(1))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credentials_group_id", AttributeType::String)
                    .description("Server-assigned group identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("urn", AttributeType::String)
                    .description("Resource URN of the group")
                    .computed()
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

        let (project_id, display_name) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request
                .config
                .get_string(&AttributePath::new("display_name")),
        ) {
            (Ok(p), Ok(d)) => (p, d),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Both 'project_id' and 'display_name' are required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = provider_data
            .client
            .create_credentials_group(
                &project_id,
                &CreateCredentialsGroupRequest {
                    display_name: display_name.clone(),
                },
            )
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to create credentials group",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        let groups = match provider_data.client.list_credentials_groups(&project_id).await {
            Ok(groups) => groups,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to list credentials groups",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let matches: Vec<&CredentialsGroup> = groups
            .iter()
            .filter(|group| group.display_name == display_name)
            .collect();

        let mut new_state = request.planned_state;
        match matches.as_slice() {
            [group] => Self::map_group_into_state(&mut new_state, group),
            [] => {
                diagnostics.push(Diagnostic::error(
                    "Credentials group not found after create",
                    format!(
                        "No credentials group named '{}' exists in project '{}'",
                        display_name, project_id
                    ),
                ));
            }
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Ambiguous credentials group name",
                    format!(
                        "{} credentials groups named '{}' exist in project '{}'",
                        matches.len(),
                        display_name,
                        project_id
                    ),
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

        let (project_id, group_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("credentials_group_id")),
        ) {
            (Ok(p), Ok(g)) => (p, g),
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

        match provider_data.client.list_credentials_groups(&project_id).await {
            Ok(groups) => {
                match groups
                    .iter()
                    .find(|group| group.credentials_group_id == group_id)
                {
                    Some(group) => {
                        let mut new_state = request.current_state.clone();
                        Self::map_group_into_state(&mut new_state, group);
                        ReadResourceResponse {
                            new_state: Some(new_state),
                            diagnostics,
                            private: request.private,
                            deferred: None,
                            new_identity: None,
                        }
                    }
                    None => ReadResourceResponse {
                        new_state: None,
                        diagnostics,
                        private: request.private,
                        deferred: None,
                        new_identity: None,
                    },
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
                    "Failed to list credentials groups",
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

        let (project_id, group_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("credentials_group_id")),
        ) {
            (Ok(p), Ok(g)) => (p, g),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_credentials_group(&project_id, &group_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete credentials group",
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
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for CredentialsGroupResource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use std::collections::HashMap;
    use tfkit::types::Dynamic;

    async fn configured_resource(url: &str) -> CredentialsGroupResource {
        let mut resource = CredentialsGroupResource::new();
        let data = NimbusProviderData::new(Client::new(url, "test-token", false).unwrap());
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(std::sync::Arc::new(data)),
                },
            )
            .await;
        resource
    }

    fn group_config(display_name: &str) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([
            (
                "project_id".to_string(),
                Dynamic::String("proj-1".to_string()),
            ),
            (
                "display_name".to_string(),
                Dynamic::String(display_name.to_string()),
            ),
        ])))
    }

    async fn create_with_listing(listing: &str) -> CreateResourceResponse {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/objectstorage/v1/projects/proj-1/credentials-groups")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/objectstorage/v1/projects/proj-1/credentials-groups")
            .with_status(200)
            .with_body(listing)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let config = group_config("backups");
        resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nimbus_objectstorage_credentials_group".to_string(),
                    planned_state: config.clone(),
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await
    }

    #[tokio::test]
    async fn create_resolves_group_by_display_name() {
        let response = create_with_listing(
            r#"{
                "credentialsGroups": [
                    {"credentialsGroupId": "cg-1", "displayName": "backups", "urn": "urn:nimbus:cg-1"},
                    {"credentialsGroupId": "cg-2", "displayName": "exports", "urn": null}
                ]
            }"#,
        )
        .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("credentials_group_id"))
                .unwrap(),
            "cg-1"
        );
    }

    #[tokio::test]
    async fn create_errors_when_name_is_missing_from_listing() {
        let response = create_with_listing(r#"{"credentialsGroups": []}"#).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("not found after create"));
    }

    #[tokio::test]
    async fn create_errors_when_name_is_ambiguous() {
        let response = create_with_listing(
            r#"{
                "credentialsGroups": [
                    {"credentialsGroupId": "cg-1", "displayName": "backups", "urn": null},
                    {"credentialsGroupId": "cg-3", "displayName": "backups", "urn": null}
                ]
            }"#,
        )
        .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Ambiguous"));
    }
}
