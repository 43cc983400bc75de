//! Secrets Manager instance resource
//!
//! Instances provision synchronously; the only in-place change is the
//! network ACL.

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
use tfkit::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfkit::validator::StringLengthValidator;

use crate::api::secretsmanager::{
    CreateSecretsInstanceRequest, SecretsInstance, UpdateSecretsInstanceRequest,
};
use crate::provider_data::NimbusProviderData;
use crate::resources::cidr::is_valid_cidr;

#[derive(Default)]
pub struct SecretsInstanceResource {
    provider_data: Option<NimbusProviderData>,
}

impl SecretsInstanceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn acl_from_config(config: &DynamicValue) -> Vec<String> {
        config
            .get_list(&AttributePath::new("acl"))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                Dynamic::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn map_instance_into_state(state: &mut DynamicValue, instance: &SecretsInstance) {
        let _ = state.set_string(
            &AttributePath::new("instance_id"),
            instance.instance_id.clone(),
        );
        let _ = state.set_string(&AttributePath::new("name"), instance.name.clone());
        if let Some(engine_version) = &instance.engine_version {
            let _ = state.set_string(
                &AttributePath::new("engine_version"),
                engine_version.clone(),
            );
        }
        let _ = state.set_list(
            &AttributePath::new("acl"),
            instance
                .acl
                .iter()
                .map(|cidr| Dynamic::String(cidr.clone()))
                .collect(),
        );
    }
}

#[async_trait]
impl Resource for SecretsInstanceResource {
    fn type_name(&self) -> &str {
        "nimbus_secrets_instance"
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
            .description("Manages a Secrets Manager instance in a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the instance belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Server-assigned instance identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the instance")
                    .required()
                    .validator(StringLengthValidator::at_least(1))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("acl", AttributeType::List(Box::new(AttributeType::String)))
                    .description("CIDRs allowed to reach the instance")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_version", AttributeType::String)
                    .description("Vault engine version reported by the platform")
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(entries) = request.config.get_list(&AttributePath::new("acl")) {
            for (index, entry) in entries.iter().enumerate() {
                if let Dynamic::String(cidr) = entry {
                    if !is_valid_cidr(cidr) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid ACL entry",
                                format!("'{}' is not a valid IPv4 CIDR", cidr),
                            )
                            .with_attribute(AttributePath::new("acl").index(index as i64)),
                        );
                    }
                }
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

        let (project_id, name) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request.config.get_string(&AttributePath::new("name")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Both 'project_id' and 'name' are required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        match provider_data
            .client
            .create_secrets_instance(
                &project_id,
                &CreateSecretsInstanceRequest {
                    name,
                    acl: Self::acl_from_config(&request.config),
                },
            )
            .await
        {
            Ok(instance) => Self::map_instance_into_state(&mut new_state, &instance),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create secrets instance",
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

        let (project_id, instance_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("instance_id")),
        ) {
            (Ok(p), Ok(i)) => (p, i),
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
            .get_secrets_instance(&project_id, &instance_id)
            .await
        {
            Ok(instance) => {
                let mut new_state = request.current_state.clone();
                Self::map_instance_into_state(&mut new_state, &instance);
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
                    "Failed to read secrets instance",
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

        let (project_id, instance_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("instance_id")),
        ) {
            (Ok(p), Ok(i)) => (p, i),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Prior state is missing project_id or instance_id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        if let Err(e) = provider_data
            .client
            .update_secrets_instance(
                &project_id,
                &instance_id,
                &UpdateSecretsInstanceRequest {
                    acl: Self::acl_from_config(&request.config),
                },
            )
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to update secrets instance",
                format!("API error: {}", e),
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
                new_identity: None,
            };
        }

        UpdateResourceResponse {
            new_state: request.planned_state,
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

        let (project_id, instance_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("instance_id")),
        ) {
            (Ok(p), Ok(i)) => (p, i),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_secrets_instance(&project_id, &instance_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete secrets instance",
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
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for SecretsInstanceResource {
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
    use tfkit::types::ClientCapabilities;

    async fn configured_resource(url: &str) -> SecretsInstanceResource {
        let mut resource = SecretsInstanceResource::new();
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

    fn instance_config(acl: Vec<&str>) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([
            (
                "project_id".to_string(),
                Dynamic::String("proj-1".to_string()),
            ),
            ("name".to_string(), Dynamic::String("vault".to_string())),
            (
                "acl".to_string(),
                Dynamic::List(
                    acl.into_iter()
                        .map(|cidr| Dynamic::String(cidr.to_string()))
                        .collect(),
                ),
            ),
        ])))
    }

    #[tokio::test]
    async fn validate_flags_malformed_acl_entry() {
        let resource = SecretsInstanceResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "nimbus_secrets_instance".to_string(),
                    config: instance_config(vec!["10.0.0.0/33"]),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn create_maps_instance_without_waiting() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/secretsmanager/v1/projects/proj-1/instances")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "name": "vault",
                "acl": ["10.0.0.0/8"]
            })))
            .with_status(201)
            .with_body(
                r#"{
                    "instanceId": "inst-11",
                    "name": "vault",
                    "engineVersion": "1.15",
                    "acl": ["10.0.0.0/8"]
                }"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let config = instance_config(vec!["10.0.0.0/8"]);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nimbus_secrets_instance".to_string(),
                    planned_state: config.clone(),
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("instance_id"))
                .unwrap(),
            "inst-11"
        );
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("engine_version"))
                .unwrap(),
            "1.15"
        );
    }

    #[tokio::test]
    async fn update_replaces_acl_in_place() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/secretsmanager/v1/projects/proj-1/instances/inst-11")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "acl": ["192.168.0.0/16"]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let mut prior = instance_config(vec!["10.0.0.0/8"]);
        prior
            .set_string(&AttributePath::new("instance_id"), "inst-11".to_string())
            .unwrap();
        let mut planned = instance_config(vec!["192.168.0.0/16"]);
        planned
            .set_string(&AttributePath::new("instance_id"), "inst-11".to_string())
            .unwrap();
        let config = planned.clone();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "nimbus_secrets_instance".to_string(),
                    prior_state: prior,
                    planned_state: planned,
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                    planned_identity: None,
                },
            )
            .await;

        put.assert_async().await;
        assert!(response.diagnostics.is_empty());
    }
}
