//! Kubernetes enablement resource
//!
//! There is one Kubernetes engine per project; the resource toggles it
//! on and off rather than creating a named object.

use async_trait::async_trait;
use tfkit::context::Context;
use tfkit::import::import_state_composite_id;
use tfkit::plan_modifier::RequiresReplace;
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

use crate::api::ske::{self, KubernetesProject};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct KubernetesProjectResource {
    provider_data: Option<NimbusProviderData>,
}

impl KubernetesProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_project_into_state(state: &mut DynamicValue, project: &KubernetesProject) {
        let _ = state.set_string(&AttributePath::new("project_id"), project.project_id.clone());
        let _ = state.set_string(&AttributePath::new("state"), project.state.clone());
    }
}

#[async_trait]
impl Resource for KubernetesProjectResource {
    fn type_name(&self) -> &str {
        "nimbus_kubernetes_project"
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
            .description("Enables the Kubernetes engine for a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project to enable Kubernetes for")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Enablement state reported by the platform")
                    .computed()
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

        let project_id = match request.config.get_string(&AttributePath::new("project_id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing project_id",
                    "The 'project_id' attribute is required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        if let Err(e) = provider_data.client.enable_kubernetes(&project_id).await {
            diagnostics.push(Diagnostic::error(
                "Failed to enable Kubernetes",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        let client = provider_data.client.clone();
        let wait_project = project_id.clone();
        let created = wait::wait_until(WaitConfig::create(), "kubernetes enablement", || {
            let client = client.clone();
            let project_id = wait_project.clone();
            async move {
                let project = client.get_kubernetes_project(&project_id).await?;
                Ok(match project.state.as_str() {
                    ske::STATE_CREATED => WaitOutcome::Done(project),
                    ske::STATE_FAILED => WaitOutcome::Failed(project.state),
                    _ => WaitOutcome::Pending,
                })
            }
        })
        .await;

        let mut new_state = request.planned_state;
        match created {
            Ok(project) => Self::map_project_into_state(&mut new_state, &project),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Kubernetes enablement did not complete",
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

        let project_id = match request
            .current_state
            .get_string(&AttributePath::new("project_id"))
        {
            Ok(id) => id,
            Err(_) => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        match provider_data.client.get_kubernetes_project(&project_id).await {
            Ok(project) if project.state == ske::STATE_DELETING => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
                deferred: None,
                new_identity: None,
            },
            Ok(project) => {
                let mut new_state = request.current_state.clone();
                Self::map_project_into_state(&mut new_state, &project);
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
                    "Failed to read Kubernetes enablement",
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
        // The only configurable attribute forces replacement.
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

        let project_id = match request
            .prior_state
            .get_string(&AttributePath::new("project_id"))
        {
            Ok(id) => id,
            Err(_) => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data.client.disable_kubernetes(&project_id).await {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to disable Kubernetes",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "kubernetes disablement", || {
            let client = client.clone();
            let project_id = project_id.clone();
            async move { client.get_kubernetes_project(&project_id).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Kubernetes was not disabled",
                format!("API error: {}", e),
            ));
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
            &[AttributePath::new("project_id")],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for KubernetesProjectResource {
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

    async fn configured_resource(url: &str) -> KubernetesProjectResource {
        let mut resource = KubernetesProjectResource::new();
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

    fn project_config() -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([(
            "project_id".to_string(),
            Dynamic::String("proj-1".to_string()),
        )])))
    }

    #[tokio::test]
    async fn create_waits_for_created_state() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body(r#"{"projectId": "proj-1", "state": "STATE_CREATED"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let config = project_config();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nimbus_kubernetes_project".to_string(),
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
                .get_string(&AttributePath::new("state"))
                .unwrap(),
            "STATE_CREATED"
        );
    }

    #[tokio::test]
    async fn create_reports_failed_enablement() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/ske/v1/projects/proj-1")
            .with_status(200)
            .with_body(r#"{"projectId": "proj-1", "state": "STATE_FAILED"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let config = project_config();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nimbus_kubernetes_project".to_string(),
                    planned_state: config.clone(),
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("STATE_FAILED"));
    }

    #[tokio::test]
    async fn delete_waits_until_project_is_gone() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/ske/v1/projects/proj-1")
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/ske/v1/projects/proj-1")
            .with_status(404)
            .with_body(r#"{"message": "not enabled"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let mut state = project_config();
        state
            .set_string(&AttributePath::new("state"), "STATE_CREATED".to_string())
            .unwrap();

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "nimbus_kubernetes_project".to_string(),
                    prior_state: state,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
