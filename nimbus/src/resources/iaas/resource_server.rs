//! Server resource
//!
//! `machine_type` is resized in place with a wait for ACTIVE; zone, boot
//! volume and user data changes force a replacement.

use async_trait::async_trait;
use std::collections::HashMap;
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

use crate::api::iaas::{BootVolumeRequest, CreateServerRequest, Server, UpdateServerRequest};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct ServerResource {
    provider_data: Option<NimbusProviderData>,
}

impl ServerResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn boot_volume_type() -> AttributeType {
        AttributeType::Object(HashMap::from([
            ("size_gb".to_string(), AttributeType::Number),
            ("performance_class".to_string(), AttributeType::String),
            ("image_id".to_string(), AttributeType::String),
        ]))
    }

    fn boot_volume_from(config: &DynamicValue) -> Result<BootVolumeRequest, Diagnostic> {
        let root = AttributePath::new("boot_volume");
        let size_gb = config
            .get_number(&AttributePath::new("boot_volume").attribute("size_gb"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing boot volume size",
                    "The 'boot_volume.size_gb' attribute is required",
                )
                .with_attribute(root.clone())
            })?;
        let image_id = config
            .get_string(&AttributePath::new("boot_volume").attribute("image_id"))
            .map_err(|_| {
                Diagnostic::error(
                    "Missing boot volume image",
                    "The 'boot_volume.image_id' attribute is required",
                )
                .with_attribute(root)
            })?;

        Ok(BootVolumeRequest {
            size_gb: size_gb as u32,
            performance_class: config
                .get_string(&AttributePath::new("boot_volume").attribute("performance_class"))
                .ok(),
            image_id,
        })
    }

    fn map_server_into_state(state: &mut DynamicValue, server: &Server) {
        let _ = state.set_string(&AttributePath::new("server_id"), server.server_id.clone());
        let _ = state.set_string(&AttributePath::new("name"), server.name.clone());
        let _ = state.set_string(
            &AttributePath::new("machine_type"),
            server.machine_type.clone(),
        );
        let _ = state.set_string(&AttributePath::new("status"), server.status.clone());
        if let Some(zone) = &server.availability_zone {
            let _ = state.set_string(&AttributePath::new("availability_zone"), zone.clone());
        }
        if let Some(volume) = &server.boot_volume {
            let mut object = HashMap::from([
                (
                    "size_gb".to_string(),
                    Dynamic::Number(volume.size_gb as f64),
                ),
                ("image_id".to_string(), Dynamic::String(volume.image_id.clone())),
            ]);
            object.insert(
                "performance_class".to_string(),
                match &volume.performance_class {
                    Some(class) => Dynamic::String(class.clone()),
                    None => Dynamic::Null,
                },
            );
            let _ = state.set_map(&AttributePath::new("boot_volume"), object);
        }
        let _ = state.set_list(
            &AttributePath::new("network_interfaces"),
            server
                .network_interfaces
                .iter()
                .map(|id| Dynamic::String(id.clone()))
                .collect(),
        );
    }

    async fn wait_for_active(
        provider_data: &NimbusProviderData,
        what: &str,
        config: WaitConfig,
        project_id: &str,
        server_id: &str,
    ) -> Result<Server, crate::api::ApiError> {
        let client = provider_data.client.clone();
        let project_id = project_id.to_string();
        let server_id = server_id.to_string();
        wait::wait_until(config, what, || {
            let client = client.clone();
            let project_id = project_id.clone();
            let server_id = server_id.clone();
            async move {
                let server = client.get_server(&project_id, &server_id).await?;
                Ok(match server.status.as_str() {
                    "ACTIVE" => WaitOutcome::Done(server),
                    "ERROR" => WaitOutcome::Failed(server.status),
                    _ => WaitOutcome::Pending,
                })
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for ServerResource {
    fn type_name(&self) -> &str {
        "nimbus_server"
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
            .description("Manages a virtual server in a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the server belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("server_id", AttributeType::String)
                    .description("Server-assigned identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the server")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("machine_type", AttributeType::String)
                    .description("Machine type, resized in place")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_zone", AttributeType::String)
                    .description("Availability zone the server is placed in")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("boot_volume", Self::boot_volume_type())
                    .description("Boot volume: size_gb, optional performance_class, image_id")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_data", AttributeType::String)
                    .description("Cloud-init user data executed on first boot")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "network_interfaces",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Network IDs to attach interfaces to")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Lifecycle status reported by the platform")
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(size) = request
            .config
            .get_number(&AttributePath::new("boot_volume").attribute("size_gb"))
        {
            if size < 5.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Boot volume too small",
                        "The boot volume must be at least 5 GB",
                    )
                    .with_attribute(AttributePath::new("boot_volume")),
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

        let boot_volume = match Self::boot_volume_from(&request.config) {
            Ok(volume) => volume,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let create_request = CreateServerRequest {
            name: request
                .config
                .get_string(&AttributePath::new("name"))
                .unwrap_or_default(),
            machine_type: request
                .config
                .get_string(&AttributePath::new("machine_type"))
                .unwrap_or_default(),
            availability_zone: request
                .config
                .get_string(&AttributePath::new("availability_zone"))
                .ok(),
            boot_volume,
            user_data: request
                .config
                .get_string(&AttributePath::new("user_data"))
                .ok(),
            network_interfaces: request
                .config
                .get_list(&AttributePath::new("network_interfaces"))
                .unwrap_or_default()
                .into_iter()
                .filter_map(|item| match item {
                    Dynamic::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        };

        let created = match provider_data
            .client
            .create_server(&project_id, &create_request)
            .await
        {
            Ok(server) => server,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create server",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        match Self::wait_for_active(
            provider_data,
            "server create",
            WaitConfig::create(),
            &project_id,
            &created.server_id,
        )
        .await
        {
            Ok(server) => Self::map_server_into_state(&mut new_state, &server),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Server did not become active",
                    format!("API error: {}", e),
                ));
                Self::map_server_into_state(&mut new_state, &created);
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

        let (project_id, server_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("server_id")),
        ) {
            (Ok(p), Ok(s)) => (p, s),
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

        match provider_data.client.get_server(&project_id, &server_id).await {
            Ok(server) => {
                let mut new_state = request.current_state.clone();
                Self::map_server_into_state(&mut new_state, &server);
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
                    "Failed to read server",
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

        let (project_id, server_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("server_id")),
        ) {
            (Ok(p), Ok(s)) => (p, s),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Prior state is missing project_id or server_id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let prior_machine_type = request
            .prior_state
            .get_string(&AttributePath::new("machine_type"))
            .unwrap_or_default();
        let planned_machine_type = request
            .planned_state
            .get_string(&AttributePath::new("machine_type"))
            .unwrap_or_default();

        let update_request = UpdateServerRequest {
            name: request.config.get_string(&AttributePath::new("name")).ok(),
            machine_type: if planned_machine_type != prior_machine_type {
                Some(planned_machine_type.clone())
            } else {
                None
            },
        };

        if let Err(e) = provider_data
            .client
            .update_server(&project_id, &server_id, &update_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to update server",
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

        // Resizes take the server through RESIZING before it settles.
        if planned_machine_type != prior_machine_type {
            match Self::wait_for_active(
                provider_data,
                "server resize",
                WaitConfig::update(),
                &project_id,
                &server_id,
            )
            .await
            {
                Ok(server) => Self::map_server_into_state(&mut new_state, &server),
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Server did not settle after resize",
                        format!("API error: {}", e),
                    ));
                }
            }
        }

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

        let (project_id, server_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("server_id")),
        ) {
            (Ok(p), Ok(s)) => (p, s),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_server(&project_id, &server_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete server",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "server delete", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let server_id = server_id.clone();
            async move { client.get_server(&project_id, &server_id).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Server was not removed",
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
            &[
                AttributePath::new("project_id"),
                AttributePath::new("server_id"),
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for ServerResource {
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

#[path = "./resource_server_test.rs"]
#[cfg(test)]
mod resource_server_test;
