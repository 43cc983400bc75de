//! Network resource

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

use crate::api::iaas::{CreateNetworkRequest, Network, UpdateNetworkRequest};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct NetworkResource {
    provider_data: Option<NimbusProviderData>,
}

impl NetworkResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_network_into_state(state: &mut DynamicValue, network: &Network) {
        let _ = state.set_string(
            &AttributePath::new("network_id"),
            network.network_id.clone(),
        );
        let _ = state.set_string(&AttributePath::new("name"), network.name.clone());
        let _ = state.set_string(&AttributePath::new("state"), network.state.clone());
        if let Some(prefix) = network.ipv4_prefix_length {
            let _ = state.set_number(&AttributePath::new("ipv4_prefix_length"), prefix as f64);
        }
        let _ = state.set_list(
            &AttributePath::new("nameservers"),
            network
                .nameservers
                .iter()
                .map(|ns| Dynamic::String(ns.clone()))
                .collect(),
        );
        let _ = state.set_bool(&AttributePath::new("routed"), network.routed);
    }

    fn nameservers_from(config: &DynamicValue) -> Vec<String> {
        config
            .get_list(&AttributePath::new("nameservers"))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                Dynamic::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Resource for NetworkResource {
    fn type_name(&self) -> &str {
        "nimbus_network"
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
            .description("Manages a network in a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the network belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_id", AttributeType::String)
                    .description("Server-assigned network identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the network")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv4_prefix_length", AttributeType::Number)
                    .description("Prefix length of the IPv4 subnet")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "nameservers",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("DNS servers distributed via DHCP")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("routed", AttributeType::Bool)
                    .description("Whether the network is routed to other networks in the project")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Lifecycle state reported by the platform")
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

        if let Ok(prefix) = request
            .config
            .get_number(&AttributePath::new("ipv4_prefix_length"))
        {
            if !(8.0..=29.0).contains(&prefix) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid ipv4_prefix_length",
                        "The prefix length must be between 8 and 29",
                    )
                    .with_attribute(AttributePath::new("ipv4_prefix_length")),
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
        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();

        let create_request = CreateNetworkRequest {
            name,
            ipv4_prefix_length: request
                .config
                .get_number(&AttributePath::new("ipv4_prefix_length"))
                .ok()
                .map(|p| p as u8),
            nameservers: Self::nameservers_from(&request.config),
            routed: request.config.get_bool(&AttributePath::new("routed")).ok(),
        };

        let created = match provider_data
            .client
            .create_network(&project_id, &create_request)
            .await
        {
            Ok(network) => network,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create network",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let client = provider_data.client.clone();
        let network_id = created.network_id.clone();
        let ready = wait::wait_until(WaitConfig::create(), "network create", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let network_id = network_id.clone();
            async move {
                let network = client.get_network(&project_id, &network_id).await?;
                Ok(match network.state.as_str() {
                    "CREATED" => WaitOutcome::Done(network),
                    "FAILED" => WaitOutcome::Failed(network.state),
                    _ => WaitOutcome::Pending,
                })
            }
        })
        .await;

        let mut new_state = request.planned_state;
        match ready {
            Ok(network) => Self::map_network_into_state(&mut new_state, &network),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Network did not become ready",
                    format!("API error: {}", e),
                ));
                Self::map_network_into_state(&mut new_state, &created);
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

        let (project_id, network_id) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request
                .current_state
                .get_string(&AttributePath::new("network_id")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
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
            .get_network(&project_id, &network_id)
            .await
        {
            Ok(network) => {
                let mut new_state = request.current_state.clone();
                Self::map_network_into_state(&mut new_state, &network);
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
                    "Failed to read network",
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

        let (project_id, network_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("network_id")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Prior state is missing project_id or network_id",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let update_request = UpdateNetworkRequest {
            name: request.config.get_string(&AttributePath::new("name")).ok(),
            nameservers: Some(Self::nameservers_from(&request.config)),
        };

        match provider_data
            .client
            .update_network(&project_id, &network_id, &update_request)
            .await
        {
            Ok(network) => {
                let mut new_state = request.planned_state;
                Self::map_network_into_state(&mut new_state, &network);
                UpdateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update network",
                    format!("API error: {}", e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
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

        let (project_id, network_id) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request
                .prior_state
                .get_string(&AttributePath::new("network_id")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data
            .client
            .delete_network(&project_id, &network_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete network",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "network delete", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let network_id = network_id.clone();
            async move { client.get_network(&project_id, &network_id).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Network was not removed",
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
                AttributePath::new("network_id"),
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for NetworkResource {
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

#[path = "./resource_network_test.rs"]
#[cfg(test)]
mod resource_network_test;
