//! Network lookup by identifier

use async_trait::async_trait;
use tfkit::context::Context;
use tfkit::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfkit::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfkit::types::{AttributePath, Diagnostic, Dynamic};

use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct NetworkDataSource {
    provider_data: Option<NimbusProviderData>,
}

impl NetworkDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for NetworkDataSource {
    fn type_name(&self) -> &str {
        "nimbus_network"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up an existing network by identifier")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the network belongs to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_id", AttributeType::String)
                    .description("Network identifier to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the network")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv4_prefix_length", AttributeType::Number)
                    .description("Prefix length of the IPv4 range")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "nameservers",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Configured nameservers")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("routed", AttributeType::Bool)
                    .description("Whether the network is routed")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Lifecycle state reported by the platform")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];
        let mut state = request.config.clone();

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        let (project_id, network_id) = match (
            request.config.get_string(&AttributePath::new("project_id")),
            request.config.get_string(&AttributePath::new("network_id")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Both 'project_id' and 'network_id' are required",
                ));
                return ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data.client.get_network(&project_id, &network_id).await {
            Ok(network) => {
                let _ = state.set_string(&AttributePath::new("name"), network.name.clone());
                if let Some(prefix) = network.ipv4_prefix_length {
                    let _ = state
                        .set_number(&AttributePath::new("ipv4_prefix_length"), prefix as f64);
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
                let _ = state.set_string(&AttributePath::new("state"), network.state.clone());
            }
            Err(e) if e.is_not_found() => {
                diagnostics.push(Diagnostic::error(
                    "Network not found",
                    format!(
                        "No network '{}' exists in project '{}'",
                        network_id, project_id
                    ),
                ));
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read network",
                    format!("API error: {}", e),
                ));
            }
        }

        ReadDataSourceResponse {
            state,
            diagnostics,
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for NetworkDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
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
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
