//! Secrets Manager instance lookup by identifier
//!
//! Exposes instance metadata only; user passwords never appear here.

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
pub struct SecretsInstanceDataSource {
    provider_data: Option<NimbusProviderData>,
}

impl SecretsInstanceDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for SecretsInstanceDataSource {
    fn type_name(&self) -> &str {
        "nimbus_secrets_instance"
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
            .description("Looks up an existing Secrets Manager instance by identifier")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the instance belongs to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Instance identifier to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Display name of the instance")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_version", AttributeType::String)
                    .description("Vault engine version")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("acl", AttributeType::List(Box::new(AttributeType::String)))
                    .description("CIDRs allowed to reach the instance")
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
                return ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data
            .client
            .get_secrets_instance(&project_id, &instance_id)
            .await
        {
            Ok(instance) => {
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
            Err(e) if e.is_not_found() => {
                diagnostics.push(Diagnostic::error(
                    "Secrets instance not found",
                    format!(
                        "No secrets instance '{}' exists in project '{}'",
                        instance_id, project_id
                    ),
                ));
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read secrets instance",
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
impl DataSourceWithConfigure for SecretsInstanceDataSource {
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
