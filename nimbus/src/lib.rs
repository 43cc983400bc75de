//! Terraform provider for the Nimbus cloud platform.
//!
//! The provider authenticates with a service account token and exposes
//! resources and data sources over the IaaS, DBaaS, object storage,
//! SKE, load balancer and Secrets Manager services.

pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

use async_trait::async_trait;
use std::sync::Arc;
use tfkit::context::Context;
use tfkit::data_source::DataSourceWithConfigure;
use tfkit::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfkit::resource::ResourceWithConfigure;
use tfkit::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfkit::types::{AttributePath, Diagnostic};
use tfkit::{Result, TfkitError};

use crate::api::{Client, RetryConfig};
use crate::provider_data::NimbusProviderData;

pub const DEFAULT_ENDPOINT: &str = "https://api.nimbus.cloud";

#[derive(Default)]
pub struct NimbusProvider {
    provider_data: Option<NimbusProviderData>,
}

impl NimbusProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for NimbusProvider {
    fn type_name(&self) -> &str {
        "nimbus"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Provider for the Nimbus cloud platform")
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("API endpoint; falls back to NIMBUS_ENDPOINT, then the public API")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("service_account_token", AttributeType::String)
                    .description("Service account token; falls back to NIMBUS_SERVICE_ACCOUNT_TOKEN")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification; falls back to NIMBUS_INSECURE")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("request_timeout_seconds", AttributeType::Number)
                    .description("Per-request timeout in seconds")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(endpoint) = request.config.get_string(&AttributePath::new("endpoint")) {
            if url::Url::parse(&endpoint).is_err() {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid endpoint",
                        format!("'{}' is not a valid URL", endpoint),
                    )
                    .with_attribute(AttributePath::new("endpoint")),
                );
            }
        }

        if let Ok(timeout) = request
            .config
            .get_number(&AttributePath::new("request_timeout_seconds"))
        {
            if timeout < 1.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid request timeout",
                        "'request_timeout_seconds' must be at least 1",
                    )
                    .with_attribute(AttributePath::new("request_timeout_seconds")),
                );
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];

        let endpoint = request
            .config
            .get_string(&AttributePath::new("endpoint"))
            .ok()
            .or_else(|| std::env::var("NIMBUS_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let token = request
            .config
            .get_string(&AttributePath::new("service_account_token"))
            .ok()
            .or_else(|| std::env::var("NIMBUS_SERVICE_ACCOUNT_TOKEN").ok());

        let insecure = request
            .config
            .get_bool(&AttributePath::new("insecure"))
            .ok()
            .or_else(|| {
                std::env::var("NIMBUS_INSECURE")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok())
            })
            .unwrap_or(false);

        let token = match token {
            Some(token) => token,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Missing service account token",
                    "'service_account_token' is required (set it in the provider block \
                     or via NIMBUS_SERVICE_ACCOUNT_TOKEN)",
                ));
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        let retry_config = match request
            .config
            .get_number(&AttributePath::new("request_timeout_seconds"))
        {
            Ok(timeout) => RetryConfig {
                timeout_seconds: timeout as u64,
                ..RetryConfig::default()
            },
            Err(_) => RetryConfig::default(),
        };

        match Client::with_config(&endpoint, &token, insecure, retry_config) {
            Ok(client) => {
                tracing::debug!(endpoint = %endpoint, insecure, "configured Nimbus API client");
                let data = NimbusProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create API client",
                    format!("API error: {}", e),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn create_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>> {
        match type_name {
            "nimbus_network" => Ok(Box::new(resources::iaas::NetworkResource::new())),
            "nimbus_server" => Ok(Box::new(resources::iaas::ServerResource::new())),
            "nimbus_database_instance" => {
                Ok(Box::new(resources::dbaas::DatabaseInstanceResource::new()))
            }
            "nimbus_database_credential" => {
                Ok(Box::new(resources::dbaas::DatabaseCredentialResource::new()))
            }
            "nimbus_objectstorage_bucket" => {
                Ok(Box::new(resources::objectstorage::BucketResource::new()))
            }
            "nimbus_objectstorage_credentials_group" => Ok(Box::new(
                resources::objectstorage::CredentialsGroupResource::new(),
            )),
            "nimbus_objectstorage_credential" => Ok(Box::new(
                resources::objectstorage::ObjectStorageCredentialResource::new(),
            )),
            "nimbus_kubernetes_project" => {
                Ok(Box::new(resources::ske::KubernetesProjectResource::new()))
            }
            "nimbus_loadbalancer" => {
                Ok(Box::new(resources::loadbalancer::LoadBalancerResource::new()))
            }
            "nimbus_secrets_instance" => {
                Ok(Box::new(resources::secretsmanager::SecretsInstanceResource::new()))
            }
            "nimbus_secrets_user" => {
                Ok(Box::new(resources::secretsmanager::SecretsUserResource::new()))
            }
            _ => Err(TfkitError::ResourceNotFound(type_name.to_string())),
        }
    }

    fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceWithConfigure>> {
        match type_name {
            "nimbus_network" => Ok(Box::new(data_sources::NetworkDataSource::new())),
            "nimbus_database_instance" => {
                Ok(Box::new(data_sources::DatabaseInstanceDataSource::new()))
            }
            "nimbus_objectstorage_bucket" => Ok(Box::new(data_sources::BucketDataSource::new())),
            "nimbus_secrets_instance" => {
                Ok(Box::new(data_sources::SecretsInstanceDataSource::new()))
            }
            _ => Err(TfkitError::DataSourceNotFound(type_name.to_string())),
        }
    }

    fn resource_types(&self) -> Vec<String> {
        vec![
            "nimbus_network".to_string(),
            "nimbus_server".to_string(),
            "nimbus_database_instance".to_string(),
            "nimbus_database_credential".to_string(),
            "nimbus_objectstorage_bucket".to_string(),
            "nimbus_objectstorage_credentials_group".to_string(),
            "nimbus_objectstorage_credential".to_string(),
            "nimbus_kubernetes_project".to_string(),
            "nimbus_loadbalancer".to_string(),
            "nimbus_secrets_instance".to_string(),
            "nimbus_secrets_user".to_string(),
        ]
    }

    fn data_source_types(&self) -> Vec<String> {
        vec![
            "nimbus_network".to_string(),
            "nimbus_database_instance".to_string(),
            "nimbus_objectstorage_bucket".to_string(),
            "nimbus_secrets_instance".to_string(),
        ]
    }
}
