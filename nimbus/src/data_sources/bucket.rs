//! Object storage bucket lookup by name

use async_trait::async_trait;
use tfkit::context::Context;
use tfkit::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfkit::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfkit::types::{AttributePath, Diagnostic};

use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct BucketDataSource {
    provider_data: Option<NimbusProviderData>,
}

impl BucketDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for BucketDataSource {
    fn type_name(&self) -> &str {
        "nimbus_objectstorage_bucket"
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
            .description("Looks up an existing object storage bucket by name")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the bucket belongs to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Bucket name to look up")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region the bucket lives in")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("Virtual-host style endpoint URL")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url_path_style", AttributeType::String)
                    .description("Path style endpoint URL")
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
                return ReadDataSourceResponse {
                    state,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        match provider_data.client.get_bucket(&project_id, &name).await {
            Ok(bucket) => {
                if let Some(region) = &bucket.region {
                    let _ = state.set_string(&AttributePath::new("region"), region.clone());
                }
                if let Some(endpoints) = &bucket.endpoints {
                    if let Some(url) = &endpoints.url {
                        let _ = state.set_string(&AttributePath::new("url"), url.clone());
                    }
                    if let Some(url_path_style) = &endpoints.url_path_style {
                        let _ = state.set_string(
                            &AttributePath::new("url_path_style"),
                            url_path_style.clone(),
                        );
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                diagnostics.push(Diagnostic::error(
                    "Bucket not found",
                    format!("No bucket '{}' exists in project '{}'", name, project_id),
                ));
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read bucket",
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
impl DataSourceWithConfigure for BucketDataSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use std::collections::HashMap;
    use tfkit::types::{ClientCapabilities, Dynamic, DynamicValue};

    #[tokio::test]
    async fn read_errors_when_bucket_is_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/objectstorage/v1/projects/proj-1/buckets/media-assets")
            .with_status(404)
            .with_body(r#"{"message": "bucket not found"}"#)
            .create_async()
            .await;

        let mut source = BucketDataSource::new();
        let data =
            NimbusProviderData::new(Client::new(&server.url(), "test-token", false).unwrap());
        source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(std::sync::Arc::new(data)),
                },
            )
            .await;

        let config = DynamicValue::new(Dynamic::Map(HashMap::from([
            (
                "project_id".to_string(),
                Dynamic::String("proj-1".to_string()),
            ),
            (
                "name".to_string(),
                Dynamic::String("media-assets".to_string()),
            ),
        ])));

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "nimbus_objectstorage_bucket".to_string(),
                    config,
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("not found"));
    }
}
