//! Object storage bucket resource
//!
//! Bucket creation is asynchronous: the create call returns immediately
//! and the bucket is usable once the platform reports its endpoints.

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

use crate::api::objectstorage::{Bucket, CreateBucketRequest};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;

#[derive(Default)]
pub struct BucketResource {
    provider_data: Option<NimbusProviderData>,
}

impl BucketResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_bucket_into_state(state: &mut DynamicValue, bucket: &Bucket) {
        let _ = state.set_string(&AttributePath::new("name"), bucket.name.clone());
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
}

#[async_trait]
impl Resource for BucketResource {
    fn type_name(&self) -> &str {
        "nimbus_objectstorage_bucket"
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
            .description("Manages an object storage bucket in a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the bucket belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Bucket name, globally unique within the region")
                    .required()
                    .validator(StringLengthValidator::between(3, 63))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Region the bucket is created in")
                    .optional()
                    .computed()
                    .plan_modifier(RequiresReplace::create())
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("Virtual-host style endpoint URL")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("url_path_style", AttributeType::String)
                    .description("Path style endpoint URL")
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

        // Enablement is idempotent; a project that already has object
        // storage enabled accepts the call again.
        if let Err(e) = provider_data.client.enable_object_storage(&project_id).await {
            diagnostics.push(Diagnostic::error(
                "Failed to enable object storage",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        let create_request = CreateBucketRequest {
            region: request.config.get_string(&AttributePath::new("region")).ok(),
        };
        if let Err(e) = provider_data
            .client
            .create_bucket(&project_id, &name, &create_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to create bucket",
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
        let wait_name = name.clone();
        let ready = wait::wait_until(WaitConfig::create(), "bucket create", || {
            let client = client.clone();
            let project_id = wait_project.clone();
            let name = wait_name.clone();
            async move {
                let bucket = client.get_bucket(&project_id, &name).await?;
                Ok(if bucket.endpoints.as_ref().is_some_and(|e| e.url.is_some()) {
                    WaitOutcome::Done(bucket)
                } else {
                    WaitOutcome::Pending
                })
            }
        })
        .await;

        let mut new_state = request.planned_state;
        match ready {
            Ok(bucket) => Self::map_bucket_into_state(&mut new_state, &bucket),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Bucket endpoints were not published",
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

        let (project_id, name) = match (
            request
                .current_state
                .get_string(&AttributePath::new("project_id")),
            request.current_state.get_string(&AttributePath::new("name")),
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

        match provider_data.client.get_bucket(&project_id, &name).await {
            Ok(bucket) => {
                let mut new_state = request.current_state.clone();
                Self::map_bucket_into_state(&mut new_state, &bucket);
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
                    "Failed to read bucket",
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

        let (project_id, name) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request.prior_state.get_string(&AttributePath::new("name")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = provider_data.client.delete_bucket(&project_id, &name).await {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete bucket",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "bucket delete", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let name = name.clone();
            async move { client.get_bucket(&project_id, &name).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Bucket was not removed",
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
            &[AttributePath::new("project_id"), AttributePath::new("name")],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for BucketResource {
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
    use tfkit::types::{ClientCapabilities, Dynamic};

    async fn configured_resource(url: &str) -> BucketResource {
        let mut resource = BucketResource::new();
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

    fn bucket_config() -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([
            (
                "project_id".to_string(),
                Dynamic::String("proj-1".to_string()),
            ),
            (
                "name".to_string(),
                Dynamic::String("media-assets".to_string()),
            ),
        ])))
    }

    #[tokio::test]
    async fn create_enables_project_and_waits_for_endpoints() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/objectstorage/v1/projects/proj-1/enable")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("POST", "/objectstorage/v1/projects/proj-1/buckets/media-assets")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/objectstorage/v1/projects/proj-1/buckets/media-assets")
            .with_status(200)
            .with_body(
                r#"{
                    "name": "media-assets",
                    "region": "eu01",
                    "endpoints": {
                        "url": "https://media-assets.objects.nimbus.cloud",
                        "urlPathStyle": "https://objects.nimbus.cloud/media-assets"
                    }
                }"#,
            )
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let config = bucket_config();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nimbus_objectstorage_bucket".to_string(),
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
                .get_string(&AttributePath::new("url"))
                .unwrap(),
            "https://media-assets.objects.nimbus.cloud"
        );
    }

    #[tokio::test]
    async fn delete_waits_until_bucket_is_gone() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "DELETE",
                "/objectstorage/v1/projects/proj-1/buckets/media-assets",
            )
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/objectstorage/v1/projects/proj-1/buckets/media-assets")
            .with_status(404)
            .with_body(r#"{"message": "bucket not found"}"#)
            .create_async()
            .await;

        let resource = configured_resource(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "nimbus_objectstorage_bucket".to_string(),
                    prior_state: bucket_config(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_splits_project_and_bucket_name() {
        let server = mockito::Server::new_async().await;
        let resource = configured_resource(&server.url()).await;

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "nimbus_objectstorage_bucket".to_string(),
                    id: "proj-1,media-assets".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                    identity: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "media-assets"
        );
    }
}
