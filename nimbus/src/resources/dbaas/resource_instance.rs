//! Database instance resource
//!
//! The `acl` attribute is a list of CIDRs in Terraform and a single
//! comma-joined string on the wire; both directions are mapped here.

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

use crate::api::dbaas::{
    CreateDatabaseInstanceRequest, DatabaseInstance, StorageRequest,
    UpdateDatabaseInstanceRequest,
};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;
use crate::resources::cidr::is_valid_cidr;
use std::collections::HashMap;

#[derive(Default)]
pub struct DatabaseInstanceResource {
    provider_data: Option<NimbusProviderData>,
}

/// List of CIDRs from config to the wire's comma-joined form. An empty
/// list maps to an empty string.
pub fn acl_to_wire(entries: &[String]) -> String {
    entries.join(",")
}

/// Comma-joined wire form back into the list; empty string maps to an
/// empty list.
pub fn acl_from_wire(wire: &str) -> Vec<String> {
    wire.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

impl DatabaseInstanceResource {
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

    fn storage_from_config(config: &DynamicValue) -> Option<StorageRequest> {
        let class = config
            .get_string(&AttributePath::new("storage").attribute("class"))
            .ok()?;
        let size_gb = config
            .get_number(&AttributePath::new("storage").attribute("size_gb"))
            .ok()?;
        Some(StorageRequest {
            class,
            size_gb: size_gb as u32,
        })
    }

    fn map_instance_into_state(state: &mut DynamicValue, instance: &DatabaseInstance) {
        let _ = state.set_string(
            &AttributePath::new("instance_id"),
            instance.instance_id.clone(),
        );
        let _ = state.set_string(&AttributePath::new("name"), instance.name.clone());
        let _ = state.set_string(&AttributePath::new("engine"), instance.engine.clone());
        let _ = state.set_string(&AttributePath::new("version"), instance.version.clone());
        let _ = state.set_string(&AttributePath::new("plan_id"), instance.plan_id.clone());
        let _ = state.set_string(&AttributePath::new("status"), instance.status.clone());
        if let Some(replicas) = instance.replicas {
            let _ = state.set_number(&AttributePath::new("replicas"), replicas as f64);
        }
        if let Some(storage) = &instance.storage {
            let _ = state.set_map(
                &AttributePath::new("storage"),
                HashMap::from([
                    ("class".to_string(), Dynamic::String(storage.class.clone())),
                    (
                        "size_gb".to_string(),
                        Dynamic::Number(storage.size_gb as f64),
                    ),
                ]),
            );
        }
        let _ = state.set_list(
            &AttributePath::new("acl"),
            acl_from_wire(&instance.acl)
                .into_iter()
                .map(Dynamic::String)
                .collect(),
        );
    }

    async fn wait_for_active(
        provider_data: &NimbusProviderData,
        what: &str,
        config: WaitConfig,
        project_id: &str,
        instance_id: &str,
    ) -> Result<DatabaseInstance, crate::api::ApiError> {
        let client = provider_data.client.clone();
        let project_id = project_id.to_string();
        let instance_id = instance_id.to_string();
        wait::wait_until(config, what, || {
            let client = client.clone();
            let project_id = project_id.clone();
            let instance_id = instance_id.clone();
            async move {
                let instance = client
                    .get_database_instance(&project_id, &instance_id)
                    .await?;
                Ok(match instance.status.as_str() {
                    "ACTIVE" => WaitOutcome::Done(instance),
                    "FAILED" => WaitOutcome::Failed(instance.status),
                    _ => WaitOutcome::Pending,
                })
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for DatabaseInstanceResource {
    fn type_name(&self) -> &str {
        "nimbus_database_instance"
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
            .description("Manages a managed database instance in a Nimbus project")
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
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine", AttributeType::String)
                    .description("Database engine, e.g. postgres or mysql")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .description("Engine version, upgradable in place")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("plan_id", AttributeType::String)
                    .description("Service plan identifier")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("replicas", AttributeType::Number)
                    .description("Number of read replicas")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "storage",
                    AttributeType::Object(HashMap::from([
                        ("class".to_string(), AttributeType::String),
                        ("size_gb".to_string(), AttributeType::Number),
                    ])),
                )
                .description("Storage class and size")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("acl", AttributeType::List(Box::new(AttributeType::String)))
                    .description("CIDRs allowed to reach the instance")
                    .optional()
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

        let create_request = CreateDatabaseInstanceRequest {
            name: request
                .config
                .get_string(&AttributePath::new("name"))
                .unwrap_or_default(),
            engine: request
                .config
                .get_string(&AttributePath::new("engine"))
                .unwrap_or_default(),
            version: request
                .config
                .get_string(&AttributePath::new("version"))
                .unwrap_or_default(),
            plan_id: request
                .config
                .get_string(&AttributePath::new("plan_id"))
                .unwrap_or_default(),
            replicas: request
                .config
                .get_number(&AttributePath::new("replicas"))
                .ok()
                .map(|r| r as u32),
            storage: Self::storage_from_config(&request.config),
            acl: acl_to_wire(&Self::acl_from_config(&request.config)),
        };

        let created = match provider_data
            .client
            .create_database_instance(&project_id, &create_request)
            .await
        {
            Ok(instance) => instance,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create database instance",
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
            "database instance create",
            WaitConfig::create(),
            &project_id,
            &created.instance_id,
        )
        .await
        {
            Ok(instance) => Self::map_instance_into_state(&mut new_state, &instance),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Database instance did not become active",
                    format!("API error: {}", e),
                ));
                Self::map_instance_into_state(&mut new_state, &created);
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
            .get_database_instance(&project_id, &instance_id)
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
                    "Failed to read database instance",
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

        let update_request = UpdateDatabaseInstanceRequest {
            version: request
                .config
                .get_string(&AttributePath::new("version"))
                .ok(),
            plan_id: request
                .config
                .get_string(&AttributePath::new("plan_id"))
                .ok(),
            replicas: request
                .config
                .get_number(&AttributePath::new("replicas"))
                .ok()
                .map(|r| r as u32),
            storage: Self::storage_from_config(&request.config),
            acl: Some(acl_to_wire(&Self::acl_from_config(&request.config))),
        };

        if let Err(e) = provider_data
            .client
            .update_database_instance(&project_id, &instance_id, &update_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to update database instance",
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
        match Self::wait_for_active(
            provider_data,
            "database instance update",
            WaitConfig::update(),
            &project_id,
            &instance_id,
        )
        .await
        {
            Ok(instance) => Self::map_instance_into_state(&mut new_state, &instance),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Database instance did not settle after update",
                    format!("API error: {}", e),
                ));
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
            .delete_database_instance(&project_id, &instance_id)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete database instance",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "database instance delete", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let instance_id = instance_id.clone();
            async move { client.get_database_instance(&project_id, &instance_id).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Database instance was not removed",
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
                AttributePath::new("instance_id"),
            ],
            &request,
            &mut response,
        );
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for DatabaseInstanceResource {
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

#[path = "./resource_instance_test.rs"]
#[cfg(test)]
mod resource_instance_test;
