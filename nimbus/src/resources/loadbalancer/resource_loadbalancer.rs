//! Load balancer resource
//!
//! The name is the API identifier, so renaming replaces the balancer.
//! Target pool membership is the only thing that changes in place.

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

use crate::api::loadbalancer::{
    CreateLoadBalancerRequest, Listener, LoadBalancer, Target, TargetPool,
    UpdateTargetPoolRequest,
};
use crate::api::wait::{self, WaitConfig, WaitOutcome};
use crate::provider_data::NimbusProviderData;
use std::collections::HashMap;

#[derive(Default)]
pub struct LoadBalancerResource {
    provider_data: Option<NimbusProviderData>,
}

fn listener_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("name".to_string(), AttributeType::String),
        ("port".to_string(), AttributeType::Number),
        ("protocol".to_string(), AttributeType::String),
        ("target_pool".to_string(), AttributeType::String),
    ]))
}

fn target_pool_type() -> AttributeType {
    AttributeType::Object(HashMap::from([
        ("name".to_string(), AttributeType::String),
        ("target_port".to_string(), AttributeType::Number),
        (
            "target_ips".to_string(),
            AttributeType::List(Box::new(AttributeType::String)),
        ),
    ]))
}

fn string_field(map: &HashMap<String, Dynamic>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Dynamic::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn number_field(map: &HashMap<String, Dynamic>, key: &str) -> Option<f64> {
    match map.get(key) {
        Some(Dynamic::Number(n)) => Some(*n),
        _ => None,
    }
}

fn listeners_from(value: &DynamicValue) -> Vec<Listener> {
    value
        .get_list(&AttributePath::new("listeners"))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            Dynamic::Map(map) => Some(Listener {
                name: string_field(&map, "name")?,
                port: number_field(&map, "port")? as u16,
                protocol: string_field(&map, "protocol")?,
                target_pool: string_field(&map, "target_pool")?,
            }),
            _ => None,
        })
        .collect()
}

fn target_pools_from(value: &DynamicValue) -> Vec<TargetPool> {
    value
        .get_list(&AttributePath::new("target_pools"))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            Dynamic::Map(map) => {
                let targets = match map.get("target_ips") {
                    Some(Dynamic::List(ips)) => ips
                        .iter()
                        .filter_map(|ip| match ip {
                            Dynamic::String(s) => Some(Target { ip: s.clone() }),
                            _ => None,
                        })
                        .collect(),
                    _ => vec![],
                };
                Some(TargetPool {
                    name: string_field(&map, "name")?,
                    target_port: number_field(&map, "target_port")? as u16,
                    targets,
                })
            }
            _ => None,
        })
        .collect()
}

fn pools_differ(a: &TargetPool, b: &TargetPool) -> bool {
    let ips = |pool: &TargetPool| -> Vec<String> {
        pool.targets.iter().map(|t| t.ip.clone()).collect()
    };
    a.target_port != b.target_port || ips(a) != ips(b)
}

impl LoadBalancerResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_balancer_into_state(state: &mut DynamicValue, balancer: &LoadBalancer) {
        let _ = state.set_string(&AttributePath::new("name"), balancer.name.clone());
        if let Some(plan) = &balancer.plan {
            let _ = state.set_string(&AttributePath::new("plan"), plan.clone());
        }
        if let Some(address) = &balancer.external_address {
            let _ = state.set_string(&AttributePath::new("external_address"), address.clone());
        }
        let _ = state.set_string(&AttributePath::new("status"), balancer.status.clone());
        let _ = state.set_list(
            &AttributePath::new("listeners"),
            balancer
                .listeners
                .iter()
                .map(|listener| {
                    Dynamic::Map(HashMap::from([
                        (
                            "name".to_string(),
                            Dynamic::String(listener.name.clone()),
                        ),
                        ("port".to_string(), Dynamic::Number(listener.port as f64)),
                        (
                            "protocol".to_string(),
                            Dynamic::String(listener.protocol.clone()),
                        ),
                        (
                            "target_pool".to_string(),
                            Dynamic::String(listener.target_pool.clone()),
                        ),
                    ]))
                })
                .collect(),
        );
        let _ = state.set_list(
            &AttributePath::new("target_pools"),
            balancer
                .target_pools
                .iter()
                .map(|pool| {
                    Dynamic::Map(HashMap::from([
                        ("name".to_string(), Dynamic::String(pool.name.clone())),
                        (
                            "target_port".to_string(),
                            Dynamic::Number(pool.target_port as f64),
                        ),
                        (
                            "target_ips".to_string(),
                            Dynamic::List(
                                pool.targets
                                    .iter()
                                    .map(|target| Dynamic::String(target.ip.clone()))
                                    .collect(),
                            ),
                        ),
                    ]))
                })
                .collect(),
        );
    }

    async fn wait_for_active(
        provider_data: &NimbusProviderData,
        what: &str,
        config: WaitConfig,
        project_id: &str,
        name: &str,
    ) -> Result<LoadBalancer, crate::api::ApiError> {
        let client = provider_data.client.clone();
        let project_id = project_id.to_string();
        let name = name.to_string();
        wait::wait_until(config, what, || {
            let client = client.clone();
            let project_id = project_id.clone();
            let name = name.clone();
            async move {
                let balancer = client.get_load_balancer(&project_id, &name).await?;
                Ok(match balancer.status.as_str() {
                    "ACTIVE" => WaitOutcome::Done(balancer),
                    "ERROR" => WaitOutcome::Failed(balancer.status),
                    _ => WaitOutcome::Pending,
                })
            }
        })
        .await
    }
}

#[async_trait]
impl Resource for LoadBalancerResource {
    fn type_name(&self) -> &str {
        "nimbus_loadbalancer"
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
            .description("Manages an application load balancer in a Nimbus project")
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("Project the load balancer belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Load balancer name, also its API identifier")
                    .required()
                    .validator(StringLengthValidator::between(1, 63))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("plan", AttributeType::String)
                    .description("Capacity plan")
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "listeners",
                    AttributeType::List(Box::new(listener_type())),
                )
                .description("Frontend listeners forwarding to target pools")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "target_pools",
                    AttributeType::List(Box::new(target_pool_type())),
                )
                .description("Backend pools; port and membership change in place")
                .required()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("external_address", AttributeType::String)
                    .description("Public address assigned by the platform")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
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

        // Every listener has to forward to a pool defined alongside it.
        let pools: Vec<String> = target_pools_from(&request.config)
            .into_iter()
            .map(|pool| pool.name)
            .collect();
        for (index, listener) in listeners_from(&request.config).iter().enumerate() {
            if !pools.contains(&listener.target_pool) {
                diagnostics.push(
                    Diagnostic::error(
                        "Unknown target pool",
                        format!(
                            "Listener '{}' forwards to undefined target pool '{}'",
                            listener.name, listener.target_pool
                        ),
                    )
                    .with_attribute(AttributePath::new("listeners").index(index as i64)),
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

        let create_request = CreateLoadBalancerRequest {
            name: name.clone(),
            plan: request.config.get_string(&AttributePath::new("plan")).ok(),
            listeners: listeners_from(&request.config),
            target_pools: target_pools_from(&request.config),
        };

        if let Err(e) = provider_data
            .client
            .create_load_balancer(&project_id, &create_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to create load balancer",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        let mut new_state = request.planned_state;
        match Self::wait_for_active(
            provider_data,
            "load balancer create",
            WaitConfig::create(),
            &project_id,
            &name,
        )
        .await
        {
            Ok(balancer) => Self::map_balancer_into_state(&mut new_state, &balancer),
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Load balancer did not become active",
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

        match provider_data.client.get_load_balancer(&project_id, &name).await {
            Ok(balancer) => {
                let mut new_state = request.current_state.clone();
                Self::map_balancer_into_state(&mut new_state, &balancer);
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
                    "Failed to read load balancer",
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

        let (project_id, name) = match (
            request
                .prior_state
                .get_string(&AttributePath::new("project_id")),
            request.prior_state.get_string(&AttributePath::new("name")),
        ) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing identifiers",
                    "Prior state is missing project_id or name",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                };
            }
        };

        let prior_pools = target_pools_from(&request.prior_state);
        let mut changed = false;
        for pool in target_pools_from(&request.config) {
            let prior = prior_pools.iter().find(|p| p.name == pool.name);
            if prior.is_none_or(|p| pools_differ(p, &pool)) {
                if let Err(e) = provider_data
                    .client
                    .update_target_pool(
                        &project_id,
                        &name,
                        &pool.name,
                        &UpdateTargetPoolRequest {
                            target_port: pool.target_port,
                            targets: pool.targets.clone(),
                        },
                    )
                    .await
                {
                    diagnostics.push(Diagnostic::error(
                        "Failed to update target pool",
                        format!("API error updating pool '{}': {}", pool.name, e),
                    ));
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        private: vec![],
                        diagnostics,
                        new_identity: None,
                    };
                }
                changed = true;
            }
        }

        let mut new_state = request.planned_state;
        if changed {
            match Self::wait_for_active(
                provider_data,
                "load balancer update",
                WaitConfig::update(),
                &project_id,
                &name,
            )
            .await
            {
                Ok(balancer) => Self::map_balancer_into_state(&mut new_state, &balancer),
                Err(e) => {
                    diagnostics.push(Diagnostic::error(
                        "Load balancer did not settle after update",
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

        if let Err(e) = provider_data
            .client
            .delete_load_balancer(&project_id, &name)
            .await
        {
            if !e.is_not_found() {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete load balancer",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let client = provider_data.client.clone();
        let gone = wait::wait_until_gone(WaitConfig::delete(), "load balancer delete", || {
            let client = client.clone();
            let project_id = project_id.clone();
            let name = name.clone();
            async move { client.get_load_balancer(&project_id, &name).await }
        })
        .await;

        if let Err(e) = gone {
            diagnostics.push(Diagnostic::error(
                "Load balancer was not removed",
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
impl ResourceWithConfigure for LoadBalancerResource {
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

#[path = "./resource_loadbalancer_test.rs"]
#[cfg(test)]
mod resource_loadbalancer_test;
