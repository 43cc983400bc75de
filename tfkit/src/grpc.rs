//! gRPC service implementation of the Terraform Plugin Protocol
//!
//! [`ProviderHandler`] adapts a [`Provider`] to the tfplugin6 service: it
//! decodes wire values, routes lifecycle RPCs to resource and data source
//! instances built by the provider's factories, and carries the provider
//! data produced by `ConfigureProvider` into every instance's configure
//! hook.
//!
//! Planning responsibilities live here rather than in resources: absent
//! computed attributes are marked unknown, attribute defaults are applied,
//! and plan modifiers run with their requires-replace results collected
//! into the response.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderSchemaRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest, ResourceWithConfigure,
    UpdateResourceRequest, UpgradeResourceStateRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    AttributeType, DefaultRequest, NestingMode, ObjectNestingMode, PlanModifierRequest, Schema,
    StringKind, ValidatorRequest,
};
use crate::types::{
    AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason, Diagnostic,
    DiagnosticSeverity, Dynamic, DynamicValue, RawState, ResourceIdentityData,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::debug;

/// Implements the tfplugin6 Provider service on top of a [`Provider`].
pub struct ProviderHandler<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<Option<Arc<dyn Any + Send + Sync>>>>,
}

impl<P: Provider + 'static> ProviderHandler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
        }
    }

    /// Builds a resource instance and runs its configure hook with the
    /// current provider data. Before `ConfigureProvider` has run the hook
    /// receives `None`; instances must tolerate that for validation RPCs.
    async fn configured_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Status> {
        let mut resource = {
            let provider = self.provider.read().await;
            provider
                .create_resource(type_name)
                .map_err(|e| Status::internal(e.to_string()))?
        };

        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(Context::new(), ConfigureResourceRequest { provider_data })
            .await;
        if let Some(diag) = first_error(&response.diagnostics) {
            return Err(Status::internal(format!(
                "{}: {}",
                diag.summary, diag.detail
            )));
        }

        Ok(resource)
    }

    async fn configured_data_source(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Status> {
        let mut data_source = {
            let provider = self.provider.read().await;
            provider
                .create_data_source(type_name)
                .map_err(|e| Status::internal(e.to_string()))?
        };

        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
            .await;
        if let Some(diag) = first_error(&response.diagnostics) {
            return Err(Status::internal(format!(
                "{}: {}",
                diag.summary, diag.detail
            )));
        }

        Ok(data_source)
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for ProviderHandler<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: provider
                .data_source_types()
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: provider
                .resource_types()
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
            functions: vec![],
            ephemeral_resources: vec![],
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let ctx = Context::new();
        let provider = self.provider.read().await;
        let mut diagnostics = vec![];

        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        diagnostics.extend(provider_schema.diagnostics.iter().map(convert_diagnostic));

        let mut resource_schemas = HashMap::new();
        for type_name in provider.resource_types() {
            let resource = provider
                .create_resource(&type_name)
                .map_err(|e| Status::internal(e.to_string()))?;
            let response = resource.schema(ctx.clone(), ResourceSchemaRequest {}).await;
            diagnostics.extend(response.diagnostics.iter().map(convert_diagnostic));
            resource_schemas.insert(type_name, convert_schema(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for type_name in provider.data_source_types() {
            let data_source = provider
                .create_data_source(&type_name)
                .map_err(|e| Status::internal(e.to_string()))?;
            let response = data_source
                .schema(ctx.clone(), DataSourceSchemaRequest {})
                .await;
            diagnostics.extend(response.diagnostics.iter().map(convert_diagnostic));
            data_source_schemas.insert(type_name, convert_schema(&response.schema));
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(convert_schema(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics,
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
            functions: HashMap::new(),
            ephemeral_resource_schemas: HashMap::new(),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();

        // Config may still hold values only known after apply; skip
        // validation rather than failing the whole plan.
        let config = match decode_dynamic_value(&req.config) {
            Ok(config) => config,
            Err(status) => {
                debug!(error = %status, "skipping provider config validation, config not decodable");
                return Ok(Response::new(proto::validate_provider_config::Response {
                    diagnostics: vec![],
                }));
            }
        };

        let ctx = Context::new();
        let provider = self.provider.read().await;

        let schema_response = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let mut diagnostics = run_schema_checks(&schema_response.schema, &config);

        let response = provider
            .validate(ctx, ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics.iter().map(convert_diagnostic).collect(),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(&req.config)?;

        debug!(
            terraform_version = %req.terraform_version,
            "configuring provider"
        );

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: convert_client_capabilities(req.client_capabilities),
                },
            )
            .await;

        *self.provider_data.write().await = response.provider_data;

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();

        let config = match decode_dynamic_value(&req.config) {
            Ok(config) => config,
            Err(status) => {
                debug!(
                    type_name = %req.type_name,
                    error = %status,
                    "skipping resource config validation, config not decodable"
                );
                return Ok(Response::new(proto::validate_resource_config::Response {
                    diagnostics: vec![],
                }));
            }
        };

        let resource = self.configured_resource(&req.type_name).await?;
        let ctx = Context::new();

        let schema_response = resource.schema(ctx.clone(), ResourceSchemaRequest {}).await;
        let mut diagnostics = run_schema_checks(&schema_response.schema, &config);

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: convert_client_capabilities(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics.iter().map(convert_diagnostic).collect(),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();

        let config = match decode_dynamic_value(&req.config) {
            Ok(config) => config,
            Err(status) => {
                debug!(
                    type_name = %req.type_name,
                    error = %status,
                    "skipping data source config validation, config not decodable"
                );
                return Ok(Response::new(
                    proto::validate_data_resource_config::Response {
                        diagnostics: vec![],
                    },
                ));
            }
        };

        let data_source = self.configured_data_source(&req.type_name).await?;
        let ctx = Context::new();

        let schema_response = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest {})
            .await;
        let mut diagnostics = run_schema_checks(&schema_response.schema, &config);

        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(
            proto::validate_data_resource_config::Response {
                diagnostics: diagnostics.iter().map(convert_diagnostic).collect(),
            },
        ))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let resource = self.configured_resource(&req.type_name).await?;

        let response = resource
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: req.type_name,
                    version: req.version,
                    raw_state: convert_raw_state(req.raw_state),
                },
            )
            .await;

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(&response.upgraded_state)?),
            diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> std::result::Result<Response<proto::get_resource_identity_schemas::Response>, Status> {
        Ok(Response::new(
            proto::get_resource_identity_schemas::Response {
                identity_schemas: HashMap::new(),
                diagnostics: vec![],
            },
        ))
    }

    async fn upgrade_resource_identity(
        &self,
        _request: Request<proto::upgrade_resource_identity::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_identity::Response>, Status> {
        Err(Status::unimplemented(
            "resource identity upgrade is not supported",
        ))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        let resource = self.configured_resource(&req.type_name).await?;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state: decode_dynamic_value(&req.current_state)?,
                    private: req.private,
                    provider_meta: decode_optional_value(&req.provider_meta)?,
                    client_capabilities: convert_client_capabilities(req.client_capabilities),
                    current_identity: decode_identity(req.current_identity)?,
                },
            )
            .await;

        // None means the remote object is gone and Terraform should drop
        // it from state.
        let new_state = match &response.new_state {
            Some(state) => Some(encode_dynamic_value(state)?),
            None => None,
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state,
            diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
            private: response.private,
            deferred: convert_deferred(response.deferred),
            new_identity: encode_identity(response.new_identity)?,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();

        let prior_state = decode_dynamic_value(&req.prior_state)?;
        let proposed_new_state = decode_dynamic_value(&req.proposed_new_state)?;
        let config = decode_dynamic_value(&req.config)?;

        // Destroy plans pass through untouched.
        if proposed_new_state.is_null() {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: Some(encode_dynamic_value(&proposed_new_state)?),
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
                deferred: None,
                planned_identity: req.prior_identity,
            }));
        }

        let resource = self.configured_resource(&req.type_name).await?;
        let schema_response = resource
            .schema(Context::new(), ResourceSchemaRequest {})
            .await;
        let schema = schema_response.schema;

        let is_create = prior_state.is_null();
        let mut planned_state = proposed_new_state;
        let mut requires_replace = vec![];
        let mut diagnostics = vec![];

        for attribute in &schema.block.attributes {
            let path = AttributePath::new(&attribute.name);
            let config_value = value_at(&config, &attribute.name);
            let prior_value = value_at(&prior_state, &attribute.name);

            if config_value.is_null() {
                if attribute.optional && attribute.computed && attribute.default.is_some() {
                    if let Some(default) = &attribute.default {
                        let response = default.default_value(DefaultRequest { path: path.clone() });
                        planned_state
                            .set_value(&path, response.value.value)
                            .map_err(|e| Status::internal(e.to_string()))?;
                    }
                } else if attribute.computed && value_at(&planned_state, &attribute.name).is_null()
                {
                    // Computed attributes the practitioner cannot set:
                    // unknown on create, carried over from state on update.
                    if prior_value.is_null() {
                        planned_state
                            .mark_unknown(&path)
                            .map_err(|e| Status::internal(e.to_string()))?;
                    } else {
                        planned_state
                            .set_value(&path, prior_value.value.clone())
                            .map_err(|e| Status::internal(e.to_string()))?;
                    }
                }
            }

            if attribute.plan_modifiers.is_empty() {
                continue;
            }

            let mut current = value_at(&planned_state, &attribute.name);
            for modifier in &attribute.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: config_value.clone(),
                    state_value: prior_value.clone(),
                    plan_value: current.clone(),
                    path: path.clone(),
                });
                current = response.plan_value;
                // Nothing exists yet on create, so there is nothing to
                // replace regardless of what modifiers report.
                if response.requires_replace && !is_create {
                    requires_replace.push(convert_attribute_path(&path));
                }
                diagnostics.extend(response.diagnostics.iter().map(convert_diagnostic));
            }
            planned_state
                .set_value(&path, current.value)
                .map_err(|e| Status::internal(e.to_string()))?;
        }

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&planned_state)?),
            requires_replace,
            planned_private: req.prior_private,
            diagnostics,
            legacy_type_system: false,
            deferred: None,
            planned_identity: req.prior_identity,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let resource = self.configured_resource(&req.type_name).await?;

        let prior_state = decode_dynamic_value(&req.prior_state)?;
        let planned_state = decode_dynamic_value(&req.planned_state)?;
        let config = decode_dynamic_value(&req.config)?;
        let provider_meta = decode_optional_value(&req.provider_meta)?;
        let ctx = Context::new();

        if prior_state.is_null() {
            debug!(type_name = %req.type_name, "applying create");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;

            Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_dynamic_value(&response.new_state)?),
                private: response.private,
                diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
                legacy_type_system: false,
                new_identity: None,
            }))
        } else if planned_state.is_null() {
            debug!(type_name = %req.type_name, "applying delete");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;

            // A failed delete keeps the prior state so Terraform still
            // tracks the object.
            let new_state = if first_error(&response.diagnostics).is_some() {
                Some(encode_dynamic_value(&prior_state)?)
            } else {
                None
            };

            Ok(Response::new(proto::apply_resource_change::Response {
                new_state,
                private: vec![],
                diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
                legacy_type_system: false,
                new_identity: None,
            }))
        } else {
            debug!(type_name = %req.type_name, "applying update");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                        planned_identity: decode_identity(req.planned_identity)?,
                    },
                )
                .await;

            Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_dynamic_value(&response.new_state)?),
                private: response.private,
                diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
                legacy_type_system: false,
                new_identity: encode_identity(response.new_identity)?,
            }))
        }
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let resource = self.configured_resource(&req.type_name).await?;

        debug!(type_name = %req.type_name, id = %req.id, "importing resource");

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: convert_client_capabilities(req.client_capabilities),
                    identity: decode_identity(req.identity)?,
                },
            )
            .await;

        let mut imported_resources = vec![];
        for imported in response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(&imported.state)?),
                private: imported.private,
                identity: encode_identity(imported.identity)?,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
            deferred: convert_deferred(response.deferred),
        }))
    }

    async fn move_resource_state(
        &self,
        _request: Request<proto::move_resource_state::Request>,
    ) -> std::result::Result<Response<proto::move_resource_state::Response>, Status> {
        Err(Status::unimplemented(
            "moving resources between types is not supported",
        ))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let data_source = self.configured_data_source(&req.type_name).await?;

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config: decode_dynamic_value(&req.config)?,
                    provider_meta: decode_optional_value(&req.provider_meta)?,
                    client_capabilities: convert_client_capabilities(req.client_capabilities),
                },
            )
            .await;

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(&response.state)?),
            diagnostics: response.diagnostics.iter().map(convert_diagnostic).collect(),
            deferred: convert_deferred(response.deferred),
        }))
    }

    async fn validate_ephemeral_resource_config(
        &self,
        _request: Request<proto::validate_ephemeral_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_ephemeral_resource_config::Response>, Status>
    {
        Ok(Response::new(
            proto::validate_ephemeral_resource_config::Response {
                diagnostics: vec![],
            },
        ))
    }

    async fn open_ephemeral_resource(
        &self,
        _request: Request<proto::open_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::open_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented(
            "ephemeral resources are not supported",
        ))
    }

    async fn renew_ephemeral_resource(
        &self,
        _request: Request<proto::renew_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::renew_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented(
            "ephemeral resources are not supported",
        ))
    }

    async fn close_ephemeral_resource(
        &self,
        _request: Request<proto::close_ephemeral_resource::Request>,
    ) -> std::result::Result<Response<proto::close_ephemeral_resource::Response>, Status> {
        Err(Status::unimplemented(
            "ephemeral resources are not supported",
        ))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> std::result::Result<Response<proto::get_functions::Response>, Status> {
        Ok(Response::new(proto::get_functions::Response {
            functions: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn call_function(
        &self,
        _request: Request<proto::call_function::Request>,
    ) -> std::result::Result<Response<proto::call_function::Response>, Status> {
        Err(Status::unimplemented(
            "provider functions are not supported",
        ))
    }
}

// Wire conversion helpers.

#[allow(clippy::result_large_err)]
fn decode_dynamic_value(
    value: &Option<proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    match value {
        Some(value) if !value.msgpack.is_empty() => DynamicValue::decode_msgpack(&value.msgpack)
            .map_err(|e| Status::invalid_argument(format!("failed to decode msgpack value: {}", e))),
        Some(value) if !value.json.is_empty() => DynamicValue::decode_json(&value.json)
            .map_err(|e| Status::invalid_argument(format!("failed to decode json value: {}", e))),
        _ => Ok(DynamicValue::null()),
    }
}

#[allow(clippy::result_large_err)]
fn decode_optional_value(
    value: &Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    match value {
        Some(_) => Ok(Some(decode_dynamic_value(value)?)),
        None => Ok(None),
    }
}

#[allow(clippy::result_large_err)]
fn encode_dynamic_value(
    value: &DynamicValue,
) -> std::result::Result<proto::DynamicValue, Status> {
    Ok(proto::DynamicValue {
        msgpack: value
            .encode_msgpack()
            .map_err(|e| Status::internal(format!("failed to encode value: {}", e)))?,
        json: vec![],
    })
}

#[allow(clippy::result_large_err)]
fn decode_identity(
    identity: Option<proto::ResourceIdentityData>,
) -> std::result::Result<Option<ResourceIdentityData>, Status> {
    match identity {
        Some(identity) => Ok(Some(ResourceIdentityData {
            identity_data: decode_dynamic_value(&identity.identity_data)?,
        })),
        None => Ok(None),
    }
}

#[allow(clippy::result_large_err)]
fn encode_identity(
    identity: Option<ResourceIdentityData>,
) -> std::result::Result<Option<proto::ResourceIdentityData>, Status> {
    match identity {
        Some(identity) => Ok(Some(proto::ResourceIdentityData {
            identity_data: Some(encode_dynamic_value(&identity.identity_data)?),
        })),
        None => Ok(None),
    }
}

fn convert_client_capabilities(
    capabilities: Option<proto::ClientCapabilities>,
) -> ClientCapabilities {
    match capabilities {
        Some(capabilities) => ClientCapabilities {
            deferral_allowed: capabilities.deferral_allowed,
            write_only_attributes_allowed: capabilities.write_only_attributes_allowed,
        },
        None => ClientCapabilities::default(),
    }
}

fn convert_raw_state(raw: Option<proto::RawState>) -> RawState {
    match raw {
        Some(raw) => RawState {
            json: if raw.json.is_empty() {
                None
            } else {
                Some(raw.json)
            },
            flatmap: if raw.flatmap.is_empty() {
                None
            } else {
                Some(raw.flatmap)
            },
        },
        None => RawState {
            json: None,
            flatmap: None,
        },
    }
}

fn convert_deferred(deferred: Option<Deferred>) -> Option<proto::Deferred> {
    deferred.map(|deferred| proto::Deferred {
        reason: match deferred.reason {
            DeferredReason::Unknown => proto::deferred::Reason::Unknown,
            DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
            DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
            DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
        } as i32,
    })
}

fn convert_diagnostic(diag: &Diagnostic) -> proto::Diagnostic {
    proto::Diagnostic {
        severity: match diag.severity {
            DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
            DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
            DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
        } as i32,
        summary: diag.summary.clone(),
        detail: diag.detail.clone(),
        attribute: diag.attribute.as_ref().map(convert_attribute_path),
    }
}

fn convert_attribute_path(path: &AttributePath) -> proto::AttributePath {
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => {
                        proto::attribute_path::step::Selector::AttributeName(name.clone())
                    }
                    AttributePathStep::ElementKeyString(key) => {
                        proto::attribute_path::step::Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(index) => {
                        proto::attribute_path::step::Selector::ElementKeyInt(*index)
                    }
                }),
            })
            .collect(),
    }
}

fn convert_string_kind(kind: StringKind) -> proto::StringKind {
    match kind {
        StringKind::Plain => proto::StringKind::Plain,
        StringKind::Markdown => proto::StringKind::Markdown,
    }
}

fn convert_schema(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(convert_block(&schema.block)),
    }
}

fn convert_block(block: &crate::schema::Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block.attributes.iter().map(convert_attribute).collect(),
        block_types: block.block_types.iter().map(convert_nested_block).collect(),
        description: block.description.clone(),
        description_kind: convert_string_kind(block.description_kind) as i32,
        deprecated: block.deprecated,
    }
}

fn convert_attribute(attr: &crate::schema::Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        // Exactly one of type and nested_type may be set on the wire.
        r#type: if attr.nested_type.is_some() {
            vec![]
        } else {
            attribute_type_bytes(&attr.r#type)
        },
        nested_type: attr.nested_type.as_ref().map(convert_nested_type),
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
        write_only: false,
    }
}

fn convert_nested_block(nested: &crate::schema::NestedBlock) -> proto::schema::NestedBlock {
    proto::schema::NestedBlock {
        type_name: nested.type_name.clone(),
        block: Some(convert_block(&nested.block)),
        nesting: match nested.nesting {
            NestingMode::Invalid => proto::schema::nested_block::NestingMode::Invalid,
            NestingMode::Single => proto::schema::nested_block::NestingMode::Single,
            NestingMode::List => proto::schema::nested_block::NestingMode::List,
            NestingMode::Set => proto::schema::nested_block::NestingMode::Set,
            NestingMode::Map => proto::schema::nested_block::NestingMode::Map,
            NestingMode::Group => proto::schema::nested_block::NestingMode::Group,
        } as i32,
        min_items: nested.min_items,
        max_items: nested.max_items,
    }
}

fn convert_nested_type(nested: &crate::schema::NestedType) -> proto::schema::Object {
    proto::schema::Object {
        attributes: nested.attributes.iter().map(convert_attribute).collect(),
        nesting: match nested.nesting {
            ObjectNestingMode::Invalid => proto::schema::object::NestingMode::Invalid,
            ObjectNestingMode::Single => proto::schema::object::NestingMode::Single,
            ObjectNestingMode::List => proto::schema::object::NestingMode::List,
            ObjectNestingMode::Set => proto::schema::object::NestingMode::Set,
            ObjectNestingMode::Map => proto::schema::object::NestingMode::Map,
        } as i32,
        // min_items/max_items on Object are deprecated in the protocol.
        ..Default::default()
    }
}

/// JSON type constraint syntax, e.g. `"string"` or `["list","string"]`.
fn attribute_type_bytes(attr_type: &AttributeType) -> Vec<u8> {
    attribute_type_json(attr_type).to_string().into_bytes()
}

fn attribute_type_json(attr_type: &AttributeType) -> serde_json::Value {
    use serde_json::json;
    match attr_type {
        AttributeType::String => json!("string"),
        AttributeType::Number => json!("number"),
        AttributeType::Bool => json!("bool"),
        AttributeType::List(elem) => json!(["list", attribute_type_json(elem)]),
        AttributeType::Set(elem) => json!(["set", attribute_type_json(elem)]),
        AttributeType::Map(elem) => json!(["map", attribute_type_json(elem)]),
        AttributeType::Object(fields) => {
            let fields: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(name, field_type)| (name.clone(), attribute_type_json(field_type)))
                .collect();
            json!(["object", fields])
        }
    }
}

// Validation helpers.

fn first_error(diagnostics: &[Diagnostic]) -> Option<&Diagnostic> {
    diagnostics
        .iter()
        .find(|d| matches!(d.severity, DiagnosticSeverity::Error))
}

fn value_at(value: &DynamicValue, name: &str) -> DynamicValue {
    match &value.value {
        Dynamic::Map(map) => DynamicValue::new(map.get(name).cloned().unwrap_or(Dynamic::Null)),
        _ => DynamicValue::null(),
    }
}

/// Schema-driven config checks shared by every validate RPC: required
/// attributes present, values type-conformant, attached validators run.
fn run_schema_checks(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    for attribute in &schema.block.attributes {
        let path = AttributePath::new(&attribute.name);
        let config_value = value_at(config, &attribute.name);

        if attribute.required && config_value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    format!("Missing required attribute: {}", attribute.name),
                    format!(
                        "The attribute {} is required, but no value was configured",
                        attribute.name
                    ),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        if attribute.nested_type.is_none()
            && !type_conforms(&config_value.value, &attribute.r#type)
        {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid value type for attribute: {}", attribute.name),
                    format!(
                        "Expected {}, got {}",
                        attribute_type_json(&attribute.r#type),
                        config_value.get_type_name()
                    ),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        for validator in &attribute.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: config_value.clone(),
                path: path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    diagnostics
}

fn type_conforms(value: &Dynamic, expected: &AttributeType) -> bool {
    match (value, expected) {
        // Null and unknown conform to anything.
        (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(elem))
        | (Dynamic::List(items), AttributeType::Set(elem)) => {
            items.iter().all(|item| type_conforms(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Map(elem)) => {
            map.values().all(|item| type_conforms(item, elem))
        }
        (Dynamic::Map(map), AttributeType::Object(fields)) => fields
            .iter()
            .all(|(name, field_type)| match map.get(name) {
                Some(field_value) => type_conforms(field_value, field_type),
                None => true,
            }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{
        DataSource, DataSourceMetadataRequest, DataSourceMetadataResponse,
        DataSourceSchemaResponse, ReadDataSourceResponse, ValidateDataSourceConfigResponse,
    };
    use crate::plan_modifier::{RequiresReplace, UseStateForUnknown};
    use crate::provider::{
        ConfigureProviderResponse, ProviderMetadataRequest, ProviderMetadataResponse,
        ProviderSchemaResponse, ValidateProviderConfigResponse,
    };
    use crate::resource::{
        ConfigureResourceResponse, CreateResourceResponse, DeleteResourceResponse,
        ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
        ResourceSchemaResponse, UpdateResourceResponse, ValidateResourceConfigResponse,
    };
    use crate::schema::{AttributeBuilder, SchemaBuilder};
    use crate::types::Config;
    use crate::Result;
    use async_trait::async_trait;
    use proto::ProviderService;

    struct TestApi {
        endpoint: String,
    }

    struct TestProvider;

    #[async_trait]
    impl Provider for TestProvider {
        fn type_name(&self) -> &str {
            "testcloud"
        }

        async fn metadata(
            &self,
            _ctx: Context,
            _request: ProviderMetadataRequest,
        ) -> ProviderMetadataResponse {
            ProviderMetadataResponse {
                type_name: "testcloud".to_string(),
            }
        }

        async fn schema(
            &self,
            _ctx: Context,
            _request: ProviderSchemaRequest,
        ) -> ProviderSchemaResponse {
            ProviderSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("endpoint", AttributeType::String)
                            .optional()
                            .build(),
                    )
                    .build(),
                diagnostics: vec![],
            }
        }

        async fn validate(
            &self,
            _ctx: Context,
            _request: ValidateProviderConfigRequest,
        ) -> ValidateProviderConfigResponse {
            ValidateProviderConfigResponse {
                diagnostics: vec![],
            }
        }

        async fn configure(
            &mut self,
            _ctx: Context,
            request: ConfigureProviderRequest,
        ) -> ConfigureProviderResponse {
            let endpoint = request
                .config
                .get_string(&AttributePath::new("endpoint"))
                .unwrap_or_else(|_| "https://api.testcloud.example".to_string());
            ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new(TestApi { endpoint })),
            }
        }

        fn create_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>> {
            match type_name {
                "testcloud_instance" => Ok(Box::new(InstanceResource { api: None })),
                _ => Err(crate::TfkitError::ResourceNotFound(type_name.to_string())),
            }
        }

        fn create_data_source(
            &self,
            type_name: &str,
        ) -> Result<Box<dyn DataSourceWithConfigure>> {
            match type_name {
                "testcloud_image" => Ok(Box::new(ImageDataSource)),
                _ => Err(crate::TfkitError::DataSourceNotFound(type_name.to_string())),
            }
        }

        fn resource_types(&self) -> Vec<String> {
            vec!["testcloud_instance".to_string()]
        }

        fn data_source_types(&self) -> Vec<String> {
            vec!["testcloud_image".to_string()]
        }
    }

    struct InstanceResource {
        api: Option<Arc<TestApi>>,
    }

    #[async_trait]
    impl Resource for InstanceResource {
        fn type_name(&self) -> &str {
            "testcloud_instance"
        }

        async fn metadata(
            &self,
            _ctx: Context,
            _request: ResourceMetadataRequest,
        ) -> ResourceMetadataResponse {
            ResourceMetadataResponse {
                type_name: "testcloud_instance".to_string(),
            }
        }

        async fn schema(
            &self,
            _ctx: Context,
            _request: ResourceSchemaRequest,
        ) -> ResourceSchemaResponse {
            ResourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("id", AttributeType::String)
                            .computed()
                            .plan_modifier(UseStateForUnknown::create())
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("zone", AttributeType::String)
                            .optional()
                            .plan_modifier(RequiresReplace::create())
                            .build(),
                    )
                    .build(),
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
            if self.api.is_none() {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![Diagnostic::error(
                        "Provider not configured",
                        "create called before the provider was configured",
                    )],
                };
            }

            let mut state = request.planned_state;
            state
                .set_string(&AttributePath::new("id"), "inst-001".to_string())
                .ok();
            CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            }
        }

        async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
            let name = request
                .current_state
                .get_string(&AttributePath::new("name"))
                .unwrap_or_default();

            if name == "vanished" {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: vec![],
                    deferred: None,
                    new_identity: None,
                };
            }

            ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
                new_identity: None,
            }
        }

        async fn update(
            &self,
            _ctx: Context,
            request: UpdateResourceRequest,
        ) -> UpdateResourceResponse {
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
            _request: DeleteResourceRequest,
        ) -> DeleteResourceResponse {
            DeleteResourceResponse {
                diagnostics: vec![],
            }
        }
    }

    #[async_trait]
    impl ResourceWithConfigure for InstanceResource {
        async fn configure(
            &mut self,
            _ctx: Context,
            request: ConfigureResourceRequest,
        ) -> ConfigureResourceResponse {
            if let Some(data) = request.provider_data {
                if let Ok(api) = data.downcast::<TestApi>() {
                    self.api = Some(api);
                }
            }
            ConfigureResourceResponse {
                diagnostics: vec![],
            }
        }
    }

    struct ImageDataSource;

    #[async_trait]
    impl DataSource for ImageDataSource {
        fn type_name(&self) -> &str {
            "testcloud_image"
        }

        async fn metadata(
            &self,
            _ctx: Context,
            _request: DataSourceMetadataRequest,
        ) -> DataSourceMetadataResponse {
            DataSourceMetadataResponse {
                type_name: "testcloud_image".to_string(),
            }
        }

        async fn schema(
            &self,
            _ctx: Context,
            _request: DataSourceSchemaRequest,
        ) -> DataSourceSchemaResponse {
            DataSourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .computed()
                            .build(),
                    )
                    .build(),
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

        async fn read(
            &self,
            _ctx: Context,
            _request: ReadDataSourceRequest,
        ) -> ReadDataSourceResponse {
            let mut state = Config::new(Dynamic::Map(HashMap::new()));
            state
                .set_string(&AttributePath::new("name"), "ubuntu-24.04".to_string())
                .ok();
            ReadDataSourceResponse {
                state,
                diagnostics: vec![],
                deferred: None,
            }
        }
    }

    #[async_trait]
    impl DataSourceWithConfigure for ImageDataSource {
        async fn configure(
            &mut self,
            _ctx: Context,
            _request: ConfigureDataSourceRequest,
        ) -> crate::data_source::ConfigureDataSourceResponse {
            crate::data_source::ConfigureDataSourceResponse {
                diagnostics: vec![],
            }
        }
    }

    fn handler() -> ProviderHandler<TestProvider> {
        ProviderHandler::new(TestProvider)
    }

    async fn configured_handler() -> ProviderHandler<TestProvider> {
        let handler = handler();
        let config = DynamicValue::new(Dynamic::Map(HashMap::from([(
            "endpoint".to_string(),
            Dynamic::String("https://api.testcloud.example".to_string()),
        )])));
        let request = Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: Some(proto::DynamicValue {
                msgpack: config.encode_msgpack().unwrap(),
                json: vec![],
            }),
            client_capabilities: None,
        });
        handler.configure_provider(request).await.unwrap();
        handler
    }

    fn wire_value(value: Dynamic) -> Option<proto::DynamicValue> {
        Some(proto::DynamicValue {
            msgpack: DynamicValue::new(value).encode_msgpack().unwrap(),
            json: vec![],
        })
    }

    fn wire_map(entries: &[(&str, Dynamic)]) -> Option<proto::DynamicValue> {
        wire_value(Dynamic::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    fn decode_wire(value: &Option<proto::DynamicValue>) -> DynamicValue {
        decode_dynamic_value(value).unwrap()
    }

    #[tokio::test]
    async fn provider_schema_lists_resources_and_data_sources() {
        let handler = handler();
        let response = handler
            .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
            .await
            .unwrap()
            .into_inner();

        assert!(response.provider.is_some());
        assert!(response.resource_schemas.contains_key("testcloud_instance"));
        assert!(response.data_source_schemas.contains_key("testcloud_image"));
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn plan_marks_absent_computed_attributes_unknown_on_create() {
        let handler = configured_handler().await;
        let response = handler
            .plan_resource_change(Request::new(proto::plan_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_value(Dynamic::Null),
                proposed_new_state: wire_map(&[("name", Dynamic::String("web".to_string()))]),
                config: wire_map(&[("name", Dynamic::String("web".to_string()))]),
                prior_private: vec![],
                provider_meta: None,
                client_capabilities: None,
                prior_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        let planned = decode_wire(&response.planned_state);
        assert!(planned.is_unknown() == false);
        let id = value_at(&planned, "id");
        assert!(id.is_unknown());
        assert!(response.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn plan_flags_requires_replace_on_update() {
        let handler = configured_handler().await;
        let response = handler
            .plan_resource_change(Request::new(proto::plan_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_map(&[
                    ("id", Dynamic::String("inst-001".to_string())),
                    ("name", Dynamic::String("web".to_string())),
                    ("zone", Dynamic::String("zone-a".to_string())),
                ]),
                proposed_new_state: wire_map(&[
                    ("id", Dynamic::String("inst-001".to_string())),
                    ("name", Dynamic::String("web".to_string())),
                    ("zone", Dynamic::String("zone-b".to_string())),
                ]),
                config: wire_map(&[
                    ("name", Dynamic::String("web".to_string())),
                    ("zone", Dynamic::String("zone-b".to_string())),
                ]),
                prior_private: vec![],
                provider_meta: None,
                client_capabilities: None,
                prior_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.requires_replace.len(), 1);
        let step = &response.requires_replace[0].steps[0];
        assert_eq!(
            step.selector,
            Some(proto::attribute_path::step::Selector::AttributeName(
                "zone".to_string()
            ))
        );

        // The computed id carries over from prior state instead of
        // showing as unknown.
        let planned = decode_wire(&response.planned_state);
        assert_eq!(
            value_at(&planned, "id").value,
            Dynamic::String("inst-001".to_string())
        );
    }

    #[tokio::test]
    async fn plan_passes_destroy_through() {
        let handler = configured_handler().await;
        let response = handler
            .plan_resource_change(Request::new(proto::plan_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_map(&[("id", Dynamic::String("inst-001".to_string()))]),
                proposed_new_state: wire_value(Dynamic::Null),
                config: wire_value(Dynamic::Null),
                prior_private: vec![],
                provider_meta: None,
                client_capabilities: None,
                prior_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        let planned = decode_wire(&response.planned_state);
        assert!(planned.is_null());
        assert!(response.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn apply_routes_create_to_resource() {
        let handler = configured_handler().await;
        let response = handler
            .apply_resource_change(Request::new(proto::apply_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_value(Dynamic::Null),
                planned_state: wire_map(&[
                    ("id", Dynamic::Unknown),
                    ("name", Dynamic::String("web".to_string())),
                ]),
                config: wire_map(&[("name", Dynamic::String("web".to_string()))]),
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let state = decode_wire(&response.new_state);
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "inst-001"
        );
    }

    #[tokio::test]
    async fn apply_without_configure_reports_diagnostic() {
        let handler = handler();
        let response = handler
            .apply_resource_change(Request::new(proto::apply_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_value(Dynamic::Null),
                planned_state: wire_map(&[("name", Dynamic::String("web".to_string()))]),
                config: wire_map(&[("name", Dynamic::String("web".to_string()))]),
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Provider not configured"));
    }

    #[tokio::test]
    async fn apply_delete_returns_no_state() {
        let handler = configured_handler().await;
        let response = handler
            .apply_resource_change(Request::new(proto::apply_resource_change::Request {
                type_name: "testcloud_instance".to_string(),
                prior_state: wire_map(&[
                    ("id", Dynamic::String("inst-001".to_string())),
                    ("name", Dynamic::String("web".to_string())),
                ]),
                planned_state: wire_value(Dynamic::Null),
                config: wire_value(Dynamic::Null),
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn read_drops_vanished_resource_from_state() {
        let handler = configured_handler().await;
        let response = handler
            .read_resource(Request::new(proto::read_resource::Request {
                type_name: "testcloud_instance".to_string(),
                current_state: wire_map(&[
                    ("id", Dynamic::String("inst-001".to_string())),
                    ("name", Dynamic::String("vanished".to_string())),
                ]),
                private: vec![],
                provider_meta: None,
                client_capabilities: None,
                current_identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn read_data_source_returns_state() {
        let handler = configured_handler().await;
        let response = handler
            .read_data_source(Request::new(proto::read_data_source::Request {
                type_name: "testcloud_image".to_string(),
                config: wire_map(&[("name", Dynamic::Null)]),
                provider_meta: None,
                client_capabilities: None,
            }))
            .await
            .unwrap()
            .into_inner();

        let state = decode_wire(&response.state);
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "ubuntu-24.04"
        );
    }

    #[tokio::test]
    async fn import_is_rejected_without_an_override() {
        let handler = configured_handler().await;
        let response = handler
            .import_resource_state(Request::new(proto::import_resource_state::Request {
                type_name: "testcloud_instance".to_string(),
                id: "inst-001".to_string(),
                client_capabilities: None,
                identity: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Import Not Supported"));
    }

    #[tokio::test]
    async fn unknown_resource_type_is_an_error() {
        let handler = configured_handler().await;
        let result = handler
            .read_resource(Request::new(proto::read_resource::Request {
                type_name: "testcloud_bogus".to_string(),
                current_state: wire_value(Dynamic::Null),
                private: vec![],
                provider_meta: None,
                client_capabilities: None,
                current_identity: None,
            }))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("testcloud_bogus"));
    }

    #[tokio::test]
    async fn validate_reports_missing_required_attribute() {
        let handler = configured_handler().await;
        let response = handler
            .validate_resource_config(Request::new(proto::validate_resource_config::Request {
                type_name: "testcloud_instance".to_string(),
                config: wire_map(&[("zone", Dynamic::String("zone-a".to_string()))]),
                client_capabilities: None,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("name"));
    }

    #[tokio::test]
    async fn upgrade_state_at_current_version_passes_through() {
        let handler = configured_handler().await;
        let response = handler
            .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
                type_name: "testcloud_instance".to_string(),
                version: 0,
                raw_state: Some(proto::RawState {
                    json: br#"{"id":"inst-001","name":"web"}"#.to_vec(),
                    flatmap: HashMap::new(),
                }),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        let upgraded = decode_wire(&response.upgraded_state);
        assert_eq!(
            upgraded.get_string(&AttributePath::new("id")).unwrap(),
            "inst-001"
        );
    }

    #[test]
    fn attribute_type_bytes_use_type_constraint_syntax() {
        assert_eq!(attribute_type_bytes(&AttributeType::String), b"\"string\"");
        assert_eq!(
            attribute_type_bytes(&AttributeType::List(Box::new(AttributeType::String))),
            b"[\"list\",\"string\"]"
        );
        let object = AttributeType::Object(HashMap::from([(
            "size".to_string(),
            AttributeType::Number,
        )]));
        assert_eq!(
            attribute_type_bytes(&object),
            b"[\"object\",{\"size\":\"number\"}]"
        );
    }
}
